use std::{sync::Arc, time::Instant};

use anyhow::Result;

use crate::{
    crawler::MixedFetcher,
    database::table::stock_pair::StockPairSource,
    logging,
    snapshot::{store::SnapshotStore, Snapshot, SymbolUniverse},
};

/// 一輪完整的抓取︰讀取股票配對 => 正規化代碼 => 抓報價 => 組快照 => 寫檔
#[derive(Clone)]
pub struct QuoteSnapshot {
    pairs: Arc<dyn StockPairSource>,
    fetcher: MixedFetcher,
    store: SnapshotStore,
}

impl QuoteSnapshot {
    pub fn new(
        pairs: Arc<dyn StockPairSource>,
        fetcher: MixedFetcher,
        store: SnapshotStore,
    ) -> Self {
        QuoteSnapshot {
            pairs,
            fetcher,
            store,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// 產生本輪的快照，任何錯誤都不會往外拋
    pub async fn collect(&self) -> Snapshot {
        let pairs = match self.pairs.fetch_pairs().await {
            Ok(pairs) => pairs,
            Err(why) => {
                logging::error_file_async(format!("Failed to fetch stock pairs because {:?}", why));
                return Snapshot::degraded(why);
            }
        };

        let universe = SymbolUniverse::from_pairs(&pairs);
        let prices = self.fetcher.fetch(&universe.symbols).await;

        Snapshot::with_universe(pairs, universe, prices)
    }

    /// 執行一輪並寫入快照檔
    ///
    /// # Errors
    /// 只有寫檔失敗時回傳錯誤，此時本輪不發佈快照。
    pub async fn execute(&self) -> Result<Snapshot> {
        let start = Instant::now();
        let snapshot = self.collect().await;

        self.store.write(&snapshot).await?;

        logging::info_file_async(format!(
            "Snapshot updated, {}/{} quotes with price, {} pairs, {} ms{}",
            snapshot.success_count,
            snapshot.prices.len(),
            snapshot.total_count,
            start.elapsed().as_millis(),
            snapshot
                .error
                .as_ref()
                .map(|e| format!(", degraded: {}", e))
                .unwrap_or_default()
        ));

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        crawler::fake::{quote, FakeAdapter},
        database::table::stock_pair::StockPair,
        error::CrawlerError,
    };

    struct FakePairs(Option<Vec<StockPair>>);

    #[async_trait]
    impl StockPairSource for FakePairs {
        async fn fetch_pairs(&self) -> Result<Vec<StockPair>> {
            match &self.0 {
                Some(pairs) => Ok(pairs.clone()),
                None => Err(CrawlerError::ReferenceStore("connection refused".to_string()).into()),
            }
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir()
            .join(format!("ah_quote_cycle_{}_{}", name, std::process::id()))
            .join("stock_data.json")
    }

    fn mega_bank() -> Vec<StockPair> {
        vec![StockPair::new("MegaBank", Some("600036.SH"), Some("3968.HK"))]
    }

    #[tokio::test]
    async fn test_execute_mega_bank() {
        let path = temp_path("mega_bank");
        let mainland = Arc::new(FakeAdapter::with(vec![quote("sh600036", 35.20, 34.80)]));
        let hong_kong = Arc::new(FakeAdapter::with(vec![quote("hk03968", 0.0, 30.1)]));
        let cycle = QuoteSnapshot::new(
            Arc::new(FakePairs(Some(mega_bank()))),
            MixedFetcher::new(mainland, hong_kong),
            SnapshotStore::new(&path),
        );

        let snapshot = cycle.execute().await.unwrap();

        assert_eq!(snapshot.success_count, 1);
        assert_eq!(snapshot.total_count, 1);
        assert!((snapshot.prices["sh600036"].change_percent - 1.1494).abs() < 0.001);
        assert!(snapshot.prices["hk03968"].is_suspended());
        assert_eq!(snapshot.code_mapping["hk03968"], "MegaBank");
        assert_eq!(cycle.store().read().await, Some(snapshot));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_execute_when_mainland_times_out() {
        let path = temp_path("timeout");
        let cycle = QuoteSnapshot::new(
            Arc::new(FakePairs(Some(mega_bank()))),
            MixedFetcher::new(
                Arc::new(FakeAdapter::failing()),
                Arc::new(FakeAdapter::with(vec![quote("hk03968", 30.5, 30.1)])),
            ),
            SnapshotStore::new(&path),
        );

        let snapshot = cycle.execute().await.unwrap();

        assert_eq!(snapshot.prices.len(), 1);
        assert!(snapshot.prices.contains_key("hk03968"));
        assert_eq!(snapshot.success_count, 1);
        assert!(snapshot.error.is_none());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_execute_skips_malformed_code() {
        let path = temp_path("malformed");
        let mainland = Arc::new(FakeAdapter::with(vec![quote("sh600036", 35.20, 34.80)]));
        let hong_kong = Arc::new(FakeAdapter::with(vec![]));
        let cycle = QuoteSnapshot::new(
            Arc::new(FakePairs(Some(vec![StockPair::new(
                "MegaBank",
                Some("600036.SH"),
                Some("ABC123"),
            )]))),
            MixedFetcher::new(mainland.clone(), hong_kong.clone()),
            SnapshotStore::new(&path),
        );

        let snapshot = cycle.execute().await.unwrap();

        assert_eq!(snapshot.code_mapping.len(), 1);
        assert_eq!(mainland.calls(), vec![vec!["sh600036".to_string()]]);
        assert!(hong_kong.calls().is_empty());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_execute_degrades_without_reference_store() {
        let path = temp_path("degraded");
        let mainland = Arc::new(FakeAdapter::with(vec![]));
        let cycle = QuoteSnapshot::new(
            Arc::new(FakePairs(None)),
            MixedFetcher::new(mainland.clone(), Arc::new(FakeAdapter::with(vec![]))),
            SnapshotStore::new(&path),
        );

        let snapshot = cycle.execute().await.unwrap();

        assert!(snapshot.is_degraded());
        assert!(snapshot
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));
        assert_eq!(snapshot.total_count, 0);
        assert!(mainland.calls().is_empty());
        assert!(cycle.store().read().await.is_some_and(|s| s.is_degraded()));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn test_execute_reports_persistence_error() {
        let path = temp_path("persistence");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let cycle = QuoteSnapshot::new(
            Arc::new(FakePairs(Some(mega_bank()))),
            MixedFetcher::new(
                Arc::new(FakeAdapter::with(vec![])),
                Arc::new(FakeAdapter::with(vec![])),
            ),
            SnapshotStore::new(&path),
        );

        let result = cycle.execute().await;
        assert!(result
            .err()
            .and_then(|e| e.downcast::<CrawlerError>().ok())
            .is_some_and(|e| matches!(e, CrawlerError::Persistence { .. })));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
