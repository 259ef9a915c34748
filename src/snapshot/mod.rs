use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{
    crawler::QuoteMap, database::table::stock_pair::StockPair, declare::QuoteRecord, logging,
    symbol,
};

pub mod store;

/// 一輪抓取的完整結果，寫檔後即不再變動
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Local>,
    pub stock_pairs: Vec<StockPair>,
    /// 正規化代碼 => 報價
    pub prices: BTreeMap<String, QuoteRecord>,
    /// 正規化代碼 => 股票名稱
    pub code_mapping: BTreeMap<String, String>,
    /// 現價大於零的報價數量
    pub success_count: usize,
    /// 股票配對的數量(不是代碼的數量)
    pub total_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 本輪要抓取的代碼與代碼對應的股票名稱
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SymbolUniverse {
    /// 依配對順序排列且不重複的代碼
    pub symbols: Vec<String>,
    pub code_mapping: BTreeMap<String, String>,
}

impl SymbolUniverse {
    /// 正規化每個配對的 A 股與港股代碼
    ///
    /// 多個配對正規化成同一個代碼時，以最後一個配對的名稱為準。
    pub fn from_pairs(pairs: &[StockPair]) -> Self {
        let mut universe = SymbolUniverse::default();

        for pair in pairs {
            for code in [&pair.a_code, &pair.h_code] {
                let normalized = match symbol::normalize(code.as_deref()) {
                    Some(s) => s,
                    None => continue,
                };

                if let Some(previous) = universe
                    .code_mapping
                    .insert(normalized.clone(), pair.display_name.clone())
                {
                    logging::debug_file_async(format!(
                        "{} is shared by {} and {}, keep the latter",
                        normalized, previous, pair.display_name
                    ));
                } else {
                    universe.symbols.push(normalized);
                }
            }
        }

        universe
    }
}

impl Snapshot {
    /// 將股票配對與抓回來的報價組成快照
    pub fn build(stock_pairs: Vec<StockPair>, prices: QuoteMap) -> Snapshot {
        let universe = SymbolUniverse::from_pairs(&stock_pairs);
        Self::with_universe(stock_pairs, universe, prices)
    }

    /// 已經正規化過代碼時使用，避免重複記錄診斷訊息
    pub fn with_universe(
        stock_pairs: Vec<StockPair>,
        universe: SymbolUniverse,
        prices: QuoteMap,
    ) -> Snapshot {
        let prices: BTreeMap<String, QuoteRecord> = prices.into_iter().collect();
        let success_count = prices.values().filter(|q| q.current_price > 0.0).count();
        let total_count = stock_pairs.len();

        Snapshot {
            timestamp: Local::now(),
            stock_pairs,
            prices,
            code_mapping: universe.code_mapping,
            success_count,
            total_count,
            error: None,
        }
    }

    /// 本輪無法取得資料時的降級快照
    pub fn degraded(why: impl Display) -> Snapshot {
        Snapshot {
            timestamp: Local::now(),
            stock_pairs: Vec::new(),
            prices: BTreeMap::new(),
            code_mapping: BTreeMap::new(),
            success_count: 0,
            total_count: 0,
            error: Some(why.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// 距離快照產生的時間
    pub fn age(&self, now: DateTime<Local>) -> TimeDelta {
        now.signed_duration_since(self.timestamp)
    }

    /// 依條件篩選股票配對並帶出 A 股與港股的報價
    pub fn rows(&self, filter: &PairFilter) -> Vec<PairRow> {
        self.stock_pairs
            .iter()
            .filter_map(|pair| {
                let matched = filter.matched(pair)?;
                let a_symbol = quiet_normalize(pair.a_code.as_deref());
                let h_symbol = quiet_normalize(pair.h_code.as_deref());

                Some(PairRow {
                    display_name: pair.display_name.clone(),
                    a_code: pair.a_code.clone(),
                    h_code: pair.h_code.clone(),
                    a_quote: a_symbol.as_ref().and_then(|s| self.prices.get(s).cloned()),
                    h_quote: h_symbol.as_ref().and_then(|s| self.prices.get(s).cloned()),
                    a_symbol,
                    h_symbol,
                    matched,
                })
            })
            .collect()
    }
}

/// 顯示用途，不需要再記錄一次診斷訊息
fn quiet_normalize(code: Option<&str>) -> Option<String> {
    symbol::parse(code?.trim()).ok()
}

/// 名稱、A 股代碼、港股代碼的模糊搜尋條件，大小寫不拘，多個條件需同時成立
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PairFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub a_code: Option<String>,
    #[serde(default)]
    pub h_code: Option<String>,
}

impl PairFilter {
    /// 不符合時回傳 None，符合時回傳有命中的欄位名稱，供畫面標示
    pub fn matched(&self, pair: &StockPair) -> Option<Vec<&'static str>> {
        let mut matched = Vec::with_capacity(3);
        let columns = [
            ("display_name", &self.name, Some(pair.display_name.as_str())),
            ("a_code", &self.a_code, pair.a_code.as_deref()),
            ("h_code", &self.h_code, pair.h_code.as_deref()),
        ];

        for (column, term, value) in columns {
            let term = match term.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => t.to_lowercase(),
                _ => continue,
            };

            match value {
                Some(v) if v.to_lowercase().contains(&term) => matched.push(column),
                _ => return None,
            }
        }

        Some(matched)
    }
}

/// 股票配對與其 A 股、港股報價
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PairRow {
    pub display_name: String,
    pub a_code: Option<String>,
    pub h_code: Option<String>,
    pub a_symbol: Option<String>,
    pub h_symbol: Option<String>,
    pub a_quote: Option<QuoteRecord>,
    pub h_quote: Option<QuoteRecord>,
    pub matched: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fake::quote;

    fn pairs() -> Vec<StockPair> {
        vec![
            StockPair::new("招商银行", Some("600036.SH"), Some("3968.HK")),
            StockPair::new("建设银行", Some("601939.SH"), Some("0939.HK")),
            StockPair::new("坏代码", Some("ABC123"), Some("nan")),
        ]
    }

    fn prices() -> QuoteMap {
        [
            quote("sh600036", 35.2, 34.8),
            quote("hk03968", 0.0, 30.1),
            quote("sh601939", 7.5, 7.4),
        ]
        .into_iter()
        .map(|q| (q.symbol.clone(), q))
        .collect()
    }

    #[test]
    fn test_symbol_universe() {
        let universe = SymbolUniverse::from_pairs(&pairs());

        assert_eq!(
            universe.symbols,
            vec!["sh600036", "hk03968", "sh601939", "hk00939"]
        );
        assert_eq!(universe.code_mapping["hk03968"], "招商银行");
        assert!(!universe.code_mapping.values().any(|n| n == "坏代码"));
    }

    #[test]
    fn test_symbol_universe_last_writer_wins() {
        let pairs = vec![
            StockPair::new("甲", Some("600036.SH"), None),
            StockPair::new("乙", Some("600036.sh"), None),
        ];
        let universe = SymbolUniverse::from_pairs(&pairs);

        assert_eq!(universe.symbols, vec!["sh600036"]);
        assert_eq!(universe.code_mapping["sh600036"], "乙");
    }

    #[test]
    fn test_build() {
        let snapshot = Snapshot::build(pairs(), prices());

        assert_eq!(snapshot.total_count, 3);
        assert_eq!(snapshot.success_count, 2);
        assert_eq!(snapshot.code_mapping.len(), 4);
        assert!(snapshot.error.is_none());
        assert!(snapshot.success_count <= snapshot.prices.len());
    }

    #[test]
    fn test_build_mega_bank_scenario() {
        let pairs = vec![StockPair::new("MegaBank", Some("600036.SH"), Some("3968.HK"))];
        let snapshot = Snapshot::build(pairs, prices());

        assert_eq!(snapshot.success_count, 2);
        let single: QuoteMap = prices()
            .into_iter()
            .filter(|(k, _)| k != "sh601939")
            .collect();
        let snapshot = Snapshot::build(
            vec![StockPair::new("MegaBank", Some("600036.SH"), Some("3968.HK"))],
            single,
        );

        assert_eq!(snapshot.success_count, 1);
        assert_eq!(snapshot.total_count, 1);
        assert!((snapshot.prices["sh600036"].change_percent - 1.149).abs() < 0.01);
        assert!(snapshot.prices["hk03968"].is_suspended());
    }

    #[test]
    fn test_build_is_idempotent() {
        let first = Snapshot::build(pairs(), prices());
        let mut second = Snapshot::build(pairs(), prices());
        second.timestamp = first.timestamp;

        assert_eq!(first, second);
    }

    #[test]
    fn test_degraded() {
        let snapshot = Snapshot::degraded("connection refused");

        assert!(snapshot.is_degraded());
        assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.success_count, 0);
        assert!(snapshot.prices.is_empty());
        assert!(snapshot.stock_pairs.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(Snapshot::build(pairs(), prices())).unwrap();

        for key in [
            "timestamp",
            "stock_pairs",
            "prices",
            "code_mapping",
            "success_count",
            "total_count",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value.get("error").is_none());
        assert!(value["prices"]["sh600036"].get("change_percent").is_some());

        let degraded = serde_json::to_value(Snapshot::degraded("boom")).unwrap();
        assert_eq!(degraded["error"], "boom");
    }

    #[test]
    fn test_rows_with_filter() {
        let snapshot = Snapshot::build(pairs(), prices());

        let all = snapshot.rows(&PairFilter::default());
        assert_eq!(all.len(), 3);
        assert!(all[0].matched.is_empty());

        let filter = PairFilter {
            name: Some("招商".to_string()),
            h_code: Some("3968.hk".to_string()),
            ..Default::default()
        };
        let rows = snapshot.rows(&filter);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].matched, vec!["display_name", "h_code"]);
        assert_eq!(rows[0].a_symbol.as_deref(), Some("sh600036"));
        assert!(rows[0].a_quote.is_some());
        assert!(rows[0].h_quote.as_ref().is_some_and(|q| q.is_suspended()));

        let filter = PairFilter {
            a_code: Some("601".to_string()),
            ..Default::default()
        };
        let rows = snapshot.rows(&filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "建设银行");
        assert!(rows[0].h_quote.is_none());
    }

    #[test]
    fn test_age() {
        let snapshot = Snapshot::degraded("x");
        let later = snapshot.timestamp + TimeDelta::seconds(30);

        assert_eq!(snapshot.age(later).num_seconds(), 30);
    }
}
