use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{
    declare::{Market, QuoteRecord},
    error::CrawlerError,
    logging,
    util::http::user_agent::gen_random_ua,
};

/// 新浪財經(A 股)
pub mod sina;
/// 騰訊財經(港股)
pub mod tencent;

/// 代碼 => 報價
pub type QuoteMap = HashMap<String, QuoteRecord>;

/// 報價來源
///
/// 一次送出同一市場的所有代碼，回傳能解析出來的報價；沒有回應或無法解析的代碼不會出現在結果內。
#[async_trait]
pub trait QuoteAdapter: Send + Sync {
    /// 來源名稱，用於記錄
    fn name(&self) -> &'static str;

    /// 向遠端請求並解析報價，網路或解碼錯誤以 Err 回傳
    async fn visit(&self, symbols: &[String]) -> Result<QuoteMap>;

    /// 取得報價，任何錯誤都降級成空結果
    async fn fetch(&self, symbols: &[String]) -> QuoteMap {
        if symbols.is_empty() {
            return QuoteMap::new();
        }

        match self.visit(symbols).await {
            Ok(quotes) => {
                logging::debug_file_async(format!(
                    "{} returned {}/{} quotes",
                    self.name(),
                    quotes.len(),
                    symbols.len()
                ));
                quotes
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to fetch quotes from {} because {:?}",
                    self.name(),
                    why
                ));
                QuoteMap::new()
            }
        }
    }
}

/// 依市場將代碼分給對應的報價來源，再把結果合併
#[derive(Clone)]
pub struct MixedFetcher {
    mainland: Arc<dyn QuoteAdapter>,
    hong_kong: Arc<dyn QuoteAdapter>,
}

impl MixedFetcher {
    pub fn new(mainland: Arc<dyn QuoteAdapter>, hong_kong: Arc<dyn QuoteAdapter>) -> Self {
        MixedFetcher {
            mainland,
            hong_kong,
        }
    }

    /// 取得混合市場的報價，A 股走新浪、港股走騰訊
    pub async fn fetch(&self, symbols: &[String]) -> QuoteMap {
        let (hong_kong, mainland): (Vec<String>, Vec<String>) =
            symbols.iter().cloned().partition(|s| is_hong_kong(s));
        let mut result = QuoteMap::with_capacity(symbols.len());

        if !mainland.is_empty() {
            result.extend(self.mainland.fetch(&mainland).await);
        }

        // 理論上兩邊的代碼不會重疊，若重疊則以後合併的港股結果為準
        if !hong_kong.is_empty() {
            result.extend(self.hong_kong.fetch(&hong_kong).await);
        }

        result
    }
}

/// 沒有 hk 前置字元的代碼一律視為 A 股
pub fn is_hong_kong(symbol: &str) -> bool {
    Market::of_symbol(symbol).is_some_and(|m| m.is_hong_kong())
}

/// 將請求或解碼失敗包成 UpstreamFetch，交由 `QuoteAdapter::fetch` 降級成空結果
pub(crate) fn upstream_error(source_name: &str, why: anyhow::Error) -> anyhow::Error {
    CrawlerError::UpstreamFetch {
        source_name: source_name.to_string(),
        reason: format!("{:?}", why),
    }
    .into()
}

/// 行情接口共用的請求標頭
pub(crate) fn build_headers(user_agent: &str, referer: &'static str) -> HeaderMap {
    let mut h = HeaderMap::with_capacity(5);

    let ua = HeaderValue::from_str(user_agent).or_else(|why| {
        logging::warn_file_async(format!(
            "Invalid User-Agent({}) because {:?}, use a generated one",
            user_agent, why
        ));
        HeaderValue::from_str(&gen_random_ua())
    });
    if let Ok(ua) = ua {
        h.insert(header::USER_AGENT, ua);
    }

    h.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    h.insert(header::REFERER, HeaderValue::from_static(referer));
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    h.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

    h
}
