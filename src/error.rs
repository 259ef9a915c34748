use thiserror::Error;

/// 抓取流程中會遇到的錯誤種類
///
/// 除了 `Config` 之外都不會讓程序結束，各層會在邊界把錯誤降級成空結果或降級快照。
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// 股票代碼格式錯誤或交易所後綴不認得，該腿直接略過
    #[error("unable to normalize stock code '{code}': {reason}")]
    SymbolNormalization { code: String, reason: String },

    /// 網路、逾時、解碼或回應格式錯誤，該次請求視為沒有資料
    #[error("{source_name} upstream fetch failed: {reason}")]
    UpstreamFetch { source_name: String, reason: String },

    /// 快照寫檔失敗，本輪不發佈快照
    #[error("failed to persist snapshot to {path}: {reason}")]
    Persistence { path: String, reason: String },

    /// 股票配對清單無法取得，本輪輸出降級快照
    #[error("stock pair reference store unavailable: {0}")]
    ReferenceStore(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
