/// 抓取 A+H 股報價並輸出快照
pub mod quote_snapshot;
