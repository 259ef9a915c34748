use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{database::PostgresSQL, error::CrawlerError};

/// 原表名 stock_pairs，同一家公司的 A 股與 H 股代碼
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct StockPair {
    /// 股票名稱
    pub display_name: String,
    /// A 股代碼，例︰600036.SH
    pub a_code: Option<String>,
    /// 港股代碼，例︰3968.HK
    pub h_code: Option<String>,
}

impl StockPair {
    pub fn new(display_name: &str, a_code: Option<&str>, h_code: Option<&str>) -> Self {
        StockPair {
            display_name: display_name.to_string(),
            a_code: a_code.map(str::to_string),
            h_code: h_code.map(str::to_string),
        }
    }
}

/// 股票配對清單的來源，僅需唯讀
#[async_trait]
pub trait StockPairSource: Send + Sync {
    async fn fetch_pairs(&self) -> Result<Vec<StockPair>>;
}

#[async_trait]
impl StockPairSource for PostgresSQL {
    /// 取得所有的 A+H 股票配對
    async fn fetch_pairs(&self) -> Result<Vec<StockPair>> {
        sqlx::query_as::<_, StockPair>(
            r#"
SELECT
    stock_name AS display_name,
    a_stock_code AS a_code,
    h_stock_code AS h_code
FROM
    stock_pairs
"#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|why| {
            anyhow::Error::from(CrawlerError::ReferenceStore(format!(
                "Failed to StockPair::fetch because:{:?}",
                why
            )))
        })
    }
}
