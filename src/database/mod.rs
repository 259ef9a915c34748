use std::time::Duration;

use anyhow::{anyhow, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config;

pub mod table;

/// PostgreSQL 連線池封裝。
///
/// 由設定檔建立後明確傳入需要查詢的地方，供 `database::table::*` 使用。
#[derive(Clone)]
pub struct PostgresSQL {
    /// SQLx PostgreSQL 連線池實例。
    pub pool: PgPool,
}

impl PostgresSQL {
    /// 建立 PostgreSQL 連線池。
    ///
    /// 連線是 lazy 的，真正查詢時才會連線，因此資料庫暫時無法連線不會讓程序啟動失敗。
    ///
    /// # Errors
    /// 連線字串格式錯誤時回傳錯誤。
    pub fn new(setting: &config::PostgreSQL) -> Result<PostgresSQL> {
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}?application_name=ah_quote_crawler",
            setting.user, setting.password, setting.host, setting.port, setting.db
        );
        let db = PgPoolOptions::new()
            .max_lifetime(Some(Duration::from_secs(1800)))
            .max_connections(5)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect_lazy(&database_url)
            .map_err(|why| {
                anyhow!(
                    "wrong database URL for {}@{}:{}/{} because {:?}",
                    setting.user,
                    setting.host,
                    setting.port,
                    setting.db,
                    why
                )
            })?;

        Ok(Self { pool: db })
    }

    /// 取得連線池參考。
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
