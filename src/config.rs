use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

use crate::{error::CrawlerError, logging};

const CONFIG_PATH: &str = "app.json";

/// 預設每次抓取間隔秒數
pub const DEFAULT_INTERVAL_SECONDS: u64 = 10;
/// 預設每次請求的逾時秒數
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
/// 預設快照輸出的位置
pub const DEFAULT_SNAPSHOT_PATH: &str = "stock_data.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub postgresql: PostgreSQL,
    #[serde(default)]
    pub crawler: Crawler,
    #[serde(default)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub system: System,
}

const POSTGRESQL_HOST: &str = "POSTGRESQL_HOST";
const POSTGRESQL_PORT: &str = "POSTGRESQL_PORT";
const POSTGRESQL_USER: &str = "POSTGRESQL_USER";
const POSTGRESQL_PASSWORD: &str = "POSTGRESQL_PASSWORD";
const POSTGRESQL_DB: &str = "POSTGRESQL_DB";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct PostgreSQL {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: String,
}

const CRAWLER_USER_AGENTS: &str = "CRAWLER_USER_AGENTS";
const CRAWLER_INTERVAL_SECONDS: &str = "CRAWLER_INTERVAL_SECONDS";
const CRAWLER_TIMEOUT_SECONDS: &str = "CRAWLER_TIMEOUT_SECONDS";

/// 報價爬蟲相關設定
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Crawler {
    /// 每次請求時隨機挑選其中一個 User-Agent
    #[serde(default)]
    pub user_agents: Vec<String>,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// 新浪財經 A 股報價的網址，空字串代表使用預設值
    #[serde(default)]
    pub sina_url: String,
    /// 騰訊財經港股報價的網址，空字串代表使用預設值
    #[serde(default)]
    pub tencent_url: String,
}

impl Default for Crawler {
    fn default() -> Self {
        Crawler {
            user_agents: Vec::new(),
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            sina_url: String::new(),
            tencent_url: String::new(),
        }
    }
}

const SNAPSHOT_PATH: &str = "SNAPSHOT_PATH";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Snapshot {
    #[serde(default = "default_snapshot_path")]
    pub path: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            path: default_snapshot_path(),
        }
    }
}

const SYSTEM_HTTP_PORT: &str = "SYSTEM_HTTP_PORT";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct System {
    /// 0 代表不啟動快照讀取的 http 服務
    #[serde(default)]
    pub http_port: u16,
}

fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_snapshot_path() -> String {
    DEFAULT_SNAPSHOT_PATH.to_string()
}

impl App {
    /// 讀取設定檔，找不到設定檔時全部改由 env 取得
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(path))
                .build()
                .and_then(|c| c.try_deserialize())
                .map_err(|why| CrawlerError::Config(why.to_string()))?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(POSTGRESQL_HOST) {
            self.postgresql.host = host;
        }

        if let Ok(port) = env::var(POSTGRESQL_PORT) {
            self.postgresql.port = i32::from_str(&port).unwrap_or(5432);
        }

        if let Ok(user) = env::var(POSTGRESQL_USER) {
            self.postgresql.user = user;
        }

        if let Ok(password) = env::var(POSTGRESQL_PASSWORD) {
            self.postgresql.password = password;
        }

        if let Ok(db) = env::var(POSTGRESQL_DB) {
            self.postgresql.db = db;
        }

        if let Ok(agents) = env::var(CRAWLER_USER_AGENTS) {
            match serde_json::from_str::<Vec<String>>(&agents) {
                Ok(list) => self.crawler.user_agents = list,
                Err(why) => {
                    logging::error_file_async(format!(
                        "Failed to serde_json because: {:?} \r\n {}",
                        why, &agents
                    ));
                }
            }
        }

        if let Ok(seconds) = env::var(CRAWLER_INTERVAL_SECONDS) {
            self.crawler.interval_seconds =
                u64::from_str(&seconds).unwrap_or(DEFAULT_INTERVAL_SECONDS);
        }

        if let Ok(seconds) = env::var(CRAWLER_TIMEOUT_SECONDS) {
            self.crawler.timeout_seconds =
                u64::from_str(&seconds).unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        }

        if let Ok(path) = env::var(SNAPSHOT_PATH) {
            self.snapshot.path = path;
        }

        if let Ok(port) = env::var(SYSTEM_HTTP_PORT) {
            self.system.http_port = u16::from_str(&port).unwrap_or(0);
        }

        if self.crawler.interval_seconds == 0 {
            self.crawler.interval_seconds = DEFAULT_INTERVAL_SECONDS;
        }

        if self.crawler.timeout_seconds == 0 {
            self.crawler.timeout_seconds = DEFAULT_TIMEOUT_SECONDS;
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
