use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use rand::Rng;
use reqwest::{header, Client, Method, Response};

use crate::{config, logging::Logger, util};

pub mod user_agent;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// 每次請求前的隨機延遲區間(毫秒)，避免被行情接口限流
const POLITENESS_DELAY_MS: (u64, u64) = (100, 300);

/// reqwest 使用 rustls-no-provider，需要在建立 Client 前安裝加密套件
pub fn install_crypto_provider() {
    // 已經安裝過時會回傳 Err，忽略即可
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// 行情接口共用的 http client
///
/// 由設定檔建立後明確傳入各個報價來源，不使用全域單例。
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agents: Vec<String>,
}

impl HttpClient {
    pub fn new(setting: &config::Crawler) -> Result<Self> {
        install_crypto_provider();

        let timeout = Duration::from_secs(setting.timeout_seconds);
        let client = Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(timeout.min(Duration::from_secs(8)))
            .timeout(timeout)
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))?;

        Ok(HttpClient {
            client,
            user_agents: setting.user_agents.clone(),
        })
    }

    /// 從設定的 UA 清單隨機挑一個
    pub fn user_agent(&self) -> String {
        user_agent::pick(&self.user_agents)
    }

    /// 發送 GET 並將回應內容以 GBK 解碼成 UTF-8 文字
    pub async fn get_use_gbk(&self, url: &str, headers: header::HeaderMap) -> Result<String> {
        let response = self.send(Method::GET, url, headers).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Error reading response body: {:?}", e))?;

        Ok(util::text::gbk_to_utf8(bytes.as_ref()))
    }

    async fn send(&self, method: Method, url: &str, headers: header::HeaderMap) -> Result<Response> {
        let visit_log = format!("{method}:{url}");
        let start = Instant::now();
        let res = self
            .client
            .request(method, url)
            .headers(headers)
            .send()
            .await;
        let elapsed = start.elapsed().as_millis();

        match res {
            Ok(response) if response.status().is_success() => {
                LOGGER.info(format!("{} {} ms", visit_log, elapsed));
                Ok(response)
            }
            Ok(response) => {
                let status = response.status();
                LOGGER.error(format!("{} returned {}. {} ms", visit_log, status, elapsed));
                Err(anyhow!("{} returned status {}", visit_log, status))
            }
            Err(why) => {
                LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
                Err(anyhow!("Failed to send request to {} because {:?}", url, why))
            }
        }
    }
}

/// 請求前的隨機延遲
pub async fn politeness_delay() {
    tokio::time::sleep(Duration::from_millis(politeness_delay_millis())).await;
}

fn politeness_delay_millis() -> u64 {
    rand::rng().random_range(POLITENESS_DELAY_MS.0..=POLITENESS_DELAY_MS.1)
}
