use crate::{config, util::http::HttpClient};

pub mod quote;

pub const HOST: &str = "qt.gtimg.cn";
const REFERER: &str = "http://stockapp.finance.qq.com";

/// 騰訊財經，提供港股即時報價
pub struct Tencent {
    http: HttpClient,
    url: String,
}

impl Tencent {
    pub fn new(http: HttpClient, setting: &config::Crawler) -> Self {
        let url = if setting.tencent_url.is_empty() {
            format!("http://{}/q=", HOST)
        } else {
            setting.tencent_url.clone()
        };

        Tencent { http, url }
    }
}
