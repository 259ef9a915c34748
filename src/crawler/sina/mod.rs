use crate::{config, util::http::HttpClient};

pub mod quote;

pub const HOST: &str = "hq.sinajs.cn";
const REFERER: &str = "https://finance.sina.com.cn";

/// 新浪財經，提供滬深北 A 股報價
pub struct Sina {
    http: HttpClient,
    url: String,
}

impl Sina {
    pub fn new(http: HttpClient, setting: &config::Crawler) -> Self {
        let url = if setting.sina_url.is_empty() {
            format!("https://{}/list=", HOST)
        } else {
            setting.sina_url.clone()
        };

        Sina { http, url }
    }
}
