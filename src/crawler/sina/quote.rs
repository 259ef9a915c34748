use anyhow::{anyhow, Result};
use async_trait::async_trait;
use concat_string::concat_string;

use crate::{
    crawler::{
        build_headers, upstream_error,
        sina::{Sina, REFERER},
        QuoteAdapter, QuoteMap,
    },
    declare::QuoteRecord,
    logging,
    util::{http, text},
};

const LINE_PREFIX: &str = "var hq_str_";
/// 一筆 A 股報價至少要有的欄位數
const MIN_FIELDS: usize = 32;

#[async_trait]
impl QuoteAdapter for Sina {
    fn name(&self) -> &'static str {
        "sina"
    }

    async fn visit(&self, symbols: &[String]) -> Result<QuoteMap> {
        let url = concat_string!(self.url, symbols.join(","));
        let headers = build_headers(&self.http.user_agent(), REFERER);

        http::politeness_delay().await;
        let body = self
            .http
            .get_use_gbk(&url, headers)
            .await
            .map_err(|why| upstream_error(self.name(), why))?;

        Ok(parse(&body))
    }
}

/// 解析新浪的回應，每行格式為 `var hq_str_sh600036="名稱,今開,昨收,現價,最高,最低,...";`
pub fn parse(body: &str) -> QuoteMap {
    let mut result = QuoteMap::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_line(line) {
            Ok(Some(quote)) => {
                result.insert(quote.symbol.clone(), quote);
            }
            Ok(None) => {}
            Err(why) => {
                logging::debug_file_async(format!("Skip sina line({}) because {:?}", line, why));
            }
        }
    }

    result
}

/// 回應內容為空(代碼不存在)時回傳 Ok(None)
fn parse_line(line: &str) -> Result<Option<QuoteRecord>> {
    let (head, rest) = match line.split_once('=') {
        Some(parts) => parts,
        None => return Ok(None),
    };

    let data = match rest.split('"').nth(1) {
        Some(d) if !d.is_empty() => d,
        _ => return Ok(None),
    };

    let symbol = head.trim().trim_start_matches(LINE_PREFIX).to_string();
    let fields: Vec<&str> = data.split(',').collect();

    if fields.len() < MIN_FIELDS {
        return Err(anyhow!(
            "expected at least {} fields but got {}",
            MIN_FIELDS,
            fields.len()
        ));
    }

    let quote = QuoteRecord {
        symbol,
        name: fields[0].to_string(),
        open: text::parse_f64_or_zero(fields[1])?,
        previous_close: text::parse_f64_or_zero(fields[2])?,
        current_price: text::parse_f64_or_zero(fields[3])?,
        high: text::parse_f64_or_zero(fields[4])?,
        low: text::parse_f64_or_zero(fields[5])?,
        volume: text::parse_i64_or_zero(fields[8])?,
        trade_date: fields[30].to_string(),
        trade_time: fields[31].to_string(),
        ..Default::default()
    };

    Ok(Some(quote.with_change()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config, error::CrawlerError, util::http::HttpClient};

    const BODY: &str = concat!(
        "var hq_str_sh600036=\"招商银行,35.000,34.800,35.200,35.500,34.900,35.190,35.200,52034400,1830000000.000,100,35.190,200,35.180,300,35.170,400,35.160,500,35.150,100,35.200,200,35.210,300,35.220,400,35.230,500,35.240,2025-01-24,15:00:00,00,\";\n",
        "var hq_str_sz000002=\"万 科Ａ,7.000,0.000,0.000,0.000,0.000,0.000,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,0,0.000,2025-01-24,15:00:00,03,\";\n",
        "var hq_str_sh999999=\"\";\n",
    );

    #[test]
    fn test_parse() {
        let quotes = parse(BODY);

        assert_eq!(quotes.len(), 2);

        let cmb = &quotes["sh600036"];
        assert_eq!(cmb.name, "招商银行");
        assert_eq!(cmb.open, 35.0);
        assert_eq!(cmb.previous_close, 34.8);
        assert_eq!(cmb.current_price, 35.2);
        assert_eq!(cmb.high, 35.5);
        assert_eq!(cmb.low, 34.9);
        assert_eq!(cmb.volume, 52034400);
        assert_eq!(cmb.trade_date, "2025-01-24");
        assert_eq!(cmb.trade_time, "15:00:00");
        assert!((cmb.change_percent - 1.1494).abs() < 0.001);

        let vanke = &quotes["sz000002"];
        assert!(vanke.is_suspended());
        assert_eq!(vanke.change, 0.0);
        assert_eq!(vanke.change_percent, 0.0);
    }

    #[test]
    fn test_parse_skips_short_and_malformed_lines() {
        let body = concat!(
            "var hq_str_sh600000=\"浦发银行,10.0,9.9\";\n",
            "var hq_str_sh600001=\"坏数据,abc,34.800,35.200,35.500,34.900,35.190,35.200,1,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2025-01-24,15:00:00,00\";\n",
            "garbage without separator\n",
        );

        assert!(parse(body).is_empty());
    }

    #[test]
    fn test_parse_skips_non_finite_prices() {
        let cmb = BODY.lines().next().unwrap();
        let body = format!(
            "{}\n{}\n{}\n",
            cmb.replace("34.800,35.200,35.500", "34.800,nan,35.500")
                .replace("sh600036", "sh600001"),
            cmb.replace("34.800,35.200,35.500", "34.800,35.200,inf")
                .replace("sh600036", "sh600002"),
            cmb
        );

        let quotes = parse(&body);

        assert_eq!(quotes.len(), 1);
        assert!(quotes.contains_key("sh600036"));
        assert!(quotes.values().all(|q| q.current_price.is_finite() && q.high.is_finite()));
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse("").is_empty());
    }

    #[tokio::test]
    async fn test_visit_unreachable_host_is_upstream_error() {
        let setting = config::Crawler {
            sina_url: "http://127.0.0.1:1/list=".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        };
        let adapter = Sina::new(HttpClient::new(&setting).unwrap(), &setting);
        let symbols = vec!["sh600036".to_string()];

        let err = adapter.visit(&symbols).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CrawlerError>(),
            Some(CrawlerError::UpstreamFetch { source_name, .. }) if source_name == "sina"
        ));
        assert!(adapter.fetch(&symbols).await.is_empty());
    }
}
