use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use concat_string::concat_string;

use crate::{
    crawler::{
        build_headers, upstream_error,
        tencent::{Tencent, REFERER},
        QuoteAdapter, QuoteMap,
    },
    declare::{Market, QuoteRecord},
    logging,
    util::{http, text},
};

const LINE_PREFIX: &str = "v_r_";
/// 一筆港股即時報價至少要有的欄位數
const MIN_FIELDS: usize = 35;

#[async_trait]
impl QuoteAdapter for Tencent {
    fn name(&self) -> &'static str {
        "tencent"
    }

    async fn visit(&self, symbols: &[String]) -> Result<QuoteMap> {
        let codes: Vec<String> = symbols.iter().map(|s| real_time_symbol(s)).collect();
        let url = concat_string!(self.url, codes.join(","));
        let headers = build_headers(&self.http.user_agent(), REFERER);

        http::politeness_delay().await;
        let body = self
            .http
            .get_use_gbk(&url, headers)
            .await
            .map_err(|why| upstream_error(self.name(), why))?;

        Ok(parse(&body, Local::now()))
    }
}

/// hk00700 => r_hk00700，未帶 hk 的代碼補零至五碼
pub fn real_time_symbol(symbol: &str) -> String {
    let prefix = Market::HongKong.prefix();
    if symbol.starts_with(prefix) {
        format!("r_{}", symbol)
    } else {
        format!("r_{}{:0>5}", prefix, symbol)
    }
}

/// 解析騰訊即時接口的回應，每行格式為 `v_r_hk00700="100~騰訊控股~00700~557.000~...";`
///
/// `now` 為抓取完成的時間，遇到無法解析的時間欄位時以它取代。
pub fn parse(body: &str, now: DateTime<Local>) -> QuoteMap {
    let mut result = QuoteMap::new();

    for line in body
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with(LINE_PREFIX) && l.contains('~'))
    {
        match parse_line(line, now) {
            Ok(quote) => {
                result.insert(quote.symbol.clone(), quote);
            }
            Err(why) => {
                logging::debug_file_async(format!("Skip tencent line({}) because {:?}", line, why));
            }
        }
    }

    result
}

fn parse_line(line: &str, now: DateTime<Local>) -> Result<QuoteRecord> {
    let (head, rest) = line
        .split_once('=')
        .ok_or_else(|| anyhow!("missing '=' separator"))?;
    let data = rest.trim().trim_end_matches(';').trim_matches('"');
    let fields: Vec<&str> = data.split('~').collect();

    if fields.len() < MIN_FIELDS {
        return Err(anyhow!(
            "expected at least {} fields but got {}",
            MIN_FIELDS,
            fields.len()
        ));
    }

    let (trade_date, trade_time) = parse_timestamp(fields[30], now);
    let quote = QuoteRecord {
        symbol: head.trim().trim_start_matches(LINE_PREFIX).to_string(),
        name: fields[1].to_string(),
        current_price: text::parse_f64_or_zero(fields[3])?,
        previous_close: text::parse_f64_or_zero(fields[4])?,
        open: text::parse_f64_or_zero(fields[5])?,
        volume: text::parse_f64_or_zero(fields[6])? as i64,
        high: text::parse_f64_or_zero(fields[33])?,
        low: text::parse_f64_or_zero(fields[34])?,
        trade_date,
        trade_time,
        ..Default::default()
    };

    Ok(quote.with_change())
}

/// 將 `2025/1/24 16:08:08` 轉成 (`2025-01-24`, `16:08:08`)
///
/// 欄位為空或格式不正確時，日期與時間皆改用 `now`。
pub fn parse_timestamp(value: &str, now: DateTime<Local>) -> (String, String) {
    parse_date_time(value.trim()).unwrap_or_else(|| {
        (
            now.format("%Y-%m-%d").to_string(),
            now.format("%H:%M:%S").to_string(),
        )
    })
}

fn parse_date_time(value: &str) -> Option<(String, String)> {
    let (date, time) = value.split_once(' ')?;
    let time = time.trim();

    let ymd: Vec<&str> = date.split(['/', '-']).collect();
    if ymd.len() != 3 || !ymd.iter().all(|p| is_digits(p)) {
        return None;
    }

    let hms: Vec<&str> = time.split(':').collect();
    if hms.len() != 3 || !hms.iter().all(|p| is_digits(p)) {
        return None;
    }

    Some((
        format!("{}-{:0>2}-{:0>2}", ymd[0], ymd[1], ymd[2]),
        time.to_string(),
    ))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
