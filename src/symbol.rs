//! 將資料庫內帶交易所後綴的股票代碼(例︰600036.SH、0939.HK)轉成報價商使用的代碼

use crate::{declare::Market, error::CrawlerError, logging};

/// 港股代碼補零後的長度
const HK_SYMBOL_WIDTH: usize = 5;

/// 正規化股票代碼，無法轉換時回傳 None 並記錄診斷訊息
///
/// 代碼為空、`nan` 時視為沒有代碼，不記錄任何訊息。
pub fn normalize(code: Option<&str>) -> Option<String> {
    let code = code.map(str::trim).filter(|c| !is_absent(c))?;

    match parse(code) {
        Ok(symbol) => Some(symbol),
        Err(why) => {
            logging::warn_file_async(why.to_string());
            None
        }
    }
}

/// 解析 `<代碼>.<交易所>` 格式的字串
pub fn parse(code: &str) -> Result<String, CrawlerError> {
    let (digits, suffix) = code
        .split_once('.')
        .ok_or_else(|| CrawlerError::SymbolNormalization {
            code: code.to_string(),
            reason: "missing exchange suffix".to_string(),
        })?;
    let digits = digits.trim();

    if digits.is_empty() {
        return Err(CrawlerError::SymbolNormalization {
            code: code.to_string(),
            reason: "missing security code".to_string(),
        });
    }

    let market = Market::from_suffix(suffix).ok_or_else(|| CrawlerError::SymbolNormalization {
        code: code.to_string(),
        reason: format!("unknown exchange suffix '{}'", suffix),
    })?;

    Ok(match market {
        Market::HongKong => format!(
            "{}{:0>width$}",
            market.prefix(),
            digits,
            width = HK_SYMBOL_WIDTH
        ),
        _ => format!("{}{}", market.prefix(), digits),
    })
}

fn is_absent(code: &str) -> bool {
    code.is_empty() || code.eq_ignore_ascii_case("nan")
}
