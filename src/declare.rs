use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

/// 交易所
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter)]
pub enum Market {
    /// 上海證券交易所
    Shanghai,
    /// 深圳證券交易所
    Shenzhen,
    /// 北京證券交易所
    Beijing,
    /// 香港交易所
    HongKong,
}

impl Market {
    /// 由代碼後綴判斷交易所，大小寫不拘，例︰SH、sz、HKG
    pub fn from_suffix(suffix: &str) -> Option<Market> {
        match suffix.trim().to_ascii_lowercase().as_str() {
            "sh" => Some(Market::Shanghai),
            "sz" => Some(Market::Shenzhen),
            "bj" => Some(Market::Beijing),
            "hk" | "hkg" => Some(Market::HongKong),
            _ => None,
        }
    }

    /// 報價商使用的前置字元
    pub fn prefix(&self) -> &'static str {
        match self {
            Market::Shanghai => "sh",
            Market::Shenzhen => "sz",
            Market::Beijing => "bj",
            Market::HongKong => "hk",
        }
    }

    /// 由已正規化的代碼反推交易所
    pub fn of_symbol(symbol: &str) -> Option<Market> {
        Market::iter().find(|m| symbol.starts_with(m.prefix()))
    }

    pub fn is_hong_kong(&self) -> bool {
        matches!(self, Market::HongKong)
    }
}

/// 單一代碼的即時報價
///
/// `current_price` 為 0 代表停牌或當日無成交，與抓取失敗(沒有這筆資料)不同。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct QuoteRecord {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    pub trade_date: String,
    pub trade_time: String,
    /// 漲跌
    pub change: f64,
    /// 漲幅(%)
    pub change_percent: f64,
}

impl QuoteRecord {
    /// 依昨收價計算漲跌與漲幅，昨收價不大於零時兩者皆為零
    pub fn with_change(mut self) -> Self {
        if self.previous_close > 0.0 {
            self.change = self.current_price - self.previous_close;
            // 漲幅 = (現價 - 昨收價) / 昨收價 * 100%
            self.change_percent = self.change / self.previous_close * 100.0;
        } else {
            self.change = 0.0;
            self.change_percent = 0.0;
        }

        self
    }

    /// 停牌或當日無成交
    pub fn is_suspended(&self) -> bool {
        self.current_price <= 0.0
    }
}
