/// A+H 股票配對
pub mod stock_pair;
