//! Market data layer: canonical data objects and datafeed adapters.

pub mod datafeed;
pub mod object;

pub use datafeed::{BaseDatafeed, EmptyDatafeed, JsonDatafeed};
pub use object::{Bar, BarSeries, StockInfo};
