//! Datafeed adapters producing canonical bar series.
//!
//! Implementations translate whatever schema the upstream provider uses into
//! the canonical `BarSeries` (front-adjusted, date ascending); all column
//! normalization stays behind this trait, out of the core.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Result, SignalError};

use super::object::{Bar, BarSeries, StockInfo};

/// Abstract market data source.
#[async_trait]
pub trait BaseDatafeed: Send + Sync {
    /// Query the screenable stock universe.
    async fn query_universe(&self) -> Result<Vec<StockInfo>>;

    /// Query up to `days` most recent daily bars for one symbol, oldest first.
    async fn query_bar_history(&self, symbol: &str, days: usize) -> Result<BarSeries>;
}

/// Empty datafeed implementation for when no data source is configured.
pub struct EmptyDatafeed;

impl EmptyDatafeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmptyDatafeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDatafeed for EmptyDatafeed {
    async fn query_universe(&self) -> Result<Vec<StockInfo>> {
        Err(SignalError::DataUnavailable {
            symbol: "universe".to_string(),
            reason: "没有正确配置数据服务".to_string(),
        })
    }

    async fn query_bar_history(&self, symbol: &str, _days: usize) -> Result<BarSeries> {
        Err(SignalError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "没有正确配置数据服务".to_string(),
        })
    }
}

/// File-backed datafeed reading a directory of JSON exports:
/// `universe.json` plus one `<symbol>.json` bar array per symbol.
pub struct JsonDatafeed {
    data_dir: PathBuf,
}

impl JsonDatafeed {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str, file: &str) -> Result<T> {
        let path = self.data_dir.join(file);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SignalError::DataUnavailable {
                symbol: name.to_string(),
                reason: format!("{}: {}", path.display(), e),
            }
        })?;

        serde_json::from_str(&content).map_err(|e| SignalError::DataUnavailable {
            symbol: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

#[async_trait]
impl BaseDatafeed for JsonDatafeed {
    async fn query_universe(&self) -> Result<Vec<StockInfo>> {
        self.read_json("universe", "universe.json").await
    }

    async fn query_bar_history(&self, symbol: &str, days: usize) -> Result<BarSeries> {
        let mut bars: Vec<Bar> = self.read_json(symbol, &format!("{}.json", symbol)).await?;
        if bars.len() > days {
            bars = bars.split_off(bars.len() - days);
        }
        BarSeries::new(symbol, bars)
    }
}
