//! Error types for the signal engine.

use thiserror::Error;

/// Failure taxonomy for a batch run.
///
/// Insufficient history and per-symbol fetch failures are recoverable: the
/// caller skips the symbol or grid cell and the batch continues. The only
/// fatal condition is a universe-wide data failure.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Series shorter than the required lookback window.
    #[error("数据不足: {have}条K线, 至少需要{need}条")]
    DataInsufficient { have: usize, need: usize },

    /// Provider failed to deliver data for one symbol.
    #[error("行情数据获取失败 {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Invalid strategy parameters, search grid or run configuration.
    #[error("配置错误: {0}")]
    Configuration(String),

    /// No symbol in the entire universe produced any data.
    #[error("全部行情数据获取失败: 共尝试{attempted}只股票")]
    NoMarketData { attempted: usize },

    /// Log file write failure.
    #[error("日志写入失败: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SignalError>;
