//! A股短线信号引擎
//!
//! Screens a stock universe, scores short-term potential, optimizes
//! crossover parameters on recent history, and emits sized BUY/SELL/HOLD/
//! WATCH suggestions with stop-loss and target levels.

pub mod backtesting;
pub mod config;
pub mod error;
pub mod logger;
pub mod market;
pub mod pipeline;
pub mod report;
pub mod strategy;
pub mod utility;

pub use config::EngineConfig;
pub use error::{Result, SignalError};
pub use pipeline::{PipelineReport, StrategyPipeline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
