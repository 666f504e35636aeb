//! Backtesting layer: signal replay, ledger statistics, grid optimization.

pub mod engine;
pub mod optimization;
pub mod statistics;

pub use engine::{BacktestEngine, BacktestReport, Trade, COVERAGE_RATIO};
pub use optimization::{
    AggregateMetrics, OptimizationOutcome, OptimizationResult, ParamOptimizer,
};
pub use statistics::{calculate_metrics, max_drawdown, BacktestMetrics};
