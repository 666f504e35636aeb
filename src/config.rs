//! Run configuration objects.
//!
//! One immutable configuration tree is built at startup and handed to each
//! component at construction; there is no process-wide mutable state. The
//! defaults reproduce the values the strategy was tuned with, and an optional
//! JSON file can override any block.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SignalError};
use crate::strategy::params::ParamGrid;

/// Universe screening thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockFilterConfig {
    /// Minimum total market cap, in 亿.
    pub min_market_cap: f64,
    /// Minimum daily turnover amount, in 亿.
    pub min_turnover_amount: f64,
    pub exclude_st: bool,
    pub exclude_delisted: bool,
    /// Universe cap; the most liquid names are kept.
    pub max_stock_count: usize,
}

impl Default for StockFilterConfig {
    fn default() -> Self {
        Self {
            min_market_cap: 500.0,
            min_turnover_amount: 2.0,
            exclude_st: true,
            exclude_delisted: true,
            max_stock_count: 200,
        }
    }
}

/// Weights of the optimizer composite score. The drawdown weight is negative
/// so deeper drawdowns lower the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub annual_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            annual_return: 0.6,
            win_rate: 0.3,
            max_drawdown: -0.1,
        }
    }
}

/// Backtest window and aggregation gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Lookback window in calendar days; also the annualization base.
    pub lookback_days: usize,
    /// Transaction cost fraction applied to both legs of a trade.
    pub transaction_cost: f64,
    /// Runs with fewer realized trades are excluded from aggregation.
    pub min_trades: usize,
    /// Grid cells backed by fewer valid symbols are skipped entirely.
    pub min_valid_symbols: usize,
    pub weights: ScoreWeights,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookback_days: 180,
            transaction_cost: 0.0015,
            min_trades: 2,
            min_valid_symbols: 2,
            weights: ScoreWeights::default(),
        }
    }
}

/// A preset stock used when scoring cannot fill the selection quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackStock {
    pub symbol: String,
    pub name: String,
}

impl FallbackStock {
    fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
        }
    }
}

/// Candidate selection counts and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// How many stocks the selection step keeps.
    pub top_count: usize,
    /// How many of them get signals generated.
    pub signal_count: usize,
    /// How many of them back the parameter optimization.
    pub validation_count: usize,
    pub primary_threshold: f64,
    pub secondary_threshold: f64,
    /// Last-resort fill so the pipeline never halts for lack of candidates.
    pub fallback_stocks: Vec<FallbackStock>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_count: 5,
            signal_count: 5,
            validation_count: 3,
            primary_threshold: 30.0,
            secondary_threshold: 20.0,
            fallback_stocks: vec![
                FallbackStock::new("601899", "紫金矿业"),
                FallbackStock::new("600519", "贵州茅台"),
                FallbackStock::new("000651", "格力电器"),
                FallbackStock::new("600028", "中国石化"),
                FallbackStock::new("601988", "中国银行"),
            ],
        }
    }
}

/// Fixed fractional cash allocation for sizing suggestions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CashConfig {
    pub initial_cash: f64,
    /// Share of cash deployed; the rest stays as reserve.
    pub invest_ratio: f64,
}

impl Default for CashConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            invest_ratio: 0.7,
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub filter: StockFilterConfig,
    pub grid: ParamGrid,
    pub backtest: BacktestConfig,
    pub selection: SelectionConfig,
    pub cash: CashConfig,
    pub log_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist. A file that exists but does not parse is a
    /// configuration error, not a silent fallback.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SignalError::Configuration(format!("无法解析配置文件 {}: {}", path.display(), e))
        })
    }

    /// Reject configurations that would produce meaningless runs.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;

        if self.selection.top_count == 0 || self.selection.signal_count == 0 {
            return Err(SignalError::Configuration(
                "top_count和signal_count必须大于0".to_string(),
            ));
        }
        if self.selection.validation_count == 0 {
            return Err(SignalError::Configuration(
                "validation_count必须大于0".to_string(),
            ));
        }
        if self.backtest.lookback_days == 0 {
            return Err(SignalError::Configuration(
                "lookback_days必须大于0".to_string(),
            ));
        }
        if !(self.cash.invest_ratio > 0.0 && self.cash.invest_ratio <= 1.0) {
            return Err(SignalError::Configuration(
                "invest_ratio必须在(0, 1]之间".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection.top_count, 5);
        assert_eq!(config.backtest.lookback_days, 180);
        assert_eq!(config.selection.fallback_stocks.len(), 5);
    }

    #[test]
    fn test_invalid_invest_ratio_rejected() {
        let mut config = EngineConfig::default();
        config.cash.invest_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = EngineConfig::load(Path::new("does_not_exist.json")).unwrap();
        assert_eq!(config.filter.max_stock_count, 200);
    }

    #[test]
    fn test_load_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"backtest": {"lookback_days": 90}}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.backtest.lookback_days, 90);
        // Untouched blocks keep their defaults
        assert_eq!(config.backtest.transaction_cost, 0.0015);
        assert_eq!(config.selection.top_count, 5);
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
