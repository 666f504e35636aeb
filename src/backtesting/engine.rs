//! Signal-replay backtesting engine.
//!
//! Replays the crossover/support rules bar by bar over a historical window
//! with a two-state position model: flat or fully long one lot. Entries and
//! exits are filled at the close adjusted by the configured margins, with
//! the transaction cost charged on both legs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::error::Result;
use crate::market::BarSeries;
use crate::strategy::indicator::{ma_array, rolling_min};
use crate::strategy::params::StrategyParams;
use crate::strategy::signal::{Signal, SignalEngine};

use super::statistics::{calculate_metrics, BacktestMetrics};

/// A run is discarded when the series covers less than this share of the
/// requested lookback window.
pub const COVERAGE_RATIO: f64 = 0.8;

/// One closed round trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub buy_date: NaiveDate,
    pub sell_date: NaiveDate,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Net return after transaction costs on both legs.
    pub return_rate: f64,
}

/// Closed trades plus the metrics computed from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub metrics: BacktestMetrics,
}

enum Position {
    Flat,
    Long { date: NaiveDate, entry: f64 },
}

/// Backtest runner for one (series, parameter set) pairing.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Replay the signal rules over the series.
    ///
    /// Returns `Ok(None)` when the series covers too little of the lookback
    /// window for the run to mean anything. A position still open at the end
    /// of the window is dropped, not force-closed; only completed round
    /// trips enter the ledger.
    pub fn run(&self, series: &BarSeries, params: StrategyParams) -> Result<Option<BacktestReport>> {
        let engine = SignalEngine::new(params)?;

        let min_bars = (self.config.lookback_days as f64 * COVERAGE_RATIO) as usize;
        if series.len() < min_bars {
            tracing::debug!(
                symbol = series.symbol(),
                bars = series.len(),
                min_bars,
                "数据覆盖不足, 跳过回测"
            );
            return Ok(None);
        }

        let closes = series.closes();
        let dates = series.dates();
        let ma_short = ma_array(&closes, params.ma_short);
        let ma_long = ma_array(&closes, params.ma_long);
        let support = rolling_min(&series.lows(), params.support_resist_days);

        let cost = self.config.transaction_cost;
        let mut position = Position::Flat;
        let mut trades = Vec::new();

        for i in 1..closes.len() {
            let signal = engine.evaluate_at(&closes, &ma_short, &ma_long, &support, i);
            match position {
                Position::Flat => {
                    if signal == Signal::Buy {
                        position = Position::Long {
                            date: dates[i],
                            entry: closes[i] * (1.0 + params.buy_margin),
                        };
                    }
                }
                Position::Long { date, entry } => {
                    if signal == Signal::Sell {
                        let exit = closes[i] * (1.0 - params.sell_margin);
                        let net_buy = entry * (1.0 + cost);
                        let net_sell = exit * (1.0 - cost);
                        trades.push(Trade {
                            buy_date: date,
                            sell_date: dates[i],
                            buy_price: entry,
                            sell_price: exit,
                            return_rate: (net_sell - net_buy) / net_buy,
                        });
                        position = Position::Flat;
                    }
                }
            }
        }

        let metrics = calculate_metrics(&trades, self.config.lookback_days);
        Ok(Some(BacktestReport { trades, metrics }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Bar;

    fn make_series(closes: &[f64]) -> BarSeries {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
                turnover_rate: None,
            })
            .collect();
        BarSeries::new("000333", bars).unwrap()
    }

    fn cycling_closes(n: usize) -> Vec<f64> {
        // Repeated decline/rebound cycles produce crossovers in both
        // directions and completed round trips.
        (0..n)
            .map(|i| 10.0 + 2.0 * (i as f64 * 0.35).sin())
            .collect()
    }

    fn test_config() -> BacktestConfig {
        BacktestConfig {
            lookback_days: 60,
            ..BacktestConfig::default()
        }
    }

    fn test_params() -> StrategyParams {
        StrategyParams {
            ma_short: 3,
            ma_long: 8,
            support_resist_days: 4,
            buy_margin: 0.05,
            sell_margin: 0.05,
        }
    }

    #[test]
    fn test_coverage_gate_skips_short_series() {
        let engine = BacktestEngine::new(test_config());
        // 60-day lookback needs at least 48 bars
        let report = engine
            .run(&make_series(&cycling_closes(40)), test_params())
            .unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn test_trades_close_and_ledger_consistent() {
        let engine = BacktestEngine::new(test_config());
        let report = engine
            .run(&make_series(&cycling_closes(120)), test_params())
            .unwrap()
            .expect("coverage is sufficient");
        for trade in &report.trades {
            assert!(trade.sell_date > trade.buy_date);
            // Net return matches the ledger prices under 0.15% per leg
            let net_buy = trade.buy_price * 1.0015;
            let net_sell = trade.sell_price * 0.9985;
            let expected = (net_sell - net_buy) / net_buy;
            assert!((trade.return_rate - expected).abs() < 1e-12);
        }
        assert_eq!(report.metrics.trade_count, report.trades.len());
    }

    #[test]
    fn test_price_scale_invariance() {
        // Multiplying every price by a constant must not change return rates
        let engine = BacktestEngine::new(test_config());
        let base = cycling_closes(120);
        let scaled: Vec<f64> = base.iter().map(|c| c * 7.5).collect();

        let a = engine
            .run(&make_series(&base), test_params())
            .unwrap()
            .unwrap();
        let b = engine
            .run(&make_series(&scaled), test_params())
            .unwrap()
            .unwrap();

        assert_eq!(a.trades.len(), b.trades.len());
        for (ta, tb) in a.trades.iter().zip(&b.trades) {
            assert!((ta.return_rate - tb.return_rate).abs() < 1e-9);
        }
    }

    #[test]
    fn test_flat_series_produces_zero_trades() {
        let engine = BacktestEngine::new(test_config());
        let report = engine
            .run(&make_series(&vec![10.0; 120]), test_params())
            .unwrap()
            .unwrap();
        assert!(report.trades.is_empty());
        assert_eq!(report.metrics, BacktestMetrics::default());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let engine = BacktestEngine::new(test_config());
        let params = StrategyParams {
            ma_short: 10,
            ma_long: 5,
            ..StrategyParams::default()
        };
        assert!(engine.run(&make_series(&cycling_closes(120)), params).is_err());
    }
}
