//! Trading signal classification.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalError};
use crate::market::BarSeries;
use crate::utility::round_to;

use super::indicator::{ma_array, rolling_max, rolling_min};
use super::params::StrategyParams;

/// Stop-loss sits 1.5% under support; buys more than 5% below support are
/// rejected; targets sit 2% above resistance.
pub const STOP_LOSS_RATIO: f64 = 0.985;
pub const SUPPORT_FLOOR_RATIO: f64 = 0.95;
pub const TARGET_RATIO: f64 = 1.02;

/// Trading signal for one symbol at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    Watch,
}

impl Signal {
    pub fn value(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
            Signal::Watch => "WATCH",
        }
    }

    /// 中文标签 for console output.
    pub fn label(&self) -> &'static str {
        match self {
            Signal::Buy => "买入",
            Signal::Sell => "卖出",
            Signal::Hold => "持有",
            Signal::Watch => "观望",
        }
    }
}

/// Signal plus the numeric context the reporter needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub signal: Signal,
    pub latest_close: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub support: f64,
    pub resistance: f64,
    pub stop_loss: f64,
    pub target: f64,
}

/// Crossover + support/resistance proximity rules.
///
/// Evaluation order is fixed: Buy, then Sell, then Hold, falling back to
/// Watch. Exactly one signal comes out per evaluation. The dead cross and
/// the stop-loss breach are independent sell triggers; either alone fires.
pub struct SignalEngine {
    params: StrategyParams,
}

impl SignalEngine {
    pub fn new(params: StrategyParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Classify bar `i` (i >= 1) from full indicator arrays.
    pub fn evaluate_at(
        &self,
        closes: &[f64],
        ma_short: &[f64],
        ma_long: &[f64],
        support: &[f64],
        i: usize,
    ) -> Signal {
        let golden_cross = ma_short[i - 1] <= ma_long[i - 1] && ma_short[i] > ma_long[i];
        let dead_cross = ma_short[i - 1] >= ma_long[i - 1] && ma_short[i] < ma_long[i];

        let close = closes[i];
        let sup = support[i];
        let near_support =
            close > sup * SUPPORT_FLOOR_RATIO && close <= sup * (1.0 + self.params.buy_margin);

        if golden_cross && near_support {
            Signal::Buy
        } else if dead_cross || close < sup * STOP_LOSS_RATIO {
            Signal::Sell
        } else if ma_short[i] > ma_long[i] {
            Signal::Hold
        } else {
            Signal::Watch
        }
    }

    /// Classify the latest bar of a series and collect reporter context.
    pub fn evaluate_series(&self, series: &BarSeries) -> Result<SignalDecision> {
        let need = self.params.max_window().max(2);
        if series.len() < need {
            return Err(SignalError::DataInsufficient {
                have: series.len(),
                need,
            });
        }

        let closes = series.closes();
        let ma_short = ma_array(&closes, self.params.ma_short);
        let ma_long = ma_array(&closes, self.params.ma_long);
        let support = rolling_min(&series.lows(), self.params.support_resist_days);
        let resistance = rolling_max(&series.highs(), self.params.support_resist_days);

        let i = closes.len() - 1;
        let signal = self.evaluate_at(&closes, &ma_short, &ma_long, &support, i);

        Ok(SignalDecision {
            signal,
            latest_close: closes[i],
            ma_short: ma_short[i],
            ma_long: ma_long[i],
            support: support[i],
            resistance: resistance[i],
            stop_loss: round_to(support[i] * STOP_LOSS_RATIO, 0.01),
            target: round_to(resistance[i] * TARGET_RATIO, 0.01),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Bar;
    use chrono::NaiveDate;

    fn make_series(closes: &[f64]) -> BarSeries {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Days::new(i as u64),
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

    fn test_params() -> StrategyParams {
        StrategyParams {
            ma_short: 2,
            ma_long: 3,
            support_resist_days: 3,
            buy_margin: 0.05,
            sell_margin: 0.05,
        }
    }

    #[test]
    fn test_golden_cross_near_support_buys() {
        // Long decline, then a small pop: ma2 crosses above ma3 on the last
        // bar while the close stays within the support tolerance band.
        let mut closes = Vec::new();
        for i in 0..48 {
            closes.push(20.0 - i as f64 * 0.27);
        }
        closes.extend_from_slice(&[7.0, 6.9, 7.2]);

        let engine = SignalEngine::new(test_params()).unwrap();
        let decision = engine.evaluate_series(&make_series(&closes)).unwrap();

        // prev: ma2 = 6.95 <= ma3; curr: ma2 = 7.05 > ma3 = 7.0333
        // support = 6.9, band = (6.555, 7.245], close = 7.2
        assert_eq!(decision.signal, Signal::Buy);
        assert_eq!(decision.support, 6.9);
        assert_eq!(decision.stop_loss, round_to(6.9 * STOP_LOSS_RATIO, 0.01));
        assert_eq!(decision.target, round_to(7.2 * TARGET_RATIO, 0.01));
    }

    #[test]
    fn test_flat_series_never_buys() {
        // 60 flat bars: no crossover is possible on a constant series.
        let closes = vec![10.0; 60];
        let engine = SignalEngine::new(test_params()).unwrap();
        let decision = engine.evaluate_series(&make_series(&closes)).unwrap();
        assert!(matches!(decision.signal, Signal::Hold | Signal::Watch));
        assert_ne!(decision.signal, Signal::Buy);
    }

    #[test]
    fn test_stop_loss_breach_sells_without_cross() {
        // No crossover anywhere, but the close sits below 98.5% of support:
        // the stop-loss trigger alone must fire.
        let engine = SignalEngine::new(test_params()).unwrap();
        let closes = [10.0, 9.0];
        let ma_short = [10.0, 9.8];
        let ma_long = [9.5, 9.4];
        let support = [9.5, 9.5];
        assert_eq!(
            engine.evaluate_at(&closes, &ma_short, &ma_long, &support, 1),
            Signal::Sell
        );
    }

    #[test]
    fn test_dead_cross_sells() {
        let closes = [10.0, 10.5, 11.0, 10.8, 9.0];
        let engine = SignalEngine::new(test_params()).unwrap();
        let decision = engine.evaluate_series(&make_series(&closes)).unwrap();
        assert_eq!(decision.signal, Signal::Sell);
    }

    #[test]
    fn test_hold_in_uptrend_without_cross() {
        // Steady rise well above support band: ma_short > ma_long, no fresh
        // cross, no breach.
        let closes = [10.0, 10.0, 10.3, 10.6, 10.9, 11.2];
        let engine = SignalEngine::new(test_params()).unwrap();
        let decision = engine.evaluate_series(&make_series(&closes)).unwrap();
        assert_eq!(decision.signal, Signal::Hold);
    }

    #[test]
    fn test_exactly_one_signal_always() {
        let cases: Vec<Vec<f64>> = vec![
            vec![10.0; 30],
            (0..30).map(|i| 10.0 + i as f64 * 0.1).collect(),
            (0..30).map(|i| 20.0 - i as f64 * 0.3).collect(),
            (0..30).map(|i| 10.0 + (i as f64 * 0.7).sin()).collect(),
        ];
        let engine = SignalEngine::new(test_params()).unwrap();
        for closes in cases {
            // evaluate_series returns a single enum variant by construction;
            // assert classification succeeds on every shape of series.
            let decision = engine.evaluate_series(&make_series(&closes)).unwrap();
            assert!(matches!(
                decision.signal,
                Signal::Buy | Signal::Sell | Signal::Hold | Signal::Watch
            ));
        }
    }

    #[test]
    fn test_insufficient_history_rejected() {
        let engine = SignalEngine::new(StrategyParams::default()).unwrap();
        let result = engine.evaluate_series(&make_series(&[10.0, 10.1]));
        assert!(matches!(
            result,
            Err(SignalError::DataInsufficient { have: 2, need: 20 })
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = StrategyParams {
            ma_short: 20,
            ma_long: 5,
            ..StrategyParams::default()
        };
        assert!(SignalEngine::new(params).is_err());
    }
}
