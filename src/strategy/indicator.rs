//! Rolling indicator computation over a bar series.
//!
//! All window operations use partial windows at the head of the series
//! instead of emitting leading NaN, so short histories still produce values.
//! Indicators are recomputed in full for every (series, parameter) pairing;
//! nothing is cached across optimizer grid cells.

use serde::{Deserialize, Serialize};

use crate::market::BarSeries;

use super::params::StrategyParams;

/// Derived indicator values at the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ma_short: f64,
    pub ma_long: f64,
    pub support: f64,
    pub resistance: f64,
    pub rsi: f64,
    pub volume_ratio: f64,
    /// `None` when the series carries no turnover data.
    pub turnover_stability: Option<f64>,
}

/// Trailing-mean array with partial windows (no leading NaN).
pub fn ma_array(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![0.0; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// Trailing rolling minimum with partial windows.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |acc, v| acc.min(v))
}

/// Trailing rolling maximum with partial windows.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |acc, v| acc.max(v))
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    if window == 0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i]
                .iter()
                .copied()
                .reduce(pick)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Mean over the trailing `n` values (all of them when fewer exist).
pub fn tail_mean(values: &[f64], n: usize) -> f64 {
    if values.is_empty() || n == 0 {
        return 0.0;
    }
    let start = values.len().saturating_sub(n);
    let tail = &values[start..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Indicator engine bound to one bar series.
pub struct IndicatorEngine<'a> {
    series: &'a BarSeries,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(series: &'a BarSeries) -> Self {
        Self { series }
    }

    /// RSI over simple rolling means of gains and losses (not Wilder
    /// smoothing). RS is defined as 0 when the average loss is 0, which
    /// collapses RSI to 0 for an all-gaining window; kept as documented
    /// behavior.
    pub fn rsi(&self, n: usize) -> f64 {
        let closes = self.series.closes();
        if closes.len() < 2 {
            return 0.0;
        }

        let mut gains = Vec::with_capacity(closes.len() - 1);
        let mut losses = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            let delta = pair[1] - pair[0];
            gains.push(delta.max(0.0));
            losses.push((-delta).max(0.0));
        }

        let avg_gain = tail_mean(&gains, n);
        let avg_loss = tail_mean(&losses, n);
        let rs = if avg_loss > 0.0 {
            avg_gain / avg_loss
        } else {
            0.0
        };
        100.0 - 100.0 / (1.0 + rs)
    }

    /// 5-day over 20-day mean volume; 0 on a zero denominator.
    pub fn volume_ratio(&self) -> f64 {
        let volumes = self.series.volumes();
        let short = tail_mean(&volumes, 5);
        let long = tail_mean(&volumes, 20);
        if long > 0.0 {
            short / long
        } else {
            0.0
        }
    }

    /// Turnover stability in [0, 1]; `None` when the series carries no
    /// turnover data so the caller can substitute its neutral fallback.
    pub fn turnover_stability(&self) -> Option<f64> {
        let turnovers = self.series.turnovers()?;
        let short = tail_mean(&turnovers, 5);
        let long = tail_mean(&turnovers, 20);
        if long == 0.0 {
            return Some(0.0);
        }
        Some((1.0 - (short - long).abs() / long).clamp(0.0, 1.0))
    }

    /// Snapshot at the latest bar for the given parameters.
    pub fn snapshot(&self, params: &StrategyParams) -> IndicatorSnapshot {
        let closes = self.series.closes();
        let highs = self.series.highs();
        let lows = self.series.lows();

        let window = params.support_resist_days;
        let support = lows
            .iter()
            .skip(lows.len().saturating_sub(window))
            .copied()
            .fold(f64::INFINITY, f64::min);
        let resistance = highs
            .iter()
            .skip(highs.len().saturating_sub(window))
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        IndicatorSnapshot {
            ma_short: tail_mean(&closes, params.ma_short),
            ma_long: tail_mean(&closes, params.ma_long),
            support: if support.is_finite() { support } else { 0.0 },
            resistance: if resistance.is_finite() { resistance } else { 0.0 },
            rsi: self.rsi(14),
            volume_ratio: self.volume_ratio(),
            turnover_stability: self.turnover_stability(),
        }
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
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: close,
                high: close + 0.1,
                low: close - 0.1,
                close,
                volume: 1000.0,
                turnover_rate: Some(1.0),
            })
            .collect();
        BarSeries::new("000333", bars).unwrap()
    }

    #[test]
    fn test_ma_array_partial_windows() {
        let ma = ma_array(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(ma[0], 2.0); // single value
        assert_eq!(ma[1], 3.0); // partial window of two
        assert_eq!(ma[2], 4.0); // full window
        assert_eq!(ma[3], 6.0);
    }

    #[test]
    fn test_rolling_min_max() {
        let values = [3.0, 1.0, 4.0, 1.5, 5.0];
        assert_eq!(rolling_min(&values, 3), vec![3.0, 1.0, 1.0, 1.0, 1.5]);
        assert_eq!(rolling_max(&values, 3), vec![3.0, 3.0, 4.0, 4.0, 5.0]);
    }

    #[test]
    fn test_rsi_all_gains_degenerates_to_zero() {
        // Monotonically rising closes: avg_loss = 0, so RS = 0 and RSI = 0
        let series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let engine = IndicatorEngine::new(&series);
        assert_eq!(engine.rsi(14), 0.0);
    }

    #[test]
    fn test_rsi_mixed_moves() {
        let series = make_series(&[10.0, 11.0, 10.5, 11.5, 11.0]);
        let engine = IndicatorEngine::new(&series);
        let rsi = engine.rsi(14);
        assert!(rsi > 0.0 && rsi < 100.0);
        // avg_gain = 2/4, avg_loss = 1/4 -> RS = 2, RSI = 100 - 100/3
        assert!((rsi - (100.0 - 100.0 / 3.0)).abs() < 1e-10);
    }

    #[test]
    fn test_volume_ratio_zero_denominator() {
        let mut series = make_series(&[10.0, 10.0, 10.0]);
        // Rebuild with zero volume
        let bars: Vec<Bar> = series
            .bars()
            .iter()
            .map(|b| Bar {
                volume: 0.0,
                ..*b
            })
            .collect();
        series = BarSeries::new("000333", bars).unwrap();
        let engine = IndicatorEngine::new(&series);
        assert_eq!(engine.volume_ratio(), 0.0);
    }

    #[test]
    fn test_turnover_stability_clamped() {
        let series = make_series(&[10.0; 25]);
        let engine = IndicatorEngine::new(&series);
        // Constant turnover: |mean5 - mean20| = 0 -> stability 1
        assert_eq!(engine.turnover_stability(), Some(1.0));
    }

    #[test]
    fn test_snapshot_idempotent() {
        let series = make_series(&[10.0, 10.5, 11.0, 10.8, 11.2, 11.1, 11.4, 11.3]);
        let params = StrategyParams {
            ma_short: 3,
            ma_long: 5,
            support_resist_days: 4,
            buy_margin: 0.01,
            sell_margin: 0.01,
        };
        let engine = IndicatorEngine::new(&series);
        let a = engine.snapshot(&params);
        let b = engine.snapshot(&params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_values() {
        let series = make_series(&[10.0, 12.0, 11.0, 13.0]);
        let params = StrategyParams {
            ma_short: 2,
            ma_long: 4,
            support_resist_days: 2,
            buy_margin: 0.01,
            sell_margin: 0.01,
        };
        let snap = IndicatorEngine::new(&series).snapshot(&params);
        assert_eq!(snap.ma_short, 12.0);
        assert_eq!(snap.ma_long, 11.5);
        assert_eq!(snap.support, 10.9); // min low of last 2 bars
        assert_eq!(snap.resistance, 13.1); // max high of last 2 bars
    }
}
