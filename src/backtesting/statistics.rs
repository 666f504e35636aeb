//! Trade ledger statistics.

use serde::{Deserialize, Serialize};

use super::engine::Trade;

/// Performance metrics of one backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BacktestMetrics {
    /// Compounded return annualized over the lookback window.
    pub annual_return: f64,
    /// Fraction of trades with a strictly positive return.
    pub win_rate: f64,
    /// Largest peak-to-trough loss of compounded equity; always <= 0.
    pub max_drawdown: f64,
    pub trade_count: usize,
}

/// Compute metrics over a closed-trade ledger. An empty ledger yields the
/// all-zero metrics rather than an error, so callers can tell "strategy
/// never traded" apart from "strategy could not run".
pub fn calculate_metrics(trades: &[Trade], lookback_days: usize) -> BacktestMetrics {
    if trades.is_empty() || lookback_days == 0 {
        return BacktestMetrics::default();
    }

    let compounded: f64 = trades.iter().map(|t| 1.0 + t.return_rate).product();
    let annual_return = compounded.powf(365.0 / lookback_days as f64) - 1.0;

    let wins = trades.iter().filter(|t| t.return_rate > 0.0).count();
    let win_rate = wins as f64 / trades.len() as f64;

    BacktestMetrics {
        annual_return,
        win_rate,
        max_drawdown: max_drawdown(trades),
        trade_count: trades.len(),
    }
}

/// Deepest drop of the compounded equity curve from its running peak.
pub fn max_drawdown(trades: &[Trade]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for trade in trades {
        equity *= 1.0 + trade.return_rate;
        peak = peak.max(equity);
        worst = worst.min(equity / peak - 1.0);
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(return_rate: f64) -> Trade {
        Trade {
            buy_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            sell_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            buy_price: 10.0,
            sell_price: 10.0 * (1.0 + return_rate),
            return_rate,
        }
    }

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let metrics = calculate_metrics(&[], 180);
        assert_eq!(metrics, BacktestMetrics::default());
    }

    #[test]
    fn test_win_rate_counts_strict_gains() {
        let trades = [trade(0.05), trade(0.0), trade(-0.02), trade(0.01)];
        let metrics = calculate_metrics(&trades, 180);
        // Break-even trades do not count as wins
        assert_eq!(metrics.win_rate, 0.5);
        assert_eq!(metrics.trade_count, 4);
    }

    #[test]
    fn test_annualization_exponent() {
        // One trade of +10% over a 365-day window annualizes to itself
        let metrics = calculate_metrics(&[trade(0.10)], 365);
        assert!((metrics.annual_return - 0.10).abs() < 1e-12);

        // Over half the window the compounding exponent roughly doubles
        let half = calculate_metrics(&[trade(0.10)], 182);
        assert!(half.annual_return > 0.10);
    }

    #[test]
    fn test_drawdown_non_positive() {
        let trades = [trade(0.05), trade(-0.10), trade(0.08)];
        let dd = max_drawdown(&trades);
        assert!(dd < 0.0);
        // The -10% leg off the 1.05 peak is the deepest trough
        assert!((dd - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn test_all_winning_ledger_has_zero_drawdown() {
        let trades = [trade(0.02), trade(0.05), trade(0.01)];
        assert_eq!(max_drawdown(&trades), 0.0);
    }
}
