//! Run reporting: CSV audit logs, position sizing, and console suggestions.
//!
//! Each pipeline stage appends one row per item to a dated CSV under the
//! configured log directory, so successive runs build a reviewable history.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::CashConfig;
use crate::error::Result;
use crate::strategy::params::StrategyParams;
use crate::strategy::signal::{Signal, SignalDecision};
use crate::utility::{floor_to, round_to};

/// One selection-stage row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: String,
    /// 总市值 in 亿.
    pub market_cap: f64,
    /// 成交额 in 亿.
    pub turnover_amount: f64,
    pub score: f64,
}

/// One optimizer-stage row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub date: NaiveDate,
    pub params: StrategyParams,
    pub annual_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub avg_trade_count: f64,
    pub composite_score: f64,
}

/// One signal-stage row, including the sizing suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: String,
    pub decision: SignalDecision,
    pub shares: u64,
    pub allocated: f64,
}

/// Suggested position size for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSuggestion {
    /// Whole shares; 0 for anything but a buy.
    pub shares: u64,
    /// Cash slice available to this slot.
    pub allocated: f64,
    /// Estimated cost of the suggested shares.
    pub est_cost: f64,
    /// Allocated cash left over after the whole-share rounding.
    pub remaining: f64,
}

/// Split the investable cash evenly over `slots` and size a whole-share
/// position at the latest close. Only buy signals get shares; other signals
/// keep the slot in cash.
pub fn size_position(
    decision: &SignalDecision,
    cash: &CashConfig,
    slots: usize,
) -> PositionSuggestion {
    let investable = cash.initial_cash * cash.invest_ratio;
    let allocated = if slots > 0 {
        investable / slots as f64
    } else {
        0.0
    };

    if decision.signal != Signal::Buy || decision.latest_close <= 0.0 {
        return PositionSuggestion {
            shares: 0,
            allocated,
            est_cost: 0.0,
            remaining: allocated,
        };
    }

    let shares = floor_to(allocated / decision.latest_close, 1.0) as u64;
    let est_cost = round_to(shares as f64 * decision.latest_close, 0.01);
    PositionSuggestion {
        shares,
        allocated,
        est_cost,
        remaining: round_to(allocated - est_cost, 0.01),
    }
}

/// One-line console suggestion for a signal row.
pub fn core_suggestion(record: &SignalRecord) -> String {
    let d = &record.decision;
    match d.signal {
        Signal::Buy => format!(
            "{} {}: 建议买入{}股, 现价{:.2}, 止损{:.2}, 目标{:.2}",
            record.symbol, record.name, record.shares, d.latest_close, d.stop_loss, d.target
        ),
        Signal::Sell => format!(
            "{} {}: 建议卖出, 现价{:.2}已跌破支撑位{:.2}附近",
            record.symbol, record.name, d.latest_close, d.support
        ),
        Signal::Hold => format!(
            "{} {}: 建议持有, 现价{:.2}, 短期均线{:.2}仍在长期均线{:.2}上方",
            record.symbol, record.name, d.latest_close, d.ma_short, d.ma_long
        ),
        Signal::Watch => format!(
            "{} {}: 建议观望, 现价{:.2}, 等待均线金叉靠近支撑位{:.2}",
            record.symbol, record.name, d.latest_close, d.support
        ),
    }
}

fn append_csv(path: &Path, header: &str, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let is_new = !path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if is_new {
        writeln!(file, "{}", header)?;
    }
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Append selection rows to `selections.csv`.
pub fn append_selection_log(dir: &Path, records: &[SelectionRecord]) -> Result<()> {
    let path = dir.join("selections.csv");
    for record in records {
        append_csv(
            &path,
            "date,symbol,name,market_cap,turnover_amount,score",
            &format!(
                "{},{},{},{:.1},{:.2},{:.2}",
                record.date,
                record.symbol,
                record.name,
                record.market_cap,
                record.turnover_amount,
                record.score
            ),
        )?;
    }
    Ok(())
}

/// Append optimizer rows to `optimizations.csv`.
pub fn append_optimization_log(dir: &Path, records: &[OptimizationRecord]) -> Result<()> {
    let path = dir.join("optimizations.csv");
    for record in records {
        append_csv(
            &path,
            "date,ma_short,ma_long,support_resist_days,buy_margin,sell_margin,annual_return,win_rate,max_drawdown,avg_trade_count,composite_score",
            &format!(
                "{},{},{},{},{},{},{:.6},{:.4},{:.6},{:.1},{:.6}",
                record.date,
                record.params.ma_short,
                record.params.ma_long,
                record.params.support_resist_days,
                record.params.buy_margin,
                record.params.sell_margin,
                record.annual_return,
                record.win_rate,
                record.max_drawdown,
                record.avg_trade_count,
                record.composite_score
            ),
        )?;
    }
    Ok(())
}

/// Append signal rows to `signals.csv`.
pub fn append_signal_log(dir: &Path, records: &[SignalRecord]) -> Result<()> {
    let path = dir.join("signals.csv");
    for record in records {
        let d = &record.decision;
        append_csv(
            &path,
            "date,symbol,name,signal,close,ma_short,ma_long,support,resistance,stop_loss,target,shares,allocated",
            &format!(
                "{},{},{},{},{:.2},{:.3},{:.3},{:.2},{:.2},{:.2},{:.2},{},{:.2}",
                record.date,
                record.symbol,
                record.name,
                d.signal.value(),
                d.latest_close,
                d.ma_short,
                d.ma_long,
                d.support,
                d.resistance,
                d.stop_loss,
                d.target,
                record.shares,
                record.allocated
            ),
        )?;
    }
    Ok(())
}
