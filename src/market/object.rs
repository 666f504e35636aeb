//! Market data objects: daily bars, validated bar series and universe rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalError};

/// One daily OHLCV bar, front-adjusted. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// 换手率 in percent; optional, not every provider carries it.
    pub turnover_rate: Option<f64>,
}

/// Ordered daily bars for one symbol.
///
/// Construction validates that dates are strictly increasing and repairs
/// missing values with a single forward-fill then back-fill pass per column.
/// Bars are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self> {
        let symbol = symbol.into();

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SignalError::Configuration(format!(
                    "K线序列{}日期必须严格递增: {} -> {}",
                    symbol, pair[0].date, pair[1].date
                )));
            }
        }

        fill_missing(&mut bars);
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Turnover column, or `None` when the series carries no turnover data at
    /// all. Holes inside the column were already filled at construction.
    pub fn turnovers(&self) -> Option<Vec<f64>> {
        if self.bars.iter().any(|b| b.turnover_rate.is_some()) {
            Some(
                self.bars
                    .iter()
                    .map(|b| b.turnover_rate.unwrap_or(0.0))
                    .collect(),
            )
        } else {
            None
        }
    }
}

/// Forward-fill then back-fill NaN values, one pass per column. Applied once
/// per series at construction, never per indicator.
fn fill_missing(bars: &mut [Bar]) {
    fill_column(bars, |b| b.open, |b, v| b.open = v);
    fill_column(bars, |b| b.high, |b, v| b.high = v);
    fill_column(bars, |b| b.low, |b, v| b.low = v);
    fill_column(bars, |b| b.close, |b, v| b.close = v);
    fill_column(bars, |b| b.volume, |b, v| b.volume = v);
    fill_turnover(bars);
}

fn fill_column(bars: &mut [Bar], get: fn(&Bar) -> f64, set: fn(&mut Bar, f64)) {
    let mut last = f64::NAN;
    for bar in bars.iter_mut() {
        let v = get(bar);
        if v.is_nan() {
            if !last.is_nan() {
                set(bar, last);
            }
        } else {
            last = v;
        }
    }

    let mut next = f64::NAN;
    for bar in bars.iter_mut().rev() {
        let v = get(bar);
        if v.is_nan() {
            if !next.is_nan() {
                set(bar, next);
            }
        } else {
            next = v;
        }
    }
}

fn fill_turnover(bars: &mut [Bar]) {
    let mut last: Option<f64> = None;
    for bar in bars.iter_mut() {
        match bar.turnover_rate {
            Some(v) if !v.is_nan() => last = Some(v),
            _ => bar.turnover_rate = last,
        }
    }

    let mut next: Option<f64> = None;
    for bar in bars.iter_mut().rev() {
        match bar.turnover_rate {
            Some(v) if !v.is_nan() => next = Some(v),
            _ => bar.turnover_rate = next,
        }
    }
}

/// One row of the screenable stock universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInfo {
    pub symbol: String,
    pub name: String,
    /// 总市值 in 亿.
    pub market_cap: f64,
    /// 成交额 in 亿.
    pub turnover_amount: f64,
    pub pct_change: f64,
    #[serde(default)]
    pub is_st: bool,
    #[serde(default)]
    pub is_delisted: bool,
}
