//! Strategy parameters and the optimization search grid.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalError};

/// One crossover/support-resistance parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub ma_short: usize,
    pub ma_long: usize,
    pub support_resist_days: usize,
    pub buy_margin: f64,
    pub sell_margin: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_long: 20,
            support_resist_days: 5,
            buy_margin: 0.01,
            sell_margin: 0.01,
        }
    }
}

impl StrategyParams {
    /// Reject parameter sets with no sane crossover semantics.
    pub fn validate(&self) -> Result<()> {
        if self.ma_short == 0 || self.support_resist_days == 0 {
            return Err(SignalError::Configuration(
                "均线和支撑阻力周期必须大于0".to_string(),
            ));
        }
        if self.ma_short >= self.ma_long {
            return Err(SignalError::Configuration(format!(
                "ma_short({})必须小于ma_long({})",
                self.ma_short, self.ma_long
            )));
        }
        if !(self.buy_margin > 0.0 && self.buy_margin < 1.0) {
            return Err(SignalError::Configuration(format!(
                "buy_margin({})必须在(0, 1)之间",
                self.buy_margin
            )));
        }
        if !(self.sell_margin > 0.0 && self.sell_margin < 1.0) {
            return Err(SignalError::Configuration(format!(
                "sell_margin({})必须在(0, 1)之间",
                self.sell_margin
            )));
        }
        Ok(())
    }

    /// Longest trailing window this parameter set needs.
    pub fn max_window(&self) -> usize {
        self.ma_long.max(self.support_resist_days)
    }
}

/// Candidate values per parameter dimension. Expanded as a full Cartesian
/// product in fixed dimension order, so grid cell indices are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub ma_short: Vec<usize>,
    pub ma_long: Vec<usize>,
    pub support_resist_days: Vec<usize>,
    pub buy_margin: Vec<f64>,
    pub sell_margin: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            ma_short: vec![4, 5, 6],
            ma_long: vec![18, 20, 22],
            support_resist_days: vec![4, 5, 6],
            buy_margin: vec![0.008, 0.01, 0.012],
            sell_margin: vec![0.008, 0.01, 0.012],
        }
    }
}

impl ParamGrid {
    /// A grid is rejected as a whole if any of its combinations is invalid;
    /// silently skipping bad cells would distort the search space.
    pub fn validate(&self) -> Result<()> {
        if self.ma_short.is_empty()
            || self.ma_long.is_empty()
            || self.support_resist_days.is_empty()
            || self.buy_margin.is_empty()
            || self.sell_margin.is_empty()
        {
            return Err(SignalError::Configuration(
                "参数网格的每个维度至少需要一个候选值".to_string(),
            ));
        }

        for combo in self.combinations() {
            combo.validate()?;
        }
        Ok(())
    }

    /// All parameter combinations, in fixed dimension order.
    pub fn combinations(&self) -> Vec<StrategyParams> {
        let mut combos = Vec::with_capacity(self.len());
        for &ma_short in &self.ma_short {
            for &ma_long in &self.ma_long {
                for &support_resist_days in &self.support_resist_days {
                    for &buy_margin in &self.buy_margin {
                        for &sell_margin in &self.sell_margin {
                            combos.push(StrategyParams {
                                ma_short,
                                ma_long,
                                support_resist_days,
                                buy_margin,
                                sell_margin,
                            });
                        }
                    }
                }
            }
        }
        combos
    }

    pub fn len(&self) -> usize {
        self.ma_short.len()
            * self.ma_long.len()
            * self.support_resist_days.len()
            * self.buy_margin.len()
            * self.sell_margin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
