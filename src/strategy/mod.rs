//! Strategy layer: parameters, indicators, scoring, and signal rules.

pub mod indicator;
pub mod params;
pub mod score;
pub mod signal;

pub use indicator::{IndicatorEngine, IndicatorSnapshot};
pub use params::{ParamGrid, StrategyParams};
pub use score::{select_candidates, short_term_score, ScoredStock, MIN_SCORE_BARS};
pub use signal::{Signal, SignalDecision, SignalEngine};
