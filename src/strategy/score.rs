//! Short-term potential scoring and candidate selection.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::SelectionConfig;
use crate::market::{BarSeries, StockInfo};

use super::indicator::{tail_mean, IndicatorEngine};

/// Minimum history for a meaningful score; shorter series score 0.
pub const MIN_SCORE_BARS: usize = 60;

/// Score granted to preset fallback stocks that were never scored.
const FALLBACK_SCORE: f64 = 25.0;

/// Neutral turnover sub-score when the series has no turnover data.
const NEUTRAL_TURNOVER_SCORE: f64 = 8.0;

/// Composite short-term potential score in [0, 100].
///
/// Five sub-scores, each clamped to its allotted range before summation so no
/// single factor can dominate through an outlier. The ranges (30/20/20/15/15)
/// realize the 0.30/0.20/0.20/0.15/0.15 factor weights.
pub fn short_term_score(series: &BarSeries) -> f64 {
    if series.len() < MIN_SCORE_BARS {
        tracing::debug!(
            symbol = series.symbol(),
            bars = series.len(),
            "数据不足{}条, 评分设为0",
            MIN_SCORE_BARS
        );
        return 0.0;
    }

    let closes = series.closes();
    let engine = IndicatorEngine::new(series);

    // 近5日涨幅: short-term trend
    let recent_return = {
        let base = closes[closes.len() - 6];
        let last = closes[closes.len() - 1];
        if base > 0.0 {
            (last - base) / base
        } else {
            0.0
        }
    };
    let return_score = (recent_return * 150.0).clamp(0.0, 30.0);

    // 成交量放大率: capital attention, only ratios above 0.5 earn points
    let volume_score = ((engine.volume_ratio() - 0.5) * 20.0).clamp(0.0, 20.0);

    // 均线多头排列: flat bonus for strict bullish ordering, else partial
    let ma5 = tail_mean(&closes, 5);
    let ma10 = tail_mean(&closes, 10);
    let ma20 = tail_mean(&closes, 20);
    let ma60 = tail_mean(&closes, 60);
    let ma_score = if ma5 > ma10 && ma10 > ma20 && ma20 > ma60 && ma60 > 0.0 {
        20.0
    } else if ma20 > 0.0 {
        ((ma5 - ma20) / ma20 * 200.0).clamp(0.0, 15.0)
    } else {
        0.0
    };

    // RSI(14): neutral-to-strong zone scores best
    let rsi = engine.rsi(14);
    let rsi_score = if (50.0..=70.0).contains(&rsi) {
        15.0
    } else if (40.0..50.0).contains(&rsi) || (70.0 < rsi && rsi <= 80.0) {
        10.0
    } else {
        3.0
    };

    // 换手率稳定性: neutral base when the provider has no turnover column
    let turnover_score = engine
        .turnover_stability()
        .map(|s| s * 15.0)
        .unwrap_or(NEUTRAL_TURNOVER_SCORE);

    let total = return_score + volume_score + ma_score + rsi_score + turnover_score;

    tracing::debug!(
        symbol = series.symbol(),
        "评分明细: 涨幅{:.1} 成交量{:.1} 均线{:.1} RSI{:.1} 换手率{:.1} 总分{:.1}",
        return_score,
        volume_score,
        ma_score,
        rsi_score,
        turnover_score,
        total
    );

    total.clamp(0.0, 100.0)
}

/// One scored universe row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredStock {
    pub info: StockInfo,
    pub score: f64,
}

/// Three-tier selection so the pipeline never halts for lack of candidates:
/// top-K at the primary threshold, backfill down to the secondary threshold,
/// then the configured preset list.
pub fn select_candidates(mut scored: Vec<ScoredStock>, selection: &SelectionConfig) -> Vec<ScoredStock> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.info.symbol.cmp(&b.info.symbol))
    });

    let top = selection.top_count;
    let mut picked: Vec<ScoredStock> = scored
        .iter()
        .filter(|s| s.score >= selection.primary_threshold)
        .take(top)
        .cloned()
        .collect();

    if picked.len() < top {
        for candidate in &scored {
            if picked.len() == top {
                break;
            }
            if candidate.score >= selection.secondary_threshold
                && !picked.iter().any(|p| p.info.symbol == candidate.info.symbol)
            {
                picked.push(candidate.clone());
            }
        }
    }

    if picked.len() < top {
        tracing::warn!(
            "高分股票不足{}只, 使用预设股票补足",
            top
        );
        for fallback in &selection.fallback_stocks {
            if picked.len() == top {
                break;
            }
            if picked.iter().any(|p| p.info.symbol == fallback.symbol) {
                continue;
            }
            picked.push(ScoredStock {
                info: StockInfo {
                    symbol: fallback.symbol.clone(),
                    name: fallback.name.clone(),
                    market_cap: 1500.0,
                    turnover_amount: 8.0,
                    pct_change: 0.0,
                    is_st: false,
                    is_delisted: false,
                },
                score: FALLBACK_SCORE,
            });
        }
    }

    picked
}
