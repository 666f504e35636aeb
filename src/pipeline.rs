//! End-to-end strategy pipeline.
//!
//! One run walks the full chain: screen the universe, score and select
//! candidates, optimize parameters on the validation set, then generate
//! sized trading signals for the final picks. Each stage degrades gracefully
//! where a fallback exists and fails fast where it does not.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtesting::{OptimizationOutcome, ParamOptimizer};
use crate::config::EngineConfig;
use crate::error::{Result, SignalError};
use crate::market::{BarSeries, BaseDatafeed, StockInfo};
use crate::report::{
    append_optimization_log, append_selection_log, append_signal_log, core_suggestion,
    size_position, OptimizationRecord, SelectionRecord, SignalRecord,
};
use crate::strategy::params::StrategyParams;
use crate::strategy::score::{select_candidates, short_term_score, ScoredStock};
use crate::strategy::signal::SignalEngine;

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub date: NaiveDate,
    pub selections: Vec<SelectionRecord>,
    pub best_params: StrategyParams,
    pub optimization: Option<OptimizationOutcome>,
    pub signals: Vec<SignalRecord>,
}

/// Pipeline driver bound to one datafeed and one configuration.
pub struct StrategyPipeline<D: BaseDatafeed> {
    datafeed: D,
    config: EngineConfig,
}

impl<D: BaseDatafeed> StrategyPipeline<D> {
    pub fn new(datafeed: D, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { datafeed, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full chain for one trading day.
    pub async fn run(&self, today: NaiveDate) -> Result<PipelineReport> {
        tracing::info!(date = %today, "开始策略流水线");

        let universe = self.screen_universe().await;
        tracing::info!("筛选后股票池: {}只", universe.len());

        let (scored, mut series_cache) = self.score_universe(&universe).await?;
        let candidates = select_candidates(scored, &self.config.selection);
        tracing::info!("入选候选股: {}只", candidates.len());

        let optimization = self
            .optimize(&candidates, &mut series_cache)
            .await?;
        let best_params = optimization
            .as_ref()
            .and_then(|o| o.best.as_ref())
            .map(|r| r.params)
            .unwrap_or_default();

        let signals = self
            .generate_signals(today, &candidates, best_params, &mut series_cache)
            .await;

        for record in &signals {
            tracing::info!("{}", core_suggestion(record));
        }

        let selections = candidates
            .iter()
            .map(|c| SelectionRecord {
                date: today,
                symbol: c.info.symbol.clone(),
                name: c.info.name.clone(),
                market_cap: c.info.market_cap,
                turnover_amount: c.info.turnover_amount,
                score: c.score,
            })
            .collect();

        Ok(PipelineReport {
            date: today,
            selections,
            best_params,
            optimization,
            signals,
        })
    }

    /// Append the run to the CSV audit logs when a log directory is set.
    pub fn write_logs(&self, report: &PipelineReport) -> Result<()> {
        let Some(dir) = &self.config.log_dir else {
            return Ok(());
        };

        append_selection_log(dir, &report.selections)?;

        if let Some(outcome) = &report.optimization {
            let records: Vec<OptimizationRecord> = outcome
                .ranked
                .iter()
                .map(|r| OptimizationRecord {
                    date: report.date,
                    params: r.params,
                    annual_return: r.metrics.annual_return,
                    win_rate: r.metrics.win_rate,
                    max_drawdown: r.metrics.max_drawdown,
                    avg_trade_count: r.metrics.avg_trade_count,
                    composite_score: r.composite_score,
                })
                .collect();
            append_optimization_log(dir, &records)?;
        }

        append_signal_log(dir, &report.signals)?;
        tracing::info!("运行日志已写入 {}", dir.display());
        Ok(())
    }

    /// Screen the universe by size, liquidity, and status flags. A universe
    /// fetch failure falls back to the preset list so the run can continue.
    async fn screen_universe(&self) -> Vec<StockInfo> {
        let filter = &self.config.filter;

        let mut universe = match self.datafeed.query_universe().await {
            Ok(universe) => universe,
            Err(e) => {
                tracing::warn!("获取股票池失败: {}, 使用预设股票", e);
                return self
                    .config
                    .selection
                    .fallback_stocks
                    .iter()
                    .map(|f| StockInfo {
                        symbol: f.symbol.clone(),
                        name: f.name.clone(),
                        market_cap: 1500.0,
                        turnover_amount: 8.0,
                        pct_change: 0.0,
                        is_st: false,
                        is_delisted: false,
                    })
                    .collect();
            }
        };

        universe.retain(|s| {
            s.market_cap >= filter.min_market_cap
                && s.turnover_amount >= filter.min_turnover_amount
                && !(filter.exclude_st && s.is_st)
                && !(filter.exclude_delisted && s.is_delisted)
        });
        universe.sort_by(|a, b| {
            b.turnover_amount
                .partial_cmp(&a.turnover_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        universe.truncate(filter.max_stock_count);
        universe
    }

    /// Score each screened symbol; unreachable symbols are skipped with a
    /// warning. Only a fully empty result is fatal.
    async fn score_universe(
        &self,
        universe: &[StockInfo],
    ) -> Result<(Vec<ScoredStock>, HashMap<String, BarSeries>)> {
        // One fetch per symbol feeds scoring, optimization, and signals
        let days = self.config.backtest.lookback_days.max(120) + 10;

        let mut scored = Vec::with_capacity(universe.len());
        let mut cache = HashMap::new();

        for info in universe {
            match self.datafeed.query_bar_history(&info.symbol, days).await {
                Ok(series) => {
                    let score = short_term_score(&series);
                    cache.insert(info.symbol.clone(), series);
                    scored.push(ScoredStock {
                        info: info.clone(),
                        score,
                    });
                }
                Err(e) => {
                    tracing::warn!(symbol = %info.symbol, "获取K线失败, 跳过: {}", e);
                }
            }
        }

        if scored.is_empty() && !universe.is_empty() {
            return Err(SignalError::NoMarketData {
                attempted: universe.len(),
            });
        }
        Ok((scored, cache))
    }

    /// Grid-search parameters over the top validation candidates. Candidates
    /// without cached history (preset fills) are fetched here.
    async fn optimize(
        &self,
        candidates: &[ScoredStock],
        cache: &mut HashMap<String, BarSeries>,
    ) -> Result<Option<OptimizationOutcome>> {
        let days = self.config.backtest.lookback_days.max(120) + 10;

        let mut validation = Vec::new();
        for candidate in candidates.iter().take(self.config.selection.validation_count) {
            let symbol = &candidate.info.symbol;
            if !cache.contains_key(symbol) {
                match self.datafeed.query_bar_history(symbol, days).await {
                    Ok(series) => {
                        cache.insert(symbol.clone(), series);
                    }
                    Err(e) => {
                        tracing::warn!(symbol = %symbol, "验证集K线缺失, 跳过: {}", e);
                        continue;
                    }
                }
            }
            validation.push(cache[symbol].clone());
        }

        if validation.is_empty() {
            tracing::warn!("验证集为空, 跳过参数优化");
            return Ok(None);
        }

        let optimizer = ParamOptimizer::new(self.config.backtest.clone());
        let outcome = optimizer.run(&self.config.grid, &validation)?;
        Ok(Some(outcome))
    }

    /// Generate sized signals for the final picks with the winning
    /// parameters. Symbols with too little history are skipped.
    async fn generate_signals(
        &self,
        today: NaiveDate,
        candidates: &[ScoredStock],
        params: StrategyParams,
        cache: &mut HashMap<String, BarSeries>,
    ) -> Vec<SignalRecord> {
        let engine = match SignalEngine::new(params) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!("信号参数无效: {}", e);
                return Vec::new();
            }
        };
        let days = self.config.backtest.lookback_days.max(120) + 10;
        let slots = self.config.selection.signal_count;

        let mut records = Vec::new();
        for candidate in candidates.iter().take(slots) {
            let symbol = &candidate.info.symbol;
            if !cache.contains_key(symbol) {
                match self.datafeed.query_bar_history(symbol, days).await {
                    Ok(series) => {
                        cache.insert(symbol.clone(), series);
                    }
                    Err(e) => {
                        tracing::warn!(symbol = %symbol, "信号K线缺失, 跳过: {}", e);
                        continue;
                    }
                }
            }

            let decision = match engine.evaluate_series(&cache[symbol]) {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, "信号生成失败, 跳过: {}", e);
                    continue;
                }
            };

            let suggestion = size_position(&decision, &self.config.cash, slots);
            records.push(SignalRecord {
                date: today,
                symbol: symbol.clone(),
                name: candidate.info.name.clone(),
                decision,
                shares: suggestion.shares,
                allocated: suggestion.allocated,
            });
        }
        records
    }
}
