//! 信号引擎命令行入口
//!
//! Loads configuration, wires the JSON datafeed, and runs one full pipeline
//! pass for the current date.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info};

use signal_engine::market::JsonDatafeed;
use signal_engine::{logger, EngineConfig, StrategyPipeline};

const CONFIG_PATH: &str = "signal_config.json";
const DEFAULT_DATA_DIR: &str = "data";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("运行失败: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> signal_engine::Result<()> {
    // Console logging comes up before the config is touched, so a broken
    // config file still reports through the subscriber.
    let config = match EngineConfig::load(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(e) => {
            logger::init_logger(None);
            return Err(e);
        }
    };
    let log_file = config.log_dir.as_ref().map(|d| d.join("signal_engine.log"));
    logger::init_logger(log_file.as_deref());
    info!("信号引擎 v{} 启动", signal_engine::VERSION);

    let data_dir: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
        .into();
    let datafeed = JsonDatafeed::new(data_dir);

    let pipeline = StrategyPipeline::new(datafeed, config)?;
    let report = pipeline.run(Local::now().date_naive()).await?;
    pipeline.write_logs(&report)?;

    info!(
        "流水线完成: 候选{}只, 信号{}条",
        report.selections.len(),
        report.signals.len()
    );
    Ok(())
}
