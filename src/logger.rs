//! Logging setup for batch runs.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logger.
///
/// Console output is always on; passing a file path adds an append-mode file
/// layer without ANSI colors. `RUST_LOG` overrides the default info level.
/// Calling again after a subscriber is installed is a no-op.
pub fn init_logger(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(filter);

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(true);

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false);

                let _ = subscriber.with(fmt_layer).with(file_layer).try_init();
            }
            Err(e) => {
                let _ = subscriber.with(fmt_layer).try_init();
                tracing::warn!("无法打开日志文件 {}: {}", log_path.display(), e);
            }
        }
    } else {
        let _ = subscriber.with(fmt_layer).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_safe() {
        // Startup may bring the console logger up early and attach the file
        // layer later; the second call must not panic.
        init_logger(None);
        init_logger(None);
        tracing::info!("日志初始化测试");
    }
}
