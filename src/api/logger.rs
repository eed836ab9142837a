// Copyright 2025 reword_engine contributors
// SPDX-License-Identifier: MIT
//
// Global logger with an optional debug-log sink (the host panel's log window).

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use log::{Level, Metadata, Record};

/// Callback that receives each rendered `[LEVEL][target] message` line.
///
/// The add-in's task pane installs one to fill its log window. It runs on whichever
/// thread emitted the record, so it must be cheap and must not log itself.
pub type LogSink = Box<dyn Fn(&str) + Send + Sync>;

lazy_static! {
    static ref DEBUG_LOG_SINK: RwLock<Option<LogSink>> = RwLock::new(None);
}

/// Track whether the logger has been initialized to avoid double initialization errors.
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

struct CombinedLogger;

impl log::Log for CombinedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        #[cfg(debug_assertions)]
        {
            metadata.level() <= Level::Debug
        }
        #[cfg(not(debug_assertions))]
        {
            metadata.level() <= Level::Info
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let msg = format_line(record.level(), record.target(), &record.args().to_string());

            // Only print when no sink is attached (avoid duplication)
            if !try_send_to_sink(&msg) {
                println!("{}", msg);
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: CombinedLogger = CombinedLogger;

fn format_line(level: Level, target: &str, message: &str) -> String {
    format!("[{}][{}] {}", level, target, message)
}

/// Initialize the global logger.
///
/// Idempotent: calling it again after a successful initialization returns Ok(()).
///
/// Log levels:
/// - Debug builds: DEBUG and above
/// - Release builds: INFO and above
pub fn init_logger() -> anyhow::Result<()> {
    if LOGGER_INITIALIZED.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
        return Ok(());
    }

    #[cfg(debug_assertions)]
    let level = log::LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    let level = log::LevelFilter::Info;

    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|e| {
            LOGGER_INITIALIZED.store(false, Ordering::SeqCst);
            anyhow::anyhow!("Logger init failed: {}", e)
        })
}

/// Route log output to `sink` in place of stdout.
///
/// A sink attached earlier is dropped. Works before or after [`init_logger`], but lines
/// only arrive once the logger is installed. Fails only when the sink lock is poisoned.
pub fn init_log_sink(sink: LogSink) -> anyhow::Result<()> {
    let mut guard = DEBUG_LOG_SINK.write().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
    *guard = Some(sink);
    Ok(())
}

/// Drop the attached sink, for example when the log window closes. Later lines are
/// printed to stdout. Calling it with no sink attached is a no-op.
pub fn close_log_sink() -> anyhow::Result<()> {
    let mut guard = DEBUG_LOG_SINK.write().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
    *guard = None;
    Ok(())
}

/// Hand `msg` to the attached sink.
///
/// `false` means the caller still owns the line: no sink is attached or the lock is
/// poisoned, and [`CombinedLogger`] prints it instead.
fn try_send_to_sink(msg: &str) -> bool {
    match DEBUG_LOG_SINK.read() {
        Ok(guard) => {
            if let Some(sink) = &*guard {
                sink(msg);
                true
            } else {
                false
            }
        }
        Err(_) => {
            #[cfg(debug_assertions)]
            eprintln!("[WARNING] debug log sink lock is poisoned");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_format_line() {
        let line = format_line(Level::Info, "reword_engine::api::rewrite", "[rewrite] done");
        assert_eq!(line, "[INFO][reword_engine::api::rewrite] [rewrite] done");
    }

    #[test]
    fn test_init_logger_is_idempotent() {
        assert!(init_logger().is_ok());
        assert!(init_logger().is_ok());
    }

    #[test]
    fn test_sink_receives_lines() {
        let captured = Arc::new(Mutex::new(Vec::<String>::new()));
        let writer = Arc::clone(&captured);
        init_log_sink(Box::new(move |line| {
            if let Ok(mut lines) = writer.lock() {
                lines.push(line.to_string());
            }
        }))
        .unwrap();

        assert!(try_send_to_sink("[INFO][test] hello"));
        close_log_sink().unwrap();
        assert!(!try_send_to_sink("[INFO][test] dropped"));

        // Other tests may log concurrently once the global logger is installed
        let lines = captured.lock().unwrap();
        assert!(lines.iter().any(|l| l == "[INFO][test] hello"));
        assert!(!lines.iter().any(|l| l == "[INFO][test] dropped"));
    }
}
