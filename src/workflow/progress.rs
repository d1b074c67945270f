// Progress reporting - narrow sink consumed by the scheduler and scene processor
use std::sync::Mutex;
use tracing::Level;

/// Accepts log lines and progress counters. Hierarchy comes from the
/// surrounding `tracing` span, so implementations do not track it themselves.
pub trait ProgressSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
    fn progress(&self, task: &str, completed: usize, total: usize);
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            _ => tracing::trace!("{}", message),
        }
    }

    fn progress(&self, task: &str, completed: usize, total: usize) {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 * 100.0 / total as f64
        };
        tracing::info!("📊 {} {}/{} ({:.0}%)", task, completed, total, percent);
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub logs: Mutex<Vec<(Level, String)>>,
    pub updates: Mutex<Vec<(String, usize, usize)>>,
}

impl RecordingProgress {
    pub fn messages(&self) -> Vec<String> {
        self.logs
            .lock()
            .map(|logs| logs.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default()
    }

    pub fn last_update(&self, task: &str) -> Option<(usize, usize)> {
        self.updates.lock().ok().and_then(|updates| {
            updates
                .iter()
                .rev()
                .find(|(t, _, _)| t == task)
                .map(|(_, done, total)| (*done, *total))
        })
    }
}

impl ProgressSink for RecordingProgress {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push((level, message.to_string()));
        }
    }

    fn progress(&self, task: &str, completed: usize, total: usize) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((task.to_string(), completed, total));
        }
    }
}
