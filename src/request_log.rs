//! Optional plain-text request log.
//!
//! When enabled, every step of a signed request appends one line of the form
//! `dd.mm.yy HH:MM:SS - message` to a file. Writing is best-effort: failures
//! are reported through `tracing` and never interrupt the request.
use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::warn;

use crate::config::Config;

#[async_trait]
pub trait LogSink: Send + Sync {
    /// Record `message`. Must not fail.
    async fn append(&self, message: &str);
}

/// Build the sink selected by `config.log_enabled`.
pub fn from_config(config: &Config) -> Arc<dyn LogSink> {
    if config.log_enabled {
        Arc::new(FileLog::new(config.log_file.clone()))
    } else {
        Arc::new(NoopLog)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLog;

#[async_trait]
impl LogSink for NoopLog {
    async fn append(&self, _message: &str) {}
}

/// Appends timestamped lines to a file, creating it on first use.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    // Serializes appends so concurrent requests never interleave lines.
    lock: Mutex<()>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl LogSink for FileLog {
    async fn append(&self, message: &str) {
        let ts = chrono::Local::now().format("%d.%m.%y %H:%M:%S");
        let line = format!("{ts} - {message}\n");

        let _guard = self.lock.lock().await;

        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "request_log: failed to open log file");
                return;
            }
        };

        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!(path = %self.path.display(), error = %e, "request_log: failed to append line");
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn temp_log_path() -> PathBuf {
        std::env::temp_dir().join(format!("ecoflow-log-{}.txt", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn file_log_appends_timestamped_lines() {
        let path = temp_log_path();
        let log = FileLog::new(&path);

        log.append("first").await;
        log.append("second").await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));
        // "dd.mm.yy HH:MM:SS" is 17 characters.
        assert_eq!(lines[0].find(" - "), Some(17));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn file_log_keeps_existing_content() {
        let path = temp_log_path();
        tokio::fs::write(&path, "previous run\n").await.unwrap();

        FileLog::new(&path).append("next run").await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("previous run\n"));
        assert!(content.trim_end().ends_with(" - next run"));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave() {
        let path = temp_log_path();
        let log = Arc::new(FileLog::new(&path));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append(&format!("line {i}")).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 20);
        assert!(content.lines().all(|l| l.contains(" - line ")));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn unwritable_path_is_swallowed() {
        let path = std::env::temp_dir()
            .join(format!("missing-{}", Uuid::new_v4()))
            .join("log.txt");
        FileLog::new(&path).append("goes nowhere").await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn from_config_respects_toggle() {
        let path = temp_log_path();
        let disabled = Config::new("SN", "AK", "SK").with_log_file(&path);
        from_config(&disabled).append("ignored").await;
        assert!(!path.exists());

        let enabled = disabled.with_logging(true);
        from_config(&enabled).append("kept").await;
        assert!(path.exists());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
