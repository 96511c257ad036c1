//! Structured records of notable bot activity.
//!
//! Logging is fire-and-forget: [`ActivityLogger::log`] never awaits and never
//! fails. Each record goes to every configured [`ActivitySink`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    BotStarted,
    CommandUsed,
    CommandDenied,
    CommandError,
    ClientError,
    UnhandledFailure,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BotStarted => write!(f, "BOT_STARTED"),
            Self::CommandUsed => write!(f, "COMMAND_USED"),
            Self::CommandDenied => write!(f, "COMMAND_DENIED"),
            Self::CommandError => write!(f, "COMMAND_ERROR"),
            Self::ClientError => write!(f, "CLIENT_ERROR"),
            Self::UnhandledFailure => write!(f, "UNHANDLED_FAILURE"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    #[serde(serialize_with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub event: ActivityKind,
    pub details: Value,
}

fn iso_timestamp<S: serde::Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[async_trait]
pub trait ActivitySink: Send + Sync + Debug {
    fn record(&self, record: &ActivityRecord);

    /// Waits until everything recorded so far has been written.
    async fn flush(&self) {}
}

/// Emits every record as a tracing event under the `activity` target.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl ActivitySink for TracingSink {
    fn record(&self, record: &ActivityRecord) {
        info!(target: "activity", event = %record.event, details = %record.details);
    }
}

/// Appends records as JSON lines to a file from a background writer task.
#[derive(Debug)]
pub struct JsonLinesSink {
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl JsonLinesSink {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_lines(path, receiver));

        Self {
            sender: std::sync::Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
        }
    }
}

async fn write_lines(path: PathBuf, mut receiver: mpsc::UnboundedReceiver<String>) {
    if let Some(parent) = Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!("Failed to create activity log directory: {}", e);
        }
    }

    let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open activity log {}: {}", path.display(), e);
            return;
        }
    };

    while let Some(line) = receiver.recv().await {
        if let Err(e) = file.write_all(line.as_bytes()).await {
            error!("Failed to write activity log {}: {}", path.display(), e);
        }
    }

    if let Err(e) = file.flush().await {
        error!("Failed to flush activity log {}: {}", path.display(), e);
    }
}

#[async_trait]
impl ActivitySink for JsonLinesSink {
    fn record(&self, record: &ActivityRecord) {
        let mut line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize activity record: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Ok(guard) = self.sender.lock() {
            if let Some(sender) = guard.as_ref() {
                sender.send(line).ok();
            }
        }
    }

    async fn flush(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        if let Some(writer) = self.writer.lock().await.take() {
            writer.await.ok();
        }
    }
}

#[derive(Clone, Debug)]
pub struct ActivityLogger {
    sinks: Arc<Vec<Arc<dyn ActivitySink>>>,
}

impl ActivityLogger {
    pub fn new(sinks: Vec<Arc<dyn ActivitySink>>) -> Self {
        Self {
            sinks: Arc::new(sinks),
        }
    }

    /// Tracing output, plus a JSON-lines file when `path` is given.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        let mut sinks: Vec<Arc<dyn ActivitySink>> = vec![Arc::new(TracingSink)];
        if let Some(path) = path {
            info!("Writing activity log to {}", path.display());
            sinks.push(Arc::new(JsonLinesSink::spawn(path)));
        }
        Self::new(sinks)
    }

    pub fn log(&self, event: ActivityKind, details: Value) {
        let record = ActivityRecord {
            timestamp: Utc::now(),
            event,
            details,
        };
        for sink in self.sinks.iter() {
            sink.record(&record);
        }
    }

    pub async fn flush(&self) {
        for sink in self.sinks.iter() {
            sink.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemorySink;
    use serde_json::json;

    #[test]
    fn kinds_serialize_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(ActivityKind::CommandUsed).unwrap(),
            json!("COMMAND_USED")
        );
        assert_eq!(ActivityKind::UnhandledFailure.to_string(), "UNHANDLED_FAILURE");
    }

    #[test]
    fn logger_fans_out_to_every_sink() {
        let first = Arc::new(MemorySink::default());
        let second = Arc::new(MemorySink::default());
        let logger = ActivityLogger::new(vec![
            first.clone() as Arc<dyn ActivitySink>,
            second.clone(),
        ]);

        logger.log(ActivityKind::BotStarted, json!({ "serverCount": 2 }));

        for sink in [&first, &second] {
            let records = sink.records();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].event, ActivityKind::BotStarted);
            assert_eq!(records[0].details["serverCount"], 2);
        }
    }

    #[tokio::test]
    async fn json_lines_sink_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activity.log");
        let sink: Arc<dyn ActivitySink> = Arc::new(JsonLinesSink::spawn(&path));
        let logger = ActivityLogger::new(vec![sink]);

        logger.log(ActivityKind::CommandUsed, json!({ "command": "help" }));
        logger.log(ActivityKind::CommandError, json!({ "error": "boom" }));
        logger.flush().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "COMMAND_USED");
        assert_eq!(lines[0]["details"]["command"], "help");
        assert_eq!(lines[1]["event"], "COMMAND_ERROR");
        assert!(lines[1]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn records_after_flush_are_dropped_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::spawn(dir.path().join("a.log"));
        sink.flush().await;
        sink.record(&ActivityRecord {
            timestamp: Utc::now(),
            event: ActivityKind::ClientError,
            details: json!({}),
        });
        sink.flush().await;
    }
}
