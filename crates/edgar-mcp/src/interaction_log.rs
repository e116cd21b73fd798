//! Daily interaction log
//!
//! One JSON array per UTC day at `<dir>/<YYYY-MM-DD>.json`. Appends are
//! read-modify-write, serialized through a mutex. Failures are logged and
//! never reach the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub session: String,
    pub tool: String,
    pub arguments: Value,
    pub ok: bool,
}

impl Interaction {
    pub fn new(session: &str, tool: &str, arguments: Value, ok: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            session: session.to_string(),
            tool: tool.to_string(),
            arguments,
            ok,
        }
    }
}

pub struct InteractionLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("{}.json", timestamp.format("%Y-%m-%d")))
    }

    /// Append, swallowing I/O errors.
    pub async fn record(&self, interaction: Interaction) {
        if let Err(e) = self.append(&interaction).await {
            warn!(dir = %self.dir.display(), error = %e, "Failed to write interaction log");
        }
    }

    async fn append(&self, interaction: &Interaction) -> edgar_core::Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(&interaction.timestamp);

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut entries: Vec<Value> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Interaction log unreadable, starting a new array");
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        entries.push(serde_json::to_value(interaction)?);

        tokio::fs::write(&path, serde_json::to_vec_pretty(&entries)?).await?;
        debug!(path = %path.display(), entries = entries.len(), "Interaction logged");
        Ok(())
    }
}
