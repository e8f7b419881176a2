//! File-backed record of incidents already announced.
//!
//! This is the older way of avoiding duplicate alerts; the notification id
//! column is the default. The file is a JSON object of `"<incident id>": true`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentStateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug)]
pub struct SentState {
    path: PathBuf,
    sent: BTreeMap<i64, bool>,
}

impl SentState {
    /// Reads the state file; a missing file is an empty set.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SentStateError> {
        let path = path.as_ref().to_path_buf();
        let sent = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| SentStateError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SentStateError::Io { path, source }),
        };
        Ok(Self { path, sent })
    }

    pub fn contains(&self, incident_id: i64) -> bool {
        self.sent.get(&incident_id).copied().unwrap_or(false)
    }

    pub fn mark_sent(&mut self, incident_id: i64) {
        self.sent.insert(incident_id, true);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    /// Rewrites the whole file.
    pub async fn save(&self) -> Result<(), SentStateError> {
        let raw = serde_json::to_vec_pretty(&self.sent).map_err(|source| SentStateError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        let io_err = |source| SentStateError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, raw).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}
