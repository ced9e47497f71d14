//! On-disk session buffer.
//!
//! Each session is one JSON file `<dir>/<session>.json`:
//!
//! ```json
//! { "version": 2, "savedAt": "2026-01-05T10:00:00Z", "state": { ... } }
//! ```
//!
//! Older blobs are migrated on load. Before a blob is rewritten its original
//! text is copied to `<session>.v<old>.bak.json`, so [`SessionBuffer::rollback`]
//! can put it back. Blobs written by a newer version are refused and left
//! untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::WizardState;

pub const SESSION_BUFFER_VERSION: u32 = 2;

/// State keys dropped when migrating from version 1.
pub const DEPRECATED_FIELDS: &[&str] = &["selectedTemplate", "showAdvanced", "legacyPricing"];

#[derive(Debug, Error)]
pub enum SessionBufferError {
    #[error("session buffer I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session buffer '{}' is not valid: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session buffer version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    version: u32,
    saved_at: DateTime<Utc>,
    state: WizardState,
}

/// Removes deprecated keys from a version-1 state object. Returns the keys
/// that were present.
fn strip_deprecated(state: &mut Value) -> Vec<String> {
    let Some(object) = state.as_object_mut() else {
        return Vec::new();
    };
    DEPRECATED_FIELDS
        .iter()
        .filter(|field| object.remove(**field).is_some())
        .map(|field| field.to_string())
        .collect()
}

/// Blob version; blobs from before versioning carry none and count as 1,
/// as does an explicit 0.
fn blob_version(blob: &Value) -> u32 {
    blob.get("version")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(1)
        .max(1)
}

#[derive(Debug, Clone)]
pub struct SessionBuffer {
    dir: PathBuf,
}

impl SessionBuffer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(
        &self,
        session: &str,
    ) -> Result<PathBuf, SessionBufferError> {
        let valid = !session.is_empty()
            && session
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SessionBufferError::InvalidSessionId(session.to_string()));
        }
        Ok(self.dir.join(format!("{session}.json")))
    }

    fn backup_path(
        &self,
        session: &str,
        version: u32,
    ) -> PathBuf {
        self.dir.join(format!("{session}.v{version}.bak.json"))
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SessionBufferError + '_ {
        move |source| SessionBufferError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Writes through a temporary file so a crash never leaves half a blob.
    fn write_atomic(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), SessionBufferError> {
        std::fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(Self::io_err(&tmp))?;
        std::fs::rename(&tmp, path).map_err(Self::io_err(path))
    }

    pub fn save(
        &self,
        session: &str,
        state: &WizardState,
    ) -> Result<(), SessionBufferError> {
        let path = self.path(session)?;
        let blob = Blob {
            version: SESSION_BUFFER_VERSION,
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let text = serde_json::to_string_pretty(&blob).map_err(|source| SessionBufferError::Json {
            path: path.clone(),
            source,
        })?;
        self.write_atomic(&path, &text)?;
        debug!(session, path = %path.display(), "session saved");
        Ok(())
    }

    /// Reads a session, migrating it first when it is older than
    /// [`SESSION_BUFFER_VERSION`]. `Ok(None)` when nothing is stored.
    pub fn load(
        &self,
        session: &str,
    ) -> Result<Option<WizardState>, SessionBufferError> {
        let path = self.path(session)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path)(e)),
        };
        let json_err = |source| SessionBufferError::Json {
            path: path.clone(),
            source,
        };

        let mut raw: Value = serde_json::from_str(&text).map_err(json_err)?;
        let version = blob_version(&raw);

        if version > SESSION_BUFFER_VERSION {
            warn!(session, version, "refusing session buffer from a newer version");
            return Err(SessionBufferError::UnsupportedVersion {
                found: version,
                supported: SESSION_BUFFER_VERSION,
            });
        }

        if version == SESSION_BUFFER_VERSION {
            let blob: Blob = serde_json::from_value(raw).map_err(json_err)?;
            return Ok(Some(blob.state));
        }

        // Version 1 stored the state object at the top level.
        let mut state = if raw.get("state").is_some() {
            raw["state"].take()
        } else {
            raw
        };
        let removed = strip_deprecated(&mut state);
        let state: WizardState = serde_json::from_value(state).map_err(json_err)?;

        let backup = self.backup_path(session, version);
        std::fs::write(&backup, &text).map_err(Self::io_err(&backup))?;
        self.save(session, &state)?;
        info!(
            session,
            from = version,
            to = SESSION_BUFFER_VERSION,
            ?removed,
            backup = %backup.display(),
            "session buffer migrated"
        );
        Ok(Some(state))
    }

    /// Restores the newest pre-migration backup over the current blob.
    /// Returns the restored version, or `None` when there is no backup.
    pub fn rollback(
        &self,
        session: &str,
    ) -> Result<Option<u32>, SessionBufferError> {
        let path = self.path(session)?;
        for version in (1..SESSION_BUFFER_VERSION).rev() {
            let backup = self.backup_path(session, version);
            if backup.is_file() {
                let text = std::fs::read_to_string(&backup).map_err(Self::io_err(&backup))?;
                self.write_atomic(&path, &text)?;
                std::fs::remove_file(&backup).map_err(Self::io_err(&backup))?;
                info!(session, version, "session buffer rolled back");
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    /// Deletes the session blob. Backups are kept. Returns whether a blob
    /// existed.
    pub fn clear(
        &self,
        session: &str,
    ) -> Result<bool, SessionBufferError> {
        let path = self.path(session)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(session, "session cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_err(&path)(e)),
        }
    }
}

/// Debounced background writer for one session.
///
/// [`AutoSaver::schedule`] never blocks. A write happens once no newer state
/// has arrived for the debounce window, and only the latest state is written.
/// [`AutoSaver::finish`] flushes anything pending.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<WizardState>,
    handle: JoinHandle<usize>,
}

impl AutoSaver {
    pub fn spawn(
        buffer: Arc<SessionBuffer>,
        session: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        let session = session.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<WizardState>();

        let handle = tokio::spawn(async move {
            let mut writes = 0;
            while let Some(mut latest) = rx.recv().await {
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(newer)) => latest = newer,
                        Ok(None) | Err(_) => break,
                    }
                }
                let (writer, id) = (buffer.clone(), session.clone());
                match tokio::task::spawn_blocking(move || writer.save(&id, &latest)).await {
                    Ok(Ok(())) => writes += 1,
                    Ok(Err(error)) => warn!(session = %session, %error, "autosave failed"),
                    Err(error) => warn!(session = %session, %error, "autosave write panicked"),
                }
            }
            writes
        });

        Self { tx, handle }
    }

    pub fn schedule(
        &self,
        state: &WizardState,
    ) {
        if self.tx.send(state.clone()).is_err() {
            warn!("autosave task has stopped; state not scheduled");
        }
    }

    /// Stops the task after writing any pending state. Returns how many
    /// writes were made.
    pub async fn finish(self) -> usize {
        drop(self.tx);
        self.handle.await.unwrap_or_else(|error| {
            warn!(%error, "autosave task panicked");
            0
        })
    }
}
