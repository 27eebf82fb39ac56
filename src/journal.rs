use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Unable to open transaction log `{}`: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to write transaction log `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Append-only text file of human readable notes, one line per entry.
///
/// The file is opened for each entry and closed again before `append`
/// returns, whether or not the write succeeded.
#[derive(Debug)]
pub struct TransactionLog {
    path: PathBuf,
    // keeps lines from interleaving when several tasks append at once
    write_lock: Mutex<()>,
}

impl TransactionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &str) -> Result<(), JournalError> {
        let mut line = entry.replace(['\r', '\n'], " ");
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| JournalError::Open {
                path: self.path.clone(),
                source,
            })?;
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|source| JournalError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
