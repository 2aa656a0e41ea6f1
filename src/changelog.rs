//! Persisted record of the last address pushed to the provider.
//!
//! The file holds a single address followed by a newline. It is always
//! replaced whole (write to `<path>.tmp`, then rename), never appended to.
//! Content that does not parse as an address is treated as if the file were
//! absent and gets overwritten.

use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::LogIoError;
use crate::ip::parse_address;

/// What the change log held before a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorState {
    Absent,
    Corrupt,
    Recorded(IpAddr),
}

#[derive(Debug, Clone)]
pub struct ChangeLog {
    path: PathBuf,
}

impl ChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the recorded address without modifying anything.
    pub async fn read(&self) -> Result<PriorState, LogIoError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PriorState::Absent),
            Err(e) => return Err(LogIoError::new("read", &self.path, e)),
        };

        let recorded = String::from_utf8(bytes)
            .ok()
            .and_then(|content| parse_address(&content));

        Ok(match recorded {
            Some(ip) => PriorState::Recorded(ip),
            None => PriorState::Corrupt,
        })
    }

    /// Compares `candidate` with the recorded address and records it when
    /// they differ. Returns whether an update cycle is required.
    pub async fn check_and_update(&self, candidate: IpAddr) -> Result<bool, LogIoError> {
        match self.read().await? {
            PriorState::Recorded(previous) if previous == candidate => {
                tracing::info!(
                    "Address {} unchanged since last run ({})",
                    candidate,
                    self.path.display()
                );
                return Ok(false);
            }
            PriorState::Recorded(previous) => {
                tracing::info!("Address changed from {} to {}", previous, candidate);
            }
            PriorState::Absent => {
                tracing::info!(
                    "No change log at {}, treating as first run",
                    self.path.display()
                );
            }
            PriorState::Corrupt => {
                tracing::warn!(
                    "Change log {} does not hold a valid address, recreating it",
                    self.path.display()
                );
            }
        }

        self.write(candidate).await?;
        Ok(true)
    }

    /// Replaces the file content with `address`.
    pub async fn write(&self, address: IpAddr) -> Result<(), LogIoError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LogIoError::new("create directory for", &self.path, e))?;
            }
        }

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| LogIoError::new("create temp file for", &self.path, e))?;

            file.write_all(format!("{}\n", address).as_bytes())
                .await
                .map_err(|e| LogIoError::new("write", &self.path, e))?;

            file.sync_all()
                .await
                .map_err(|e| LogIoError::new("sync", &self.path, e))?;
        }

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| LogIoError::new("replace", &self.path, e))?;

        tracing::debug!("Recorded {} in {}", address, self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}
