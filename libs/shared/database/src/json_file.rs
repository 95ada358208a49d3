use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::DatabaseError;

/// A JSON array stored as one file and always rewritten as a whole.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or blank file reads as an empty array.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>, DatabaseError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(DatabaseError::Io { path: self.path.clone(), source });
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| DatabaseError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes to a sibling temp file and renames it over the target, so
    /// readers never observe a half-written array.
    pub async fn save<T: Serialize>(&self, records: &[T]) -> Result<(), DatabaseError> {
        let json = serde_json::to_string_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, json.as_bytes())
            .await
            .map_err(|source| DatabaseError::Io { path: staging.clone(), source })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> DatabaseError {
        DatabaseError::Io { path: self.path.clone(), source }
    }
}
