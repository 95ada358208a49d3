use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::json_file::JsonFile;

/// An ordered record set held in memory, optionally mirrored to a JSON file.
///
/// Every mutation runs under the write lock against a staged copy of the
/// records. The copy is persisted first and only then swapped in, so a
/// rejected mutation or a failed write leaves both memory and disk as they
/// were.
pub struct Collection<T> {
    name: &'static str,
    records: RwLock<Vec<T>>,
    file: Option<JsonFile>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn in_memory(name: &'static str) -> Self {
        Self::with_records(name, Vec::new())
    }

    pub fn with_records(name: &'static str, records: Vec<T>) -> Self {
        Self {
            name,
            records: RwLock::new(records),
            file: None,
        }
    }

    /// Loads the file (if any) and keeps it as the backing store.
    pub async fn open(name: &'static str, path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let file = JsonFile::new(path);
        let records = file.load().await?;
        info!("Loaded {} {} from {}", records.len(), name, file.path().display());

        Ok(Self {
            name,
            records: RwLock::new(records),
            file: Some(file),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_persistent(&self) -> bool {
        self.file.is_some()
    }

    pub async fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[T]) -> R,
    {
        let records = self.records.read().await;
        f(&records)
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Applies `f` atomically. An `Err` from `f` discards the staged copy and
    /// nothing is written.
    pub async fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
        E: From<DatabaseError>,
    {
        let mut records = self.records.write().await;
        let mut staged = records.clone();

        let outcome = f(&mut staged)?;

        if let Some(file) = &self.file {
            file.save(&staged).await?;
        }

        debug!("{}: committed write ({} records)", self.name, staged.len());
        *records = staged;
        Ok(outcome)
    }
}
