//! Filesystem sink: one `{id}.html` file per fetched snapshot.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::traits::{SnapshotSink, StoreError};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens `dir` as the output folder, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.html"))
    }
}

#[async_trait]
impl SnapshotSink for FileStore {
    async fn store(&self, id: u64, content: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(self.path_for(id), content)
            .await
            .map_err(|source| StoreError::Io { id, source })
    }
}
