use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use uuid::Uuid;

use crate::lecture::LectureRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt lecture record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize lecture {id}: {source}")]
    Serialize {
        id: Uuid,
        source: serde_json::Error,
    },
}

/// Durable home of lecture records. Each call stands alone; there are no
/// transactions.
#[async_trait]
pub trait LectureStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<LectureRecord>, StoreError>;
    async fn save(&self, record: &LectureRecord) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, LectureRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl LectureStore for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<LectureRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, record: &LectureRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per lecture.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<LectureRecord>, StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            records.push(read_record(&path).await?);
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

async fn read_record(path: &Path) -> Result<LectureRecord, StoreError> {
    let json = fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl LectureStore for FileStore {
    async fn find(&self, id: Uuid) -> Result<Option<LectureRecord>, StoreError> {
        let path = self.record_path(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        read_record(&path).await.map(Some)
    }

    async fn save(&self, record: &LectureRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.id);
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", record.id, Uuid::new_v4()));
        let pretty_json =
            serde_json::to_string_pretty(record).map_err(|source| StoreError::Serialize {
                id: record.id,
                source,
            })?;

        fs::write(&tmp_path, pretty_json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        // rename keeps readers from ever seeing a half-written record
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })
    }
}
