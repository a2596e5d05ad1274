use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{LectureError, Result};

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("lectern")
}

/// Where fetched media lands before the stages read it.
pub fn get_scratch_dir() -> PathBuf {
    get_root_cache_dir().join("scratch")
}

pub fn get_root_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("lectern")
}

pub fn get_store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("lectures")
}

pub fn get_spool_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("spool")
}

/// `<prefix>_<uuid><ext>`; `ext` includes its leading dot.
pub fn unique_file_name(prefix: &str, ext: &str) -> String {
    format!("{}_{}{}", prefix, Uuid::new_v4().simple(), ext)
}

pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| LectureError::Scratch {
            path: path.to_path_buf(),
            source,
        })
}
