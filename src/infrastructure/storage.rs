#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::path;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;

/// Key-value persistence for serialized settings and chat collections.
/// Writes are synchronous and best-effort from the caller's perspective,
/// callers log failures and continue.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<key>.json` under a data directory.
#[derive(Clone)]
pub struct FileStorage {
    pub data_dir: path::PathBuf,
}

impl Default for FileStorage {
    fn default() -> FileStorage {
        let data_dir = dirs::data_dir().unwrap().join("quickchat");

        return FileStorage::new(data_dir);
    }
}

impl FileStorage {
    pub fn new(data_dir: path::PathBuf) -> FileStorage {
        return FileStorage { data_dir };
    }

    fn get_file_path(&self, key: &str) -> path::PathBuf {
        return self.data_dir.join(format!("{key}.json"));
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Option<String> {
        let file_path = self.get_file_path(key);
        if !file_path.exists() {
            return None;
        }

        return fs::read_to_string(file_path).ok();
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        }

        let file_path = self.get_file_path(key);
        fs::write(&file_path, value)
            .with_context(|| format!("Failed to write {}", file_path.display()))?;

        return Ok(());
    }
}

/// Shared in-memory storage, used by tests that need durable-storage
/// semantics without touching disk.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        return self.records.lock().unwrap().get(key).cloned();
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        return Ok(());
    }
}
