use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Client-local string-keyed storage that survives restarts.
pub trait DurableStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

/// Durable store backed by a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary file and an
/// atomic rename so a crash never leaves a partial document behind.
pub struct FileStore {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "store.json";

    /// Open (or create) the store file inside `dir`.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let mut store = Self {
            path: dir.join(Self::FILE_NAME),
            data: BTreeMap::new(),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(&mut self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.path.exists() {
            let mut file = File::open(&self.path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            if !contents.trim().is_empty() {
                self.data = serde_json::from_str(&contents)?;
            }
        } else {
            self.save()?;
        }

        Ok(())
    }

    fn save(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(&self.data)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, &self.path)?;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        if self.data.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.data.remove(key);
        Ok(())
    }
}

/// Cloneable handle so the session and the local task list share one store.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Box<dyn DurableStore>>>,
}

impl StoreHandle {
    pub fn new(store: impl DurableStore + 'static) -> Self {
        let boxed: Box<dyn DurableStore> = Box::new(store);
        Self {
            inner: Arc::new(Mutex::new(boxed)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn DurableStore>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock().set(key, value)
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key)
    }
}
