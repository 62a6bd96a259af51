use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WidgetResult;

/// String key-value storage, the widget's stand-in for browser local
/// storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> WidgetResult<()>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> WidgetResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// Storage that survives restarts: one JSON object per origin, written
/// through on every `set`. Different origins never see each other's keys.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens (or starts) the store for `origin` inside `dir`.
    pub fn for_origin(dir: impl AsRef<Path>, origin: &str) -> WidgetResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Self::open(dir.join(format!("{}.json", origin_file_stem(origin))))
    }

    pub fn open(path: impl Into<PathBuf>) -> WidgetResult<Self> {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable store {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!("Opened store {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> WidgetResult<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);

        let json = serde_json::to_string(&*entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// `https://radio.example:8080` -> `https_radio.example_8080`
fn origin_file_stem(origin: &str) -> String {
    let stem: String = origin
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('_').to_string()
}
