use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const STUDENTS_KEY: &str = "students";
pub const GRADES_KEY: &str = "grades";

/// Persistence boundary for the roster collections. Each key holds one
/// serialized collection; `load` returns `None` for a key that has never
/// been saved. Save-then-load must reproduce the payload byte-for-byte.
pub trait Store {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&mut self, key: &str, payload: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per collection under a workspace directory.
pub struct JsonFileStore {
    workspace: PathBuf,
}

impl JsonFileStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!(
                "failed to create workspace {}",
                workspace.to_string_lossy()
            )
        })?;
        Ok(Self {
            workspace: workspace.to_path_buf(),
        })
    }

    pub fn collection_path(&self, key: &str) -> PathBuf {
        self.workspace.join(format!("{}.json", key))
    }
}

impl Store for JsonFileStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.collection_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        Ok(Some(text))
    }

    fn save(&mut self, key: &str, payload: &str) -> anyhow::Result<()> {
        let path = self.collection_path(key);
        let tmp = self.workspace.join(format!("{}.json.saving", key));
        std::fs::write(&tmp, payload)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move {} into place", tmp.to_string_lossy()))?;
        Ok(())
    }
}

/// In-process store used by tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, payload: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), payload.to_string());
        Ok(())
    }
}
