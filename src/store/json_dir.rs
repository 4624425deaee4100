use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::util::write_json_atomic;

use super::RecordStore;

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("record directory does not exist: {}", root.display());
        }
        Ok(Self { root })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl RecordStore for JsonDirStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list records in {}", self.root.display()))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", self.root.display()))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) if stem.starts_with("section_") => keys.push(stem.to_string()),
                _ => {}
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("failed to read record {}", path.display()))
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        write_json_atomic(&self.record_path(key), value)
    }

    fn manifest_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }
}
