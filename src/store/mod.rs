mod json_dir;
mod sqlite;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

pub use json_dir::JsonDirStore;
pub use sqlite::SqliteStore;

// Keys are record file stems (or row ids); every key that does not start with
// a parseable `section_NN` is ignored by the batch layer.
pub trait RecordStore {
    fn describe(&self) -> String;

    fn list_keys(&self) -> Result<Vec<String>>;

    // Stored text as-is, so callers can tell an unreadable record from one
    // that does not parse.
    fn read_raw(&self, key: &str) -> Result<Option<String>>;

    fn load(&self, key: &str) -> Result<Option<Value>> {
        self.read_raw(key)?
            .map(|raw| {
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse record {key} in {}", self.describe()))
            })
            .transpose()
    }

    fn save(&self, key: &str, value: &Value) -> Result<()>;

    fn manifest_dir(&self) -> PathBuf;
}
