use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

// 4-space indentation with a trailing newline, the on-disk record format.
pub fn to_pretty_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut data, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("failed to serialize json")?;
    data.push(b'\n');
    Ok(data)
}

pub fn sha256_json<T: Serialize>(value: &T) -> Result<String> {
    let data = serde_json::to_vec(value).context("failed to serialize json for hashing")?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

// Writes next to the destination and renames over it, so readers never see a
// partially written file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = to_pretty_json_bytes(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    let tmp_path = temp_path_for(path);

    let mut file = File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write temp file: {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to flush temp file: {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            tmp_path.display(),
            path.display()
        )
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// Flag raised on Ctrl-C. The listener runs on its own thread with a
// single-threaded runtime; the batch loop polls the flag between records.
pub fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let listener_flag = Arc::clone(&flag);

    let spawned = thread::Builder::new()
        .name("interrupt-listener".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "failed to start interrupt listener runtime");
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        warn!("interrupt received; stopping after the current record");
                        listener_flag.store(true, Ordering::SeqCst);
                    }
                    Err(err) => warn!(error = %err, "failed to listen for interrupt"),
                }
            });
        });

    if let Err(err) = spawned {
        warn!(error = %err, "failed to spawn interrupt listener");
    } else {
        debug!("interrupt listener installed");
    }

    flag
}
