// Persistence helpers for small JSON state files (reminders, recap banner)
// Files are replaced atomically so a crash never leaves a half-written document.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

/// Load a JSON document, returning `T::default()` if the file is missing or empty
pub async fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    if contents.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    atomic_write(path, &contents).await
}

/// Atomically save data to a file using write-to-temp + rename
pub async fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid path: {}", path.display()))?;

    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    // Temp file in the same directory so the rename stays on one filesystem
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id()
    ));

    fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).await.with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
