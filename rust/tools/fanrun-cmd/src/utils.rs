//! Common utilities for fanrun-cmd

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::{fs, path::Path, time::Duration};

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

/// Reads a JSON document from `path` into `T`.
pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    validate_file_exists(path)?;
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {path}"))
}

/// Formats a duration as whole milliseconds, or seconds above one minute
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 60_000 {
        format!("{ms} ms")
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}
