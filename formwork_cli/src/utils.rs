// SPDX-License-Identifier: AGPL-3.0-or-later

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use formwork::{MetadataBundle, Row};
use path_clean::PathClean;

/// Returns the absolute, normalized path of a file or directory.
pub fn absolute_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
    .clean()
}

/// Reads a metadata bundle from a JSON file.
pub fn read_bundle(path: &Path) -> Result<MetadataBundle> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Could not read metadata file '{}'", path.display()))?;
    let bundle = serde_json::from_str(&json)
        .with_context(|| format!("Invalid metadata in '{}'", path.display()))?;
    Ok(bundle)
}

/// Reads a single result row from a JSON object file.
pub fn read_record(path: &Path) -> Result<Row> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Could not read record file '{}'", path.display()))?;
    let row = serde_json::from_str(&json)
        .with_context(|| format!("Invalid record in '{}'", path.display()))?;
    Ok(row)
}

/// Splits a "Column=value" argument at its first equals sign.
pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    match assignment.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => bail!(
            "Invalid field edit '{}', expected the form \"Column=value\"",
            assignment
        ),
    }
}

/// Turns a log level or a full filter directive into an `env_logger` filter.
pub fn log_filter(log_level: &str) -> String {
    if log_level.contains('=') {
        log_level.to_string()
    } else {
        format!("formwork={log_level},formwork_cli={log_level}")
    }
}
