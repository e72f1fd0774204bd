//! Flat-file run state: sorted line sets and small JSON maps.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Error, Result};

pub fn load_lines(path: &Path) -> BTreeSet<String> {
    match fs::read_to_string(path) {
        Ok(data) => data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

pub fn save_lines(path: &Path, lines: &BTreeSet<String>) -> Result<()> {
    let data = lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
    write(path, data)
}

/// Missing file gives the default; a corrupt one is reported and ignored.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let Ok(data) = fs::read_to_string(path) else {
        return T::default();
    };
    match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file is corrupt or empty, ignoring it");
            T::default()
        }
    }
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    write(path, data)
}

fn write(path: &Path, data: String) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
