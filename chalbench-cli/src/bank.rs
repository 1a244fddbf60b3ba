// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bank files: the definition-source format and its directory loader.

use chalbench_core::Definition;
use chalbench_runtime::{Registry, RegistryError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read bank file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse bank file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse bank file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The definition-source document: a versioned list of `Definition`s.
#[derive(Debug, Clone, Deserialize)]
pub struct BankFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub challenges: Vec<Definition>,
}

/// One accumulated validation failure. `index == -1` marks a file/top-level
/// issue rather than a specific challenge entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub index: i64,
}

impl ValidationError {
    fn top_level(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            index: -1,
        }
    }

    fn at(index: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            index: index as i64,
        }
    }
}

/// Runs the validator rules, in order, accumulating every failure rather
/// than stopping at the first: file readable -> parseable JSON -> `version`
/// non-empty -> every challenge has a non-empty `id` -> IDs unique within
/// the file -> every challenge has a non-empty `name`.
pub fn validate_bank_file(path: &Path) -> Vec<ValidationError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => return vec![ValidationError::top_level("file", format!("not readable: {e}"))],
    };

    let bank: BankFile = match serde_json::from_str(&raw) {
        Ok(bank) => bank,
        Err(e) => return vec![ValidationError::top_level("file", format!("not parseable JSON: {e}"))],
    };

    let mut errors = Vec::new();

    if bank.version.trim().is_empty() {
        errors.push(ValidationError::top_level("version", "must not be empty"));
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for (idx, challenge) in bank.challenges.iter().enumerate() {
        if challenge.id.trim().is_empty() {
            errors.push(ValidationError::at(idx, "id", "must not be empty"));
        } else if !seen_ids.insert(challenge.id.as_str()) {
            errors.push(ValidationError::at(
                idx,
                "id",
                format!("duplicate challenge id: {}", challenge.id),
            ));
        }

        if challenge.name.trim().is_empty() {
            errors.push(ValidationError::at(idx, "name", "must not be empty"));
        }
    }

    errors
}

/// Loads and deserializes one bank file, dispatching on extension
/// (`.json` via `serde_json`, `.yaml`/`.yml` via `serde_yaml`).
fn load_bank_file(path: &Path) -> Result<BankFile, BankError> {
    let raw = std::fs::read_to_string(path).map_err(|e| BankError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&raw).map_err(|e| BankError::ParseYaml {
                path: path.to_path_buf(),
                source: e,
            })
        }
        _ => serde_json::from_str(&raw).map_err(|e| BankError::ParseJson {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Non-recursive directory loader: every `.json`/`.yaml`/`.yml` file in
/// `dir` is loaded as a `BankFile` and its challenges registered as
/// `Definition`s. Duplicate IDs across files surface the registry's own
/// `AlreadyRegistered` error.
pub fn load_bank_directory(dir: &Path, registry: &Registry) -> Result<usize, BankError> {
    let mut registered = 0;
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| BankError::Read {
            path: dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("yaml") | Some("yml")
                )
        })
        .collect();
    entries.sort();

    for path in entries {
        let bank = load_bank_file(&path)?;
        for challenge in bank.challenges {
            registry.register_definition(challenge)?;
            registered += 1;
        }
    }

    Ok(registered)
}
