//! Saved calculations, kept as one flat JSON collection on disk.
//!
//! Records are opaque to the engine: `input_params` and `results` are stored
//! as whatever JSON the caller handed over.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access calculation store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid calculation JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("import must contain either a `calculations` list or a single calculation with an `id`")]
    InvalidImport,
    #[error("calculation {0:?} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCalculation {
    pub id: String,
    pub name: String,
    pub timestamp: String,
    #[serde(default)]
    pub input_params: Value,
    #[serde(default)]
    pub results: Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    calculations: Vec<SavedCalculation>,
}

#[derive(Debug)]
pub struct CalculationStore {
    path: PathBuf,
    data: StoreFile,
}

impl CalculationStore {
    /// Loads the collection at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => StoreFile::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoreFile::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[SavedCalculation] {
        &self.data.calculations
    }

    pub fn get(&self, id: &str) -> Option<&SavedCalculation> {
        self.data.calculations.iter().find(|calc| calc.id == id)
    }

    pub fn save(
        &mut self,
        name: &str,
        input_params: Value,
        results: Value,
    ) -> Result<SavedCalculation, StoreError> {
        self.save_at(name, input_params, results, Utc::now())
    }

    fn save_at(
        &mut self,
        name: &str,
        input_params: Value,
        results: Value,
        now: DateTime<Utc>,
    ) -> Result<SavedCalculation, StoreError> {
        let calculation = SavedCalculation {
            id: self.unique_id(now),
            name: name.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            input_params,
            results,
        };
        self.data.calculations.push(calculation.clone());
        if let Err(e) = self.persist() {
            self.data.calculations.pop();
            return Err(e);
        }
        info!(id = %calculation.id, name = %calculation.name, "saved calculation");
        Ok(calculation)
    }

    fn unique_id(&self, now: DateTime<Utc>) -> String {
        let base = format!("calc_{}", now.timestamp_millis());
        if self.get(&base).is_none() {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<SavedCalculation, StoreError> {
        let Some(index) = self.data.calculations.iter().position(|calc| calc.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let removed = self.data.calculations.remove(index);
        if let Err(e) = self.persist() {
            self.data.calculations.insert(index, removed);
            return Err(e);
        }
        info!(id, "deleted calculation");
        Ok(removed)
    }

    /// Pretty JSON of one calculation, or of the whole collection when `id`
    /// is `None`.
    pub fn export(&self, id: Option<&str>) -> Result<String, StoreError> {
        let json = match id {
            Some(id) => {
                let calc = self
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                serde_json::to_string_pretty(calc)?
            }
            None => serde_json::to_string_pretty(&self.data)?,
        };
        Ok(json)
    }

    /// Merges an exported collection or single record. Ids already present
    /// are skipped. Returns how many records were added.
    pub fn import(&mut self, json: &str) -> Result<usize, StoreError> {
        let value: Value = serde_json::from_str(json)?;
        let incoming = if value.get("calculations").is_some() {
            serde_json::from_value::<StoreFile>(value)?.calculations
        } else if value.get("id").is_some() {
            vec![serde_json::from_value::<SavedCalculation>(value)?]
        } else {
            return Err(StoreError::InvalidImport);
        };

        let mut known: HashSet<String> =
            self.data.calculations.iter().map(|calc| calc.id.clone()).collect();
        let before = self.data.calculations.len();
        for calc in incoming {
            if known.insert(calc.id.clone()) {
                self.data.calculations.push(calc);
            }
        }

        let added = self.data.calculations.len() - before;
        if added > 0 {
            if let Err(e) = self.persist() {
                self.data.calculations.truncate(before);
                return Err(e);
            }
        }
        info!(added, "imported calculations");
        Ok(added)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let result = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(source) = result {
            error!(path = %self.path.display(), error = %source, "failed to write calculation store");
            return Err(io_err(source));
        }
        Ok(())
    }
}
