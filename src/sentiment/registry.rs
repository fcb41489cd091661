// src/sentiment/registry.rs
//! Append-only model metrics log: one JSON array per model version.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Serializes read-modify-write cycles across every registry in the process.
static WRITE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub model_version: String,
    pub timestamp: DateTime<Utc>,
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub error_rate: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Many(Vec<MetricsSnapshot>),
    One(MetricsSnapshot),
}

#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    dir: PathBuf,
}

impl MetricsRegistry {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir); // best-effort
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, model_version: &str) -> PathBuf {
        self.dir.join(format!("{model_version}_metrics.json"))
    }

    /// Append one snapshot to its model version's log.
    pub fn append(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let _guard = match WRITE_LOCK.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating registry dir {}", self.dir.display()))?;
        let path = self.path_for(&snapshot.model_version);
        let mut entries = read_entries(&path)?;
        entries.push(snapshot.clone());

        let json = serde_json::to_string_pretty(&entries).context("encoding metrics log")?;
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    /// Read the full log for a model version (empty when nothing was written).
    pub fn load(&self, model_version: &str) -> Result<Vec<MetricsSnapshot>> {
        read_entries(&self.path_for(model_version))
    }
}

fn read_entries(path: &Path) -> Result<Vec<MetricsSnapshot>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stored: Stored =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(match stored {
        Stored::Many(v) => v,
        Stored::One(s) => vec![s],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(version: &str, requests: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            model_version: version.to_string(),
            timestamp: Utc::now(),
            request_count: requests,
            error_count: 0,
            avg_latency_ms: 0.25,
            error_rate: 0.0,
        }
    }

    #[test]
    fn append_creates_and_extends_array() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = MetricsRegistry::new(tmp.path().join("registry"));

        assert!(reg.load("v1").unwrap().is_empty());
        reg.append(&snap("v1", 1)).unwrap();
        reg.append(&snap("v1", 2)).unwrap();
        reg.append(&snap("v2", 9)).unwrap();

        let v1 = reg.load("v1").unwrap();
        assert_eq!(v1.len(), 2);
        assert_eq!(v1[1].request_count, 2);
        assert_eq!(reg.load("v2").unwrap().len(), 1);
        assert!(reg.path_for("v1").ends_with("v1_metrics.json"));
    }

    #[test]
    fn single_object_log_is_promoted_to_array() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = MetricsRegistry::new(tmp.path());
        let legacy = serde_json::to_string(&snap("v1", 3)).unwrap();
        fs::write(reg.path_for("v1"), legacy).unwrap();

        reg.append(&snap("v1", 4)).unwrap();
        let all = reg.load("v1").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].request_count, 3);
    }

    #[test]
    fn corrupt_log_is_an_error_and_left_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = MetricsRegistry::new(tmp.path());
        fs::write(reg.path_for("v1"), "garbage").unwrap();
        assert!(reg.append(&snap("v1", 1)).is_err());
        assert_eq!(fs::read_to_string(reg.path_for("v1")).unwrap(), "garbage");
    }
}
