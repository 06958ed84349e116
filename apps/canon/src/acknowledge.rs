//! Acknowledgment tracker: persisted manual sign-off on review-worthy findings.
//!
//! # Store format
//!
//! ```json
//! {
//!   "src/components/Card.vue": {
//!     "script-typed": {
//!       "acknowledgedAt": "2026-01-15T10:30:00+00:00",
//!       "reason": "legacy component, migration scheduled",
//!       "contentHash": "9f86d081884c7d65..."
//!     }
//!   }
//! }
//! ```
//!
//! Paths are stored relative to the base directory. The store is loaded on
//! first access and rewritten in full on every mutation. There is no
//! locking: concurrent processes against one store are last-writer-wins.
//!
//! A record only says a finding was reviewed. Whether the file changed since
//! is a separate question answered by [`AckStore::has_drifted`].

use crate::error::{CanonError, Result};
use crate::judge::Judgments;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRecord {
    /// ISO-8601 timestamp.
    pub acknowledged_at: String,
    pub reason: Option<String>,
    /// Hex SHA-256 of the file content at acknowledgment time.
    pub content_hash: String,
}

type Document = BTreeMap<String, BTreeMap<String, AckRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Missing,
    Fresh,
    Drifted,
}

/// Hex SHA-256 digest of `content`.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn absolutize(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        Err(_) => p.to_path_buf(),
    }
}

fn normalize(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub struct AckStore {
    path: PathBuf,
    base: PathBuf,
    records: Option<Document>,
}

impl AckStore {
    /// A store persisted at `path` whose keys are relative to `base`.
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: normalize(&absolutize(&base.into())),
            records: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<&mut Document> {
        if self.records.is_none() {
            let doc = match fs::read_to_string(&self.path) {
                Ok(s) if s.trim().is_empty() => Document::new(),
                Ok(s) => serde_json::from_str(&s).map_err(|e| CanonError::Store {
                    path: self.path.clone(),
                    message: e.to_string(),
                })?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
                Err(e) => return Err(CanonError::io(&self.path, e)),
            };
            log::debug!("loaded {} acknowledged file(s) from {}", doc.len(), self.path.display());
            self.records = Some(doc);
        }
        Ok(self.records.get_or_insert_with(Document::new))
    }

    fn flush(&self) -> Result<()> {
        let empty = Document::new();
        let doc = self.records.as_ref().unwrap_or(&empty);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CanonError::io(parent, e))?;
            }
        }
        let text = serde_json::to_string_pretty(doc).map_err(|e| CanonError::Store {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, text).map_err(|e| CanonError::io(&self.path, e))?;
        log::debug!("flushed acknowledgment store {}", self.path.display());
        Ok(())
    }

    /// Store key for `path`: relative to the base, forward slashes.
    pub fn key(&self, path: &Path) -> String {
        let abs = normalize(&absolutize(path));
        let rel = pathdiff::diff_paths(&abs, &self.base).unwrap_or(abs);
        rel.to_string_lossy().replace('\\', "/")
    }

    /// Acknowledge `rule_id` on the file at `path`, hashing its current content.
    pub fn acknowledge(&mut self, path: &Path, rule_id: &str, reason: Option<&str>) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| CanonError::io(path, e))?;
        self.acknowledge_content(path, rule_id, reason, &content)
    }

    /// Acknowledge against explicitly supplied content.
    pub fn acknowledge_content(
        &mut self,
        path: &Path,
        rule_id: &str,
        reason: Option<&str>,
        content: &str,
    ) -> Result<()> {
        let key = self.key(path);
        let record = AckRecord {
            acknowledged_at: chrono::Utc::now().to_rfc3339(),
            reason: reason.map(str::to_string),
            content_hash: content_hash(content),
        };
        self.load()?
            .entry(key)
            .or_default()
            .insert(rule_id.to_string(), record);
        self.flush()
    }

    /// Presence check only; does not look at drift.
    pub fn is_acknowledged(&mut self, path: &Path, rule_id: &str) -> Result<bool> {
        Ok(self.record(path, rule_id)?.is_some())
    }

    /// True when no record exists or the stored hash differs from `current`.
    pub fn has_drifted(&mut self, path: &Path, rule_id: &str, current: &str) -> Result<bool> {
        Ok(match self.record(path, rule_id)? {
            Some(r) => r.content_hash != content_hash(current),
            None => true,
        })
    }

    pub fn status(&mut self, path: &Path, rule_id: &str, current: &str) -> Result<AckStatus> {
        Ok(match self.record(path, rule_id)? {
            None => AckStatus::Missing,
            Some(r) if r.content_hash == content_hash(current) => AckStatus::Fresh,
            Some(_) => AckStatus::Drifted,
        })
    }

    pub fn record(&mut self, path: &Path, rule_id: &str) -> Result<Option<AckRecord>> {
        let key = self.key(path);
        Ok(self
            .load()?
            .get(&key)
            .and_then(|rules| rules.get(rule_id))
            .cloned())
    }

    /// Remove one record. Returns whether anything was removed.
    pub fn revoke(&mut self, path: &Path, rule_id: &str) -> Result<bool> {
        let key = self.key(path);
        let doc = self.load()?;
        let (removed, now_empty) = match doc.get_mut(&key) {
            Some(rules) => (rules.remove(rule_id).is_some(), rules.is_empty()),
            None => (false, false),
        };
        if now_empty {
            doc.remove(&key);
        }
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    /// Drop entries for files that no longer exist. Returns the number of
    /// file entries removed.
    pub fn cleanup(&mut self) -> Result<usize> {
        let base = self.base.clone();
        let doc = self.load()?;
        let before = doc.len();
        doc.retain(|rel, _| base.join(rel).exists());
        let removed = before - doc.len();
        if removed > 0 {
            log::info!("dropped {} acknowledgment entries for missing files", removed);
            self.flush()?;
        }
        Ok(removed)
    }

    /// All records as `(relative path, rule id, record)`.
    pub fn entries(&mut self) -> Result<Vec<(String, String, AckRecord)>> {
        Ok(self
            .load()?
            .iter()
            .flat_map(|(p, rules)| {
                rules
                    .iter()
                    .map(move |(r, rec)| (p.clone(), r.clone(), rec.clone()))
            })
            .collect())
    }
}

/// Remove advisories of acknowledged, non-drifted (file, rule) pairs from
/// `results`. Returns the number of advisories suppressed.
pub fn suppress_acknowledged(store: &mut AckStore, results: &mut Judgments) -> Result<usize> {
    let mut suppressed = 0;
    for (path, verdicts) in results.iter_mut() {
        if !verdicts.values().any(|v| v.has_advisories()) {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };
        for (rule_id, verdict) in verdicts.iter_mut() {
            if !verdict.has_advisories() {
                continue;
            }
            if store.is_acknowledged(path, rule_id)? && !store.has_drifted(path, rule_id, &content)? {
                suppressed += verdict.advisories.len();
                verdict.advisories.clear();
            }
        }
    }
    Ok(suppressed)
}
