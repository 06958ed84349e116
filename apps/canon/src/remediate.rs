//! Remediation protocol: auto-fix results and the backup-write contract.
//!
//! Remediators are only invoked after a rule judged the file non-clean.
//! Writing is done by the caller:
//! 1. write the original content to `<file>.canon-bak`;
//! 2. overwrite the target with the new content;
//! 3. delete the backup only after the overwrite succeeded.
//!
//! A failed overwrite leaves the backup in place as the only recovery path.
//! A failed backup write leaves the target untouched and no backup behind.

use crate::error::CanonError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to a file name for its remediation backup.
pub const BACKUP_SUFFIX: &str = "canon-bak";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Outcome of one auto-fix attempt.
pub struct RemediationResult {
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    pub actions_taken: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RemediationResult {
    pub fn success(new_content: String, actions: Vec<String>) -> Self {
        Self {
            succeeded: true,
            new_content: Some(new_content),
            actions_taken: actions,
            ..Default::default()
        }
    }

    /// Successful no-op for content that needs no change.
    pub fn unchanged(content: &str, why: &str) -> Self {
        Self::success(content.to_string(), vec![format!("no changes needed: {}", why)])
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            failure_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// True when the fix produced content different from `original`.
    pub fn changes(&self, original: &str) -> bool {
        self.succeeded && self.new_content.as_deref().is_some_and(|c| c != original)
    }
}

/// Auto-fix capability of a rule.
pub trait Remediate {
    /// Fast, content-independent pre-check.
    fn can_remediate(&self, path: &Path) -> bool;

    /// Produce fixed content. Must report success with a no-op action on
    /// content that is already clean.
    fn remediate(&self, path: &Path, content: &str) -> RemediationResult;
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Stage at which the backup protocol stopped.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("backup write failed; target untouched: {0}")]
    Backup(#[source] CanonError),

    #[error("overwrite failed; original kept at {}: {source}", .backup.display())]
    Overwrite {
        backup: PathBuf,
        #[source]
        source: CanonError,
    },
}

impl WriteFailure {
    /// Backup left on disk for recovery, if one was written.
    pub fn backup(&self) -> Option<&Path> {
        match self {
            WriteFailure::Backup(_) => None,
            WriteFailure::Overwrite { backup, .. } => Some(backup),
        }
    }
}

/// Write `new_content` over `path` using the backup protocol.
///
/// Returns `Ok(None)` when the write completed and the backup was removed,
/// `Ok(Some(backup))` when only the cleanup failed.
pub fn write_with_backup(
    path: &Path,
    original: &str,
    new_content: &str,
) -> std::result::Result<Option<PathBuf>, WriteFailure> {
    let backup = backup_path(path);
    fs::write(&backup, original).map_err(|e| WriteFailure::Backup(CanonError::io(&backup, e)))?;
    if let Err(e) = fs::write(path, new_content) {
        log::warn!(
            "overwrite of {} failed; original kept at {}",
            path.display(),
            backup.display()
        );
        return Err(WriteFailure::Overwrite {
            backup,
            source: CanonError::io(path, e),
        });
    }
    match fs::remove_file(&backup) {
        Ok(()) => Ok(None),
        Err(e) => {
            log::warn!("could not remove backup {}: {}", backup.display(), e);
            Ok(Some(backup))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("src/a.vue")),
            PathBuf::from("src/a.vue.canon-bak")
        );
    }

    #[test]
    fn test_write_with_backup_removes_backup() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("a.txt");
        fs::write(&f, "old").unwrap();
        let left = write_with_backup(&f, "old", "new").unwrap();
        assert!(left.is_none());
        assert_eq!(fs::read_to_string(&f).unwrap(), "new");
        assert!(!backup_path(&f).exists());
    }

    #[test]
    fn test_failed_overwrite_keeps_backup() {
        let dir = tempdir().unwrap();
        // A directory cannot be overwritten as a file.
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let err = write_with_backup(&target, "original", "new").unwrap_err();
        assert!(matches!(err, WriteFailure::Overwrite { .. }));
        assert_eq!(err.backup(), Some(backup_path(&target).as_path()));
        assert_eq!(fs::read_to_string(backup_path(&target)).unwrap(), "original");
    }

    #[test]
    fn test_failed_backup_leaves_target_untouched() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("a.txt");
        fs::write(&f, "old").unwrap();
        fs::create_dir(backup_path(&f)).unwrap();
        let err = write_with_backup(&f, "old", "new").unwrap_err();
        assert!(matches!(err, WriteFailure::Backup(_)));
        assert!(err.backup().is_none());
        assert!(err.to_string().starts_with("backup write failed; target untouched"));
        assert_eq!(fs::read_to_string(&f).unwrap(), "old");
    }

    #[test]
    fn test_result_shapes() {
        let ok = RemediationResult::unchanged("x", "already clean");
        assert!(ok.succeeded);
        assert!(!ok.changes("x"));
        assert!(ok.actions_taken[0].contains("no changes needed"));
        let bad = RemediationResult::failure("parse error");
        assert!(!bad.succeeded);
        assert_eq!(bad.failure_reason.as_deref(), Some("parse error"));
    }
}
