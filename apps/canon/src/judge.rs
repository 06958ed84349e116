//! Scan & judge orchestrator.
//!
//! Turns a group's configuration into candidate files, applies every
//! applicable rule in registration order, and aggregates verdicts.
//! Also drives the remediation command path for non-clean files.
//!
//! Per-file failures never abort a batch: unreadable files are skipped and
//! files with no applicable rules are omitted from the results.

use crate::error::{CanonError, Result};
use crate::models::{Summary, Verdict};
use crate::registry::Registry;
use crate::remediate::{self, RemediationResult};
use crate::rule::Rule;
use crate::scan;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Verdicts for one file keyed by rule id.
pub type FileVerdicts = BTreeMap<String, Verdict>;
/// Verdicts for a batch keyed by file path.
pub type Judgments = BTreeMap<PathBuf, FileVerdicts>;

#[derive(Debug, Clone, Serialize)]
/// One remediation attempt on a file.
pub struct FixOutcome {
    pub rule_id: String,
    pub result: RemediationResult,
}

pub struct Judge<'r> {
    registry: &'r Registry,
    root: PathBuf,
}

impl<'r> Judge<'r> {
    pub fn new(registry: &'r Registry, root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            root: root.into(),
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Judge every candidate file of `group`.
    pub fn judge_group(&self, group: &str) -> Result<Judgments> {
        let g = self
            .registry
            .group(group)
            .ok_or_else(|| CanonError::UnknownGroup(group.to_string()))?;
        let rules = self.registry.get_rules(group)?;
        let mut out = Judgments::new();
        if rules.is_empty() {
            log::debug!("group '{}' has no active rules", group);
            return Ok(out);
        }
        let s = &g.settings;
        for path in scan::scan(&self.root, &s.bases, &s.extensions, &s.exclude) {
            if let Some(v) = judge_with(&rules, &path) {
                out.insert(path, v);
            }
        }
        log::info!("group '{}': {} file(s) with applicable rules", group, out.len());
        Ok(out)
    }

    /// Judge explicitly requested files against `group`'s rules.
    pub fn judge_files(&self, group: &str, paths: &[PathBuf]) -> Result<Judgments> {
        let rules = self.registry.get_rules(group)?;
        let mut out = Judgments::new();
        for p in paths {
            let path = self.resolve(p)?;
            if let Some(v) = judge_with(&rules, &path) {
                out.insert(path, v);
            }
        }
        Ok(out)
    }

    /// Judge a single file; `None` when no rule applies or it is unreadable.
    pub fn judge_file(&self, group: &str, path: &Path) -> Result<Option<FileVerdicts>> {
        let rules = self.registry.get_rules(group)?;
        let path = self.resolve(path)?;
        Ok(judge_with(&rules, &path))
    }

    fn resolve(&self, p: &Path) -> Result<PathBuf> {
        let path = if p.is_absolute() || p.exists() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        };
        if path.exists() {
            Ok(path)
        } else {
            Err(CanonError::UnknownFile(p.to_path_buf()))
        }
    }

    /// Run remediable rules against a non-clean file and write the result
    /// with the backup protocol unless `dry_run`.
    ///
    /// Fixes are chained: each remediator sees the previous one's output.
    pub fn remediate_file(&self, group: &str, path: &Path, dry_run: bool) -> Result<Vec<FixOutcome>> {
        let rules = self.registry.get_rules(group)?;
        let path = self.resolve(path)?;
        let original = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("skipping unreadable file {}: {}", path.display(), e);
                return Ok(Vec::new());
            }
        };
        let mut current = original.clone();
        let mut outcomes = Vec::new();
        for rule in rules.iter().filter(|r| r.applies_to(&path)) {
            let Some(fixer) = rule.remediator() else { continue };
            if !fixer.can_remediate(&path) {
                continue;
            }
            if rule.judge(&path, &current).is_clean() {
                continue;
            }
            let result = fixer.remediate(&path, &current);
            if result.changes(&current) {
                if let Some(next) = result.new_content.clone() {
                    current = next;
                }
            }
            outcomes.push(FixOutcome {
                rule_id: rule.id().to_string(),
                result,
            });
        }

        if dry_run || current == original {
            return Ok(outcomes);
        }
        match remediate::write_with_backup(&path, &original, &current) {
            Ok(leftover) => {
                for o in outcomes.iter_mut().filter(|o| o.result.succeeded) {
                    o.result.backup_path = leftover.clone();
                }
            }
            Err(e) => {
                let backup = e.backup().map(Path::to_path_buf);
                for o in outcomes.iter_mut().filter(|o| o.result.succeeded) {
                    o.result.succeeded = false;
                    o.result.failure_reason = Some(e.to_string());
                    o.result.backup_path = backup.clone();
                }
            }
        }
        Ok(outcomes)
    }

    /// Remediate every non-clean file of `group`.
    pub fn remediate_group(&self, group: &str, dry_run: bool) -> Result<BTreeMap<PathBuf, Vec<FixOutcome>>> {
        let judged = self.judge_group(group)?;
        self.remediate_judged(group, &judged, dry_run)
    }

    /// Remediate the non-clean files of an existing judgment.
    pub fn remediate_judged(
        &self,
        group: &str,
        judged: &Judgments,
        dry_run: bool,
    ) -> Result<BTreeMap<PathBuf, Vec<FixOutcome>>> {
        let mut out = BTreeMap::new();
        for (path, verdicts) in judged {
            if verdicts.values().all(Verdict::is_clean) {
                continue;
            }
            let outcomes = self.remediate_file(group, path, dry_run)?;
            if !outcomes.is_empty() {
                out.insert(path.clone(), outcomes);
            }
        }
        Ok(out)
    }
}

/// Apply applicable `rules` to the file at `path`.
fn judge_with(rules: &[Box<dyn Rule>], path: &Path) -> Option<FileVerdicts> {
    let applicable: Vec<&Box<dyn Rule>> = rules.iter().filter(|r| r.applies_to(path)).collect();
    if applicable.is_empty() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("skipping unreadable file {}: {}", path.display(), e);
            return None;
        }
    };
    let mut verdicts = FileVerdicts::new();
    for rule in applicable {
        verdicts.insert(rule.id().to_string(), rule.judge(path, &content));
    }
    Some(verdicts)
}

/// Count examined, clean and flagged files plus finding totals.
pub fn summarize(results: &Judgments) -> Summary {
    let mut s = Summary::default();
    for verdicts in results.values() {
        s.files_examined += 1;
        if verdicts.values().all(Verdict::is_clean) {
            s.clean += 1;
        } else {
            s.flagged += 1;
        }
        for v in verdicts.values() {
            s.violations += v.violations.len();
            s.advisories += v.advisories.len();
            if v.skipped {
                s.skipped += 1;
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Violation;
    use crate::pattern::PatternSet;
    use crate::pipeline::Context;
    use crate::registry::GroupSettings;
    use crate::remediate::Remediate;
    use crate::rule::RuleRef;
    use tempfile::tempdir;

    struct FlagTodo;

    impl Rule for FlagTodo {
        fn id(&self) -> &str {
            "flag-todo"
        }
        fn file_types(&self) -> Vec<String> {
            vec!["txt".into()]
        }
        fn excluded_paths(&self) -> Vec<String> {
            vec!["skipme".into()]
        }
        fn judge(&self, path: &Path, content: &str) -> Verdict {
            let set = PatternSet::new().literal("todo", "TODO");
            Context::new(path, content)
                .match_file(&set)
                .finish(|c| c.violations_from_matches(|_| "TODO found".into()))
        }
        fn remediator(&self) -> Option<&dyn Remediate> {
            Some(self)
        }
    }

    impl Remediate for FlagTodo {
        fn can_remediate(&self, _path: &Path) -> bool {
            true
        }
        fn remediate(&self, _path: &Path, content: &str) -> RemediationResult {
            if !content.contains("TODO") {
                return RemediationResult::unchanged(content, "no TODO markers");
            }
            RemediationResult::success(content.replace("TODO", "DONE"), vec!["replaced TODO".into()])
        }
    }

    fn todo_ref() -> RuleRef {
        RuleRef::new("flag-todo", &["txt"], "", || Box::new(FlagTodo))
    }

    fn registry_for(root: &Path) -> Registry {
        let mut reg = Registry::default();
        reg.set_group_config(
            "docs",
            GroupSettings {
                bases: vec![root.to_string_lossy().to_string()],
                ..Default::default()
            },
        );
        reg
    }

    #[test]
    fn test_empty_group_returns_empty_map() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "TODO").unwrap();
        }
        let reg = registry_for(dir.path());
        let judge = Judge::new(&reg, dir.path());
        assert!(judge.judge_group("docs").unwrap().is_empty());
    }

    #[test]
    fn test_todo_on_line_seven() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("notes.txt");
        fs::write(&f, "1\n2\n3\n4\n5\n6\nfix this TODO\n8\n").unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let res = judge.judge_group("docs").unwrap();
        let v = &res[&f]["flag-todo"];
        assert_eq!(v.violations.len(), 1);
        assert_eq!(v.violations[0].line, Some(7));
    }

    #[test]
    fn test_files_without_applicable_rules_are_omitted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "TODO").unwrap();
        fs::create_dir(dir.path().join("skipme")).unwrap();
        fs::write(dir.path().join("skipme/b.txt"), "TODO").unwrap();
        fs::write(dir.path().join("c.txt"), "clean").unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let res = judge.judge_group("docs").unwrap();
        assert_eq!(res.len(), 1);
        let s = summarize(&res);
        assert_eq!(s.files_examined, 1);
        assert_eq!(s.clean, 1);
        assert_eq!(s.flagged, 0);
    }

    #[test]
    fn test_unreadable_file_does_not_abort() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
        fs::write(dir.path().join("good.txt"), "TODO").unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let res = judge.judge_group("docs").unwrap();
        assert_eq!(res.len(), 1);
        assert!(res.contains_key(&dir.path().join("good.txt")));
        assert_eq!(summarize(&res).flagged, 1);
    }

    #[test]
    fn test_explicit_unknown_file_is_error() {
        let dir = tempdir().unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let err = judge
            .judge_files("docs", &[PathBuf::from("missing.txt")])
            .unwrap_err();
        assert!(matches!(err, CanonError::UnknownFile(_)));
        assert!(matches!(
            judge.judge_group("nope"),
            Err(CanonError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_remediate_only_non_clean_and_writes() {
        let dir = tempdir().unwrap();
        let dirty = dir.path().join("dirty.txt");
        let clean = dir.path().join("clean.txt");
        fs::write(&dirty, "a TODO here").unwrap();
        fs::write(&clean, "nothing").unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());

        let preview = judge.remediate_group("docs", true).unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(fs::read_to_string(&dirty).unwrap(), "a TODO here");

        let done = judge.remediate_group("docs", false).unwrap();
        let outcomes = &done[&dirty];
        assert!(outcomes[0].result.succeeded);
        assert_eq!(fs::read_to_string(&dirty).unwrap(), "a DONE here");
        assert!(!remediate::backup_path(&dirty).exists());
        assert!(!done.contains_key(&clean));
        assert!(judge.remediate_group("docs", false).unwrap().is_empty());
    }

    #[test]
    fn test_failed_backup_reports_no_recovery_path() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("a.txt");
        fs::write(&f, "a TODO here").unwrap();
        fs::create_dir(remediate::backup_path(&f)).unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let outcomes = judge.remediate_file("docs", &f, false).unwrap();
        let r = &outcomes[0].result;
        assert!(!r.succeeded);
        assert!(r.backup_path.is_none());
        assert!(r
            .failure_reason
            .as_deref()
            .unwrap()
            .starts_with("backup write failed; target untouched"));
        assert_eq!(fs::read_to_string(&f).unwrap(), "a TODO here");
    }

    #[test]
    fn test_failed_overwrite_names_existing_backup() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("a.txt");
        fs::write(&f, "a TODO here").unwrap();
        let mut perms = fs::metadata(&f).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&f, perms).unwrap();
        // Privileged users can write read-only files; nothing to observe then.
        if fs::OpenOptions::new().write(true).open(&f).is_ok() {
            return;
        }
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());
        let outcomes = judge.remediate_file("docs", &f, false).unwrap();
        let r = &outcomes[0].result;
        assert!(!r.succeeded);
        let backup = r.backup_path.as_ref().unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "a TODO here");
    }

    #[test]
    fn test_judge_file_single_entry_point() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "ok
TODO later
").unwrap();
        fs::write(dir.path().join("readme.md"), "TODO").unwrap();
        let mut reg = registry_for(dir.path());
        reg.register("docs", todo_ref(), None);
        let judge = Judge::new(&reg, dir.path());

        let verdicts = judge
            .judge_file("docs", Path::new("notes.txt"))
            .unwrap()
            .unwrap();
        assert_eq!(verdicts["flag-todo"].violations[0].line, Some(2));
        assert!(judge
            .judge_file("docs", &dir.path().join("readme.md"))
            .unwrap()
            .is_none());
        assert!(matches!(
            judge.judge_file("docs", Path::new("gone.txt")),
            Err(CanonError::UnknownFile(_))
        ));
    }

    #[test]
    fn test_summary_counts() {
        let mut res = Judgments::new();
        let mut a = FileVerdicts::new();
        a.insert("r".into(), Verdict::violation(Violation::new("x")));
        a.insert("s".into(), Verdict::skipped("why"));
        res.insert(PathBuf::from("a"), a);
        let mut b = FileVerdicts::new();
        b.insert("r".into(), Verdict::clean());
        res.insert(PathBuf::from("b"), b);
        let s = summarize(&res);
        assert_eq!((s.files_examined, s.clean, s.flagged), (2, 1, 1));
        assert_eq!((s.violations, s.skipped), (1, 1));
    }
}
