//! Output rendering for judge, fix, ack, rules and sync commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-item fields and a top-level summary.

use crate::acknowledge::{AckRecord, AckStatus};
use crate::judge::{FixOutcome, Judgments};
use crate::models::Summary;
use crate::sync::SyncReport;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordinal listing of one group: `(ordinal, id, description)` rows.
pub type RuleListing = Vec<(String, Vec<(usize, String, String)>)>;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn tag(label: &str, color: bool, paint: fn(&str) -> String) -> String {
    let text = format!("⟦{}⟧", label);
    if color {
        paint(&text)
    } else {
        text
    }
}

pub fn error_prefix() -> String {
    tag("error", use_colors("human"), |s| s.red().bold().to_string())
}

pub fn note_prefix() -> String {
    tag("note", use_colors("human"), |s| s.blue().bold().to_string())
}

/// Path relative to `root` for display, falling back to the path itself.
pub fn display_path(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}

fn print_json(value: &JsonVal) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print judged verdicts in the requested format.
pub fn print_judgments(results: &Judgments, summary: &Summary, root: &Path, output: &str) {
    if output == "json" {
        print_json(&compose_judgments_json(results, summary, root));
        return;
    }
    let color = use_colors(output);
    for (path, verdicts) in results {
        let file = display_path(root, path);
        for (rule, v) in verdicts {
            if let Some(reason) = &v.skip_reason {
                let sev = tag("skip", color, |s| s.bright_black().to_string());
                println!("◇ {} {} ❲{}❳ — {}", sev, file, rule, reason);
            }
            for x in &v.violations {
                let sev = tag("error", color, |s| s.red().bold().to_string());
                let icon = if color { "✖".red().to_string() } else { "✖".to_string() };
                let at = match x.line {
                    Some(l) => format!("{}:{}", file, l),
                    None => file.clone(),
                };
                let at = if color { at.bold().to_string() } else { at };
                println!("{} {} {} ❲{}❳ — {}", icon, sev, at, rule, x.message);
                if let Some(snip) = x.snippet.as_deref().filter(|s| !s.is_empty()) {
                    println!("      {}", snip);
                }
                if let Some(fix) = &x.suggested_fix {
                    println!("      fix: {}", fix);
                }
            }
            for a in &v.advisories {
                let sev = tag("warn", color, |s| s.yellow().bold().to_string());
                let icon = if color { "▲".yellow().to_string() } else { "▲".to_string() };
                let at = match a.line {
                    Some(l) => format!("{}:{}", file, l),
                    None => file.clone(),
                };
                println!("{} {} {} ❲{}❳ — {}", icon, sev, at, rule, a.message);
            }
        }
    }
    let line = format!(
        "— Summary — files={} clean={} flagged={} violations={} advisories={} skipped={}",
        summary.files_examined,
        summary.clean,
        summary.flagged,
        summary.violations,
        summary.advisories,
        summary.skipped
    );
    if color {
        println!("{}", line.bold());
    } else {
        println!("{}", line);
    }
}

/// Compose judgments JSON object (pure) for testing/snapshot purposes.
pub fn compose_judgments_json(results: &Judgments, summary: &Summary, root: &Path) -> JsonVal {
    let files: serde_json::Map<String, JsonVal> = results
        .iter()
        .map(|(path, verdicts)| {
            (
                display_path(root, path),
                serde_json::to_value(verdicts).unwrap_or(JsonVal::Null),
            )
        })
        .collect();
    json!({"results": files, "summary": summary})
}

/// Print remediation outcomes per file.
pub fn print_fixes(
    fixes: &BTreeMap<PathBuf, Vec<FixOutcome>>,
    root: &Path,
    output: &str,
    dry_run: bool,
) {
    if output == "json" {
        print_json(&compose_fixes_json(fixes, root, dry_run));
        return;
    }
    let color = use_colors(output);
    for (path, outcomes) in fixes {
        let file = display_path(root, path);
        for o in outcomes {
            if o.result.succeeded {
                let label = if dry_run { "would fix:" } else { "fixed:" };
                let label = if color { label.green().bold().to_string() } else { label.to_string() };
                println!("{} {} ❲{}❳ {}", label, file, o.rule_id, o.result.actions_taken.join("; "));
            } else {
                let label = if color { "failed:".red().bold().to_string() } else { "failed:".to_string() };
                let reason = o.result.failure_reason.as_deref().unwrap_or("unknown");
                println!("{} {} ❲{}❳ {}", label, file, o.rule_id, reason);
            }
            if let Some(b) = &o.result.backup_path {
                println!("      backup kept at {}", display_path(root, b));
            }
        }
    }
    if fixes.is_empty() {
        println!("nothing to fix");
    }
}

/// Compose fix JSON object (pure) for testing/snapshot purposes.
pub fn compose_fixes_json(fixes: &BTreeMap<PathBuf, Vec<FixOutcome>>, root: &Path, dry_run: bool) -> JsonVal {
    let items: Vec<_> = fixes
        .iter()
        .flat_map(|(path, outcomes)| {
            let file = display_path(root, path);
            outcomes.iter().map(move |o| {
                json!({
                    "file": file,
                    "rule": o.rule_id,
                    "succeeded": o.result.succeeded,
                    "actions": o.result.actions_taken,
                    "failure": o.result.failure_reason,
                    "backup": o.result.backup_path.as_ref().map(|b| display_path(root, b)),
                })
            })
        })
        .collect();
    let all = fixes.values().flatten();
    let summary = json!({
        "files": fixes.len(),
        "succeeded": all.clone().filter(|o| o.result.succeeded).count(),
        "failed": all.filter(|o| !o.result.succeeded).count(),
        "dry_run": dry_run,
    });
    json!({"results": items, "summary": summary})
}

/// Print ordinal rule listings per group.
pub fn print_rules(listing: &RuleListing, output: &str) {
    if output == "json" {
        let groups: serde_json::Map<String, JsonVal> = listing
            .iter()
            .map(|(g, rows)| {
                let rows: Vec<_> = rows
                    .iter()
                    .map(|(n, id, desc)| json!({"ordinal": n, "id": id, "description": desc}))
                    .collect();
                (g.clone(), JsonVal::Array(rows))
            })
            .collect();
        print_json(&JsonVal::Object(groups));
        return;
    }
    let color = use_colors(output);
    for (group, rows) in listing {
        if color {
            println!("{}", format!("[{}]", group).bold());
        } else {
            println!("[{}]", group);
        }
        for (n, id, desc) in rows {
            println!("  {:>2}. {:<24} {}", n, id, desc);
        }
    }
}

/// Print the acknowledgment status of one (file, rule) pair.
pub fn print_ack_status(file: &str, rule: &str, status: AckStatus, record: Option<&AckRecord>, output: &str) {
    if output == "json" {
        print_json(&json!({
            "file": file,
            "rule": rule,
            "status": status,
            "record": record,
        }));
        return;
    }
    let color = use_colors(output);
    let label = match status {
        AckStatus::Missing => "not acknowledged".to_string(),
        AckStatus::Fresh if color => "acknowledged".green().to_string(),
        AckStatus::Fresh => "acknowledged".to_string(),
        AckStatus::Drifted if color => "acknowledged, content drifted".yellow().to_string(),
        AckStatus::Drifted => "acknowledged, content drifted".to_string(),
    };
    println!("{} ❲{}❳ {}", file, rule, label);
    if let Some(r) = record {
        println!("      at {}", r.acknowledged_at);
        if let Some(reason) = &r.reason {
            println!("      reason: {}", reason);
        }
    }
}

/// Print the outcome of an `ack add|revoke|cleanup` mutation.
pub fn print_ack_change(action: &str, subject: &str, changed: usize, output: &str) {
    if output == "json" {
        print_json(&json!({"action": action, "subject": subject, "changed": changed}));
        return;
    }
    let color = use_colors(output);
    let label = format!("{}:", action);
    let label = if color && changed > 0 {
        label.green().bold().to_string()
    } else {
        label
    };
    if changed > 0 {
        println!("{} {}", label, subject);
    } else {
        println!("{} nothing to do for {}", label, subject);
    }
}

/// Print sync actions summarizing additions and writes.
pub fn print_sync(report: &SyncReport, root: &Path, output: &str) {
    if output == "json" {
        print_json(&compose_sync_json(report, root));
        return;
    }
    let color = use_colors(output);
    let doc = display_path(root, &report.config_path);
    for a in &report.actions {
        let label = if report.wrote { "📥 added:" } else { "would add:" };
        let label = if color { label.green().bold().to_string() } else { label.to_string() };
        println!("{} [groups.{}] {} ({})", label, a.group, a.added.join(", "), doc);
    }
    for g in &report.unpatchable {
        let label = if color { "⏭️  skipped:".yellow().bold().to_string() } else { "⏭️  skipped:".to_string() };
        println!("{} [groups.{}] has no editable rules array", label, g);
    }
    if report.actions.is_empty() {
        println!("{} is up to date", doc);
    }
}

/// Compose sync JSON object (pure) for testing/snapshot purposes.
pub fn compose_sync_json(report: &SyncReport, root: &Path) -> JsonVal {
    let items: Vec<_> = report
        .actions
        .iter()
        .map(|a| json!({"group": a.group, "added": a.added}))
        .collect();
    json!({
        "config": display_path(root, &report.config_path),
        "results": items,
        "unpatchable": report.unpatchable,
        "summary": {
            "added": report.added_count(),
            "would_write": report.would_write,
            "wrote": report.wrote,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::FileVerdicts;
    use crate::models::{Advisory, Verdict, Violation};
    use crate::remediate::RemediationResult;
    use crate::sync::SyncAction;

    #[test]
    fn test_compose_judgments_json_shape() {
        let root = Path::new("/repo");
        let mut verdicts = FileVerdicts::new();
        verdicts.insert("no-todo".into(), Verdict::violation(Violation::new("TODO marker left in file").at_line(7)));
        verdicts.insert("script-typed".into(), Verdict::advisory(Advisory::new("untyped")));
        let mut results = Judgments::new();
        results.insert(PathBuf::from("/repo/src/a.vue"), verdicts);
        let summary = crate::judge::summarize(&results);
        let out = compose_judgments_json(&results, &summary, root);
        assert_eq!(out["summary"]["flagged"], 1);
        assert_eq!(out["summary"]["advisories"], 1);
        assert_eq!(out["results"]["src/a.vue"]["no-todo"]["violations"][0]["line"], 7);
    }

    #[test]
    fn test_compose_fixes_json_counts() {
        let mut fixes = BTreeMap::new();
        fixes.insert(
            PathBuf::from("/repo/a.txt"),
            vec![
                FixOutcome {
                    rule_id: "trailing-whitespace".into(),
                    result: RemediationResult::success("x".into(), vec!["stripped".into()]),
                },
                FixOutcome {
                    rule_id: "scoped-styles".into(),
                    result: RemediationResult::failure("no style"),
                },
            ],
        );
        let out = compose_fixes_json(&fixes, Path::new("/repo"), true);
        assert_eq!(out["summary"]["succeeded"], 1);
        assert_eq!(out["summary"]["failed"], 1);
        assert_eq!(out["results"][0]["file"], "a.txt");
        assert_eq!(out["results"][1]["failure"], "no style");
    }

    #[test]
    fn test_compose_sync_json() {
        let report = SyncReport {
            config_path: PathBuf::from("/repo/canon.toml"),
            actions: vec![SyncAction {
                group: "web".into(),
                added: vec!["no-todo".into()],
            }],
            unpatchable: vec![],
            would_write: true,
            wrote: false,
        };
        let out = compose_sync_json(&report, Path::new("/repo"));
        assert_eq!(out["config"], "canon.toml");
        assert_eq!(out["summary"]["added"], 1);
        assert_eq!(out["results"][0]["added"][0], "no-todo");
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(Path::new("/r"), Path::new("/r/a/b.rs")), "a/b.rs");
        assert_eq!(display_path(Path::new("/r"), Path::new("/r")), "/r");
    }
}
