//! Canon CLI binary entry point.
//! Resolves configuration, builds the rule registry and dispatches commands.
//!
//! Exit codes: 0 clean, 1 violations (or pending changes under `--check`),
//! 2 configuration-level errors.

use canon::acknowledge::{self, AckStore};
use canon::cli::{AckCmd, Cli, Commands};
use canon::config::{self, Effective};
use canon::error::{CanonError, Result};
use canon::judge::{self, FixOutcome, Judge, Judgments};
use canon::output;
use canon::registry::Registry;
use canon::rule::{Capabilities, RuleRef};
use canon::{rules, sync};
use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", output::error_prefix(), e);
            2
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    if let Commands::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }
    let eff = config::resolve_effective(cli.root.as_deref(), cli.output.as_deref(), None)?;
    let catalog = rules::catalog();
    match cli.cmd {
        Commands::Version => Ok(0),
        Commands::Sync { write, check } => {
            // --check never writes.
            let report = sync::run_sync(&eff.config_path, &catalog, write && !check)?;
            output::print_sync(&report, &eff.root, &eff.output);
            Ok(if check && report.would_write { 1 } else { 0 })
        }
        Commands::Ack { cmd } => run_ack(&eff, cmd),
        Commands::Judge { group, files } => {
            let registry = build_registry(&eff, &catalog)?;
            let groups = selected_groups(&registry, group)?;
            let judge = Judge::new(&registry, &eff.root);
            let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
            let mut results = Judgments::new();
            for g in &groups {
                let judged = if paths.is_empty() {
                    judge.judge_group(g)?
                } else {
                    judge.judge_files(g, &paths)?
                };
                merge_judgments(&mut results, judged);
            }
            let mut store = AckStore::new(&eff.store_path, &eff.root);
            let suppressed = acknowledge::suppress_acknowledged(&mut store, &mut results)?;
            if suppressed > 0 {
                log::info!("{} acknowledged advisory finding(s) hidden", suppressed);
            }
            let summary = judge::summarize(&results);
            output::print_judgments(&results, &summary, &eff.root, &eff.output);
            Ok(if summary.violations > 0 { 1 } else { 0 })
        }
        Commands::Fix { group, dry_run, files } => {
            let registry = build_registry(&eff, &catalog)?;
            let groups = selected_groups(&registry, group)?;
            let judge = Judge::new(&registry, &eff.root);
            let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
            let mut fixes: BTreeMap<PathBuf, Vec<FixOutcome>> = BTreeMap::new();
            for g in &groups {
                let done = if paths.is_empty() {
                    judge.remediate_group(g, dry_run)?
                } else {
                    let judged = judge.judge_files(g, &paths)?;
                    judge.remediate_judged(g, &judged, dry_run)?
                };
                for (path, outcomes) in done {
                    fixes.entry(path).or_default().extend(outcomes);
                }
            }
            output::print_fixes(&fixes, &eff.root, &eff.output, dry_run);
            let failed = fixes.values().flatten().any(|o| !o.result.succeeded);
            Ok(if failed { 1 } else { 0 })
        }
        Commands::Rules { group } => {
            let registry = build_registry(&eff, &catalog)?;
            let mut listing = Vec::new();
            for g in selected_groups(&registry, group)? {
                let rows = registry.list(&g)?;
                listing.push((g, rows));
            }
            output::print_rules(&listing, &eff.output);
            Ok(0)
        }
    }
}

fn build_registry(eff: &Effective, catalog: &[RuleRef]) -> Result<Registry> {
    Registry::from_config(&eff.config, catalog, &eff.config_path, Capabilities::detect())
}

/// The requested group, or every configured group.
fn selected_groups(registry: &Registry, group: Option<String>) -> Result<Vec<String>> {
    match group {
        Some(g) if registry.group(&g).is_some() => Ok(vec![g]),
        Some(g) => Err(CanonError::UnknownGroup(g)),
        None => Ok(registry.group_names().into_iter().map(str::to_string).collect()),
    }
}

/// Fold one group's judgments into the combined result; a rule judged by
/// several groups keeps the merged verdict.
fn merge_judgments(into: &mut Judgments, from: Judgments) {
    for (path, verdicts) in from {
        let entry = into.entry(path).or_default();
        for (rule, v) in verdicts {
            let merged = match entry.remove(&rule) {
                Some(prev) => prev.merge(v),
                None => v,
            };
            entry.insert(rule, merged);
        }
    }
}

/// Resolve a CLI file argument against the working directory, then the root.
fn locate(root: &Path, file: &str, must_exist: bool) -> Result<PathBuf> {
    let p = PathBuf::from(file);
    if p.exists() {
        return Ok(p);
    }
    let under_root = root.join(&p);
    if under_root.exists() || !must_exist {
        Ok(under_root)
    } else {
        Err(CanonError::UnknownFile(p))
    }
}

fn run_ack(eff: &Effective, cmd: AckCmd) -> Result<i32> {
    let mut store = AckStore::new(&eff.store_path, &eff.root);
    let known = |rule: &str| -> Result<()> {
        if rules::lookup(rule).is_some() {
            Ok(())
        } else {
            Err(CanonError::UnknownRule(rule.to_string()))
        }
    };
    match cmd {
        AckCmd::Add { file, rule, reason } => {
            known(&rule)?;
            let path = locate(&eff.root, &file, true)?;
            store.acknowledge(&path, &rule, reason.as_deref())?;
            let subject = format!("{} ❲{}❳", store.key(&path), rule);
            output::print_ack_change("acknowledged", &subject, 1, &eff.output);
        }
        AckCmd::Revoke { file, rule } => {
            let path = locate(&eff.root, &file, false)?;
            let removed = store.revoke(&path, &rule)?;
            let subject = format!("{} ❲{}❳", store.key(&path), rule);
            output::print_ack_change("revoked", &subject, usize::from(removed), &eff.output);
        }
        AckCmd::Status { file, rule } => {
            known(&rule)?;
            let path = locate(&eff.root, &file, true)?;
            let content = fs::read_to_string(&path).map_err(|e| CanonError::io(&path, e))?;
            let status = store.status(&path, &rule, &content)?;
            let record = store.record(&path, &rule)?;
            output::print_ack_status(&store.key(&path), &rule, status, record.as_ref(), &eff.output);
        }
        AckCmd::Cleanup => {
            let removed = store.cleanup()?;
            let subject = match removed {
                0 => "acknowledgment store".to_string(),
                1 => "1 stale file entry".to_string(),
                n => format!("{} stale file entries", n),
            };
            output::print_ack_change("cleaned", &subject, removed, &eff.output);
        }
    }
    Ok(0)
}
