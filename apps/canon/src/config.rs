//! Configuration discovery and effective settings resolution.
//!
//! Canon reads `canon.toml|yaml|yml` from the repository root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `acknowledgments.path`: `.canon/acknowledgments.json`
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! A missing or malformed document is fatal for the whole run.

use crate::error::{CanonError, Result};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Document names probed in each directory, in order.
pub const CONFIG_NAMES: &[&str] = &["canon.toml", "canon.yaml", "canon.yml"];

/// Default acknowledgment store location relative to the root.
pub const DEFAULT_STORE: &str = ".canon/acknowledgments.json";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration document.
pub struct CanonConfig {
    pub output: Option<String>,
    #[serde(default)]
    pub acknowledgments: Option<AckCfg>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[acknowledgments]` section.
pub struct AckCfg {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[groups.<name>]`: where to look and which rules to apply.
pub struct GroupCfg {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    /// Shared settings merged into every rule of the group.
    #[serde(default)]
    pub thresholds: Map<String, Json>,
}

impl GroupCfg {
    /// All base paths; the root itself when none are declared.
    pub fn base_paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self.path.iter().cloned().collect();
        out.extend(self.paths.iter().cloned());
        if out.is_empty() {
            out.push(".".to_string());
        }
        out
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
/// A rule reference in a group's `rules` array: a bare id or an inline table.
pub enum RuleEntry {
    Id(String),
    Configured {
        rule: String,
        #[serde(flatten)]
        settings: Map<String, Json>,
    },
}

impl RuleEntry {
    pub fn id(&self) -> &str {
        match self {
            RuleEntry::Id(id) => id,
            RuleEntry::Configured { rule, .. } => rule,
        }
    }

    pub fn settings(&self) -> Option<&Map<String, Json>> {
        match self {
            RuleEntry::Id(_) => None,
            RuleEntry::Configured { settings, .. } => Some(settings),
        }
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: CanonConfig,
    pub output: String,
    pub store_path: PathBuf,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a configuration document or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    let mut cur = start.as_path();
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Locate the configuration document directly under `root`.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_NAMES
        .iter()
        .map(|n| root.join(n))
        .find(|p| p.is_file())
}

pub fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

/// Parse a configuration document from text, choosing the format by extension.
pub fn parse_config(path: &Path, text: &str) -> Result<CanonConfig> {
    if is_toml(path) {
        toml::from_str(text).map_err(|e| CanonError::config(path, e.to_string()))
    } else {
        serde_yaml::from_str(text).map_err(|e| CanonError::config(path, e.to_string()))
    }
}

/// Load and parse the document at `path`.
pub fn load_config(path: &Path) -> Result<CanonConfig> {
    let text = fs::read_to_string(path).map_err(|e| CanonError::io(path, e))?;
    parse_config(path, &text)
}

/// Resolve `Effective` by merging CLI flags, the discovered document, and defaults.
pub fn resolve_effective(
    cli_root: Option<&str>,
    cli_output: Option<&str>,
    cli_store: Option<&str>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_root.unwrap_or("."));
    let root = detect_repo_root(&start);
    let config_path = find_config(&root).ok_or_else(|| CanonError::ConfigMissing(start.clone()))?;
    let config = load_config(&config_path)?;
    log::debug!("loaded configuration from {}", config_path.display());

    let output = cli_output
        .map(|s| s.to_string())
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| "human".to_string());

    let store_rel = cli_store
        .map(|s| s.to_string())
        .or_else(|| config.acknowledgments.as_ref().and_then(|a| a.path.clone()))
        .unwrap_or_else(|| DEFAULT_STORE.to_string());

    Ok(Effective {
        store_path: root.join(store_rel),
        root,
        config_path,
        config,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("canon.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"

[groups.backend]
path = "src"
extensions = ["rs"]
exclude = ["generated"]
rules = [
    "no-todo",
    { rule = "max-file-lines", max_lines = 800 },
]

[groups.backend.thresholds]
max_lines = 500
"#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.store_path, root.canonicalize().unwrap().join(DEFAULT_STORE));
        let g = &eff.config.groups["backend"];
        assert_eq!(g.base_paths(), vec!["src"]);
        assert_eq!(g.rules[0], RuleEntry::Id("no-todo".into()));
        assert_eq!(g.rules[1].id(), "max-file-lines");
        assert_eq!(g.rules[1].settings().unwrap()["max_lines"], 800);
        assert_eq!(g.thresholds["max_lines"], 500);
    }

    #[test]
    fn test_load_yaml_and_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("canon.yaml"),
            r#"
output: human
acknowledgments:
  path: reviewed.json
groups:
  views:
    paths: [resources, components]
    extensions: [vue]
    rules:
      - scoped-styles
"#,
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), Some("json"), None).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.store_path, root.canonicalize().unwrap().join("reviewed.json"));
        assert_eq!(
            eff.config.groups["views"].base_paths(),
            vec!["resources", "components"]
        );
    }

    #[test]
    fn test_missing_document_is_error() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let err = resolve_effective(dir.path().to_str(), None, None).unwrap_err();
        assert!(matches!(err, CanonError::ConfigMissing(_)));
    }

    #[test]
    fn test_malformed_document_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("canon.toml"), "groups = [ unterminated").unwrap();
        let err = resolve_effective(dir.path().to_str(), None, None).unwrap_err();
        assert!(matches!(err, CanonError::Config { .. }));
    }

    #[test]
    fn test_default_base_path() {
        assert_eq!(GroupCfg::default().base_paths(), vec!["."]);
    }
}
