//! Rule contract, per-rule settings and the capabilities environment.

use crate::models::Verdict;
use crate::remediate::Remediate;
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Tools probed on `PATH` by [`Capabilities::detect`].
pub const PROBED_TOOLS: &[&str] = &["git", "node", "php", "rustfmt"];

/// Configuration handed to a rule: the group's thresholds overlaid with the
/// rule's own inline block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings(pub Map<String, Json>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Json>) -> Self {
        Self(map)
    }

    pub fn set(&mut self, key: &str, value: Json) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.0.get(key)
    }

    /// Overlay `over` onto `self`; keys in `over` win.
    pub fn merged(&self, over: &Settings) -> Settings {
        let mut out = self.0.clone();
        for (k, v) in over.0.iter() {
            out.insert(k.clone(), v.clone());
        }
        Settings(out)
    }

    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(Json::as_u64)
            .map(|n| n as usize)
            .unwrap_or(default)
    }

    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Json::as_f64).unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Json::as_bool).unwrap_or(default)
    }

    pub fn str_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Json::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn strings_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.get(key).and_then(Json::as_array) {
            Some(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Environment facts a rule may depend on.
///
/// Built once per process and passed into the registry; rules never probe
/// the environment on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    available: BTreeSet<String>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    /// Probe `PATH` for the tools in [`PROBED_TOOLS`].
    pub fn detect() -> Self {
        let mut caps = Self::default();
        let Some(path) = std::env::var_os("PATH") else {
            return caps;
        };
        for dir in std::env::split_paths(&path) {
            for tool in PROBED_TOOLS {
                let candidate = dir.join(tool);
                if candidate.is_file() || candidate.with_extension("exe").is_file() {
                    caps.available.insert(tool.to_string());
                }
            }
        }
        log::debug!("detected capabilities: {:?}", caps.available);
        caps
    }

    pub fn with(mut self, name: &str) -> Self {
        self.available.insert(name.to_string());
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.available.contains(name)
    }
}

/// One checkable convention.
///
/// `judge` must be pure given `(path, content)`. Structural parse failures
/// inside a rule become skipped verdicts or advisories, never panics.
pub trait Rule: Send + Sync {
    /// Stable identifier used in configuration and acknowledgments.
    fn id(&self) -> &str;

    /// Display name; defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// File extensions (without dot) this rule applies to; empty means all.
    fn file_types(&self) -> Vec<String> {
        Vec::new()
    }

    /// Path fragments this rule never judges.
    fn excluded_paths(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the rule can run in this environment.
    fn supported(&self, _caps: &Capabilities) -> bool {
        true
    }

    fn configure(&mut self, _settings: &Settings) {}

    fn judge(&self, path: &Path, content: &str) -> Verdict;

    /// Auto-fix capability, if any.
    fn remediator(&self) -> Option<&dyn Remediate> {
        None
    }

    /// Whether `path` falls under this rule's file types and exclusions.
    fn applies_to(&self, path: &Path) -> bool {
        let types = self.file_types();
        if !types.is_empty() {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if !types.iter().any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(&ext)) {
                return false;
            }
        }
        let p = path.to_string_lossy().replace('\\', "/");
        !self.excluded_paths().iter().any(|ex| p.contains(ex.as_str()))
    }
}

pub type RuleFactory = Arc<dyn Fn() -> Box<dyn Rule> + Send + Sync>;

/// A reference to a rule implementation: the unit of registration.
///
/// Two references are the same rule when their ids match.
#[derive(Clone)]
pub struct RuleRef {
    pub id: String,
    pub file_types: Vec<String>,
    /// Source text of the implementation, mined for configurable keys.
    pub source: &'static str,
    factory: RuleFactory,
}

impl RuleRef {
    pub fn new<F>(id: &str, file_types: &[&str], source: &'static str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Rule> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            file_types: file_types.iter().map(|s| s.to_string()).collect(),
            source,
            factory: Arc::new(factory),
        }
    }

    pub fn instantiate(&self) -> Box<dyn Rule> {
        (self.factory)()
    }
}

impl PartialEq for RuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RuleRef {}

impl fmt::Debug for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRef")
            .field("id", &self.id)
            .field("file_types", &self.file_types)
            .finish()
    }
}
