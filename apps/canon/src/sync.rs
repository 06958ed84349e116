//! Config synchronization: add discoverable-but-unregistered rules to each
//! group's `rules` array in `canon.toml`.
//!
//! The document is patched as text so hand-written comments, ordering and
//! spacing survive. New entries are followed by a commented-out inline table
//! listing the settings keys the rule reads, with their defaults.

use crate::config::{self, CanonConfig};
use crate::error::{CanonError, Result};
use crate::rule::RuleRef;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Indentation added to the `rules` key line for array entries.
const ENTRY_INDENT: &str = "    ";

pub struct SyncAction {
    pub group: String,
    pub added: Vec<String>,
}

pub struct SyncReport {
    pub config_path: PathBuf,
    pub actions: Vec<SyncAction>,
    /// Groups whose `rules` array could not be located in the document text.
    pub unpatchable: Vec<String>,
    pub would_write: bool,
    pub wrote: bool,
}

impl SyncReport {
    pub fn added_count(&self) -> usize {
        self.actions.iter().map(|a| a.added.len()).sum()
    }
}

/// Bounds of a bracketed array literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArraySpan {
    open: usize,
    close: usize,
    /// Last byte outside comments and whitespace strictly inside the array.
    last_significant: Option<usize>,
}

/// Walk forward from the `[` at `open` to its matching `]`.
///
/// Brackets inside quoted strings and `#` comments do not count. Backslash
/// escapes are honoured in `"` strings; `'` strings are literal.
fn scan_array(text: &str, open: usize) -> Option<ArraySpan> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut in_comment = false;
    let mut last_significant = None;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_comment {
            if b == b'\n' {
                in_comment = false;
            }
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' && q == b'"' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            last_significant = Some(i);
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'#' => {
                in_comment = true;
                continue;
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(ArraySpan {
                        open,
                        close: i,
                        last_significant,
                    });
                }
            }
            _ => {}
        }
        if i > open && !b.is_ascii_whitespace() {
            last_significant = Some(i);
        }
    }
    None
}

/// Index of the `]` matching the `[` at `open`.
pub fn find_array_end(text: &str, open: usize) -> Option<usize> {
    scan_array(text, open).map(|s| s.close)
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[\s*([^\[\]]+?)\s*\]\s*(?:#.*)?$").expect("static regex"))
}

fn table_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[").expect("static regex"))
}

fn rules_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)rules\s*=\s*\[").expect("static regex"))
}

fn setting_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(?:usize|f64|bool|str|strings)_or\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*,\s*([^)]*?)\s*\)"#)
            .expect("static regex")
    })
}

fn const_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static regex"))
}

/// Split a table header (`groups."web app"`) into unquoted key segments.
fn header_segments(header: &str) -> Vec<String> {
    header
        .split('.')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .collect()
}

/// Where a group's rules live in the document text.
enum Anchor {
    /// Byte offset of the `[` opening the array, plus the key line's indent.
    Array { open: usize, indent: String },
    /// Section exists without a `rules` key; insert one after the header line.
    Section { after_header: usize },
}

fn locate_group(text: &str, group: &str) -> Option<Anchor> {
    let mut offset = 0usize;
    let mut in_section = false;
    let mut after_header = 0usize;
    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        if table_start_re().is_match(body) {
            if in_section {
                // A sub-table or sibling ends the group's own keys.
                return Some(Anchor::Section { after_header });
            }
            if let Some(caps) = header_re().captures(body) {
                let segs = header_segments(&caps[1]);
                if segs.len() == 2 && segs[0] == "groups" && segs[1] == group {
                    in_section = true;
                    after_header = offset + line.len();
                }
            }
        } else if in_section {
            if let Some(caps) = rules_key_re().captures(body) {
                let whole = caps.get(0)?;
                return Some(Anchor::Array {
                    open: offset + whole.end() - 1,
                    indent: caps[1].to_string(),
                });
            }
        }
        offset += line.len();
    }
    in_section.then_some(Anchor::Section { after_header })
}

/// Settings keys a rule reads, with default values as TOML literals.
///
/// Keys are found as `settings.<kind>_or("key", default)` calls outside the
/// test module; a default naming a `const` is resolved in the same source.
pub fn config_keys(source: &str) -> Vec<(String, String)> {
    let body = source.split("#[cfg(test)]").next().unwrap_or(source);
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for caps in setting_call_re().captures_iter(body) {
        let key = caps[1].to_string();
        if !seen.insert(key.clone()) {
            continue;
        }
        let raw = caps[2].trim();
        let value = if const_name_re().is_match(raw) {
            resolve_const(body, raw).unwrap_or_else(|| raw.to_string())
        } else {
            raw.to_string()
        };
        out.push((key, toml_literal(&value)));
    }
    out
}

fn resolve_const(source: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+{}\s*:[^=]*=\s*(.+?);\s*$",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(source).map(|c| c[1].trim().to_string())
}

fn toml_literal(rust: &str) -> String {
    let v = rust.trim().trim_start_matches('&').trim();
    v.strip_suffix(".to_string()")
        .or_else(|| v.strip_suffix(".into()"))
        .unwrap_or(v)
        .to_string()
}

/// Catalog rules applicable to a group declaring `extensions`.
///
/// Rules without file types apply everywhere; a group without extensions
/// accepts every rule.
pub fn rule_family<'c>(catalog: &'c [RuleRef], extensions: &[String]) -> Vec<&'c RuleRef> {
    let exts: BTreeSet<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();
    catalog
        .iter()
        .filter(|r| {
            exts.is_empty()
                || r.file_types.is_empty()
                || r.file_types
                    .iter()
                    .any(|t| exts.contains(&t.trim_start_matches('.').to_ascii_lowercase()))
        })
        .collect()
}

fn entry_lines(rule: &RuleRef, indent: &str) -> String {
    let mut out = format!("{}\"{}\",\n", indent, rule.id);
    let keys = config_keys(rule.source);
    if !keys.is_empty() {
        let settings = keys
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{}# {{ rule = \"{}\", {} }},\n", indent, rule.id, settings));
    }
    out
}

fn line_start(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// A replacement of `len` bytes at `at`.
struct Edit {
    at: usize,
    len: usize,
    insert: String,
}

fn array_edits(text: &str, open: usize, indent: &str, rules: &[&RuleRef]) -> Option<Vec<Edit>> {
    let span = scan_array(text, open)?;
    let inner = format!("{}{}", indent, ENTRY_INDENT);
    let block: String = rules.iter().map(|r| entry_lines(r, &inner)).collect();
    let inside = &text[span.open + 1..span.close];

    if span.last_significant.is_none() && !inside.contains('#') {
        return Some(vec![Edit {
            at: span.open,
            len: span.close - span.open + 1,
            insert: format!("[\n{}{}]", block, indent),
        }]);
    }

    let mut edits = Vec::new();
    let close_line = line_start(text, span.close);
    if close_line > span.open && text[close_line..span.close].trim().is_empty() {
        edits.push(Edit {
            at: close_line,
            len: 0,
            insert: block,
        });
    } else {
        edits.push(Edit {
            at: span.close,
            len: 0,
            insert: format!("\n{}{}", block, indent),
        });
    }
    if let Some(last) = span.last_significant {
        if text.as_bytes()[last] != b',' {
            edits.push(Edit {
                at: last + 1,
                len: 0,
                insert: ",".to_string(),
            });
        }
    }
    Some(edits)
}

fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.at.cmp(&a.at));
    let mut out = text.to_string();
    for e in edits {
        out.replace_range(e.at..e.at + e.len, &e.insert);
    }
    out
}

/// Compute the patched document. Returns the new text, the per-group
/// additions and the groups that could not be patched.
pub fn plan(
    text: &str,
    cfg: &CanonConfig,
    catalog: &[RuleRef],
) -> (String, Vec<SyncAction>, Vec<String>) {
    let mut edits = Vec::new();
    let mut actions = Vec::new();
    let mut unpatchable = Vec::new();

    for (name, group) in cfg.groups.iter() {
        let registered: BTreeSet<&str> = group.rules.iter().map(|e| e.id()).collect();
        let missing: Vec<&RuleRef> = rule_family(catalog, &group.extensions)
            .into_iter()
            .filter(|r| !registered.contains(r.id.as_str()))
            .collect();
        if missing.is_empty() {
            continue;
        }
        let group_edits = match locate_group(text, name) {
            Some(Anchor::Array { open, indent }) => array_edits(text, open, &indent, &missing),
            Some(Anchor::Section { after_header }) => {
                let block: String = missing.iter().map(|r| entry_lines(r, ENTRY_INDENT)).collect();
                // A header on the last line may lack its newline.
                let lead = if text[..after_header].ends_with('\n') { "" } else { "\n" };
                Some(vec![Edit {
                    at: after_header,
                    len: 0,
                    insert: format!("{}rules = [\n{}]\n", lead, block),
                }])
            }
            None => None,
        };
        match group_edits {
            Some(e) => {
                edits.extend(e);
                actions.push(SyncAction {
                    group: name.clone(),
                    added: missing.iter().map(|r| r.id.clone()).collect(),
                });
            }
            None => {
                log::warn!("group '{}': no [groups.{}] table with a rules array found", name, name);
                unpatchable.push(name.clone());
            }
        }
    }
    (apply_edits(text, edits), actions, unpatchable)
}

/// Synchronize the document at `config_path` with `catalog`.
///
/// With `write = false` the document is left untouched and the report says
/// whether a write would happen.
pub fn run_sync(config_path: &Path, catalog: &[RuleRef], write: bool) -> Result<SyncReport> {
    if !config::is_toml(config_path) {
        return Err(CanonError::config(
            config_path,
            "sync supports TOML documents only",
        ));
    }
    let text = fs::read_to_string(config_path).map_err(|e| CanonError::io(config_path, e))?;
    let cfg = config::parse_config(config_path, &text)?;
    let (patched, actions, unpatchable) = plan(&text, &cfg, catalog);
    let would_write = patched != text;
    if would_write {
        // A patch that breaks the document is never written.
        config::parse_config(config_path, &patched)?;
    }
    let wrote = write && would_write;
    if wrote {
        fs::write(config_path, &patched).map_err(|e| CanonError::io(config_path, e))?;
        log::info!("updated {}", config_path.display());
    }
    Ok(SyncReport {
        config_path: config_path.to_path_buf(),
        actions,
        unpatchable,
        would_write,
        wrote,
    })
}
