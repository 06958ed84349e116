//! Region extraction for multi-section source files.
//!
//! A single-file component carries up to three sections:
//! - logic (`<script>`): first opening tag to the first following closer,
//!   with a declared language and an alternate-syntax (`setup`) flag;
//! - presentation (`<template>`): the tag nests inside itself, so the
//!   closer is found with a depth counter;
//! - style (`<style>`): non-nesting like logic, plus a `scoped` flag.
//!
//! Region offsets always point into the original file content, so matches
//! found inside a region can be mapped back to file line numbers with
//! [`line_at`].

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Width in bytes of a diagnostic snippet window.
pub const SNIPPET_WIDTH: usize = 60;
/// How far before the match offset a snippet window starts.
pub const SNIPPET_LEAD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Logic,
    Presentation,
    Style,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionFlags {
    /// `<script setup>`
    pub alternate_syntax: bool,
    /// `<style scoped>`
    pub scoped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// An extracted sub-document span.
pub struct Region {
    pub kind: RegionKind,
    pub content: String,
    /// Offset of the first content byte in the original file.
    pub start_offset: usize,
    /// Offset one past the last content byte in the original file.
    pub end_offset: usize,
    /// Offset of the opening tag's `<` in the original file.
    pub tag_offset: usize,
    /// Raw attribute string of the opening tag.
    pub attributes: String,
    pub lang: Option<String>,
    pub flags: RegionFlags,
}

impl Region {
    /// Absolute file offset for an offset relative to this region.
    pub fn absolute(&self, relative: usize) -> usize {
        self.start_offset + relative
    }

    /// 1-based line number in `original` of a region-relative offset.
    pub fn line_of(&self, original: &str, relative: usize) -> usize {
        line_at(original, self.absolute(relative))
    }
}

fn logic_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<script(\s[^>]*)?>").expect("static regex"))
}

fn logic_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</script\s*>").expect("static regex"))
}

fn presentation_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<template(\s[^>]*)?>").expect("static regex"))
}

fn presentation_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</template\s*>").expect("static regex"))
}

fn style_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<style(\s[^>]*)?>").expect("static regex"))
}

fn style_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</style\s*>").expect("static regex"))
}

fn lang_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\blang\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("static regex")
    })
}

pub fn has_attribute(attrs: &str, flag: &str) -> bool {
    attrs
        .split(|c: char| c.is_whitespace())
        .map(|tok| tok.split('=').next().unwrap_or(""))
        .any(|name| name.eq_ignore_ascii_case(flag))
}

fn parse_lang(attrs: &str) -> Option<String> {
    let caps = lang_attr().captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
}

/// Locate the first `open` tag and the first `close` tag after it.
fn extract_flat(content: &str, open: &Regex, close: &Regex, kind: RegionKind) -> Option<Region> {
    let caps = open.captures(content)?;
    let whole = caps.get(0)?;
    let attributes = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    let start = whole.end();
    let closer = close.find_at(content, start)?;
    Some(Region {
        kind,
        content: content[start..closer.start()].to_string(),
        start_offset: start,
        end_offset: closer.start(),
        tag_offset: whole.start(),
        lang: parse_lang(&attributes),
        flags: RegionFlags::default(),
        attributes,
    })
}

/// Extract the logic region. `None` when either marker is absent.
pub fn extract_logic(content: &str) -> Option<Region> {
    let mut region = extract_flat(content, logic_open(), logic_close(), RegionKind::Logic)?;
    region.flags.alternate_syntax = has_attribute(&region.attributes, "setup");
    Some(region)
}

/// Extract the style region. `None` when either marker is absent.
pub fn extract_style(content: &str) -> Option<Region> {
    let mut region = extract_flat(content, style_open(), style_close(), RegionKind::Style)?;
    region.flags.scoped = has_attribute(&region.attributes, "scoped");
    Some(region)
}

/// Extract the outermost presentation region, honouring nested markers.
///
/// `None` when no opening marker exists or the outer marker is never closed.
pub fn extract_presentation(content: &str) -> Option<Region> {
    let open = presentation_open();
    let close = presentation_close();
    let caps = open.captures(content)?;
    let whole = caps.get(0)?;
    let attributes = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    let start = whole.end();

    let mut depth: usize = 1;
    let mut pos = start;
    loop {
        let next_close = close.find_at(content, pos)?;
        match open.find_at(content, pos) {
            Some(next_open) if next_open.start() < next_close.start() => {
                depth += 1;
                pos = next_open.end();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(Region {
                        kind: RegionKind::Presentation,
                        content: content[start..next_close.start()].to_string(),
                        start_offset: start,
                        end_offset: next_close.start(),
                        tag_offset: whole.start(),
                        lang: parse_lang(&attributes),
                        flags: RegionFlags::default(),
                        attributes,
                    });
                }
                pos = next_close.end();
            }
        }
    }
}

/// Dispatch to the extractor for `kind`.
pub fn extract(kind: RegionKind, content: &str) -> Option<Region> {
    match kind {
        RegionKind::Logic => extract_logic(content),
        RegionKind::Presentation => extract_presentation(content),
        RegionKind::Style => extract_style(content),
    }
}

/// 1-based line number of byte `offset` within `content`.
pub fn line_at(content: &str, offset: usize) -> usize {
    let end = offset.min(content.len());
    1 + content.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}

/// 1-based column (in characters) of byte `offset` within `content`.
pub fn column_at(content: &str, offset: usize) -> usize {
    let end = floor_boundary(content, offset.min(content.len()));
    let line_start = content[..end].rfind('\n').map(|i| i + 1).unwrap_or(0);
    content[line_start..end].chars().count() + 1
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Build a short single-line excerpt of `text` around `offset`.
pub fn snippet(text: &str, offset: usize) -> String {
    let start = floor_boundary(text, offset.saturating_sub(SNIPPET_LEAD).min(text.len()));
    let end = floor_boundary(text, (start + SNIPPET_WIDTH).min(text.len()));
    let body = text[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(&body);
    if end < text.len() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SFC: &str = "<template>\n  <div>\n    <template v-if=\"a\">\n      <template v-slot:x>\n        <p>deep</p>\n      </template>\n    </template>\n  </div>\n</template>\n<template>sibling</template>\n<script setup lang=\"ts\">\nconst a = 1\n</script>\n<style scoped lang='scss'>\n.a { color: red }\n</style>\n";

    #[test]
    fn test_presentation_nested_two_levels() {
        let r = extract_presentation(SFC).unwrap();
        assert!(r.content.ends_with("  </div>\n"));
        assert!(!r.content.contains("sibling"));
        let closer = SFC.find("</div>\n</template>").unwrap() + "</div>\n".len();
        assert_eq!(r.end_offset, closer);
        assert_eq!(&SFC[r.start_offset..r.end_offset], r.content);
    }

    #[test]
    fn test_presentation_unclosed_is_none() {
        assert!(extract_presentation("<template><template></template>").is_none());
        assert!(extract_presentation("no markers at all").is_none());
    }

    #[test]
    fn test_logic_attributes() {
        let r = extract_logic(SFC).unwrap();
        assert_eq!(r.lang.as_deref(), Some("ts"));
        assert!(r.flags.alternate_syntax);
        assert_eq!(r.content, "\nconst a = 1\n");
        assert!(extract_logic("<script>never closed").is_none());
        let plain = extract_logic("<script>\nx\n</script>").unwrap();
        assert_eq!(plain.lang, None);
        assert!(!plain.flags.alternate_syntax);
    }

    #[test]
    fn test_style_scoped_flag() {
        let r = extract_style(SFC).unwrap();
        assert!(r.flags.scoped);
        assert_eq!(r.lang.as_deref(), Some("scss"));
        let unscoped = extract_style("<style>\n.a{}\n</style>").unwrap();
        assert!(!unscoped.flags.scoped);
    }

    #[test]
    fn test_line_mapping_hand_counted() {
        // lines: 1 "<template>", 2 "  <div>", 3 "    <template v-if..."
        let r = extract_presentation(SFC).unwrap();
        let rel = r.content.find("<p>deep").unwrap();
        assert_eq!(r.line_of(SFC, rel), 5);
        assert_eq!(line_at(SFC, 0), 1);
        let logic = extract_logic(SFC).unwrap();
        let rel = logic.content.find("const").unwrap();
        assert_eq!(logic.line_of(SFC, rel), 12);
    }

    #[test]
    fn test_column_at() {
        let text = "ab\ncdef";
        assert_eq!(column_at(text, 0), 1);
        assert_eq!(column_at(text, 5), 3);
    }

    #[test]
    fn test_snippet_window() {
        let text = format!("{}needle   in\n\n  a haystack{}", "x".repeat(30), "y".repeat(80));
        let offset = text.find("needle").unwrap();
        let s = snippet(&text, offset);
        assert!(s.starts_with("..."));
        assert!(s.ends_with("..."));
        assert!(s.contains("needle in a haystack"));
        assert_eq!(snippet("short text", 0), "short text");
    }
}
