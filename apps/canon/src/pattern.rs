//! Named regular-expression sets run against a region's content.

use crate::region::{self, Region, RegionKind};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub regex: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One match of a named pattern.
pub struct PatternMatch {
    pub pattern: String,
    pub text: String,
    /// Capture groups 1..n; `None` for groups that did not participate.
    pub groups: Vec<Option<String>>,
    /// Offset relative to the searched region (or whole file).
    pub offset: usize,
    /// Absolute offset of the searched text in the original file.
    pub region_start: usize,
    pub region: Option<RegionKind>,
    pub snippet: String,
}

impl PatternMatch {
    pub fn absolute_offset(&self) -> usize {
        self.region_start + self.offset
    }

    /// 1-based line number in the original file content.
    pub fn line(&self, original: &str) -> usize {
        region::line_at(original, self.absolute_offset())
    }

    pub fn column(&self, original: &str) -> usize {
        region::column_at(original, self.absolute_offset())
    }

    pub fn group(&self, i: usize) -> Option<&str> {
        self.groups.get(i.checked_sub(1)?)?.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
/// Ordered collection of named patterns.
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regex pattern under `name`.
    pub fn with(mut self, name: &str, pattern: &str) -> Result<Self, regex::Error> {
        self.patterns.push(Pattern {
            name: name.to_string(),
            regex: Regex::new(pattern)?,
        });
        Ok(self)
    }

    /// Add a literal substring pattern under `name`.
    pub fn literal(mut self, name: &str, text: &str) -> Self {
        // An escaped literal is always a valid regex.
        if let Ok(regex) = Regex::new(&regex::escape(text)) {
            self.patterns.push(Pattern {
                name: name.to_string(),
                regex,
            });
        }
        self
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Run every pattern against `region.content`.
    pub fn run_region(&self, region: &Region) -> Vec<PatternMatch> {
        self.scan(&region.content, region.start_offset, Some(region.kind))
    }

    /// Run every pattern against a whole file.
    pub fn run(&self, content: &str) -> Vec<PatternMatch> {
        self.scan(content, 0, None)
    }

    fn scan(&self, text: &str, region_start: usize, kind: Option<RegionKind>) -> Vec<PatternMatch> {
        let mut out = Vec::new();
        for p in &self.patterns {
            for caps in p.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect();
                out.push(PatternMatch {
                    pattern: p.name.clone(),
                    text: whole.as_str().to_string(),
                    groups,
                    offset: whole.start(),
                    region_start,
                    region: kind,
                    snippet: region::snippet(text, whole.start()),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::extract_presentation;

    #[test]
    fn test_matches_are_region_relative() {
        let file = "<script>\nlet x = 1\n</script>\n<template>\n  <a style=\"x\">\n</template>\n";
        let region = extract_presentation(file).unwrap();
        let set = PatternSet::new()
            .with("inline-style", r#"style="([^"]*)""#)
            .unwrap();
        let found = set.run_region(&region);
        assert_eq!(found.len(), 1);
        let m = &found[0];
        assert_eq!(m.pattern, "inline-style");
        assert_eq!(m.group(1), Some("x"));
        assert_eq!(m.offset, region.content.find("style=").unwrap());
        // s + k against the hand-counted fixture: the match sits on line 5
        assert_eq!(m.line(file), 5);
        assert_eq!(m.absolute_offset(), file.find("style=").unwrap());
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let set = PatternSet::new().literal("dbg", "dbg!(");
        let found = set.run("a\ndbg!(x)\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line("a\ndbg!(x)\n"), 2);
        assert_eq!(found[0].region, None);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(PatternSet::new().with("bad", "(unclosed").is_err());
    }
}
