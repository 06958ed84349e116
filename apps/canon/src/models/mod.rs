//! Finding and verdict value types shared by rules, the orchestrator and printers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// A failing finding.
pub struct Violation {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// A non-failing finding that deserves manual review.
pub struct Advisory {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Advisory {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Outcome of judging one file against one rule.
///
/// A verdict is clean when it carries no violations and was not skipped.
/// Advisories never make a verdict unclean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl Verdict {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn violation(v: Violation) -> Self {
        Self {
            violations: vec![v],
            ..Default::default()
        }
    }

    pub fn violations(vs: Vec<Violation>) -> Self {
        Self {
            violations: vs,
            ..Default::default()
        }
    }

    pub fn advisory(a: Advisory) -> Self {
        Self {
            advisories: vec![a],
            ..Default::default()
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && !self.skipped
    }

    pub fn has_advisories(&self) -> bool {
        !self.advisories.is_empty()
    }

    pub fn with_advisory(mut self, a: Advisory) -> Self {
        self.advisories.push(a);
        self
    }

    /// Combine two verdicts. Findings are concatenated in call order; the
    /// result is skipped if either side was, keeping the first skip reason.
    pub fn merge(mut self, other: Verdict) -> Verdict {
        self.violations.extend(other.violations);
        self.advisories.extend(other.advisories);
        if !self.skipped && other.skipped {
            self.skip_reason = other.skip_reason;
        }
        self.skipped |= other.skipped;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts over a judged batch.
pub struct Summary {
    pub files_examined: usize,
    pub clean: usize,
    pub flagged: usize,
    pub violations: usize,
    pub advisories: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_definition() {
        assert!(Verdict::clean().is_clean());
        assert!(Verdict::advisory(Advisory::new("look")).is_clean());
        assert!(!Verdict::violation(Violation::new("bad")).is_clean());
        let s = Verdict::skipped("unparseable");
        assert!(!s.is_clean());
        assert_eq!(s.skip_reason.as_deref(), Some("unparseable"));
    }

    #[test]
    fn test_merge_concatenates_in_call_order() {
        let a = Verdict::violation(Violation::new("a")).with_advisory(Advisory::new("x"));
        let b = Verdict::violation(Violation::new("b"));
        let c = Verdict::advisory(Advisory::new("y"));
        let merged = a.merge(b).merge(c);
        let msgs: Vec<_> = merged.violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(msgs, vec!["a", "b"]);
        let adv: Vec<_> = merged.advisories.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(adv, vec!["x", "y"]);
    }

    #[test]
    fn test_merge_is_associative() {
        let a = Verdict::violation(Violation::new("a").at_line(1));
        let b = Verdict::skipped("b skipped").with_advisory(Advisory::new("b"));
        let c = Verdict::skipped("c skipped").with_advisory(Advisory::new("c"));
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
        assert_eq!(left.skip_reason.as_deref(), Some("b skipped"));
    }
}
