//! File length limit with an early-warning band.

use crate::models::{Advisory, Verdict, Violation};
use crate::rule::{Rule, Settings};
use std::path::Path;

pub const ID: &str = "max-file-lines";

const MAX_LINES: usize = 500;
const WARN_RATIO: f64 = 0.8;

pub struct MaxFileLines {
    max_lines: usize,
    warn_ratio: f64,
}

impl MaxFileLines {
    pub fn new() -> Self {
        Self {
            max_lines: MAX_LINES,
            warn_ratio: WARN_RATIO,
        }
    }
}

impl Default for MaxFileLines {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for MaxFileLines {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Maximum file length"
    }

    fn description(&self) -> &str {
        "Files must stay under a line limit"
    }

    fn configure(&mut self, settings: &Settings) {
        self.max_lines = settings.usize_or("max_lines", MAX_LINES);
        self.warn_ratio = settings.f64_or("warn_ratio", WARN_RATIO);
    }

    fn judge(&self, _path: &Path, content: &str) -> Verdict {
        let lines = content.lines().count();
        if lines > self.max_lines {
            return Verdict::violation(
                Violation::new(format!("file has {} lines (limit {})", lines, self.max_lines))
                    .at_line(self.max_lines + 1)
                    .with_fix("split the file into smaller units"),
            );
        }
        let warn_at = (self.max_lines as f64 * self.warn_ratio).floor() as usize;
        if self.warn_ratio < 1.0 && lines > warn_at {
            return Verdict::advisory(Advisory::new(format!(
                "file has {} lines, approaching the limit of {}",
                lines, self.max_lines
            )));
        }
        Verdict::clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(max: usize) -> MaxFileLines {
        let mut r = MaxFileLines::new();
        let mut s = Settings::new();
        s.set("max_lines", json!(max));
        r.configure(&s);
        r
    }

    #[test]
    fn test_over_limit_is_violation() {
        let v = rule(3).judge(Path::new("a"), "1\n2\n3\n4\n");
        assert_eq!(v.violations.len(), 1);
        assert_eq!(v.violations[0].line, Some(4));
        assert_eq!(v.violations[0].message, "file has 4 lines (limit 3)");
    }

    #[test]
    fn test_warning_band_is_advisory_only() {
        let v = rule(10).judge(Path::new("a"), &"x\n".repeat(9));
        assert!(v.is_clean());
        assert!(v.has_advisories());
        let v = rule(10).judge(Path::new("a"), &"x\n".repeat(8));
        assert!(v.is_clean());
        assert!(!v.has_advisories());
    }
}
