//! Leftover work markers (`TODO`, `FIXME`, ...) anywhere in a file.

use crate::models::Verdict;
use crate::pattern::PatternSet;
use crate::pipeline::Context;
use crate::rule::{Rule, Settings};
use std::path::Path;

pub const ID: &str = "no-todo";

const DEFAULT_MARKERS: &[&str] = &["TODO", "FIXME"];

pub struct NoTodo {
    patterns: PatternSet,
}

impl NoTodo {
    pub fn new() -> Self {
        let mut rule = Self {
            patterns: PatternSet::new(),
        };
        rule.configure(&Settings::new());
        rule
    }
}

impl Default for NoTodo {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for NoTodo {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "No work markers"
    }

    fn description(&self) -> &str {
        "Flags leftover TODO/FIXME style markers"
    }

    fn configure(&mut self, settings: &Settings) {
        let markers = settings.strings_or("markers", DEFAULT_MARKERS);
        self.patterns = markers
            .iter()
            .filter(|m| !m.is_empty())
            .fold(PatternSet::new(), |set, m| set.literal(m, m));
    }

    fn judge(&self, path: &Path, content: &str) -> Verdict {
        let mut verdict = Context::new(path, content)
            .clean_when(|_| self.patterns.is_empty())
            .match_file(&self.patterns)
            .finish(|ctx| ctx.violations_from_matches(|m| format!("{} marker left in file", m.text)));
        verdict.violations.sort_by_key(|v| (v.line, v.column));
        verdict
    }
}
