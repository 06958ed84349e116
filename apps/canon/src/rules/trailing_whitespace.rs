//! Trailing spaces and tabs at line ends. Auto-fixable.

use crate::models::{Verdict, Violation};
use crate::remediate::{Remediate, RemediationResult};
use crate::rule::Rule;
use std::path::Path;

pub const ID: &str = "trailing-whitespace";

const BLANKS: [char; 2] = [' ', '\t'];

pub struct TrailingWhitespace;

/// Split a line (as yielded by `split_inclusive('\n')`) into body and terminator.
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

impl Rule for TrailingWhitespace {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "No trailing whitespace"
    }

    fn description(&self) -> &str {
        "Lines must not end in spaces or tabs"
    }

    fn judge(&self, _path: &Path, content: &str) -> Verdict {
        let violations = content
            .split_inclusive('\n')
            .enumerate()
            .filter_map(|(i, line)| {
                let (body, _) = split_terminator(line);
                let trimmed = body.trim_end_matches(BLANKS);
                (trimmed.len() != body.len()).then(|| {
                    Violation::new("trailing whitespace")
                        .at_line(i + 1)
                        .at_column(trimmed.chars().count() + 1)
                        .with_fix("strip whitespace at end of line")
                })
            })
            .collect();
        Verdict::violations(violations)
    }

    fn remediator(&self) -> Option<&dyn Remediate> {
        Some(self)
    }
}

impl Remediate for TrailingWhitespace {
    fn can_remediate(&self, _path: &Path) -> bool {
        true
    }

    fn remediate(&self, _path: &Path, content: &str) -> RemediationResult {
        let mut touched = 0usize;
        let mut out = String::with_capacity(content.len());
        for line in content.split_inclusive('\n') {
            let (body, end) = split_terminator(line);
            let trimmed = body.trim_end_matches(BLANKS);
            if trimmed.len() != body.len() {
                touched += 1;
            }
            out.push_str(trimmed);
            out.push_str(end);
        }
        if touched == 0 {
            return RemediationResult::unchanged(content, "no trailing whitespace");
        }
        RemediationResult::success(
            out,
            vec![format!("stripped trailing whitespace on {} line(s)", touched)],
        )
    }
}
