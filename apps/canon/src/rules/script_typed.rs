//! Logic regions should declare a typed language.
//!
//! Findings are advisories: an untyped or classic-syntax script still works,
//! it just falls short of the convention.

use crate::models::{Advisory, Verdict};
use crate::pipeline::Context;
use crate::region::{self, RegionKind};
use crate::rule::{Rule, Settings};
use std::path::Path;

pub const ID: &str = "script-typed";

const TYPED_LANGS: &[&str] = &["ts", "tsx"];

pub struct ScriptTyped {
    languages: Vec<String>,
    prefer_setup: bool,
}

impl ScriptTyped {
    pub fn new() -> Self {
        let mut rule = Self {
            languages: Vec::new(),
            prefer_setup: false,
        };
        rule.configure(&Settings::new());
        rule
    }
}

impl Default for ScriptTyped {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ScriptTyped {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Typed component logic"
    }

    fn description(&self) -> &str {
        "Component scripts should use a typed language"
    }

    fn file_types(&self) -> Vec<String> {
        vec!["vue".into()]
    }

    fn configure(&mut self, settings: &Settings) {
        self.languages = settings.strings_or("languages", TYPED_LANGS);
        self.prefer_setup = settings.bool_or("prefer_setup", false);
    }

    fn judge(&self, path: &Path, content: &str) -> Verdict {
        Context::new(path, content)
            .extract(RegionKind::Logic)
            .skip_when(
                |c| c.region(RegionKind::Logic).is_none() && c.content.contains("<script"),
                "unterminated <script> region",
            )
            .clean_if_missing(RegionKind::Logic)
            .finish(|ctx| {
                let mut verdict = Verdict::clean();
                let Some(logic) = ctx.region(RegionKind::Logic) else {
                    return verdict;
                };
                let line = region::line_at(ctx.content, logic.tag_offset);
                let typed = logic
                    .lang
                    .as_deref()
                    .is_some_and(|l| self.languages.iter().any(|t| t.eq_ignore_ascii_case(l)));
                if !typed {
                    let declared = logic.lang.as_deref().unwrap_or("no language");
                    verdict = verdict.with_advisory(
                        Advisory::new(format!(
                            "script declares {}; expected one of: {}",
                            declared,
                            self.languages.join(", ")
                        ))
                        .at_line(line),
                    );
                }
                if self.prefer_setup && !logic.flags.alternate_syntax {
                    verdict = verdict
                        .with_advisory(Advisory::new("prefer <script setup>").at_line(line));
                }
                verdict
            })
    }
}
