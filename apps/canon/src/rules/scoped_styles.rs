//! Component style regions must be scoped. Auto-fixable.

use crate::models::{Verdict, Violation};
use crate::pipeline::Context;
use crate::region::{self, RegionKind};
use crate::remediate::{Remediate, RemediationResult};
use crate::rule::{Rule, Settings};
use std::path::Path;

pub const ID: &str = "scoped-styles";

const OPEN_TAG: &str = "<style";

pub struct ScopedStyles {
    allow_module: bool,
}

impl ScopedStyles {
    pub fn new() -> Self {
        Self { allow_module: true }
    }
}

impl Default for ScopedStyles {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ScopedStyles {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Scoped component styles"
    }

    fn description(&self) -> &str {
        "Style blocks must be scoped to their component"
    }

    fn file_types(&self) -> Vec<String> {
        vec!["vue".into()]
    }

    fn configure(&mut self, settings: &Settings) {
        self.allow_module = settings.bool_or("allow_module", true);
    }

    fn judge(&self, path: &Path, content: &str) -> Verdict {
        Context::new(path, content)
            .extract(RegionKind::Style)
            .skip_when(
                |c| c.region(RegionKind::Style).is_none() && c.content.contains(OPEN_TAG),
                "unterminated <style> region",
            )
            .clean_if_missing(RegionKind::Style)
            .clean_when(|c| {
                c.region(RegionKind::Style).is_some_and(|s| {
                    s.flags.scoped
                        || (self.allow_module && region::has_attribute(&s.attributes, "module"))
                })
            })
            .finish(|ctx| {
                let line = ctx
                    .region(RegionKind::Style)
                    .map(|s| region::line_at(ctx.content, s.tag_offset))
                    .unwrap_or(1);
                Verdict::violation(
                    Violation::new("style block is not scoped")
                        .at_line(line)
                        .with_fix("add the `scoped` attribute"),
                )
            })
    }

    fn remediator(&self) -> Option<&dyn Remediate> {
        Some(self)
    }
}

impl Remediate for ScopedStyles {
    fn can_remediate(&self, path: &Path) -> bool {
        self.applies_to(path)
    }

    fn remediate(&self, _path: &Path, content: &str) -> RemediationResult {
        let Some(style) = region::extract_style(content) else {
            return RemediationResult::failure("no complete <style> region");
        };
        if style.flags.scoped {
            return RemediationResult::unchanged(content, "style already scoped");
        }
        let at = style.tag_offset + OPEN_TAG.len();
        let fixed = format!("{} scoped{}", &content[..at], &content[at..]);
        RemediationResult::success(
            fixed,
            vec![format!(
                "added scoped attribute to <style> at line {}",
                region::line_at(content, style.tag_offset)
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UNSCOPED: &str = "<template><p/></template>\n\n<style lang=\"scss\">\n.a{}\n</style>\n";

    #[test]
    fn test_unscoped_style_flagged_at_tag_line() {
        let v = ScopedStyles::new().judge(Path::new("A.vue"), UNSCOPED);
        assert_eq!(v.violations.len(), 1);
        assert_eq!(v.violations[0].line, Some(3));
    }

    #[test]
    fn test_module_styles_follow_setting() {
        let module = "<style module>\n.a{}\n</style>";
        let mut rule = ScopedStyles::new();
        assert!(rule.judge(Path::new("A.vue"), module).is_clean());
        let mut s = Settings::new();
        s.set("allow_module", json!(false));
        rule.configure(&s);
        assert!(!rule.judge(Path::new("A.vue"), module).is_clean());
    }

    #[test]
    fn test_remediate_adds_scoped_and_fixed_content_judges_clean() {
        let rule = ScopedStyles::new();
        let r = rule.remediate(Path::new("A.vue"), UNSCOPED);
        assert!(r.succeeded);
        let fixed = r.new_content.unwrap();
        assert!(fixed.contains("<style scoped lang=\"scss\">"));
        assert!(rule.judge(Path::new("A.vue"), &fixed).is_clean());
        let again = rule.remediate(Path::new("A.vue"), &fixed);
        assert!(again.succeeded);
        assert!(!again.changes(&fixed));
    }

    #[test]
    fn test_remediate_without_style_fails() {
        let r = ScopedStyles::new().remediate(Path::new("A.vue"), "<template></template>");
        assert!(!r.succeeded);
        assert!(r.failure_reason.is_some());
    }
}
