//! Static `style="..."` attributes inside the presentation region.

use crate::models::Verdict;
use crate::pattern::PatternSet;
use crate::pipeline::Context;
use crate::region::RegionKind;
use crate::rule::{Rule, Settings};
use std::path::Path;

pub const ID: &str = "template-inline-style";

// Matches at line start or after blanks on the same line, so the reported
// line is the attribute's own line. Bound `:style` is not matched.
const INLINE_STYLE: &str = r#"(?m)(?:^[ \t]*|[ \t]+)style\s*=\s*(?:"[^"]*"|'[^']*')"#;

pub struct TemplateInlineStyle {
    patterns: PatternSet,
    path_filter: String,
}

impl TemplateInlineStyle {
    pub fn new() -> Self {
        let patterns = PatternSet::new()
            .with("inline-style", INLINE_STYLE)
            .unwrap_or_default();
        Self {
            patterns,
            path_filter: String::new(),
        }
    }
}

impl Default for TemplateInlineStyle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for TemplateInlineStyle {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "No inline styles in templates"
    }

    fn description(&self) -> &str {
        "Template markup must not carry static style attributes"
    }

    fn file_types(&self) -> Vec<String> {
        vec!["vue".into()]
    }

    fn configure(&mut self, settings: &Settings) {
        self.path_filter = settings.str_or("path_filter", "");
    }

    fn judge(&self, path: &Path, content: &str) -> Verdict {
        Context::new(path, content)
            .extract(RegionKind::Presentation)
            .skip_when(
                |c| c.region(RegionKind::Presentation).is_none() && c.content.contains("<template"),
                "unterminated <template> region",
            )
            .clean_if_missing(RegionKind::Presentation)
            .clean_when(|c| {
                !self.path_filter.is_empty()
                    && !c.path.to_string_lossy().replace('\\', "/").contains(&self.path_filter)
            })
            .match_region(RegionKind::Presentation, &self.patterns)
            .finish(|ctx| {
                let mut v = ctx.violations_from_matches(|_| {
                    "inline style attribute in template".to_string()
                });
                for found in v.violations.iter_mut() {
                    found.suggested_fix = Some("move the declarations into the <style> block".into());
                }
                v
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VUE: &str = "<template>\n  <div\n    style=\"color: red\"\n    :style=\"dyn\">\n    <p style='x'>a</p>\n  </div>\n</template>\n<style>\n.a { color: red }\n</style>\n";

    #[test]
    fn test_flags_static_styles_on_their_lines() {
        let v = TemplateInlineStyle::new().judge(Path::new("A.vue"), VUE);
        let lines: Vec<_> = v.violations.iter().map(|x| x.line).collect();
        assert_eq!(lines, vec![Some(3), Some(5)]);
    }

    #[test]
    fn test_no_template_is_clean_and_unterminated_is_skipped() {
        let rule = TemplateInlineStyle::new();
        assert!(rule.judge(Path::new("A.vue"), "<script>x</script>").is_clean());
        let v = rule.judge(Path::new("A.vue"), "<template><div style=\"a\">");
        assert!(v.skipped);
        assert!(v.violations.is_empty());
    }

    #[test]
    fn test_path_filter() {
        let mut rule = TemplateInlineStyle::new();
        let mut s = Settings::new();
        s.set("path_filter", json!("components/"));
        rule.configure(&s);
        assert!(rule.judge(Path::new("pages/A.vue"), VUE).is_clean());
        assert_eq!(rule.judge(Path::new("src/components/A.vue"), VUE).violations.len(), 2);
    }
}
