//! Built-in rule catalog.
//!
//! Every entry carries the source text of its implementation so the config
//! synchronizer can suggest the settings keys a rule reads.

pub mod max_file_lines;
pub mod no_todo;
pub mod scoped_styles;
pub mod script_typed;
pub mod template_inline_style;
pub mod trailing_whitespace;

use crate::rule::RuleRef;

/// All built-in rules, in catalog order.
pub fn catalog() -> Vec<RuleRef> {
    vec![
        RuleRef::new(no_todo::ID, &[], include_str!("no_todo.rs"), || {
            Box::new(no_todo::NoTodo::new())
        }),
        RuleRef::new(
            max_file_lines::ID,
            &[],
            include_str!("max_file_lines.rs"),
            || Box::new(max_file_lines::MaxFileLines::new()),
        ),
        RuleRef::new(
            trailing_whitespace::ID,
            &[],
            include_str!("trailing_whitespace.rs"),
            || Box::new(trailing_whitespace::TrailingWhitespace),
        ),
        RuleRef::new(
            template_inline_style::ID,
            &["vue"],
            include_str!("template_inline_style.rs"),
            || Box::new(template_inline_style::TemplateInlineStyle::new()),
        ),
        RuleRef::new(
            script_typed::ID,
            &["vue"],
            include_str!("script_typed.rs"),
            || Box::new(script_typed::ScriptTyped::new()),
        ),
        RuleRef::new(
            scoped_styles::ID,
            &["vue"],
            include_str!("scoped_styles.rs"),
            || Box::new(scoped_styles::ScopedStyles::new()),
        ),
    ]
}

/// Catalog entry by id.
pub fn lookup(id: &str) -> Option<RuleRef> {
    catalog().into_iter().find(|r| r.id == id)
}
