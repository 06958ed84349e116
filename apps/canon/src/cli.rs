//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canon",
    version,
    about = "Convention checks for source trees",
    long_about = "Canon — judge source files against configured convention rules, fix what can be fixed, and acknowledge the rest.\n\nConfiguration precedence: CLI > canon.toml > defaults.",
    after_help = "Examples:\n  canon judge\n  canon judge --group web --output json src/App.vue\n  canon fix --dry-run\n  canon ack add src/Legacy.vue script-typed --reason \"migrating in Q3\"\n  canon sync --check",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, global = true, help = "Repository root (default: current dir)")]
    pub root: Option<String>,
    #[arg(long, global = true, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current canon version.")]
    Version,
    /// Judge files against group rules
    #[command(
        about = "Run convention checks",
        long_about = "Judge every candidate file of each group (or only --group), or just the FILES given. Violations make the command exit 1.",
        after_help = "Examples:\n  canon judge\n  canon judge --group web src/App.vue"
    )]
    Judge {
        #[arg(long, help = "Only this rule group")]
        group: Option<String>,
        #[arg(help = "Explicit files to judge instead of scanning")]
        files: Vec<String>,
    },
    /// Apply auto-fixes
    #[command(
        about = "Apply auto-fixes",
        long_about = "Run remediable rules on non-clean files. Each write keeps a <file>.canon-bak backup until the overwrite succeeds.",
        after_help = "Examples:\n  canon fix --dry-run\n  canon fix --group web src/App.vue"
    )]
    Fix {
        #[arg(long, help = "Only this rule group")]
        group: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Report fixes without writing")]
        dry_run: bool,
        #[arg(help = "Explicit files to fix instead of scanning")]
        files: Vec<String>,
    },
    /// Acknowledgment management (add/revoke/status/cleanup)
    Ack {
        #[command(subcommand)]
        cmd: AckCmd,
    },
    /// List registered rules with ordinals
    #[command(about = "List rules", long_about = "List supported rules per group with their ordinals.")]
    Rules {
        #[arg(long, help = "Only this rule group")]
        group: Option<String>,
    },
    /// Add discoverable rules missing from canon.toml
    #[command(
        about = "Sync rule lists",
        long_about = "Add built-in rules that apply to a group but are not listed in its rules array. The document is patched in place; comments and layout are preserved.",
        after_help = "Examples:\n  canon sync --check\n  canon sync --write"
    )]
    Sync {
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Apply changes to canon.toml")]
        write: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit non-zero if changes would occur")]
        check: bool,
    },
}

#[derive(Subcommand)]
/// Subcommands for `canon ack`
pub enum AckCmd {
    /// Acknowledge a rule's findings on a file
    #[command(about = "Acknowledge", long_about = "Record that FILE knowingly deviates from RULE at its current content.")]
    Add {
        file: String,
        rule: String,
        #[arg(long, help = "Why the deviation is accepted")]
        reason: Option<String>,
    },
    /// Remove an acknowledgment
    #[command(about = "Revoke acknowledgment")]
    Revoke { file: String, rule: String },
    /// Show whether an acknowledgment exists and is still fresh
    #[command(about = "Acknowledgment status")]
    Status { file: String, rule: String },
    /// Drop acknowledgments of files that no longer exist
    #[command(about = "Clean up stale entries")]
    Cleanup,
}
