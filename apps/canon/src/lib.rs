//! Canon core library.
//!
//! This crate exposes programmatic APIs for judging source files against
//! named groups of convention rules, auto-fixing what rules can fix,
//! acknowledging known deviations, and keeping the configuration's rule
//! lists in sync with the built-in catalog.
//!
//! High-level modules:
//! - `models`: Verdict, Violation, Advisory and Summary values.
//! - `region`, `pattern`, `pipeline`: sub-document extraction and the
//!   short-circuiting rule pipeline built on it.
//! - `rule`, `registry`: the rule contract and per-group registration.
//! - `scan`, `judge`: candidate discovery and the judge/remediate orchestrator.
//! - `remediate`: auto-fix results and the backup-write protocol.
//! - `acknowledge`: persisted acknowledgments with content drift detection.
//! - `sync`: source-preserving patching of `canon.toml` rule lists.
//! - `rules`: built-in rule catalog.
//! - `config`: discovery and effective configuration resolution.
//! - `cli`, `output`: CLI parsing and human/JSON printers.
pub mod acknowledge;
pub mod cli;
pub mod config;
pub mod error;
pub mod judge;
pub mod models;
pub mod output;
pub mod pattern;
pub mod pipeline;
pub mod region;
pub mod registry;
pub mod remediate;
pub mod rule;
pub mod rules;
pub mod scan;
pub mod sync;
