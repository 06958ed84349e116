//! Short-circuiting judgment pipeline.
//!
//! A rule reads as a flat chain of steps over a [`Context`]:
//!
//! ```
//! use canon::pipeline::Context;
//! use canon::pattern::PatternSet;
//! use canon::region::RegionKind;
//! use std::path::Path;
//!
//! let set = PatternSet::new().literal("inline-style", "style=\"");
//! let verdict = Context::new(Path::new("views/App.vue"), "<template><a style=\"x\"></template>")
//!     .extract(RegionKind::Presentation)
//!     .clean_if_missing(RegionKind::Presentation)
//!     .only_under("views/")
//!     .match_region(RegionKind::Presentation, &set)
//!     .finish(|ctx| ctx.violations_from_matches(|m| format!("found {}", m.pattern)));
//! assert_eq!(verdict.violations.len(), 1);
//! ```
//!
//! Once a step settles the context (early verdict or skip reason), every
//! later step passes it through untouched.

use crate::models::{Verdict, Violation};
use crate::pattern::{PatternMatch, PatternSet};
use crate::region::{self, Region, RegionKind};
use std::path::Path;

/// A pure transform over the pipeline context.
pub type Step<'s> = Box<dyn for<'a> Fn(Context<'a>) -> Context<'a> + 's>;

/// Box a closure as a [`Step`].
pub fn step<'s, F>(f: F) -> Step<'s>
where
    F: for<'a> Fn(Context<'a>) -> Context<'a> + 's,
{
    Box::new(f)
}

#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub path: &'a Path,
    pub content: &'a str,
    pub regions: Vec<Region>,
    pub matches: Vec<PatternMatch>,
    pub early: Option<Verdict>,
    pub skip_reason: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(path: &'a Path, content: &'a str) -> Self {
        Self {
            path,
            content,
            regions: Vec::new(),
            matches: Vec::new(),
            early: None,
            skip_reason: None,
        }
    }

    /// True once an early verdict or a skip reason has been recorded.
    pub fn is_settled(&self) -> bool {
        self.early.is_some() || self.skip_reason.is_some()
    }

    /// Apply `step` unless the context is already settled.
    pub fn then<F>(self, step: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if self.is_settled() {
            self
        } else {
            step(self)
        }
    }

    /// Apply an ordered list of steps.
    pub fn run(self, steps: &[Step<'_>]) -> Self {
        steps.iter().fold(self, |ctx, step| ctx.then(|c| step(c)))
    }

    pub fn region(&self, kind: RegionKind) -> Option<&Region> {
        self.regions.iter().find(|r| r.kind == kind)
    }

    pub fn settle(mut self, verdict: Verdict) -> Self {
        self.early = Some(verdict);
        self
    }

    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// Extract a region of `kind`; a missing region leaves the context unchanged.
    pub fn extract(self, kind: RegionKind) -> Self {
        self.then(|mut ctx| {
            if ctx.region(kind).is_none() {
                if let Some(r) = region::extract(kind, ctx.content) {
                    ctx.regions.push(r);
                }
            }
            ctx
        })
    }

    /// Settle clean when no region of `kind` was extracted.
    pub fn clean_if_missing(self, kind: RegionKind) -> Self {
        self.then(|ctx| {
            if ctx.region(kind).is_none() {
                ctx.settle(Verdict::clean())
            } else {
                ctx
            }
        })
    }

    /// Skip when no region of `kind` was extracted.
    pub fn skip_if_missing(self, kind: RegionKind, reason: &str) -> Self {
        self.then(|ctx| {
            if ctx.region(kind).is_none() {
                ctx.skip(reason)
            } else {
                ctx
            }
        })
    }

    /// Settle clean unless the file path contains `fragment`.
    pub fn only_under(self, fragment: &str) -> Self {
        self.then(|ctx| {
            let p = ctx.path.to_string_lossy().replace('\\', "/");
            if p.contains(fragment) {
                ctx
            } else {
                ctx.settle(Verdict::clean())
            }
        })
    }

    /// Settle clean when `pred` holds.
    pub fn clean_when<P>(self, pred: P) -> Self
    where
        P: FnOnce(&Self) -> bool,
    {
        self.then(|ctx| {
            if pred(&ctx) {
                ctx.settle(Verdict::clean())
            } else {
                ctx
            }
        })
    }

    /// Skip with `reason` when `pred` holds.
    pub fn skip_when<P>(self, pred: P, reason: &str) -> Self
    where
        P: FnOnce(&Self) -> bool,
    {
        self.then(|ctx| if pred(&ctx) { ctx.skip(reason) } else { ctx })
    }

    /// Settle with the verdict `decide` returns, if any.
    pub fn decide<D>(self, decide: D) -> Self
    where
        D: FnOnce(&Self) -> Option<Verdict>,
    {
        self.then(|ctx| match decide(&ctx) {
            Some(v) => ctx.settle(v),
            None => ctx,
        })
    }

    /// Run `set` against the region of `kind` (no-op if absent).
    pub fn match_region(self, kind: RegionKind, set: &PatternSet) -> Self {
        self.then(|mut ctx| {
            let found = ctx.region(kind).map(|r| set.run_region(r)).unwrap_or_default();
            ctx.matches.extend(found);
            ctx
        })
    }

    /// Run `set` against the whole file.
    pub fn match_file(self, set: &PatternSet) -> Self {
        self.then(|mut ctx| {
            let found = set.run(ctx.content);
            ctx.matches.extend(found);
            ctx
        })
    }

    /// Resolve the pipeline: skip reason first, then the early verdict,
    /// otherwise whatever `format` builds from the accumulated matches.
    pub fn finish<F>(self, format: F) -> Verdict
    where
        F: FnOnce(&Self) -> Verdict,
    {
        if let Some(reason) = self.skip_reason {
            return Verdict::skipped(reason);
        }
        if let Some(v) = self.early {
            return v;
        }
        format(&self)
    }

    /// One violation per accumulated match, located in the original file.
    pub fn violations_from_matches<M>(&self, message: M) -> Verdict
    where
        M: Fn(&PatternMatch) -> String,
    {
        Verdict::violations(
            self.matches
                .iter()
                .map(|m| {
                    Violation::new(message(m))
                        .at_line(m.line(self.content))
                        .at_column(m.column(self.content))
                        .with_snippet(m.snippet.clone())
                })
                .collect(),
        )
    }
}
