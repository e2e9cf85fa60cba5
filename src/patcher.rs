//! Rule application over an in-memory document.
//!
//! `apply` is a pure-by-value operation on the buffer: it either splices the
//! replacement over exactly one contiguous region or leaves the document
//! byte-identical. Persistence is the caller's concern.

use crate::document::Document;
use crate::matcher::{self, MatchPhase};
use crate::report::{RuleReport, RunReport};
use crate::rule::{PatchRule, RuleSet};
use serde::Serialize;
use std::fmt;

/// What happened to one rule.
///
/// `NoMatchFound` is not an error: a target block may already have been
/// patched in a prior run, which is exactly the idempotence contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleOutcome {
    ExactMatchApplied,
    FallbackMatchApplied,
    NoMatchFound,
}

impl RuleOutcome {
    /// True if either phase located and replaced the target.
    pub fn matched(&self) -> bool {
        !matches!(self, RuleOutcome::NoMatchFound)
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::ExactMatchApplied => write!(f, "exact-match-applied"),
            RuleOutcome::FallbackMatchApplied => write!(f, "fallback-match-applied"),
            RuleOutcome::NoMatchFound => write!(f, "no-match-found"),
        }
    }
}

/// Apply one rule to the document.
///
/// Exact phase first; the whitespace-tolerant fallback only runs when the
/// exact form is absent. Only the first occurrence is ever replaced.
pub fn apply(document: &mut Document, rule: &PatchRule) -> RuleOutcome {
    match matcher::find_block(document.text(), rule.target()) {
        Some(m) => {
            document.splice(m.byte_start, m.byte_end, rule.replacement());
            match m.phase {
                MatchPhase::Exact => RuleOutcome::ExactMatchApplied,
                MatchPhase::Fallback => RuleOutcome::FallbackMatchApplied,
            }
        }
        None => RuleOutcome::NoMatchFound,
    }
}

/// Apply every rule in caller order over the evolving document.
///
/// A later rule's target may depend on an earlier rule's replacement having
/// already landed, so order is preserved exactly.
pub fn apply_all(document: &mut Document, rules: &RuleSet) -> RunReport {
    let before = document.fingerprint();

    let outcomes = rules
        .rules()
        .iter()
        .map(|rule| RuleReport {
            rule_id: rule.id().to_string(),
            outcome: apply(document, rule),
        })
        .collect();

    RunReport::new(
        document.path().to_path_buf(),
        before,
        document.fingerprint(),
        outcomes,
    )
}
