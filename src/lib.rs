//! Block Patcher: idempotent text patching by exact/fuzzy block matching.
//!
//! Given a UTF-8 text file and an ordered list of patch rules (target block,
//! replacement block), locate each target and substitute it exactly once,
//! leaving the rest of the file untouched.
//!
//! # Matching
//!
//! Location is a two-phase strategy: an exact, case-sensitive substring
//! search first, then a whitespace-tolerant fallback that matches the target
//! line-by-line modulo indentation. Both phases treat the target as a block
//! of whole lines, anchored at line boundaries. Tolerance never loosens
//! token content (a line differing in any non-whitespace character is not a
//! match) and all target text is matched literally.
//!
//! # Idempotence
//!
//! A rule whose target is absent is a reported no-op, not an error: re-running
//! a patch over an already-patched document changes nothing. Only the first
//! occurrence of a target is ever replaced.
//!
//! # Example
//!
//! ```
//! use block_patcher::{apply, Document, PatchRule, RuleOutcome};
//!
//! let mut doc = Document::from_text("demo.txt", "A\nB\nC\n");
//! let rule = PatchRule::new("rename-b", "B", "B2");
//!
//! assert_eq!(apply(&mut doc, &rule), RuleOutcome::ExactMatchApplied);
//! assert_eq!(doc.text(), "A\nB2\nC\n");
//!
//! // Second application is a no-op.
//! assert_eq!(apply(&mut doc, &rule), RuleOutcome::NoMatchFound);
//! ```

pub mod config;
pub mod document;
pub mod matcher;
pub mod patcher;
pub mod report;
pub mod rule;
pub mod safety;

// Re-exports
pub use config::{
    apply_rule_set, check_rule_set, load_from_path, load_from_str, ApplyError, ConfigError,
    PatchSet, Preview, RuleSetParseError,
};
pub use document::{Document, DocumentError};
pub use matcher::{closest_candidate, find_block, BlockMatch, MatchPhase, NearMiss};
pub use patcher::{apply, apply_all, RuleOutcome};
pub use report::{RuleReport, RunReport, RunStatus};
pub use rule::{PatchRule, RuleSet};
pub use safety::{SafetyError, WorkspaceGuard};
