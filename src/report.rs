use crate::patcher::RuleOutcome;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Outcome of one rule against one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub rule_id: String,
    pub outcome: RuleOutcome,
}

/// Overall outcome of a run over one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Every rule found its target (by either phase).
    AllRulesApplied,
    /// At least one rule was a no-op; the run still completed.
    SomeRulesNoOp,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::AllRulesApplied => write!(f, "all-rules-applied"),
            RunStatus::SomeRulesNoOp => write!(f, "some-rules-no-op"),
        }
    }
}

/// Per-rule outcomes for one document, in rule order, plus content
/// fingerprints so the caller can verify exactly what was written.
#[derive(Debug, Clone, Serialize)]
#[must_use = "RunReport should be checked for no-op rules"]
pub struct RunReport {
    pub file: PathBuf,
    /// xxh3 of the document before any rule ran, as hex.
    pub before_fingerprint: String,
    /// xxh3 of the document after the last rule ran, as hex.
    pub after_fingerprint: String,
    pub outcomes: Vec<RuleReport>,
}

impl RunReport {
    pub fn new(
        file: PathBuf,
        before_fingerprint: u64,
        after_fingerprint: u64,
        outcomes: Vec<RuleReport>,
    ) -> Self {
        Self {
            file,
            before_fingerprint: format!("{before_fingerprint:016x}"),
            after_fingerprint: format!("{after_fingerprint:016x}"),
            outcomes,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.outcomes.iter().all(|r| r.outcome.matched()) {
            RunStatus::AllRulesApplied
        } else {
            RunStatus::SomeRulesNoOp
        }
    }

    /// True if any rule mutated the document (the file needs writing back).
    pub fn changed(&self) -> bool {
        self.outcomes.iter().any(|r| r.outcome.matched())
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.matched()).count()
    }

    pub fn no_op_count(&self) -> usize {
        self.outcomes.len() - self.applied_count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.file.display(), self.status())?;
        for rule in &self.outcomes {
            writeln!(f, "  {}: {}", rule.rule_id, rule.outcome)?;
        }
        Ok(())
    }
}
