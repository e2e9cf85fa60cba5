use crate::rule::PatchRule;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// A rule-set file: `[meta]` plus an ordered `[[rules]]` array.
///
/// Rule order in the file is the application order, and it matters: a later
/// rule's target may only exist after an earlier rule's replacement.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// When true, `file` fields resolve against the workspace root.
    #[serde(default)]
    pub workspace_relative: bool,
}

/// One rule as written in TOML: which file, what to find, what to put there.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub id: String,
    pub file: String,
    /// Literal target block, matched exactly or with indentation tolerance.
    pub target: String,
    /// Literal replacement block; may add, remove, or reorder lines.
    pub replacement: String,
}

impl RuleDefinition {
    pub fn to_rule(&self) -> PatchRule {
        PatchRule::new(&self.id, &self.target, &self.replacement)
    }
}

impl PatchSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen_ids = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen_ids.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }
            if rule.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "file",
                });
            }
            // Blocks must be non-empty; an empty target would match nothing
            // and an empty replacement is a deletion this tool does not do.
            if rule.target.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "target",
                });
            }
            if rule.replacement.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "replacement",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Why rule-set text could not become a usable `PatchSet`.
#[derive(Error, Debug)]
pub enum RuleSetParseError {
    #[error("malformed rule set TOML: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("invalid rule set: {0}")]
    Invalid(#[from] ValidationError),
}

/// Why a rule-set file could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read rule set {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule set {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: RuleSetParseError,
    },
}

impl FromStr for PatchSet {
    type Err = RuleSetParseError;

    /// Parse and validate rule-set TOML in one step; a `PatchSet` that
    /// exists has already passed validation.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let set: PatchSet = toml_edit::de::from_str(input)?;
        set.validate()?;
        Ok(set)
    }
}

pub fn load_from_str(input: &str) -> Result<PatchSet, RuleSetParseError> {
    input.parse()
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    contents.parse().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "duplicate rule id '{rule_id}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str, target: &str, replacement: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            file: "src/app.tsx".to_string(),
            target: target.to_string(),
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let set = PatchSet {
            meta: Metadata::default(),
            rules: vec![definition("r1", "old", "new")],
        };
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_rule_list() {
        let set = PatchSet::default();
        let err = set.validate().unwrap_err();
        assert!(matches!(err.issues[0], ValidationIssue::EmptyRuleList));
    }

    #[test]
    fn test_validate_empty_blocks() {
        let set = PatchSet {
            meta: Metadata::default(),
            rules: vec![definition("r1", "", "")],
        };
        let err = set.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let set = PatchSet {
            meta: Metadata::default(),
            rules: vec![definition("r1", "a", "b"), definition("r1", "c", "d")],
        };
        let err = set.validate().unwrap_err();
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::DuplicateId { .. })));
    }
}
