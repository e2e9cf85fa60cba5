//! Rule-set applicator: applies a loaded rule set to the files it names.
//!
//! Rules are grouped by resolved file path so each document is read once and
//! written at most once. Within a file, rule order from the TOML is kept
//! exactly; order is caller-significant.

use crate::config::schema::PatchSet;
use crate::document::{Document, DocumentError};
use crate::patcher;
use crate::report::RunReport;
use crate::rule::RuleSet;
use crate::safety::{SafetyError, WorkspaceGuard};
use std::path::PathBuf;
use thiserror::Error;

/// Why a document's rules could not be applied at all.
///
/// Per-rule no-matches are not here: those are recorded in the `RunReport`
/// and the run continues.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Read-only evaluation of one document: the report plus both texts, so a
/// caller can render a diff without re-running anything.
#[derive(Debug, Clone)]
pub struct Preview {
    pub report: RunReport,
    pub original: String,
    pub patched: String,
}

/// Resolve and group the set's rules by file, preserving order: files in
/// first-appearance order, rules in file order within each file.
fn group_rules(
    set: &PatchSet,
    guard: &WorkspaceGuard,
) -> Vec<(PathBuf, Result<RuleSet, ApplyError>)> {
    let mut groups: Vec<(String, PathBuf, Result<RuleSet, ApplyError>)> = Vec::new();

    for definition in &set.rules {
        let raw = if set.meta.workspace_relative {
            guard.workspace_root().join(&definition.file)
        } else {
            PathBuf::from(&definition.file)
        };

        let entry = groups.iter_mut().find(|(file, _, _)| file == &definition.file);
        match entry {
            Some((_, _, Ok(rules))) => rules.push(definition.to_rule()),
            Some((_, _, Err(_))) => {}
            None => {
                let grouped = match guard.validate_path(&raw) {
                    Ok(canonical) => {
                        let mut rules = RuleSet::new();
                        rules.push(definition.to_rule());
                        (definition.file.clone(), canonical, Ok(rules))
                    }
                    Err(e) => (definition.file.clone(), raw, Err(ApplyError::Safety(e))),
                };
                groups.push(grouped);
            }
        }
    }

    groups
        .into_iter()
        .map(|(_, path, rules)| (path, rules))
        .collect()
}

/// Apply a rule set to the workspace.
///
/// Each document is loaded once, its rules applied in order, and written
/// back only if at least one rule matched. An all-no-op run leaves the file
/// byte-identical and untouched on disk.
pub fn apply_rule_set(
    set: &PatchSet,
    guard: &WorkspaceGuard,
) -> Vec<(PathBuf, Result<RunReport, ApplyError>)> {
    group_rules(set, guard)
        .into_iter()
        .map(|(path, rules)| {
            let result = rules.and_then(|rules| {
                let mut document = Document::load(&path)?;
                let report = patcher::apply_all(&mut document, &rules);
                if report.changed() {
                    guard.revalidate(&path)?;
                    document.save()?;
                }
                Ok(report)
            });
            (path, result)
        })
        .collect()
}

/// Evaluate a rule set without writing anything.
///
/// Result semantics mirror `apply_rule_set`: a report saying a rule applied
/// means it *would* apply.
pub fn check_rule_set(
    set: &PatchSet,
    guard: &WorkspaceGuard,
) -> Vec<(PathBuf, Result<Preview, ApplyError>)> {
    group_rules(set, guard)
        .into_iter()
        .map(|(path, rules)| {
            let result = rules.and_then(|rules| {
                let mut document = Document::load(&path)?;
                let original = document.text().to_string();
                let report = patcher::apply_all(&mut document, &rules);
                Ok(Preview {
                    report,
                    original,
                    patched: document.text().to_string(),
                })
            });
            (path, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;
    use crate::report::RunStatus;
    use std::fs;

    fn workspace_with(file: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        dir
    }

    #[test]
    fn test_apply_writes_patched_file() {
        let dir = workspace_with("app.txt", "A\nB\nC\n");
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let set = load_from_str(
            r#"
[meta]
name = "test"
workspace_relative = true

[[rules]]
id = "r1"
file = "app.txt"
target = "B"
replacement = "B2"
"#,
        )
        .unwrap();

        let results = apply_rule_set(&set, &guard);
        assert_eq!(results.len(), 1);
        let report = results[0].1.as_ref().unwrap();
        assert_eq!(report.status(), RunStatus::AllRulesApplied);

        assert_eq!(
            fs::read_to_string(dir.path().join("app.txt")).unwrap(),
            "A\nB2\nC\n"
        );
    }

    #[test]
    fn test_apply_skips_write_when_nothing_matched() {
        let dir = workspace_with("app.txt", "A\nB\nC\n");
        let guard = WorkspaceGuard::new(dir.path()).unwrap();
        let before_mtime = fs::metadata(dir.path().join("app.txt"))
            .unwrap()
            .modified()
            .unwrap();

        let set = load_from_str(
            r#"
[meta]
workspace_relative = true

[[rules]]
id = "r1"
file = "app.txt"
target = "Z"
replacement = "Z2"
"#,
        )
        .unwrap();

        let results = apply_rule_set(&set, &guard);
        let report = results[0].1.as_ref().unwrap();
        assert_eq!(report.status(), RunStatus::SomeRulesNoOp);

        let after_mtime = fs::metadata(dir.path().join("app.txt"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(before_mtime, after_mtime);
        assert_eq!(
            fs::read_to_string(dir.path().join("app.txt")).unwrap(),
            "A\nB\nC\n"
        );
    }

    #[test]
    fn test_missing_file_is_per_file_failure() {
        let dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let set = load_from_str(
            r#"
[meta]
workspace_relative = true

[[rules]]
id = "r1"
file = "gone.txt"
target = "x"
replacement = "y"
"#,
        )
        .unwrap();

        let results = apply_rule_set(&set, &guard);
        assert!(results[0].1.is_err());
    }

    #[test]
    fn test_rules_for_one_file_share_a_document() {
        let dir = workspace_with("app.txt", "A\nB\nC\n");
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        // r2's target only exists after r1 has run.
        let set = load_from_str(
            r#"
[meta]
workspace_relative = true

[[rules]]
id = "r1"
file = "app.txt"
target = "B"
replacement = "B2"

[[rules]]
id = "r2"
file = "app.txt"
target = "A\nB2"
replacement = "X"
"#,
        )
        .unwrap();

        let results = apply_rule_set(&set, &guard);
        assert_eq!(results.len(), 1);
        let report = results[0].1.as_ref().unwrap();
        assert_eq!(report.status(), RunStatus::AllRulesApplied);

        assert_eq!(
            fs::read_to_string(dir.path().join("app.txt")).unwrap(),
            "X\nC\n"
        );
    }

    #[test]
    fn test_check_leaves_file_untouched() {
        let dir = workspace_with("app.txt", "A\nB\nC\n");
        let guard = WorkspaceGuard::new(dir.path()).unwrap();

        let set = load_from_str(
            r#"
[meta]
workspace_relative = true

[[rules]]
id = "r1"
file = "app.txt"
target = "B"
replacement = "B2"
"#,
        )
        .unwrap();

        let results = check_rule_set(&set, &guard);
        let preview = results[0].1.as_ref().unwrap();
        assert_eq!(preview.original, "A\nB\nC\n");
        assert_eq!(preview.patched, "A\nB2\nC\n");
        assert!(preview.report.changed());

        assert_eq!(
            fs::read_to_string(dir.path().join("app.txt")).unwrap(),
            "A\nB\nC\n"
        );
    }
}
