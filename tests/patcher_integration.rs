//! End-to-end tests: real files on disk, full load-patch-save cycle.

use block_patcher::{
    apply_all, apply_rule_set, load_from_str, Document, DocumentError, RuleSet, RunStatus,
    WorkspaceGuard,
};
use std::fs;
use tempfile::TempDir;

const DASHBOARD: &str = r#"export function Dashboard() {
    return (
        <table>
            <td className="py-4 px-4 text-right">
                <button onClick={() => transfer(m)}>
                    Virement
                </button>
            </td>
        </table>
    );
}
"#;

fn workspace_with_dashboard() -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("dashboard.tsx"), DASHBOARD).unwrap();
    dir
}

#[test]
fn exact_patch_survives_save_and_reload() {
    let dir = workspace_with_dashboard();
    let path = dir.path().join("src/dashboard.tsx");

    let rules = RuleSet::new().rule(
        "add-retirer",
        "                <button onClick={() => transfer(m)}>\n                    Virement\n                </button>",
        "                <button onClick={() => transfer(m)}>\n                    Virement\n                </button>\n                <button onClick={() => demote(m)}>\n                    Retirer\n                </button>",
    );

    let mut doc = Document::load(&path).unwrap();
    let report = apply_all(&mut doc, &rules);
    assert_eq!(report.status(), RunStatus::AllRulesApplied);
    doc.save().unwrap();

    let patched = fs::read_to_string(&path).unwrap();
    assert!(patched.contains("Retirer"));
    // The rest of the file is untouched.
    assert!(patched.starts_with("export function Dashboard()"));
    assert!(patched.ends_with(");\n}\n"));
}

#[test]
fn rerun_is_a_recorded_no_op() {
    let dir = workspace_with_dashboard();
    let path = dir.path().join("src/dashboard.tsx");

    let rules = RuleSet::new().rule("rename", "Virement", "Transfert");

    let mut doc = Document::load(&path).unwrap();
    let first = apply_all(&mut doc, &rules);
    assert_eq!(first.status(), RunStatus::AllRulesApplied);
    doc.save().unwrap();

    // Second run over the already-patched file: no-op, file unchanged.
    let snapshot = fs::read_to_string(&path).unwrap();
    let mut doc = Document::load(&path).unwrap();
    let second = apply_all(&mut doc, &rules);
    assert_eq!(second.status(), RunStatus::SomeRulesNoOp);
    assert!(!second.changed());
    doc.save().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), snapshot);
}

#[test]
fn fallback_matches_a_reindented_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.py");
    // The file was reformatted since the rule was written: deeper indentation.
    fs::write(
        &path,
        "def user_payload(db_user):\n        return {\n                \"is_active\": db_user.is_active\n        }\n",
    )
    .unwrap();

    let rules = RuleSet::new().rule(
        "add-onboarding",
        "return {\n    \"is_active\": db_user.is_active\n}",
        "return {\n    \"is_active\": db_user.is_active,\n    \"onboarding_completed\": db_user.onboarding_completed\n}",
    );

    let mut doc = Document::load(&path).unwrap();
    let report = apply_all(&mut doc, &rules);
    assert_eq!(report.status(), RunStatus::AllRulesApplied);
    doc.save().unwrap();

    assert!(fs::read_to_string(&path)
        .unwrap()
        .contains("onboarding_completed"));
}

#[test]
fn missing_file_is_read_failure_and_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.txt");

    let result = Document::load(&path);
    assert!(matches!(result, Err(DocumentError::Read { .. })));
    assert!(!path.exists());
}

#[test]
fn rule_set_file_applies_in_order_across_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "A\nB\nC\n").unwrap();
    fs::write(dir.path().join("b.txt"), "one\ntwo\n").unwrap();

    let guard = WorkspaceGuard::new(dir.path()).unwrap();
    let set = load_from_str(
        r#"
[meta]
name = "two-files"
workspace_relative = true

[[rules]]
id = "step1"
file = "a.txt"
target = "B"
replacement = "B2"

[[rules]]
id = "step2"
file = "a.txt"
target = "A\nB2"
replacement = "X"

[[rules]]
id = "other-file"
file = "b.txt"
target = "two"
replacement = "three"
"#,
    )
    .unwrap();

    let results = apply_rule_set(&set, &guard);
    assert_eq!(results.len(), 2);
    for (_, result) in &results {
        assert_eq!(result.as_ref().unwrap().status(), RunStatus::AllRulesApplied);
    }

    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "X\nC\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "one\nthree\n"
    );
}

#[test]
fn reversed_rule_order_leaves_dependent_rule_unmatched() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "A\nB\nC\n").unwrap();

    let guard = WorkspaceGuard::new(dir.path()).unwrap();
    let set = load_from_str(
        r#"
[meta]
workspace_relative = true

[[rules]]
id = "step2"
file = "a.txt"
target = "A\nB2"
replacement = "X"

[[rules]]
id = "step1"
file = "a.txt"
target = "B"
replacement = "B2"
"#,
    )
    .unwrap();

    let results = apply_rule_set(&set, &guard);
    let report = results[0].1.as_ref().unwrap();
    assert_eq!(report.status(), RunStatus::SomeRulesNoOp);
    assert!(!report.outcomes[0].outcome.matched());
    assert!(report.outcomes[1].outcome.matched());

    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "A\nB2\nC\n"
    );
}

#[test]
fn fingerprints_verify_what_was_written() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.txt");
    fs::write(&path, "A\nB\nC\n").unwrap();

    let rules = RuleSet::new().rule("r", "B", "B2");
    let mut doc = Document::load(&path).unwrap();
    let report = apply_all(&mut doc, &rules);
    doc.save().unwrap();

    // The after-fingerprint matches a fresh load of what landed on disk.
    let reloaded = Document::load(&path).unwrap();
    assert_eq!(
        report.after_fingerprint,
        format!("{:016x}", reloaded.fingerprint())
    );
    assert_ne!(report.before_fingerprint, report.after_fingerprint);
}
