use anyhow::Result;
use block_patcher::{
    apply_rule_set, check_rule_set, closest_candidate, load_from_path, PatchSet, Preview,
    RuleOutcome, WorkspaceGuard,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Below this similarity a "closest candidate" hint is more noise than help.
const NEAR_MISS_THRESHOLD: f64 = 0.6;

#[derive(Parser)]
#[command(name = "block-patcher")]
#[command(about = "Idempotent text patching by exact/fuzzy block matching", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rule sets to a workspace
    Apply {
        /// Path to workspace root (defaults to PATCHER_WORKSPACE or cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific rule file to apply (otherwise applies all in patches/)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Emit the run reports as JSON instead of human-readable output
        #[arg(short, long)]
        json: bool,
    },

    /// Evaluate rule sets without writing anything
    Status {
        /// Path to workspace root (defaults to PATCHER_WORKSPACE or cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Emit the run reports as JSON instead of human-readable output
        #[arg(short, long)]
        json: bool,
    },

    /// List discovered rule files and the rules they carry
    List {
        /// Path to workspace root (defaults to PATCHER_WORKSPACE or cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            workspace,
            rules,
            dry_run,
            diff,
            json,
        } => cmd_apply(workspace, rules, dry_run, diff, json),

        Commands::Status { workspace, json } => cmd_status(workspace, json),

        Commands::List { workspace } => cmd_list(workspace),
    }
}

/// Discover all .toml rule files in a patches/ directory.
///
/// Discovery order:
/// 1. `<workspace>/patches` (keeps rule files alongside the target tree).
/// 2. `./patches` relative to the current working directory.
fn discover_rule_files(workspace: &Path) -> Result<Vec<PathBuf>> {
    let cwd_patches_dir = env::current_dir().ok().map(|cwd| cwd.join("patches"));
    let workspace_patches_dir = workspace.join("patches");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(workspace_patches_dir)
        .chain(cwd_patches_dir)
        .collect();

    for patches_dir in candidate_dirs {
        if !patches_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&patches_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml rule files found in either ./patches or {}/patches",
        workspace.display()
    )
}

/// Resolve workspace path.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("PATCHER_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: PATCHER_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?.canonicalize()?)
}

/// Show unified diff between original and patched content.
fn display_diff(file: &Path, original: &str, patched: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, patched);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_outcome_line(rule_id: &str, outcome: RuleOutcome) {
    let line = format!("  {}: {}", rule_id, outcome);
    match outcome {
        RuleOutcome::ExactMatchApplied | RuleOutcome::FallbackMatchApplied => {
            println!("{}", line.green());
        }
        RuleOutcome::NoMatchFound => println!("{}", line.yellow()),
    }
}

/// For a no-op rule, point at the most similar region so a stale target
/// block can be repaired.
fn print_near_miss_hint(set: &PatchSet, rule_id: &str, content: &str) {
    let Some(definition) = set.rules.iter().find(|r| r.id == rule_id) else {
        return;
    };
    if let Some(miss) = closest_candidate(content, &definition.target) {
        if miss.similarity >= NEAR_MISS_THRESHOLD {
            println!(
                "{}",
                format!(
                    "    closest candidate at line {} (similarity {:.2})",
                    miss.line, miss.similarity
                )
                .dimmed()
            );
        }
    }
}

fn cmd_apply(
    workspace: Option<PathBuf>,
    rules: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let guard = WorkspaceGuard::new(&workspace)?;

    let rule_files = if let Some(path) = rules {
        vec![path]
    } else {
        discover_rule_files(&workspace)?
    };

    if !json {
        println!("Workspace: {}", workspace.display());
        if dry_run {
            println!("{}", "Dry run - no files will be modified".yellow());
        }
        println!();
    }

    let mut total_applied = 0;
    let mut total_no_op = 0;
    let mut total_failed = 0;
    let mut json_reports = Vec::new();

    for rule_file in rule_files {
        let set = load_from_path(&rule_file)?;
        if !json {
            println!(
                "{}",
                format!("Rule set '{}' ({})", set.meta.name, rule_file.display()).bold()
            );
        }

        if dry_run {
            let results = check_rule_set(&set, &guard);
            for (file, result) in results {
                match result {
                    Ok(Preview {
                        report,
                        original,
                        patched,
                    }) => {
                        total_applied += report.applied_count();
                        total_no_op += report.no_op_count();
                        if json {
                            json_reports.push(serde_json::to_value(&report)?);
                            continue;
                        }
                        for rule in &report.outcomes {
                            print_outcome_line(&rule.rule_id, rule.outcome);
                            if !rule.outcome.matched() {
                                print_near_miss_hint(&set, &rule.rule_id, &original);
                            }
                        }
                        if show_diff && report.changed() {
                            display_diff(&file, &original, &patched);
                        }
                    }
                    Err(e) => {
                        total_failed += 1;
                        report_file_failure(&file, &e.to_string(), json, &mut json_reports)?;
                    }
                }
            }
        } else {
            // Capture previews first so --diff can show what the write changed.
            let previews = if show_diff {
                Some(check_rule_set(&set, &guard))
            } else {
                None
            };

            let results = apply_rule_set(&set, &guard);
            for (file, result) in results {
                match result {
                    Ok(report) => {
                        total_applied += report.applied_count();
                        total_no_op += report.no_op_count();
                        if json {
                            json_reports.push(serde_json::to_value(&report)?);
                            continue;
                        }
                        for rule in &report.outcomes {
                            print_outcome_line(&rule.rule_id, rule.outcome);
                            if !rule.outcome.matched() {
                                if let Ok(content) = fs::read_to_string(&file) {
                                    print_near_miss_hint(&set, &rule.rule_id, &content);
                                }
                            }
                        }
                        if let Some(previews) = &previews {
                            if let Some((_, Ok(preview))) =
                                previews.iter().find(|(f, _)| f == &file)
                            {
                                if preview.report.changed() {
                                    display_diff(&file, &preview.original, &preview.patched);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        total_failed += 1;
                        report_file_failure(&file, &e.to_string(), json, &mut json_reports)?;
                    }
                }
            }
        }

        if !json {
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    } else {
        println!(
            "{} applied, {} no-op, {} failed",
            total_applied.to_string().green(),
            total_no_op.to_string().yellow(),
            total_failed.to_string().red()
        );
    }

    if total_failed > 0 {
        anyhow::bail!("{} file(s) failed", total_failed);
    }

    Ok(())
}

fn report_file_failure(
    file: &Path,
    reason: &str,
    json: bool,
    json_reports: &mut Vec<serde_json::Value>,
) -> Result<()> {
    if json {
        json_reports.push(serde_json::json!({
            "file": file.display().to_string(),
            "error": reason,
        }));
    } else {
        println!("{}", format!("  {}: {}", file.display(), reason).red());
    }
    Ok(())
}

fn cmd_status(workspace: Option<PathBuf>, json: bool) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let guard = WorkspaceGuard::new(&workspace)?;
    let rule_files = discover_rule_files(&workspace)?;

    let mut json_reports = Vec::new();

    for rule_file in rule_files {
        let set = load_from_path(&rule_file)?;
        if !json {
            println!(
                "{}",
                format!("Rule set '{}' ({})", set.meta.name, rule_file.display()).bold()
            );
        }

        for (file, result) in check_rule_set(&set, &guard) {
            match result {
                Ok(preview) => {
                    if json {
                        json_reports.push(serde_json::to_value(&preview.report)?);
                        continue;
                    }
                    println!("  {}: {}", file.display(), preview.report.status());
                    for rule in &preview.report.outcomes {
                        print_outcome_line(&rule.rule_id, rule.outcome);
                        if !rule.outcome.matched() {
                            print_near_miss_hint(&set, &rule.rule_id, &preview.original);
                        }
                    }
                }
                Err(e) => {
                    report_file_failure(&file, &e.to_string(), json, &mut json_reports)?;
                }
            }
        }

        if !json {
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    Ok(())
}

fn cmd_list(workspace: Option<PathBuf>) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let rule_files = discover_rule_files(&workspace)?;

    for rule_file in rule_files {
        match load_from_path(&rule_file) {
            Ok(set) => {
                println!("{}", rule_file.display().to_string().bold());
                println!("  name: {}", set.meta.name);
                if let Some(description) = &set.meta.description {
                    println!("  description: {}", description);
                }
                for rule in &set.rules {
                    println!("  {} -> {}", rule.id, rule.file);
                }
            }
            Err(e) => {
                println!(
                    "{}",
                    format!("{}: {}", rule_file.display(), e).red()
                );
            }
        }
        println!();
    }

    Ok(())
}
