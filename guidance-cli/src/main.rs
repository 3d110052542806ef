mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use guidance_core::{
    applicable_questions, build_tree, completion, evaluate_guidance, has_errors,
    materialize_guidance, resolve_questions, validate, Answers, CompanyConfig, FormType,
    GuidanceRule, MasterCatalog, Question, QuestionNode, Severity, ViewMode,
};

use crate::cli::{Cli, Command};

/// One engine invocation's worth of inputs, assembled by whatever owns
/// persistence. The engine itself never reads files.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    master: MasterCatalog,
    #[serde(default)]
    company: CompanyConfig,
    #[serde(default)]
    rules: Vec<GuidanceRule>,
    #[serde(default)]
    profile_answers: Answers,
    #[serde(default)]
    assessment_answers: Answers,
}

impl Snapshot {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {:?}", path))
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let snapshot = Snapshot::load(Path::new(&cli.file))?;
    let project = cli.project.as_deref();

    match &cli.command {
        Command::Questions {
            form,
            editor,
            format,
        } => {
            let form = parse_form(form)?;
            let view = if *editor {
                ViewMode::Editor
            } else {
                ViewMode::EndUser
            };
            show_questions(&snapshot, project, form, view, parse_format(format)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Progress { form, format } => {
            let form = parse_form(form)?;
            show_progress(&snapshot, project, form, parse_format(format)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Guidance { format } => {
            show_guidance(&snapshot, project, parse_format(format)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate => run_validate(&snapshot),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_form(s: &str) -> Result<FormType> {
    match s.to_lowercase().as_str() {
        "profile" => Ok(FormType::Profile),
        "assessment" => Ok(FormType::Assessment),
        _ => anyhow::bail!("Unknown form '{}' (expected profile or assessment)", s),
    }
}

fn parse_format(s: &str) -> Result<OutputFormat> {
    match s.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => anyhow::bail!("Unknown format '{}' (expected text or json)", s),
    }
}

fn show_questions(
    snapshot: &Snapshot,
    project: Option<&str>,
    form: FormType,
    view: ViewMode,
    format: OutputFormat,
) -> Result<()> {
    let resolved = resolve_questions(&snapshot.master, &snapshot.company, project, form, view);
    let tree = build_tree(resolved, &snapshot.company.question_order_by_section);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    if tree.is_empty() {
        println!("No questions resolved for the {} form.", form);
        return Ok(());
    }

    let mut section = String::new();
    for node in &tree {
        if node.question.section != section {
            section = node.question.section.clone();
            println!("{}", section.bold());
        }
        print_node(node, 1);
    }
    Ok(())
}

fn print_node(node: &QuestionNode, depth: usize) {
    let q = &node.question;
    let mut markers = Vec::new();
    if !q.is_active {
        markers.push("inactive".yellow().to_string());
    }
    if q.is_custom {
        markers.push("custom".cyan().to_string());
    }
    if q.is_locked {
        markers.push("locked".to_string());
    }
    let markers = if markers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", markers.join(", "))
    };

    println!(
        "{}{} {}{}",
        "  ".repeat(depth),
        q.id.green(),
        q.label,
        markers
    );
    if !q.options.is_empty() {
        println!("{}  options: {}", "  ".repeat(depth), q.options.join(" | "));
    }
    for sub in &node.sub_questions {
        print_node(sub, depth + 1);
    }
}

fn show_progress(
    snapshot: &Snapshot,
    project: Option<&str>,
    form: FormType,
    format: OutputFormat,
) -> Result<()> {
    let resolved = resolve_questions(
        &snapshot.master,
        &snapshot.company,
        project,
        form,
        ViewMode::EndUser,
    );
    let tree = build_tree(resolved, &snapshot.company.question_order_by_section);
    let (answers, cross_form) = match form {
        FormType::Profile => (&snapshot.profile_answers, &snapshot.assessment_answers),
        FormType::Assessment => (&snapshot.assessment_answers, &snapshot.profile_answers),
    };

    let stats = completion(&tree, answers, cross_form);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let headline = format!(
        "{}% complete ({}/{} applicable questions)",
        stats.percentage, stats.completed, stats.total_applicable
    );
    if stats.is_complete {
        println!("{}", headline.green());
    } else {
        println!("{}", headline.yellow());
        for id in &stats.incomplete_questions {
            println!("  missing: {}", id);
        }
    }
    Ok(())
}

/// Resolves both forms for the viewer and runs the full guidance pass
fn show_guidance(snapshot: &Snapshot, project: Option<&str>, format: OutputFormat) -> Result<()> {
    let resolved = resolved_for_guidance(snapshot, project);
    let selection = evaluate_guidance(
        &snapshot.rules,
        &resolved,
        &snapshot.assessment_answers,
        &snapshot.profile_answers,
        Utc::now().date_naive(),
    );
    let report = materialize_guidance(&selection, &snapshot.master, &snapshot.company);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.tasks.is_empty() && report.tips.is_empty() {
        println!("No guidance assigned.");
        return Ok(());
    }

    if !report.tasks.is_empty() {
        println!("{}", "Tasks".bold());
        for task in &report.tasks {
            let deadline = task
                .deadline_days
                .map(|d| format!(" (due in {} days)", d))
                .unwrap_or_default();
            println!("  {} {}{}", task.task_id.green(), task.title, deadline);
        }
    }
    if !report.tips.is_empty() {
        println!("{}", "Tips".bold());
        for tip in &report.tips {
            println!("  {} {}", tip.tip_id.cyan(), tip.title);
        }
    }
    Ok(())
}

/// Flat resolved questions across both forms, restricted to what is
/// currently applicable so hidden questions cannot contribute guidance
fn resolved_for_guidance(snapshot: &Snapshot, project: Option<&str>) -> Vec<Question> {
    let mut resolved = Vec::new();
    for form in [FormType::Profile, FormType::Assessment] {
        let questions = resolve_questions(
            &snapshot.master,
            &snapshot.company,
            project,
            form,
            ViewMode::EndUser,
        );
        let tree = build_tree(questions, &snapshot.company.question_order_by_section);
        let (answers, cross_form) = match form {
            FormType::Profile => (&snapshot.profile_answers, &snapshot.assessment_answers),
            FormType::Assessment => (&snapshot.assessment_answers, &snapshot.profile_answers),
        };
        resolved.extend(
            applicable_questions(&tree, answers, cross_form)
                .into_iter()
                .cloned(),
        );
    }
    resolved
}

fn run_validate(snapshot: &Snapshot) -> Result<ExitCode> {
    let issues = validate(&snapshot.master, &snapshot.company, &snapshot.rules);

    if issues.is_empty() {
        println!("{}", "Configuration is valid.".green());
        return Ok(ExitCode::SUCCESS);
    }

    for issue in &issues {
        let tag = match issue.severity {
            Severity::Error => "error".red(),
            Severity::Warning => "warning".yellow(),
        };
        println!("{}: {}", tag, issue.error);
    }

    if has_errors(&issues) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
