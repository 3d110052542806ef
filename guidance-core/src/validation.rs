use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::config::CompanyConfig;
use crate::models::{GuidanceBundle, MasterCatalog};
use crate::rules::{GuidanceAssignments, GuidanceRule};

/// How serious a validation finding is. Errors should reject the save;
/// warnings describe data the runtime will quietly work around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single configuration defect
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("custom question id '{0}' collides with a master question")]
    CustomIdShadowsMaster(String),

    #[error("custom question stored under key '{key}' carries id '{id}'")]
    CustomKeyMismatch { key: String, id: String },

    #[error("question '{child}' names missing parent '{parent}'")]
    DanglingParent { child: String, parent: String },

    #[error("override targets unknown question '{0}'")]
    OverrideUnknownQuestion(String),

    #[error("section '{section}' order lists unknown question '{id}'")]
    OrderUnknownQuestion { section: String, id: String },

    #[error("guidance override targets unknown question '{0}'")]
    GuidanceOverrideUnknownQuestion(String),

    #[error("project '{project}' hides unknown question '{id}'")]
    ProjectHidesUnknownQuestion { project: String, id: String },

    #[error("direct rule '{0}' has no conditions and can never match")]
    DirectRuleWithoutConditions(String),

    #[error("calculated rule '{0}' has no ranges")]
    CalculatedRuleWithoutRanges(String),

    #[error("calculated rule '{rule}' range [{from}, {to}) is empty or inverted")]
    EmptyRange { rule: String, from: i64, to: i64 },

    #[error("calculated rule '{rule}' has overlapping ranges [{a_from}, {a_to}) and [{b_from}, {b_to})")]
    OverlappingRanges {
        rule: String,
        a_from: i64,
        a_to: i64,
        b_from: i64,
        b_to: i64,
    },

    #[error("guidance references unknown task id '{0}'")]
    UnknownTaskId(String),

    #[error("guidance references unknown tip id '{0}'")]
    UnknownTipId(String),
}

/// One finding with its severity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub error: ValidationError,
}

impl ValidationIssue {
    fn error(error: ValidationError) -> Self {
        Self {
            severity: Severity::Error,
            error,
        }
    }

    fn warning(error: ValidationError) -> Self {
        Self {
            severity: Severity::Warning,
            error,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.error)
    }
}

/// Returns true if any finding is error-grade
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Save-time gate: fails when the configuration carries error-grade
/// defects, listing every finding in the message. Warnings alone pass.
pub fn ensure_valid(
    master: &MasterCatalog,
    company: &CompanyConfig,
    rules: &[GuidanceRule],
) -> anyhow::Result<()> {
    let issues = validate(master, company, rules);
    if has_errors(&issues) {
        let details: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        anyhow::bail!("Configuration rejected:\n  {}", details.join("\n  "));
    }
    Ok(())
}

/// Checks a configuration snapshot for authoring defects the runtime
/// either cannot detect (duplicate ids, overlapping ranges resolve by
/// silent first-wins precedence) or quietly recovers from (dangling
/// references). Meant to run at configuration-save time; the resolution
/// engine itself never rejects data.
pub fn validate(
    master: &MasterCatalog,
    company: &CompanyConfig,
    rules: &[GuidanceRule],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let master_ids: HashSet<&str> = master.questions.iter().map(|q| q.id.as_str()).collect();
    let mut known_ids = master_ids.clone();
    known_ids.extend(company.custom_questions.keys().map(String::as_str));

    let known_task_ids: HashSet<&str> = master
        .tasks
        .iter()
        .chain(company.company_tasks.iter())
        .map(|t| t.id.as_str())
        .collect();
    let known_tip_ids: HashSet<&str> = master
        .tips
        .iter()
        .chain(company.company_tips.iter())
        .map(|t| t.id.as_str())
        .collect();

    // Custom question identity
    for (key, question) in &company.custom_questions {
        if master_ids.contains(key.as_str()) {
            issues.push(ValidationIssue::error(
                ValidationError::CustomIdShadowsMaster(key.clone()),
            ));
        }
        if *key != question.id {
            issues.push(ValidationIssue::error(ValidationError::CustomKeyMismatch {
                key: key.clone(),
                id: question.id.clone(),
            }));
        }
    }

    // Parent links across master and custom questions
    let all_questions = master
        .questions
        .iter()
        .chain(company.custom_questions.values());
    for question in all_questions.clone() {
        if let Some(parent) = &question.parent_id {
            if !known_ids.contains(parent.as_str()) {
                issues.push(ValidationIssue::warning(ValidationError::DanglingParent {
                    child: question.id.clone(),
                    parent: parent.clone(),
                }));
            }
        }
    }

    // Override and order records naming unknown questions
    for id in company.questions.keys() {
        if !known_ids.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(
                ValidationError::OverrideUnknownQuestion(id.clone()),
            ));
        }
    }
    for (section, ids) in &company.question_order_by_section {
        for id in ids {
            if !known_ids.contains(id.as_str()) {
                issues.push(ValidationIssue::warning(
                    ValidationError::OrderUnknownQuestion {
                        section: section.clone(),
                        id: id.clone(),
                    },
                ));
            }
        }
    }
    for id in company.answer_guidance_overrides.keys() {
        if !known_ids.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(
                ValidationError::GuidanceOverrideUnknownQuestion(id.clone()),
            ));
        }
    }
    for (project_id, project) in &company.project_configs {
        for id in &project.hidden_questions {
            if !known_ids.contains(id.as_str()) {
                issues.push(ValidationIssue::warning(
                    ValidationError::ProjectHidesUnknownQuestion {
                        project: project_id.clone(),
                        id: id.clone(),
                    },
                ));
            }
        }
        for id in project.answer_guidance_overrides.keys() {
            if !known_ids.contains(id.as_str()) {
                issues.push(ValidationIssue::warning(
                    ValidationError::GuidanceOverrideUnknownQuestion(id.clone()),
                ));
            }
        }
    }

    // Rule shape
    for (i, rule) in rules.iter().enumerate() {
        let rule_name = rule
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("#{}", i + 1));
        match rule {
            GuidanceRule::Direct {
                conditions,
                assignments,
                ..
            } => {
                if conditions.is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationError::DirectRuleWithoutConditions(rule_name.clone()),
                    ));
                }
                check_assignments(assignments, &known_task_ids, &known_tip_ids, &mut issues);
            }
            GuidanceRule::Calculated { ranges, .. } => {
                if ranges.is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationError::CalculatedRuleWithoutRanges(rule_name.clone()),
                    ));
                }
                for range in ranges {
                    if range.from >= range.to {
                        issues.push(ValidationIssue::error(ValidationError::EmptyRange {
                            rule: rule_name.clone(),
                            from: range.from,
                            to: range.to,
                        }));
                    }
                    check_assignments(
                        &range.assignments,
                        &known_task_ids,
                        &known_tip_ids,
                        &mut issues,
                    );
                }
                for (a, b) in overlapping_pairs(ranges) {
                    issues.push(ValidationIssue::error(ValidationError::OverlappingRanges {
                        rule: rule_name.clone(),
                        a_from: a.0,
                        a_to: a.1,
                        b_from: b.0,
                        b_to: b.1,
                    }));
                }
            }
        }
    }

    // Task/tip references from answer guidance maps
    for question in all_questions {
        for bundle in question.answer_guidance.values() {
            check_bundle(bundle, &known_task_ids, &known_tip_ids, &mut issues);
        }
        for by_project in question.project_answer_guidance.values() {
            for bundle in by_project.values() {
                check_bundle(bundle, &known_task_ids, &known_tip_ids, &mut issues);
            }
        }
    }
    for overrides in company.answer_guidance_overrides.values() {
        for bundle in overrides.values() {
            check_bundle(bundle, &known_task_ids, &known_tip_ids, &mut issues);
        }
    }
    for project in company.project_configs.values() {
        for overrides in project.answer_guidance_overrides.values() {
            for bundle in overrides.values() {
                check_bundle(bundle, &known_task_ids, &known_tip_ids, &mut issues);
            }
        }
    }

    issues
}

fn check_assignments(
    assignments: &GuidanceAssignments,
    known_tasks: &HashSet<&str>,
    known_tips: &HashSet<&str>,
    issues: &mut Vec<ValidationIssue>,
) {
    for id in &assignments.task_ids {
        if !known_tasks.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(ValidationError::UnknownTaskId(
                id.clone(),
            )));
        }
    }
    for id in &assignments.tip_ids {
        if !known_tips.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(ValidationError::UnknownTipId(
                id.clone(),
            )));
        }
    }
}

fn check_bundle(
    bundle: &GuidanceBundle,
    known_tasks: &HashSet<&str>,
    known_tips: &HashSet<&str>,
    issues: &mut Vec<ValidationIssue>,
) {
    for id in bundle.task_ids.as_deref().unwrap_or(&[]) {
        if !known_tasks.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(ValidationError::UnknownTaskId(
                id.clone(),
            )));
        }
    }
    for id in bundle.tip_ids.as_deref().unwrap_or(&[]) {
        if !known_tips.contains(id.as_str()) {
            issues.push(ValidationIssue::warning(ValidationError::UnknownTipId(
                id.clone(),
            )));
        }
    }
}

/// Pairs of ranges whose half-open intervals intersect
fn overlapping_pairs(
    ranges: &[crate::rules::GuidanceRange],
) -> Vec<((i64, i64), (i64, i64))> {
    let mut pairs = Vec::new();
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if a.from < b.to && b.from < a.to {
                pairs.push(((a.from, a.to), (b.from, b.to)));
            }
        }
    }
    pairs
}
