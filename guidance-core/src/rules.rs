use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{AnswerValue, Answers, FormType, Question};

/// Date format used by date-typed answers
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The unit a tenure calculation reports in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TenureUnit {
    Years,
    Days,
}

/// The numeric input of a calculated rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Calculation {
    /// Integer year difference between today and a birth-year answer
    Age { birth_year_question_id: String },
    /// Difference between two date-valued answers, in the given unit
    Tenure {
        unit: TenureUnit,
        start_date_question_id: String,
        end_date_question_id: String,
    },
}

/// One question-id = answer-value condition of a direct rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerCondition {
    pub question_id: String,
    pub answer: String,
}

/// Task/tip ids a matching rule contributes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidanceAssignments {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tip_ids: Vec<String>,
    /// An explicit "no guidance" outcome; the rule still counts as matched
    #[serde(default)]
    pub no_guidance_required: bool,
}

/// A half-open interval [from, to) with its own assignments.
/// Among a rule's ranges the first match wins; overlap is an authoring
/// error caught by save-time validation, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidanceRange {
    pub from: i64,
    pub to: i64,
    pub assignments: GuidanceAssignments,
}

impl GuidanceRange {
    /// Returns true if the value falls inside [from, to)
    pub fn contains(&self, value: i64) -> bool {
        self.from <= value && value < self.to
    }
}

/// One guidance assignment rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GuidanceRule {
    /// Matches when every condition holds (logical AND)
    Direct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        conditions: Vec<AnswerCondition>,
        assignments: GuidanceAssignments,
    },
    /// Matches the first range containing a computed numeric value
    Calculated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        calculation: Calculation,
        ranges: Vec<GuidanceRange>,
    },
}

impl GuidanceRule {
    /// The rule's authoring name, if it has one
    pub fn name(&self) -> Option<&str> {
        match self {
            GuidanceRule::Direct { name, .. } => name.as_deref(),
            GuidanceRule::Calculated { name, .. } => name.as_deref(),
        }
    }
}

/// The accumulated task/tip id sets one evaluation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuidanceSelection {
    pub task_ids: BTreeSet<String>,
    pub tip_ids: BTreeSet<String>,
}

impl GuidanceSelection {
    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty() && self.tip_ids.is_empty()
    }

    fn union_assignments(&mut self, assignments: &GuidanceAssignments) {
        if assignments.no_guidance_required {
            return;
        }
        self.task_ids.extend(assignments.task_ids.iter().cloned());
        self.tip_ids.extend(assignments.tip_ids.iter().cloned());
    }
}

/// Evaluates a rule set against the collected answers and unions in the
/// answer-mapped guidance of the resolved questions.
///
/// Rules are processed in list order and every match contributes; a rule
/// the engine cannot evaluate (missing answer, unparseable date) matches
/// nothing and is skipped without error. `today` is injected so the
/// function stays deterministic; callers pass the wall clock.
pub fn evaluate_guidance(
    rules: &[GuidanceRule],
    resolved_questions: &[Question],
    assessment: &Answers,
    profile: &Answers,
    today: NaiveDate,
) -> GuidanceSelection {
    let mut selection = GuidanceSelection::default();

    for rule in rules {
        match rule {
            GuidanceRule::Direct {
                conditions,
                assignments,
                ..
            } => {
                if direct_rule_matches(conditions, assessment, profile) {
                    selection.union_assignments(assignments);
                }
            }
            GuidanceRule::Calculated {
                calculation, ranges, ..
            } => {
                if let Some(value) = compute(calculation, assessment, profile, today) {
                    if let Some(range) = ranges.iter().find(|r| r.contains(value)) {
                        selection.union_assignments(&range.assignments);
                    }
                }
            }
        }
    }

    // Answer-mapped guidance fires alongside rule-based guidance
    for question in resolved_questions {
        let answers = match question.form {
            FormType::Profile => profile,
            FormType::Assessment => assessment,
        };
        let answer = match answers.get(&question.id) {
            Some(a) => a,
            None => continue,
        };
        for (expected, bundle) in &question.answer_guidance {
            if answer.matches(expected) {
                selection.task_ids.extend(bundle.effective_task_ids().iter().cloned());
                selection.tip_ids.extend(bundle.effective_tip_ids().iter().cloned());
            }
        }
    }

    selection
}

/// All conditions must hold; an empty condition list never matches.
/// Condition equality is array-aware (membership for list answers).
fn direct_rule_matches(
    conditions: &[AnswerCondition],
    assessment: &Answers,
    profile: &Answers,
) -> bool {
    if conditions.is_empty() {
        return false;
    }
    conditions.iter().all(|condition| {
        lookup_answer(&condition.question_id, assessment, profile)
            .map(|answer| answer.matches(&condition.answer))
            .unwrap_or(false)
    })
}

/// Finds an answer across both forms, assessment first
fn lookup_answer<'a>(
    question_id: &str,
    assessment: &'a Answers,
    profile: &'a Answers,
) -> Option<&'a AnswerValue> {
    assessment.get(question_id).or_else(|| profile.get(question_id))
}

/// Computes the numeric input of a calculated rule, or None when any
/// required answer is missing or not a valid date/number
fn compute(
    calculation: &Calculation,
    assessment: &Answers,
    profile: &Answers,
    today: NaiveDate,
) -> Option<i64> {
    match calculation {
        Calculation::Age {
            birth_year_question_id,
        } => {
            let birth_year: i64 = profile
                .get(birth_year_question_id)?
                .as_text()?
                .trim()
                .parse()
                .ok()?;
            Some(i64::from(today.year()) - birth_year)
        }
        Calculation::Tenure {
            unit,
            start_date_question_id,
            end_date_question_id,
        } => {
            let start = parse_date(lookup_answer(start_date_question_id, assessment, profile)?)?;
            let end = parse_date(lookup_answer(end_date_question_id, assessment, profile)?)?;
            if end < start {
                return None;
            }
            match unit {
                TenureUnit::Years => end.years_since(start).map(i64::from),
                TenureUnit::Days => Some((end - start).num_days()),
            }
        }
    }
}

fn parse_date(answer: &AnswerValue) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(answer.as_text()?, DATE_FORMAT).ok()
}
