use serde::Serialize;

use crate::models::{AnswerValue, Answers, Question, QuestionType, NOT_NONE};
use crate::tree::QuestionNode;

/// Walks a resolved question tree and returns the questions that are
/// presently relevant, given the answers collected so far.
///
/// Depth-first and prune-eager: an excluded question's whole subtree is
/// skipped. Re-run after every answer change; nothing is cached between
/// calls.
pub fn applicable_questions<'a>(
    tree: &'a [QuestionNode],
    answers: &Answers,
    cross_form: &Answers,
) -> Vec<&'a Question> {
    let mut out = Vec::new();
    for node in tree {
        collect_applicable(node, answers, cross_form, &mut out);
    }
    out
}

fn collect_applicable<'a>(
    node: &'a QuestionNode,
    answers: &Answers,
    cross_form: &Answers,
    out: &mut Vec<&'a Question>,
) {
    let question = &node.question;

    if !question.is_active {
        return;
    }

    if let Some(dependency) = &question.depends_on {
        // The dependency names which form holds the referenced answer;
        // a missing answer means "not triggered", not an error
        let snapshot = if dependency.source == question.form {
            answers
        } else {
            cross_form
        };
        let satisfied = snapshot
            .get(&dependency.question_id)
            .map(|answer| dependency.value.is_satisfied_by(answer))
            .unwrap_or(false);
        if !satisfied {
            return;
        }
    }

    out.push(question);

    let current = answers.get(&question.id);
    for sub in &node.sub_questions {
        if sub_question_triggered(question, current, &sub.question) {
            collect_applicable(sub, answers, cross_form, out);
        }
    }
}

/// Decides whether a sub-question is revealed by the parent's current
/// answer. Checkbox parents match on membership, with NOT_NONE standing
/// for "any selection beyond the exclusive option"; all other parent
/// types match on scalar equality.
fn sub_question_triggered(
    parent: &Question,
    parent_answer: Option<&AnswerValue>,
    sub: &Question,
) -> bool {
    let trigger = match &sub.trigger_value {
        Some(t) => t,
        None => return false,
    };
    let answer = match parent_answer {
        Some(a) => a,
        None => return false,
    };

    if parent.question_type == QuestionType::Checkbox {
        let selected = answer.as_list().unwrap_or(&[]);
        if trigger == NOT_NONE {
            if selected.is_empty() {
                return false;
            }
            match &parent.exclusive_option {
                Some(exclusive) => !selected.iter().all(|s| s == exclusive),
                None => true,
            }
        } else {
            selected.iter().any(|s| s == trigger)
        }
    } else {
        answer.as_text() == Some(trigger.as_str())
    }
}

/// Completion statistics for one form, derived from the applicable set
#[derive(Debug, Clone, Serialize)]
pub struct CompletionStats {
    pub percentage: u32,
    pub is_complete: bool,
    pub total_applicable: usize,
    pub completed: usize,
    /// Ids of applicable questions still lacking an answer
    pub incomplete_questions: Vec<String>,
}

/// Compares the applicable question set against the collected answers.
/// "Unsure" is a valid stored value that still counts as unanswered here.
/// An empty applicable set reports 100% complete.
pub fn completion(
    tree: &[QuestionNode],
    answers: &Answers,
    cross_form: &Answers,
) -> CompletionStats {
    let applicable = applicable_questions(tree, answers, cross_form);
    let total_applicable = applicable.len();

    let mut completed = 0;
    let mut incomplete_questions = Vec::new();
    for question in &applicable {
        if answers.is_answered(&question.id) {
            completed += 1;
        } else {
            incomplete_questions.push(question.id.clone());
        }
    }

    let percentage = if total_applicable == 0 {
        100
    } else {
        (completed * 100 / total_applicable) as u32
    };

    CompletionStats {
        percentage,
        is_complete: completed == total_applicable,
        total_applicable,
        completed,
        incomplete_questions,
    }
}
