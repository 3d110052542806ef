use serde::Serialize;
use std::collections::HashMap;

use crate::models::Question;

/// A question with its attached conditional sub-questions
#[derive(Debug, Clone, Serialize)]
pub struct QuestionNode {
    pub question: Question,
    pub sub_questions: Vec<QuestionNode>,
}

impl QuestionNode {
    fn leaf(question: Question) -> Self {
        Self {
            question,
            sub_questions: Vec::new(),
        }
    }
}

/// Converts a flat resolved question list into a forest linked by
/// parent_id, then orders root questions per section.
///
/// A parent_id that does not resolve within the list (the parent was
/// filtered out by visibility) demotes the child to root level instead of
/// dropping it. Within each section, roots follow the configured order
/// list; unlisted ids sort after all listed ones, stable by sort_order and
/// then original position. Sections keep their first-appearance order.
pub fn build_tree(
    questions: Vec<Question>,
    order_by_section: &HashMap<String, Vec<String>>,
) -> Vec<QuestionNode> {
    let index: HashMap<String, usize> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.clone(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); questions.len()];
    let mut is_child = vec![false; questions.len()];

    for (i, question) in questions.iter().enumerate() {
        if let Some(parent_id) = &question.parent_id {
            if let Some(&parent) = index.get(parent_id) {
                // Self-parenting is authoring garbage; treat as dangling
                if parent != i {
                    children[parent].push(i);
                    is_child[i] = true;
                }
            }
        }
    }

    let mut slots: Vec<Option<Question>> = questions.into_iter().map(Some).collect();
    let mut visited = vec![false; slots.len()];
    let mut roots = Vec::new();

    for i in 0..slots.len() {
        if !is_child[i] && !visited[i] {
            if let Some(question) = slots[i].take() {
                roots.push(attach(question, i, &mut slots, &children, &mut visited));
            }
        }
    }

    // Anything left unvisited sits on a parent cycle; surface it at root
    // level rather than losing it
    for i in 0..slots.len() {
        if !visited[i] {
            if let Some(question) = slots[i].take() {
                roots.push(attach(question, i, &mut slots, &children, &mut visited));
            }
        }
    }

    order_roots(roots, order_by_section)
}

/// Recursively attaches question `i`'s sub-questions, ordered by
/// sort_order then original position
fn attach(
    question: Question,
    i: usize,
    slots: &mut Vec<Option<Question>>,
    children: &[Vec<usize>],
    visited: &mut Vec<bool>,
) -> QuestionNode {
    visited[i] = true;

    let mut sub_questions: Vec<QuestionNode> = children[i]
        .clone()
        .into_iter()
        .filter_map(|c| {
            if visited[c] {
                return None;
            }
            slots[c]
                .take()
                .map(|q| attach(q, c, slots, children, visited))
        })
        .collect();
    sub_questions.sort_by_key(|n| n.question.sort_order.unwrap_or(u32::MAX));

    let mut node = QuestionNode::leaf(question);
    node.sub_questions = sub_questions;
    node
}

/// Groups roots by section (first-appearance order) and sorts each group
/// by the configured id order, falling back to sort_order then original
/// position for unlisted ids
fn order_roots(
    roots: Vec<QuestionNode>,
    order_by_section: &HashMap<String, Vec<String>>,
) -> Vec<QuestionNode> {
    let mut section_order: Vec<String> = Vec::new();
    let mut by_section: HashMap<String, Vec<QuestionNode>> = HashMap::new();

    for node in roots {
        let section = node.question.section.clone();
        if !by_section.contains_key(&section) {
            section_order.push(section.clone());
        }
        by_section.entry(section).or_default().push(node);
    }

    let mut ordered = Vec::new();
    for section in section_order {
        let mut group = by_section.remove(&section).unwrap_or_default();
        let configured = order_by_section.get(&section);
        group.sort_by_key(|node| {
            let listed = configured
                .and_then(|ids| ids.iter().position(|id| *id == node.question.id))
                .unwrap_or(usize::MAX);
            (listed, node.question.sort_order.unwrap_or(u32::MAX))
        });
        ordered.extend(group);
    }
    ordered
}

/// Depth-first readback of a forest into the flat question list
pub fn flatten(nodes: &[QuestionNode]) -> Vec<&Question> {
    let mut out = Vec::new();
    for node in nodes {
        flatten_into(node, &mut out);
    }
    out
}

fn flatten_into<'a>(node: &'a QuestionNode, out: &mut Vec<&'a Question>) {
    out.push(&node.question);
    for sub in &node.sub_questions {
        flatten_into(sub, out);
    }
}
