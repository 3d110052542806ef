use serde::Serialize;

use crate::config::CompanyConfig;
use crate::models::{MasterCatalog, MasterTask, MasterTip};
use crate::rules::GuidanceSelection;

/// A task assignment ready for display, carrying the originating id
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecommendationItem {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_days: Option<u32>,
}

impl RecommendationItem {
    fn from_task(task: &MasterTask) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            deadline_days: task.deadline_days,
        }
    }
}

/// A tip ready for display, carrying the originating id
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TipItem {
    pub tip_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

impl TipItem {
    fn from_tip(tip: &MasterTip) -> Self {
        Self {
            tip_id: tip.id.clone(),
            title: tip.title.clone(),
            description: tip.description.clone(),
            category: tip.category.clone(),
        }
    }
}

/// The fully materialized guidance output for one user
#[derive(Debug, Clone, Default, Serialize)]
pub struct GuidanceReport {
    pub tasks: Vec<RecommendationItem>,
    pub tips: Vec<TipItem>,
}

/// Resolves accumulated task/tip ids against the combined master and
/// company catalogs. Ids with no matching record are stale references
/// and are dropped silently.
pub fn materialize_guidance(
    selection: &GuidanceSelection,
    master: &MasterCatalog,
    company: &CompanyConfig,
) -> GuidanceReport {
    let tasks = selection
        .task_ids
        .iter()
        .filter_map(|id| master.get_task(id).or_else(|| company.get_task(id)))
        .map(RecommendationItem::from_task)
        .collect();

    let tips = selection
        .tip_ids
        .iter()
        .filter_map(|id| master.get_tip(id).or_else(|| company.get_tip(id)))
        .map(TipItem::from_tip)
        .collect();

    GuidanceReport { tasks, tips }
}
