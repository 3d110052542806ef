use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{GuidanceBundle, MasterTask, MasterTip, Question};

/// Option-list edits a company applies to a master question.
/// Removal always applies before addition, so a removed option cannot
/// survive by also appearing in the add list of an older record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionOverrides {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl OptionOverrides {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Applies remove-then-add to a master option list, skipping values
    /// already present so the result never contains duplicates
    pub fn apply(&self, options: &[String]) -> Vec<String> {
        let removed: HashSet<&str> = self.remove.iter().map(String::as_str).collect();
        let mut result: Vec<String> = options
            .iter()
            .filter(|o| !removed.contains(o.as_str()))
            .cloned()
            .collect();
        for added in &self.add {
            if !result.contains(added) {
                result.push(added.clone());
            }
        }
        result
    }
}

/// A partial, company-scope override of one master question.
/// Every field is optional; unset fields fall through to the master value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "OptionOverrides::is_empty")]
    pub option_overrides: OptionOverrides,

    /// When the company copy was made; older than the master's
    /// last_updated means the master has changed underneath it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl QuestionOverride {
    /// Returns true if the master question changed after this override
    /// was recorded
    pub fn is_stale(&self, master: &Question) -> bool {
        match (self.last_updated, master.last_updated) {
            (Some(ours), Some(theirs)) => theirs > ours,
            _ => false,
        }
    }
}

/// Per-project visibility and guidance overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Questions invisible to this project even when company-active
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub hidden_questions: BTreeSet<String>,

    /// Question id -> options removed for this project
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub hidden_answers: HashMap<String, HashSet<String>>,

    /// Question id -> answer -> guidance bundle, overriding the company
    /// default for this project only
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answer_guidance_overrides: BTreeMap<String, BTreeMap<String, GuidanceBundle>>,
}

impl ProjectConfig {
    /// Returns true if this project hides the given question
    pub fn hides_question(&self, question_id: &str) -> bool {
        self.hidden_questions.contains(question_id)
    }

    /// Options this project removes from the given question
    pub fn hidden_answers_for(&self, question_id: &str) -> Option<&HashSet<String>> {
        self.hidden_answers.get(question_id)
    }
}

/// The full per-company override bundle.
/// Id-keyed maps are ordered so resolution output and validation
/// findings come out the same on every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Master question id -> partial override
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub questions: BTreeMap<String, QuestionOverride>,

    /// Company-authored questions, keyed by id and resolved in key order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_questions: BTreeMap<String, Question>,

    /// Section label -> ordered question ids; unlisted ids sort after
    /// all listed ones
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub question_order_by_section: HashMap<String, Vec<String>>,

    /// Question id -> answer -> guidance bundle, the company default
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answer_guidance_overrides: BTreeMap<String, BTreeMap<String, GuidanceBundle>>,

    /// Company-private task catalog entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company_tasks: Vec<MasterTask>,

    /// Company-private tip catalog entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company_tips: Vec<MasterTip>,

    /// Project id -> project-scope overrides
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project_configs: BTreeMap<String, ProjectConfig>,
}

impl CompanyConfig {
    /// Creates an empty company config
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the override record for a master question, if any
    pub fn question_override(&self, question_id: &str) -> Option<&QuestionOverride> {
        self.questions.get(question_id)
    }

    /// Gets the project config for a project id, if any
    pub fn project(&self, project_id: &str) -> Option<&ProjectConfig> {
        self.project_configs.get(project_id)
    }

    /// Company-level guidance overrides for one question
    pub fn guidance_overrides_for(
        &self,
        question_id: &str,
    ) -> Option<&BTreeMap<String, GuidanceBundle>> {
        self.answer_guidance_overrides.get(question_id)
    }

    /// Gets a company-private task by id
    pub fn get_task(&self, id: &str) -> Option<&MasterTask> {
        self.company_tasks.iter().find(|t| t.id == id)
    }

    /// Gets a company-private tip by id
    pub fn get_tip(&self, id: &str) -> Option<&MasterTip> {
        self.company_tips.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::{FormType, QuestionType};

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_option_overrides_remove_applies_before_add() {
        let overrides = OptionOverrides {
            add: options(&["Remote", "Hybrid"]),
            remove: options(&["Hybrid"]),
        };

        // "Hybrid" is removed first, then re-added: present in the result
        let result = overrides.apply(&options(&["Onsite", "Hybrid"]));
        assert_eq!(result, options(&["Onsite", "Remote", "Hybrid"]));
    }

    #[test]
    fn test_option_overrides_remove_only() {
        let overrides = OptionOverrides {
            add: Vec::new(),
            remove: options(&["Hybrid"]),
        };
        let result = overrides.apply(&options(&["Onsite", "Hybrid", "Remote"]));
        assert_eq!(result, options(&["Onsite", "Remote"]));
    }

    #[test]
    fn test_option_overrides_never_duplicates() {
        let overrides = OptionOverrides {
            add: options(&["Onsite"]),
            remove: Vec::new(),
        };
        let result = overrides.apply(&options(&["Onsite", "Remote"]));
        assert_eq!(result, options(&["Onsite", "Remote"]));
    }

    #[test]
    fn test_question_override_staleness() {
        let mut master = Question::new(
            "workStatus",
            FormType::Profile,
            "Employment",
            "Work status",
            QuestionType::Radio,
        );
        master.last_updated = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        let mut over = QuestionOverride::default();
        over.last_updated = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(over.is_stale(&master));

        over.last_updated = Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        assert!(!over.is_stale(&master));

        // Missing timestamps on either side never report stale
        over.last_updated = None;
        assert!(!over.is_stale(&master));
    }

    #[test]
    fn test_company_config_permissive_parse() {
        // Unknown fields in override records are ignored, not rejected
        let yaml = r#"
questions:
  workStatus:
    is_active: false
    some_future_field: 42
"#;
        let config: CompanyConfig = serde_yaml::from_str(yaml).unwrap();
        let over = config.question_override("workStatus").unwrap();
        assert_eq!(over.is_active, Some(false));
    }
}
