use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Trigger sentinel: the sub-question is revealed by any non-empty parent
/// answer that does not consist solely of the parent's exclusive option.
pub const NOT_NONE: &str = "NOT_NONE";

/// Project-visibility sentinel for custom questions: matches viewers that
/// have no project assigned.
pub const NO_PROJECT: &str = "__none__";

/// A stored answer value that counts as unanswered for completion purposes.
pub const UNSURE: &str = "Unsure";

/// Which form a question belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Profile,
    Assessment,
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormType::Profile => write!(f, "profile"),
            FormType::Assessment => write!(f, "assessment"),
        }
    }
}

/// The input type of a question
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Select,
    Radio,
    Checkbox,
    Date,
}

impl QuestionType {
    /// Returns true for types that carry a fixed option list
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            QuestionType::Select | QuestionType::Radio | QuestionType::Checkbox
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Text => write!(f, "text"),
            QuestionType::Select => write!(f, "select"),
            QuestionType::Radio => write!(f, "radio"),
            QuestionType::Checkbox => write!(f, "checkbox"),
            QuestionType::Date => write!(f, "date"),
        }
    }
}

/// A collected answer: scalar for text/select/radio/date questions,
/// a list of selected options for checkbox questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Returns true if this value counts as an answer for completion.
    /// Empty strings, empty lists and the literal "Unsure" do not.
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Text(s) => !s.is_empty() && s != UNSURE,
            AnswerValue::Multi(values) => !values.is_empty(),
        }
    }

    /// Array-aware equality against a single expected value: list answers
    /// match on membership, scalar answers on exact equality
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            AnswerValue::Text(s) => s == expected,
            AnswerValue::Multi(values) => values.iter().any(|v| v == expected),
        }
    }

    /// The scalar text, if this is a scalar answer
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s.as_str()),
            AnswerValue::Multi(_) => None,
        }
    }

    /// The selected options, if this is a list answer
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Text(_) => None,
            AnswerValue::Multi(values) => Some(values),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Multi(values.into_iter().map(String::from).collect())
    }
}

/// One form's answer snapshot, keyed by question id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answers {
    #[serde(flatten)]
    values: HashMap<String, AnswerValue>,
}

impl Answers {
    /// Creates an empty answer snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an answer, replacing any previous value
    pub fn insert(&mut self, question_id: impl Into<String>, value: impl Into<AnswerValue>) {
        self.values.insert(question_id.into(), value.into());
    }

    /// Gets the stored answer for a question, if any
    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.values.get(question_id)
    }

    /// Returns true if the question has a value that counts as answered
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.values
            .get(question_id)
            .map(|v| v.is_answered())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A set of task/tip ids attached to one answer value.
/// Fields are optional so that layered overrides only replace what they
/// actually set (last writer wins per field, not per bundle).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidanceBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_ids: Option<Vec<String>>,

    /// Explicit "no guidance required" marker; an empty bundle with this
    /// flag set is a deliberate authoring decision, not missing data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_guidance_required: Option<bool>,
}

impl GuidanceBundle {
    /// Layers this bundle over a base bundle: fields present here replace
    /// the base field, absent fields fall through to the base
    pub fn layered_over(&self, base: &GuidanceBundle) -> GuidanceBundle {
        GuidanceBundle {
            task_ids: self.task_ids.clone().or_else(|| base.task_ids.clone()),
            tip_ids: self.tip_ids.clone().or_else(|| base.tip_ids.clone()),
            no_guidance_required: self.no_guidance_required.or(base.no_guidance_required),
        }
    }

    /// Task ids carried by this bundle (empty when unset or marked
    /// "no guidance required")
    pub fn effective_task_ids(&self) -> &[String] {
        if self.no_guidance_required.unwrap_or(false) {
            return &[];
        }
        self.task_ids.as_deref().unwrap_or(&[])
    }

    /// Tip ids carried by this bundle
    pub fn effective_tip_ids(&self) -> &[String] {
        if self.no_guidance_required.unwrap_or(false) {
            return &[];
        }
        self.tip_ids.as_deref().unwrap_or(&[])
    }
}

/// The expected value of a cross-form dependency: a single answer or any
/// member of a set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependencyValue {
    One(String),
    AnyOf(Vec<String>),
}

impl DependencyValue {
    /// Returns true if the referenced answer satisfies this dependency
    pub fn is_satisfied_by(&self, answer: &AnswerValue) -> bool {
        match self {
            DependencyValue::One(expected) => answer.matches(expected),
            DependencyValue::AnyOf(values) => values.iter().any(|v| answer.matches(v)),
        }
    }
}

/// A dependency on another question's answer, possibly from the other form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossFormDependency {
    /// Id of the question whose answer gates this one
    pub question_id: String,
    /// Which form the referenced question lives in
    pub source: FormType,
    /// Answer value(s) that satisfy the dependency
    pub value: DependencyValue,
}

/// One prompt in a form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique key within one resolved question map
    pub id: String,

    /// The form this question belongs to
    pub form: FormType,

    /// Owning question for conditional sub-questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Grouping label used for ordering
    pub section: String,

    /// Prompt text shown to the user
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub question_type: QuestionType,

    /// Ordered option list, only meaningful for choice types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// The "None of the above"-style option that the NOT_NONE trigger
    /// treats as an empty selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_option: Option<String>,

    /// Master/company/project visibility
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Companies may only suggest changes to locked questions; their
    /// text/option overrides are ignored at resolution time
    #[serde(default)]
    pub is_locked: bool,

    /// Authored by a company/project rather than the master catalog
    #[serde(default)]
    pub is_custom: bool,

    /// Parent answer value that reveals this sub-question (or NOT_NONE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_value: Option<String>,

    /// Gate on another question's answer, possibly in the other form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<CrossFormDependency>,

    /// Answer value -> guidance bundle, the question-level default.
    /// Ordered so resolution and validation walk it deterministically.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answer_guidance: BTreeMap<String, GuidanceBundle>,

    /// Answer value -> project id -> guidance bundle, overriding the
    /// company default for that project
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project_answer_guidance: BTreeMap<String, BTreeMap<String, GuidanceBundle>>,

    /// For custom questions: which projects see it (empty = all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub project_ids: Vec<String>,

    /// Explicit position within the section; unset sorts last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,

    /// Used to detect master edits newer than a company's copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Question {
    /// Creates a minimal active question; callers fill in the rest
    pub fn new(
        id: impl Into<String>,
        form: FormType,
        section: impl Into<String>,
        label: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            id: id.into(),
            form,
            parent_id: None,
            section: section.into(),
            label: label.into(),
            description: None,
            question_type,
            options: Vec::new(),
            exclusive_option: None,
            is_active: true,
            is_locked: false,
            is_custom: false,
            trigger_value: None,
            depends_on: None,
            answer_guidance: BTreeMap::new(),
            project_answer_guidance: BTreeMap::new(),
            project_ids: Vec::new(),
            sort_order: None,
            last_updated: None,
        }
    }
}

/// A task catalog entry referenced by id from guidance bundles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Suggested completion deadline, in days from assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_days: Option<u32>,
}

/// A tip catalog entry referenced by id from guidance bundles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterTip {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// The immutable master snapshot: canonical questions plus the platform
/// task/tip catalogs. Loaded once per evaluation; the engine never
/// mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterCatalog {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub tasks: Vec<MasterTask>,
    #[serde(default)]
    pub tips: Vec<MasterTip>,
}

impl MasterCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a master question by id
    pub fn get_question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Master questions belonging to one form, in catalog order
    pub fn questions_for_form(&self, form: FormType) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.form == form)
    }

    /// Gets a master task by id
    pub fn get_task(&self, id: &str) -> Option<&MasterTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Gets a master tip by id
    pub fn get_tip(&self, id: &str) -> Option<&MasterTip> {
        self.tips.iter().find(|t| t.id == id)
    }
}
