pub mod applicability;
pub mod catalog;
pub mod config;
pub mod models;
pub mod resolver;
pub mod rules;
pub mod tree;
pub mod validation;

// Re-export commonly used types
pub use applicability::{applicable_questions, completion, CompletionStats};
pub use catalog::{materialize_guidance, GuidanceReport, RecommendationItem, TipItem};
pub use config::{CompanyConfig, OptionOverrides, ProjectConfig, QuestionOverride};
pub use models::{
    AnswerValue, Answers, CrossFormDependency, DependencyValue, FormType, GuidanceBundle,
    MasterCatalog, MasterTask, MasterTip, Question, QuestionType, NOT_NONE, NO_PROJECT, UNSURE,
};
pub use resolver::{resolve_questions, ViewMode};
pub use rules::{
    evaluate_guidance, AnswerCondition, Calculation, GuidanceAssignments, GuidanceRange,
    GuidanceRule, GuidanceSelection, TenureUnit,
};
pub use tree::{build_tree, flatten, QuestionNode};
pub use validation::{ensure_valid, has_errors, validate, Severity, ValidationError, ValidationIssue};
