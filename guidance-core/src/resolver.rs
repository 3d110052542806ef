use std::collections::BTreeMap;

use crate::config::{CompanyConfig, ProjectConfig};
use crate::models::{FormType, GuidanceBundle, MasterCatalog, Question, NO_PROJECT};

/// Who the questions are being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// End-user forms: invisible questions are dropped entirely
    EndUser,
    /// Company/admin editors: invisible questions are kept, marked inactive
    Editor,
}

/// Merges the master catalog with company and project overrides into the
/// flat question list one viewer sees for one form.
///
/// Visibility precedence: project hidden > company override > master.
/// Field overrides, option edits and guidance layering follow the company
/// record; locked master questions only accept visibility overrides.
/// Pure function over its inputs; the catalog and config are never mutated.
pub fn resolve_questions(
    master: &MasterCatalog,
    company: &CompanyConfig,
    project_id: Option<&str>,
    form: FormType,
    view: ViewMode,
) -> Vec<Question> {
    let project = project_id.and_then(|id| company.project(id));
    let mut resolved = Vec::new();

    for question in master.questions_for_form(form) {
        // Master deactivation removes the question from every view
        if !question.is_active {
            continue;
        }

        let over = company.question_override(&question.id);

        let hidden_by_project = project
            .map(|p| p.hides_question(&question.id))
            .unwrap_or(false);
        let company_active = over.and_then(|o| o.is_active).unwrap_or(question.is_active);
        let visible = !hidden_by_project && company_active;

        if !visible && view == ViewMode::EndUser {
            continue;
        }

        let mut result = question.clone();
        result.is_active = visible;

        if let Some(over) = over {
            // Companies may only suggest edits to locked questions; their
            // text and option overrides do not take effect
            if !question.is_locked {
                if let Some(label) = &over.label {
                    result.label = label.clone();
                }
                if let Some(description) = &over.description {
                    result.description = Some(description.clone());
                }
                result.options = over.option_overrides.apply(&result.options);
            }
            if let Some(last_updated) = over.last_updated {
                result.last_updated = Some(last_updated);
            }
        }

        if view == ViewMode::EndUser {
            if let Some(hidden) = project.and_then(|p| p.hidden_answers_for(&question.id)) {
                result.options.retain(|o| !hidden.contains(o));
            }
        }

        result.answer_guidance =
            merge_answer_guidance(&result, company, project, project_id);

        resolved.push(result);
    }

    // Key order keeps the appended block stable across runs; an id that
    // duplicates a master question replaces the earlier entry
    for custom in company.custom_questions.values() {
        if custom.form != form {
            continue;
        }
        match view {
            ViewMode::Editor => {
                let mut result = custom.clone();
                result.is_custom = true;
                result.answer_guidance =
                    merge_answer_guidance(&result, company, project, project_id);
                resolved.retain(|q| q.id != result.id);
                resolved.push(result);
            }
            ViewMode::EndUser => {
                if !custom.is_active {
                    continue;
                }
                if !custom_visible_to_project(custom, project_id) {
                    continue;
                }
                let mut result = custom.clone();
                result.is_custom = true;
                result.answer_guidance =
                    merge_answer_guidance(&result, company, project, project_id);
                resolved.retain(|q| q.id != result.id);
                resolved.push(result);
            }
        }
    }

    resolved
}

/// Project visibility rule for custom questions: an empty project list
/// means all projects; viewers without a project match the NO_PROJECT
/// sentinel.
fn custom_visible_to_project(question: &Question, project_id: Option<&str>) -> bool {
    if question.project_ids.is_empty() {
        return true;
    }
    match project_id {
        Some(id) => question.project_ids.iter().any(|p| p == id),
        None => question.project_ids.iter().any(|p| p == NO_PROJECT),
    }
}

/// Layers guidance for every answer of one question.
/// Merge order is master < company < question-level project map <
/// project-config override; last writer wins per bundle field.
fn merge_answer_guidance(
    question: &Question,
    company: &CompanyConfig,
    project: Option<&ProjectConfig>,
    project_id: Option<&str>,
) -> BTreeMap<String, GuidanceBundle> {
    let mut merged = question.answer_guidance.clone();

    if let Some(overrides) = company.guidance_overrides_for(&question.id) {
        for (answer, bundle) in overrides {
            let layered = match merged.get(answer) {
                Some(base) => bundle.layered_over(base),
                None => bundle.clone(),
            };
            merged.insert(answer.clone(), layered);
        }
    }

    if let Some(project_id) = project_id {
        for (answer, by_project) in &question.project_answer_guidance {
            if let Some(bundle) = by_project.get(project_id) {
                let layered = match merged.get(answer) {
                    Some(base) => bundle.layered_over(base),
                    None => bundle.clone(),
                };
                merged.insert(answer.clone(), layered);
            }
        }
    }

    if let Some(overrides) = project.and_then(|p| p.answer_guidance_overrides.get(&question.id)) {
        for (answer, bundle) in overrides {
            let layered = match merged.get(answer) {
                Some(base) => bundle.layered_over(base),
                None => bundle.clone(),
            };
            merged.insert(answer.clone(), layered);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OptionOverrides, QuestionOverride};
    use crate::models::QuestionType;

    fn master_with(questions: Vec<Question>) -> MasterCatalog {
        MasterCatalog {
            questions,
            tasks: Vec::new(),
            tips: Vec::new(),
        }
    }

    fn radio(id: &str, options: &[&str]) -> Question {
        let mut q = Question::new(
            id,
            FormType::Profile,
            "Employment",
            format!("{} prompt", id),
            QuestionType::Radio,
        );
        q.options = options.iter().map(|o| o.to_string()).collect();
        q
    }

    fn bundle(tasks: &[&str]) -> GuidanceBundle {
        GuidanceBundle {
            task_ids: Some(tasks.iter().map(|t| t.to_string()).collect()),
            tip_ids: None,
            no_guidance_required: None,
        }
    }

    #[test]
    fn test_inactive_master_dropped_everywhere() {
        let mut q = radio("workStatus", &["Employed", "Laid off"]);
        q.is_active = false;
        let master = master_with(vec![q]);
        let company = CompanyConfig::new();

        let end_user =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        let editor =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::Editor);
        assert!(end_user.is_empty());
        assert!(editor.is_empty());
    }

    #[test]
    fn test_visibility_precedence_project_over_company_over_master() {
        let master = master_with(vec![radio("workStatus", &["Employed", "Laid off"])]);

        // Company reactivates, project hides: project wins
        let mut company = CompanyConfig::new();
        company.questions.insert(
            "workStatus".into(),
            QuestionOverride {
                is_active: Some(true),
                ..Default::default()
            },
        );
        let mut project = ProjectConfig::default();
        project.hidden_questions.insert("workStatus".into());
        company.project_configs.insert("proj-1".into(), project);

        let end_user = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert!(end_user.is_empty());

        // Editors still see it, marked inactive
        let editor = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::Editor,
        );
        assert_eq!(editor.len(), 1);
        assert!(!editor[0].is_active);

        // Other projects are unaffected
        let other = resolve_questions(
            &master,
            &company,
            Some("proj-2"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(other.len(), 1);
        assert!(other[0].is_active);
    }

    #[test]
    fn test_visibility_truth_table() {
        // Effective visibility = !project_hidden && (company_override ?? master)
        for master_active in [true, false] {
            for company_override in [None, Some(true), Some(false)] {
                for project_hidden in [true, false] {
                    let mut q = radio("q", &["Yes"]);
                    q.is_active = master_active;
                    let master = master_with(vec![q]);

                    let mut company = CompanyConfig::new();
                    if let Some(active) = company_override {
                        company.questions.insert(
                            "q".into(),
                            QuestionOverride {
                                is_active: Some(active),
                                ..Default::default()
                            },
                        );
                    }
                    let mut project = ProjectConfig::default();
                    if project_hidden {
                        project.hidden_questions.insert("q".into());
                    }
                    company.project_configs.insert("p".into(), project);

                    let resolved = resolve_questions(
                        &master,
                        &company,
                        Some("p"),
                        FormType::Profile,
                        ViewMode::EndUser,
                    );

                    let expected = master_active
                        && !project_hidden
                        && company_override.unwrap_or(master_active);
                    assert_eq!(
                        resolved.len() == 1,
                        expected,
                        "master={} override={:?} hidden={}",
                        master_active,
                        company_override,
                        project_hidden
                    );
                }
            }
        }
    }

    #[test]
    fn test_company_deactivation_drops_for_end_user_only() {
        let master = master_with(vec![radio("workStatus", &["Employed"])]);
        let mut company = CompanyConfig::new();
        company.questions.insert(
            "workStatus".into(),
            QuestionOverride {
                is_active: Some(false),
                ..Default::default()
            },
        );

        let end_user =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert!(end_user.is_empty());

        let editor =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::Editor);
        assert_eq!(editor.len(), 1);
        assert!(!editor[0].is_active);
    }

    #[test]
    fn test_field_overrides_applied() {
        let master = master_with(vec![radio("workStatus", &["Employed", "Laid off"])]);
        let mut company = CompanyConfig::new();
        company.questions.insert(
            "workStatus".into(),
            QuestionOverride {
                label: Some("Current employment status".into()),
                description: Some("Pick one".into()),
                option_overrides: OptionOverrides {
                    add: vec!["Contractor".into()],
                    remove: vec!["Employed".into()],
                },
                ..Default::default()
            },
        );

        let resolved =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].label, "Current employment status");
        assert_eq!(resolved[0].description.as_deref(), Some("Pick one"));
        assert_eq!(resolved[0].options, vec!["Laid off", "Contractor"]);
    }

    #[test]
    fn test_locked_question_ignores_text_and_option_edits() {
        let mut q = radio("workStatus", &["Employed", "Laid off"]);
        q.is_locked = true;
        let master = master_with(vec![q]);

        let mut company = CompanyConfig::new();
        company.questions.insert(
            "workStatus".into(),
            QuestionOverride {
                label: Some("Edited label".into()),
                option_overrides: OptionOverrides {
                    add: vec!["Contractor".into()],
                    remove: vec!["Employed".into()],
                },
                ..Default::default()
            },
        );

        let resolved =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(resolved[0].label, "workStatus prompt");
        assert_eq!(resolved[0].options, vec!["Employed", "Laid off"]);
    }

    #[test]
    fn test_project_hidden_answers_subtract_for_end_user() {
        let master = master_with(vec![radio("benefits", &["Severance", "COBRA", "401k"])]);
        let mut company = CompanyConfig::new();
        let mut project = ProjectConfig::default();
        project
            .hidden_answers
            .entry("benefits".into())
            .or_default()
            .insert("COBRA".into());
        company.project_configs.insert("proj-1".into(), project);

        let end_user = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(end_user[0].options, vec!["Severance", "401k"]);

        // Editors keep the full option list
        let editor = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::Editor,
        );
        assert_eq!(editor[0].options, vec!["Severance", "COBRA", "401k"]);
    }

    #[test]
    fn test_guidance_layering_master_company_project() {
        let mut q = radio("workStatus", &["Laid off"]);
        q.answer_guidance
            .insert("Laid off".into(), bundle(&["master-task"]));
        let master = master_with(vec![q]);

        let mut company = CompanyConfig::new();
        company
            .answer_guidance_overrides
            .entry("workStatus".into())
            .or_default()
            .insert("Laid off".into(), bundle(&["company-task"]));

        let mut project = ProjectConfig::default();
        project
            .answer_guidance_overrides
            .entry("workStatus".into())
            .or_default()
            .insert("Laid off".into(), bundle(&["project-task"]));
        company.project_configs.insert("proj-1".into(), project);

        // No project: company layer wins
        let resolved =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(
            resolved[0].answer_guidance["Laid off"].task_ids,
            Some(vec!["company-task".to_string()])
        );

        // With the project: project layer wins
        let resolved = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(
            resolved[0].answer_guidance["Laid off"].task_ids,
            Some(vec!["project-task".to_string()])
        );
    }

    #[test]
    fn test_question_level_project_guidance_overrides_company() {
        let mut q = radio("workStatus", &["Laid off"]);
        q.project_answer_guidance
            .entry("Laid off".into())
            .or_default()
            .insert("proj-1".into(), bundle(&["per-project-task"]));
        let master = master_with(vec![q]);

        let mut company = CompanyConfig::new();
        company
            .answer_guidance_overrides
            .entry("workStatus".into())
            .or_default()
            .insert("Laid off".into(), bundle(&["company-task"]));

        let resolved = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(
            resolved[0].answer_guidance["Laid off"].task_ids,
            Some(vec!["per-project-task".to_string()])
        );

        // Other projects keep the company layer
        let resolved = resolve_questions(
            &master,
            &company,
            Some("proj-2"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(
            resolved[0].answer_guidance["Laid off"].task_ids,
            Some(vec!["company-task".to_string()])
        );
    }

    #[test]
    fn test_custom_question_project_visibility() {
        let master = master_with(Vec::new());
        let mut company = CompanyConfig::new();

        let mut scoped = radio("customScoped", &["Yes", "No"]);
        scoped.project_ids = vec!["proj-1".into()];
        let unscoped = radio("customAll", &["Yes", "No"]);
        let mut no_project = radio("customNoProject", &["Yes", "No"]);
        no_project.project_ids = vec![NO_PROJECT.into()];

        company.custom_questions.insert(scoped.id.clone(), scoped);
        company.custom_questions.insert(unscoped.id.clone(), unscoped);
        company
            .custom_questions
            .insert(no_project.id.clone(), no_project);

        let ids = |qs: &[Question]| {
            let mut v: Vec<String> = qs.iter().map(|q| q.id.clone()).collect();
            v.sort();
            v
        };

        let for_project = resolve_questions(
            &master,
            &company,
            Some("proj-1"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(ids(&for_project), vec!["customAll", "customScoped"]);

        let for_other = resolve_questions(
            &master,
            &company,
            Some("proj-2"),
            FormType::Profile,
            ViewMode::EndUser,
        );
        assert_eq!(ids(&for_other), vec!["customAll"]);

        let no_proj =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(ids(&no_proj), vec!["customAll", "customNoProject"]);

        // Editors see everything, tagged custom
        let editor =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::Editor);
        assert_eq!(editor.len(), 3);
        assert!(editor.iter().all(|q| q.is_custom));
    }

    #[test]
    fn test_custom_question_order_is_stable_across_configs() {
        let master = master_with(vec![radio("masterQ", &["Yes"])]);
        let ids = ["custom-e", "custom-a", "custom-c", "custom-b", "custom-d"];

        // Same custom questions inserted in different orders must resolve
        // to the same list
        let mut forward = CompanyConfig::new();
        for id in ids {
            forward.custom_questions.insert(id.to_string(), radio(id, &["Yes"]));
        }
        let mut backward = CompanyConfig::new();
        for id in ids.iter().rev() {
            backward.custom_questions.insert(id.to_string(), radio(id, &["Yes"]));
        }

        let resolve = |company: &CompanyConfig| -> Vec<String> {
            resolve_questions(&master, company, None, FormType::Profile, ViewMode::EndUser)
                .iter()
                .map(|q| q.id.clone())
                .collect()
        };
        assert_eq!(resolve(&forward), resolve(&backward));
        assert_eq!(
            resolve(&forward),
            vec!["masterQ", "custom-a", "custom-b", "custom-c", "custom-d", "custom-e"]
        );
    }

    #[test]
    fn test_custom_id_duplicating_master_replaces_it() {
        let master = master_with(vec![radio("workStatus", &["Employed"])]);
        let mut company = CompanyConfig::new();
        let mut shadow = radio("workStatus", &["Employed", "Laid off"]);
        shadow.label = "Replacement prompt".into();
        company.custom_questions.insert(shadow.id.clone(), shadow);

        let end_user =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(end_user.len(), 1);
        assert!(end_user[0].is_custom);
        assert_eq!(end_user[0].label, "Replacement prompt");

        let editor =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::Editor);
        assert_eq!(editor.len(), 1);
        assert!(editor[0].is_custom);
    }

    #[test]
    fn test_inactive_custom_question_dropped_for_end_user() {
        let master = master_with(Vec::new());
        let mut company = CompanyConfig::new();
        let mut custom = radio("customQ", &["Yes"]);
        custom.is_active = false;
        company.custom_questions.insert(custom.id.clone(), custom);

        let end_user =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert!(end_user.is_empty());

        let editor =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::Editor);
        assert_eq!(editor.len(), 1);
    }

    #[test]
    fn test_form_filter() {
        let mut assessment_q = radio("assessQ", &["Yes"]);
        assessment_q.form = FormType::Assessment;
        let master = master_with(vec![radio("profileQ", &["Yes"]), assessment_q]);
        let company = CompanyConfig::new();

        let profile =
            resolve_questions(&master, &company, None, FormType::Profile, ViewMode::EndUser);
        assert_eq!(profile.len(), 1);
        assert_eq!(profile[0].id, "profileQ");

        let assessment = resolve_questions(
            &master,
            &company,
            None,
            FormType::Assessment,
            ViewMode::EndUser,
        );
        assert_eq!(assessment.len(), 1);
        assert_eq!(assessment[0].id, "assessQ");
    }
}
