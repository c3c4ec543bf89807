use crate::models::{
    ChecklistItem, ListType, Milestone, MilestoneDraft, MilestoneStatus, Project, ProjectDraft, ProjectStatus,
    ProjectTemplate, Task, TaskDraft, TaskStatus,
};
use chrono::Utc;
use uuid::Uuid;

pub const PROJECT_TEMPLATES: &[ProjectTemplate] = &[
    ProjectTemplate {
        id: "consultoria",
        label: "Consultoria com visitas",
        milestones: &[
            "Kick-off",
            "Visita 1",
            "Visita 2",
            "Atividades de escritório / Estudo",
            "Visita final / Apresentação",
            "Entrega do relatório",
        ],
    },
    ProjectTemplate {
        id: "simples",
        label: "Projeto simples",
        milestones: &["Planejamento", "Execução", "Entrega"],
    },
];

pub const FALLBACK_TEMPLATE_ID: &str = "simples";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn project_templates() -> &'static [ProjectTemplate] {
    PROJECT_TEMPLATES
}

pub fn find_template(template_id: &str) -> Option<&'static ProjectTemplate> {
    PROJECT_TEMPLATES.iter().find(|template| template.id == template_id.trim())
}

pub fn create_task(draft: TaskDraft) -> Task {
    let now = Utc::now();
    Task {
        id: new_id(),
        title: draft.title.trim().to_string(),
        status: draft.status.unwrap_or(TaskStatus::Open),
        list_type: draft.list_type.unwrap_or(ListType::Inbox),
        context: draft.context,
        due_date: non_blank(draft.due_date),
        project_id: non_blank(draft.project_id),
        created_at: now,
        updated_at: now,
        waiting_on: draft.waiting_on,
        follow_up_date: non_blank(draft.follow_up_date),
        notes: draft.notes,
    }
}

pub fn create_project(draft: ProjectDraft) -> Project {
    let now = Utc::now();
    Project {
        id: new_id(),
        name: draft.name.trim().to_string(),
        client: draft.client,
        description: draft.description,
        status: draft.status.unwrap_or(ProjectStatus::Active),
        created_at: now,
        updated_at: now,
    }
}

pub fn create_milestone(draft: MilestoneDraft) -> Milestone {
    Milestone {
        id: new_id(),
        project_id: draft.project_id,
        name: draft.name.trim().to_string(),
        planned_date: non_blank(draft.planned_date),
        completed_date: None,
        status: draft.status.unwrap_or(MilestoneStatus::NotStarted),
        checklist: draft.checklist,
        notes: draft.notes,
    }
}

pub fn create_checklist_item(text: &str) -> ChecklistItem {
    ChecklistItem {
        id: new_id(),
        text: text.trim().to_string(),
        done: false,
    }
}

/// One fresh milestone per template entry, in template order.
pub fn milestones_from_template(project_id: &str, template: &ProjectTemplate) -> Vec<Milestone> {
    template
        .milestones
        .iter()
        .map(|name| {
            create_milestone(MilestoneDraft {
                project_id: project_id.to_string(),
                name: (*name).to_string(),
                ..MilestoneDraft::default()
            })
        })
        .collect()
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
