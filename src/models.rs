use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    Inbox,
    Next,
    Waiting,
    Someday,
    Reference,
    Done,
}

impl ListType {
    pub const ALL: [ListType; 6] = [
        Self::Inbox,
        Self::Next,
        Self::Waiting,
        Self::Someday,
        Self::Reference,
        Self::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Next => "next",
            Self::Waiting => "waiting",
            Self::Someday => "someday",
            Self::Reference => "reference",
            Self::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Next => "Próximas ações",
            Self::Waiting => "Aguardando",
            Self::Someday => "Talvez",
            Self::Reference => "Referência",
            Self::Done => "Concluídas",
        }
    }

    /// Lists that never show up on the agenda even when dated.
    pub fn hidden_from_agenda(self) -> bool {
        matches!(self, Self::Inbox | Self::Done | Self::Reference)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "aberta")]
    Open,
    #[serde(rename = "concluída")]
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "aberta",
            Self::Done => "concluída",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Concluído")]
    Done,
    #[serde(rename = "Em espera")]
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Ativo",
            Self::Done => "Concluído",
            Self::OnHold => "Em espera",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneStatus {
    #[default]
    #[serde(rename = "Não iniciado")]
    NotStarted,
    #[serde(rename = "Em andamento")]
    InProgress,
    #[serde(rename = "Concluído")]
    Done,
}

impl MilestoneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Não iniciado",
            Self::InProgress => "Em andamento",
            Self::Done => "Concluído",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MainTab {
    #[default]
    Agenda,
    Inbox,
    Process,
    Gtd,
    Projects,
    Backup,
}

impl MainTab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Agenda => "Hoje/Agenda",
            Self::Inbox => "Inbox",
            Self::Process => "Processar",
            Self::Gtd => "GTD",
            Self::Projects => "Projetos",
            Self::Backup => "Backup",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub list_type: ListType,
    pub context: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub due_date: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub waiting_on: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub follow_up_date: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub client: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub planned_date: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub completed_date: Option<String>,
    pub status: MilestoneStatus,
    #[serde(deserialize_with = "checklist_or_empty")]
    pub checklist: Vec<ChecklistItem>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub active_tab: MainTab,
    pub gtd_subtab: ListType,
    pub selected_project_id: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_tab: MainTab::Agenda,
            gtd_subtab: ListType::Next,
            selected_project_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub milestones: Vec<Milestone>,
    pub ui: UiState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectTemplate {
    pub id: &'static str,
    pub label: &'static str,
    pub milestones: &'static [&'static str],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub title: String,
    pub status: Option<TaskStatus>,
    pub list_type: Option<ListType>,
    pub context: String,
    pub due_date: Option<String>,
    pub project_id: Option<String>,
    pub waiting_on: String,
    pub follow_up_date: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDraft {
    pub name: String,
    pub client: String,
    pub description: String,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MilestoneDraft {
    pub project_id: String,
    pub name: String,
    pub planned_date: Option<String>,
    pub status: Option<MilestoneStatus>,
    pub checklist: Vec<ChecklistItem>,
    pub notes: String,
}

/// Outcome chosen for an inbox item while processing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProcessDecision {
    #[serde(rename_all = "camelCase")]
    NextAction {
        title: String,
        context: String,
        #[serde(default)]
        due_date: Option<String>,
        #[serde(default)]
        project_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Project { name: String, template_id: String },
    #[serde(rename_all = "camelCase")]
    Waiting {
        #[serde(default)]
        title: String,
        waiting_on: String,
        #[serde(default)]
        follow_up_date: Option<String>,
    },
    Someday,
    Reference,
    Trash,
}

impl ProcessDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NextAction { .. } => "Próxima ação",
            Self::Project { .. } => "Projeto",
            Self::Waiting { .. } => "Aguardando",
            Self::Someday => "Talvez",
            Self::Reference => "Referência",
            Self::Trash => "Lixo",
        }
    }
}

/// Result of processing: the task kept in place, the project it became, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "camelCase")]
pub enum ProcessOutcome {
    Task(Task),
    Project(Project),
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectUpdate {
    pub name: String,
    pub client: String,
    pub description: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MilestoneUpdate {
    pub name: String,
    pub planned_date: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilter {
    pub list_type: ListType,
    pub text: Option<String>,
    pub context: Option<String>,
    pub project_id: Option<String>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self::for_list(ListType::Next)
    }
}

impl TaskFilter {
    pub fn for_list(list_type: ListType) -> Self {
        Self {
            list_type,
            text: None,
            context: None,
            project_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaEntryKind {
    Task,
    Milestone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEntry {
    pub kind: AgendaEntryKind,
    pub id: String,
    pub title: String,
    pub date: String,
    pub extra: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agenda {
    pub overdue: Vec<AgendaEntry>,
    pub today: Vec<AgendaEntry>,
    pub next_7_days: Vec<AgendaEntry>,
    pub next_30_days: Vec<AgendaEntry>,
}

impl Agenda {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty()
            && self.today.is_empty()
            && self.next_7_days.is_empty()
            && self.next_30_days.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project: Project,
    pub next_milestone: Option<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub storage_key: String,
    pub log_level: String,
    pub contexts: Vec<String>,
    pub default_template: String,
    pub backup_dir: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage_key: crate::storage::STORAGE_KEY.to_string(),
            log_level: "info".to_string(),
            contexts: ["@computador", "@telefone", "@campo", "@escritório", "@casa"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_template: "simples".to_string(),
            backup_dir: None,
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.is_empty()))
}

fn checklist_or_empty<'de, D>(deserializer: D) -> Result<Vec<ChecklistItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(error = %error, "skipping unreadable checklist item");
                None
            }
        })
        .collect())
}
