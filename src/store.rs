use crate::db::KeyValueStore;
use crate::errors::{AppError, AppResult};
use crate::factory::{self, non_blank, FALLBACK_TEMPLATE_ID};
use crate::models::{
    Agenda, AppSettings, AppState, ChecklistItem, ListType, MainTab, Milestone, MilestoneDraft, MilestoneStatus,
    MilestoneUpdate, ProcessDecision, ProcessOutcome, Project, ProjectDraft, ProjectStatus, ProjectSummary,
    ProjectTemplate, ProjectUpdate, Task, TaskDraft, TaskFilter, TaskStatus,
};
use crate::{query, storage};
use chrono::{Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owner of the in-memory state. Mutations are applied to a copy, persisted, then swapped in,
/// so memory never holds anything the store has not accepted.
pub struct GtdStore {
    state: AppState,
    kv: Arc<dyn KeyValueStore>,
    storage_key: String,
    settings: AppSettings,
}

impl GtdStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_settings(kv, &AppSettings::default())
    }

    pub fn with_settings(kv: Arc<dyn KeyValueStore>, settings: &AppSettings) -> Self {
        let storage_key = if settings.storage_key.trim().is_empty() {
            storage::STORAGE_KEY.to_string()
        } else {
            settings.storage_key.clone()
        };
        let state = storage::load_state(kv.as_ref(), &storage_key);
        tracing::info!(
            key = %storage_key,
            tasks = state.tasks.len(),
            projects = state.projects.len(),
            "state loaded"
        );
        Self {
            state,
            kv,
            storage_key,
            settings: settings.clone(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Context tags offered when turning an inbox item into a next action.
    pub fn contexts(&self) -> &[String] {
        &self.settings.contexts
    }

    pub fn save(&self) -> AppResult<()> {
        storage::save_state(self.kv.as_ref(), &self.storage_key, &self.state)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.state.projects.iter().find(|project| project.id == project_id)
    }

    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.state.milestones.iter().find(|milestone| milestone.id == milestone_id)
    }

    pub fn capture(&mut self, title: &str) -> AppResult<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Digite algo para adicionar na Inbox.".to_string()));
        }
        let task = factory::create_task(TaskDraft {
            title: title.to_string(),
            list_type: Some(ListType::Inbox),
            ..TaskDraft::default()
        });
        self.commit(|state| {
            state.tasks.push(task.clone());
            Ok(task)
        })
    }

    pub fn delete_task(&mut self, task_id: &str) -> AppResult<()> {
        self.commit(|state| {
            state.tasks.retain(|task| task.id != task_id);
            Ok(())
        })
    }

    /// Moves the task to the front so it is processed next, and switches to the process tab.
    pub fn start_processing(&mut self, task_id: &str) -> AppResult<Task> {
        self.commit(|state| {
            let index = task_index(state, task_id)?;
            let task = state.tasks.remove(index);
            state.tasks.insert(0, task.clone());
            state.ui.active_tab = MainTab::Process;
            Ok(task)
        })
    }

    pub fn next_to_process(&self) -> Option<&Task> {
        query::next_inbox_item(&self.state.tasks)
    }

    /// Only inbox items can be processed.
    pub fn process_inbox_item(&mut self, task_id: &str, decision: ProcessDecision) -> AppResult<ProcessOutcome> {
        let label = decision.label();
        let outcome = self.commit(|state| {
            let index = task_index(state, task_id)?;
            if state.tasks[index].list_type != ListType::Inbox {
                return Err(AppError::Validation("Este item não está na Inbox.".to_string()));
            }
            apply_decision(state, index, decision)
        })?;
        tracing::info!(task_id, decision = label, "inbox item processed");
        Ok(outcome)
    }

    pub fn complete_task(&mut self, task_id: &str) -> AppResult<Task> {
        self.commit(|state| {
            let task = task_mut(state, task_id)?;
            task.list_type = ListType::Done;
            task.status = TaskStatus::Done;
            task.updated_at = Utc::now();
            Ok(task.clone())
        })
    }

    /// Blank titles keep the current one.
    pub fn edit_task_title(&mut self, task_id: &str, title: &str) -> AppResult<Task> {
        let title = title.trim();
        self.commit(|state| {
            let task = task_mut(state, task_id)?;
            if !title.is_empty() {
                task.title = title.to_string();
                task.updated_at = Utc::now();
            }
            Ok(task.clone())
        })
    }

    pub fn tasks_in_list(&self, filter: &TaskFilter) -> Vec<&Task> {
        query::filter_tasks(&self.state.tasks, filter)
    }

    /// Unknown template ids fall back to the configured default, then to the simple template.
    pub fn create_project(&mut self, name: &str, template_id: &str) -> AppResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Nome do projeto é obrigatório.".to_string()));
        }
        let template = factory::find_template(template_id)
            .or_else(|| factory::find_template(&self.settings.default_template))
            .or_else(|| factory::find_template(FALLBACK_TEMPLATE_ID))
            .ok_or_else(|| AppError::Internal("no project template available".to_string()))?;
        self.commit(|state| insert_project_from_template(state, name, template))
    }

    pub fn update_project(&mut self, project_id: &str, update: ProjectUpdate) -> AppResult<Project> {
        self.commit(|state| {
            let project = state
                .projects
                .iter_mut()
                .find(|project| project.id == project_id)
                .ok_or_else(|| AppError::NotFound(format!("Projeto '{}' não encontrado", project_id)))?;
            project.name = update.name.trim().to_string();
            project.client = update.client.trim().to_string();
            project.description = update.description.trim().to_string();
            project.status = update.status;
            project.updated_at = Utc::now();
            Ok(project.clone())
        })
    }

    pub fn add_milestone(&mut self, project_id: &str, name: &str) -> AppResult<Milestone> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Informe o nome do marco.".to_string()));
        }
        let milestone = factory::create_milestone(MilestoneDraft {
            project_id: project_id.to_string(),
            name: name.to_string(),
            ..MilestoneDraft::default()
        });
        self.commit(|state| {
            state.milestones.push(milestone.clone());
            Ok(milestone)
        })
    }

    pub fn complete_milestone(&mut self, milestone_id: &str) -> AppResult<Milestone> {
        self.complete_milestone_on(milestone_id, Local::now().date_naive())
    }

    pub fn complete_milestone_on(&mut self, milestone_id: &str, date: NaiveDate) -> AppResult<Milestone> {
        self.commit(|state| {
            let milestone = milestone_mut(state, milestone_id)?;
            milestone.status = MilestoneStatus::Done;
            milestone.completed_date = Some(date.format("%Y-%m-%d").to_string());
            Ok(milestone.clone())
        })
    }

    pub fn edit_milestone(&mut self, milestone_id: &str, update: MilestoneUpdate) -> AppResult<Milestone> {
        self.commit(|state| {
            let milestone = milestone_mut(state, milestone_id)?;
            let name = update.name.trim();
            if !name.is_empty() {
                milestone.name = name.to_string();
            }
            milestone.planned_date = non_blank(update.planned_date);
            milestone.notes = update.notes;
            Ok(milestone.clone())
        })
    }

    pub fn add_checklist_item(&mut self, milestone_id: &str, text: &str) -> AppResult<ChecklistItem> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Informe o texto do item da checklist.".to_string()));
        }
        let item = factory::create_checklist_item(text);
        self.commit(|state| {
            milestone_mut(state, milestone_id)?.checklist.push(item.clone());
            Ok(item)
        })
    }

    pub fn remove_checklist_item(&mut self, milestone_id: &str, item_id: &str) -> AppResult<()> {
        self.commit(|state| {
            milestone_mut(state, milestone_id)?
                .checklist
                .retain(|item| item.id != item_id);
            Ok(())
        })
    }

    pub fn set_checklist_item_done(
        &mut self,
        milestone_id: &str,
        item_id: &str,
        done: bool,
    ) -> AppResult<ChecklistItem> {
        self.commit(|state| {
            let item = milestone_mut(state, milestone_id)?
                .checklist
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| AppError::NotFound(format!("Item '{}' não encontrado", item_id)))?;
            item.done = done;
            Ok(item.clone())
        })
    }

    pub fn set_active_tab(&mut self, tab: MainTab) -> AppResult<()> {
        self.commit(|state| {
            state.ui.active_tab = tab;
            Ok(())
        })
    }

    pub fn set_gtd_subtab(&mut self, list_type: ListType) -> AppResult<()> {
        self.commit(|state| {
            state.ui.gtd_subtab = list_type;
            Ok(())
        })
    }

    pub fn select_project(&mut self, project_id: &str) -> AppResult<()> {
        self.commit(|state| {
            state.ui.selected_project_id = project_id.to_string();
            Ok(())
        })
    }

    pub fn clear_selected_project(&mut self) -> AppResult<()> {
        self.select_project("")
    }

    pub fn agenda(&self, today: NaiveDate) -> Agenda {
        query::agenda(&self.state, today)
    }

    pub fn agenda_today(&self) -> Agenda {
        self.agenda(Local::now().date_naive())
    }

    pub fn project_summaries(&self) -> Vec<ProjectSummary> {
        query::project_summaries(&self.state)
    }

    pub fn project_milestones(&self, project_id: &str) -> Vec<&Milestone> {
        query::project_milestones(&self.state.milestones, project_id)
    }

    pub fn next_milestone(&self, project_id: &str) -> Option<&Milestone> {
        query::next_milestone(&self.state.milestones, project_id)
    }

    pub fn project_templates(&self) -> &'static [ProjectTemplate] {
        factory::project_templates()
    }

    pub fn export_backup(&self) -> AppResult<String> {
        storage::export_backup(&self.state)
    }

    pub fn export_backup_file(&self, dir: &Path) -> AppResult<PathBuf> {
        let path = storage::write_backup_file(dir, &self.state, Local::now().date_naive())?;
        tracing::info!(path = %path.to_string_lossy(), "backup exported");
        Ok(path)
    }

    /// Writes today's backup into `AppSettings::backup_dir`.
    pub fn export_backup_default(&self) -> AppResult<PathBuf> {
        let dir = self
            .settings
            .backup_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| AppError::Validation("Nenhuma pasta de backup configurada.".to_string()))?;
        self.export_backup_file(Path::new(dir))
    }

    /// Replaces the whole state. A rejected backup, or one that cannot be persisted,
    /// leaves the current state untouched.
    pub fn import_backup(&mut self, raw: &str) -> AppResult<()> {
        let imported = storage::import_backup(raw)?;
        self.replace_state(imported)
    }

    pub fn import_backup_file(&mut self, path: &Path) -> AppResult<()> {
        let imported = storage::read_backup_file(path)?;
        self.replace_state(imported)
    }

    /// Persists the default state over the current blob.
    pub fn reset_all(&mut self) -> AppResult<()> {
        self.commit(|state| {
            *state = AppState::default();
            Ok(())
        })?;
        tracing::info!(key = %self.storage_key, "state reset");
        Ok(())
    }

    fn replace_state(&mut self, next: AppState) -> AppResult<()> {
        let (tasks, projects, milestones) = (next.tasks.len(), next.projects.len(), next.milestones.len());
        self.commit(|state| {
            *state = next;
            Ok(())
        })?;
        tracing::info!(tasks, projects, milestones, "backup imported");
        Ok(())
    }

    fn commit<T>(&mut self, change: impl FnOnce(&mut AppState) -> AppResult<T>) -> AppResult<T> {
        let mut next = self.state.clone();
        let result = change(&mut next)?;
        storage::save_state(self.kv.as_ref(), &self.storage_key, &next)?;
        self.state = next;
        Ok(result)
    }
}

fn apply_decision(state: &mut AppState, index: usize, decision: ProcessDecision) -> AppResult<ProcessOutcome> {
    match decision {
        ProcessDecision::Trash => {
            state.tasks.remove(index);
            Ok(ProcessOutcome::Discarded)
        }
        ProcessDecision::NextAction {
            title,
            context,
            due_date,
            project_id,
        } => {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Informe o título da próxima ação.".to_string()));
            }
            let task = &mut state.tasks[index];
            task.title = title.to_string();
            task.list_type = ListType::Next;
            task.context = context;
            task.due_date = non_blank(due_date);
            task.project_id = non_blank(project_id);
            task.updated_at = Utc::now();
            Ok(ProcessOutcome::Task(task.clone()))
        }
        ProcessDecision::Waiting {
            title,
            waiting_on,
            follow_up_date,
        } => {
            let waiting_on = waiting_on.trim();
            if waiting_on.is_empty() {
                return Err(AppError::Validation("Informe quem está aguardando.".to_string()));
            }
            let task = &mut state.tasks[index];
            let title = title.trim();
            if !title.is_empty() {
                task.title = title.to_string();
            }
            task.list_type = ListType::Waiting;
            task.waiting_on = waiting_on.to_string();
            task.follow_up_date = non_blank(follow_up_date);
            task.updated_at = Utc::now();
            Ok(ProcessOutcome::Task(task.clone()))
        }
        ProcessDecision::Project { name, template_id } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("Informe o nome do projeto.".to_string()));
            }
            let template = factory::find_template(&template_id)
                .ok_or_else(|| AppError::NotFound(format!("Template '{}' não existe", template_id)))?;
            let project = insert_project_from_template(state, name, template)?;
            state.tasks.remove(index);
            Ok(ProcessOutcome::Project(project))
        }
        ProcessDecision::Someday => {
            let task = &mut state.tasks[index];
            task.list_type = ListType::Someday;
            Ok(ProcessOutcome::Task(task.clone()))
        }
        ProcessDecision::Reference => {
            let task = &mut state.tasks[index];
            task.list_type = ListType::Reference;
            Ok(ProcessOutcome::Task(task.clone()))
        }
    }
}

fn insert_project_from_template(state: &mut AppState, name: &str, template: &ProjectTemplate) -> AppResult<Project> {
    let project = factory::create_project(ProjectDraft {
        name: name.to_string(),
        status: Some(ProjectStatus::Active),
        ..ProjectDraft::default()
    });
    let milestones = factory::milestones_from_template(&project.id, template);
    if milestones.is_empty() {
        return Err(AppError::Validation("Projeto precisa de ao menos um marco.".to_string()));
    }
    tracing::info!(
        project_id = %project.id,
        template = template.id,
        milestones = milestones.len(),
        "project created"
    );
    state.projects.push(project.clone());
    state.milestones.extend(milestones);
    Ok(project)
}

fn task_index(state: &AppState, task_id: &str) -> AppResult<usize> {
    state
        .tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| AppError::NotFound(format!("Tarefa '{}' não encontrada", task_id)))
}

fn task_mut<'a>(state: &'a mut AppState, task_id: &str) -> AppResult<&'a mut Task> {
    let index = task_index(state, task_id)?;
    Ok(&mut state.tasks[index])
}

fn milestone_mut<'a>(state: &'a mut AppState, milestone_id: &str) -> AppResult<&'a mut Milestone> {
    state
        .milestones
        .iter_mut()
        .find(|milestone| milestone.id == milestone_id)
        .ok_or_else(|| AppError::NotFound(format!("Marco '{}' não encontrado", milestone_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    /// Reads like a `MemoryStore` but refuses every write.
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> AppResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::Io("disk full".to_string()))
        }

        fn remove(&self, key: &str) -> AppResult<()> {
            self.inner.remove(key)
        }
    }

    fn read_only_store_with(state: &AppState) -> GtdStore {
        let inner = MemoryStore::new();
        storage::save_state(&inner, storage::STORAGE_KEY, state).expect("seed");
        GtdStore::new(Arc::new(ReadOnlyStore { inner }))
    }

    fn store() -> (Arc<MemoryStore>, GtdStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = GtdStore::new(kv.clone());
        (kv, store)
    }

    fn reloaded(kv: &Arc<MemoryStore>) -> AppState {
        storage::load_state(kv.as_ref(), storage::STORAGE_KEY)
    }

    #[test]
    fn capture_requires_text_and_persists() {
        let (kv, mut store) = store();
        let error = store.capture("   ").expect_err("blank capture");
        assert_eq!(error.user_message(), "Digite algo para adicionar na Inbox.");
        assert!(kv.get(storage::STORAGE_KEY).expect("get").is_none());

        let task = store.capture("  Pagar boleto ").expect("capture");
        assert_eq!(task.title, "Pagar boleto");
        assert_eq!(task.list_type, ListType::Inbox);
        assert_eq!(reloaded(&kv).tasks, vec![task]);
    }

    #[test]
    fn start_processing_moves_item_to_front() {
        let (_kv, mut store) = store();
        store.capture("primeiro").expect("capture");
        let second = store.capture("segundo").expect("capture");

        store.start_processing(&second.id).expect("start");
        assert_eq!(store.state().tasks[0].id, second.id);
        assert_eq!(store.state().ui.active_tab, MainTab::Process);
        assert_eq!(store.next_to_process().map(|t| t.id.as_str()), Some(second.id.as_str()));

        let error = store.start_processing("missing").expect_err("unknown id");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn processing_as_next_action_keeps_the_same_record() {
        let (kv, mut store) = store();
        let captured = store.capture("ligar contador").expect("capture");

        let outcome = store
            .process_inbox_item(
                &captured.id,
                ProcessDecision::NextAction {
                    title: "Ligar para o contador".to_string(),
                    context: "@telefone".to_string(),
                    due_date: Some("2024-02-01".to_string()),
                    project_id: Some(String::new()),
                },
            )
            .expect("process");

        let ProcessOutcome::Task(task) = outcome else {
            panic!("expected task outcome");
        };
        assert_eq!(task.id, captured.id);
        assert_eq!(task.list_type, ListType::Next);
        assert_eq!(task.context, "@telefone");
        assert_eq!(task.due_date.as_deref(), Some("2024-02-01"));
        assert_eq!(task.project_id, None);
        assert_eq!(reloaded(&kv).tasks.len(), 1);
    }

    #[test]
    fn processing_validates_required_fields_without_mutating() {
        let (_kv, mut store) = store();
        let captured = store.capture("algo").expect("capture");

        let error = store
            .process_inbox_item(
                &captured.id,
                ProcessDecision::NextAction {
                    title: " ".to_string(),
                    context: "@casa".to_string(),
                    due_date: None,
                    project_id: None,
                },
            )
            .expect_err("blank title");
        assert_eq!(error.user_message(), "Informe o título da próxima ação.");

        let error = store
            .process_inbox_item(
                &captured.id,
                ProcessDecision::Waiting {
                    title: String::new(),
                    waiting_on: String::new(),
                    follow_up_date: None,
                },
            )
            .expect_err("blank waiting on");
        assert_eq!(error.user_message(), "Informe quem está aguardando.");
        assert_eq!(store.task(&captured.id).map(|t| t.list_type), Some(ListType::Inbox));
    }

    #[test]
    fn processing_as_waiting_keeps_title_when_blank() {
        let (_kv, mut store) = store();
        let captured = store.capture("orçamento fornecedor").expect("capture");
        store
            .process_inbox_item(
                &captured.id,
                ProcessDecision::Waiting {
                    title: String::new(),
                    waiting_on: "Fornecedor".to_string(),
                    follow_up_date: Some("2024-03-01".to_string()),
                },
            )
            .expect("process");
        let task = store.task(&captured.id).expect("task");
        assert_eq!(task.title, "orçamento fornecedor");
        assert_eq!(task.list_type, ListType::Waiting);
        assert_eq!(task.waiting_on, "Fornecedor");
        assert_eq!(task.follow_up_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn processing_as_project_replaces_inbox_item() {
        let (_kv, mut store) = store();
        let captured = store.capture("reforma escritório").expect("capture");
        let outcome = store
            .process_inbox_item(
                &captured.id,
                ProcessDecision::Project {
                    name: "Reforma".to_string(),
                    template_id: "consultoria".to_string(),
                },
            )
            .expect("process");

        let ProcessOutcome::Project(project) = outcome else {
            panic!("expected project outcome");
        };
        assert!(store.task(&captured.id).is_none());
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(store.project_milestones(&project.id).len(), 6);

        let unknown = store.capture("outro").expect("capture");
        let error = store
            .process_inbox_item(
                &unknown.id,
                ProcessDecision::Project {
                    name: "X".to_string(),
                    template_id: "nope".to_string(),
                },
            )
            .expect_err("unknown template");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn someday_reference_and_trash() {
        let (_kv, mut store) = store();
        let a = store.capture("a").expect("capture");
        let b = store.capture("b").expect("capture");
        let c = store.capture("c").expect("capture");

        store.process_inbox_item(&a.id, ProcessDecision::Someday).expect("someday");
        store.process_inbox_item(&b.id, ProcessDecision::Reference).expect("reference");
        let outcome = store.process_inbox_item(&c.id, ProcessDecision::Trash).expect("trash");

        assert_eq!(outcome, ProcessOutcome::Discarded);
        assert_eq!(store.task(&a.id).map(|t| t.list_type), Some(ListType::Someday));
        assert_eq!(store.task(&b.id).map(|t| t.list_type), Some(ListType::Reference));
        assert!(store.task(&c.id).is_none());
        assert!(store.next_to_process().is_none());
    }

    #[test]
    fn complete_and_edit_tasks() {
        let (_kv, mut store) = store();
        let task = store.capture("revisar").expect("capture");

        let edited = store.edit_task_title(&task.id, "  ").expect("edit blank");
        assert_eq!(edited.title, "revisar");
        let edited = store.edit_task_title(&task.id, "Revisar contrato").expect("edit");
        assert_eq!(edited.title, "Revisar contrato");

        let done = store.complete_task(&task.id).expect("complete");
        assert_eq!(done.list_type, ListType::Done);
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(store.tasks_in_list(&TaskFilter::for_list(ListType::Done)).len(), 1);

        store.delete_task(&task.id).expect("delete");
        assert!(store.state().tasks.is_empty());
    }

    #[test]
    fn create_project_uses_simple_template() {
        let (_kv, mut store) = store();
        let error = store.create_project("", "simples").expect_err("blank name");
        assert_eq!(error.user_message(), "Nome do projeto é obrigatório.");

        let project = store.create_project("Site novo", "simples").expect("project");
        let names: Vec<&str> = store
            .project_milestones(&project.id)
            .iter()
            .map(|milestone| milestone.name.as_str())
            .collect();
        assert_eq!(names, vec!["Planejamento", "Execução", "Entrega"]);
        assert!(store
            .state()
            .milestones
            .iter()
            .all(|m| m.project_id == project.id && m.status == MilestoneStatus::NotStarted));

        let fallback = store.create_project("Outro", "inexistente").expect("fallback");
        assert_eq!(store.project_milestones(&fallback.id).len(), 3);
    }

    #[test]
    fn milestone_lifecycle() {
        let (_kv, mut store) = store();
        let project = store.create_project("Auditoria", "simples").expect("project");
        let extra = store.add_milestone(&project.id, " Revisão ").expect("milestone");
        assert_eq!(extra.name, "Revisão");

        let edited = store
            .edit_milestone(
                &extra.id,
                MilestoneUpdate {
                    name: String::new(),
                    planned_date: Some("2024-04-01".to_string()),
                    notes: "link".to_string(),
                },
            )
            .expect("edit");
        assert_eq!(edited.name, "Revisão");
        assert_eq!(edited.planned_date.as_deref(), Some("2024-04-01"));
        assert_eq!(store.next_milestone(&project.id).map(|m| m.id.as_str()), Some(extra.id.as_str()));

        let date = NaiveDate::from_ymd_opt(2024, 4, 2).expect("date");
        let done = store.complete_milestone_on(&extra.id, date).expect("complete");
        assert_eq!(done.status, MilestoneStatus::Done);
        assert_eq!(done.completed_date.as_deref(), Some("2024-04-02"));
        assert_ne!(store.next_milestone(&project.id).map(|m| m.id.as_str()), Some(extra.id.as_str()));
    }

    #[test]
    fn checklist_items_belong_to_their_milestone() {
        let (kv, mut store) = store();
        let project = store.create_project("Auditoria", "simples").expect("project");
        let milestone_id = store.project_milestones(&project.id)[0].id.clone();

        assert!(store.add_checklist_item(&milestone_id, " ").is_err());
        let item = store.add_checklist_item(&milestone_id, " coletar dados ").expect("item");
        assert_eq!(item.text, "coletar dados");

        let toggled = store.set_checklist_item_done(&milestone_id, &item.id, true).expect("toggle");
        assert!(toggled.done);
        assert!(reloaded(&kv).milestones[0].checklist[0].done);

        store.remove_checklist_item(&milestone_id, &item.id).expect("remove");
        assert!(store.milestone(&milestone_id).expect("milestone").checklist.is_empty());

        let error = store
            .set_checklist_item_done(&milestone_id, "gone", true)
            .expect_err("missing item");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn update_project_trims_fields() {
        let (_kv, mut store) = store();
        let project = store.create_project("Auditoria", "simples").expect("project");
        let updated = store
            .update_project(
                &project.id,
                ProjectUpdate {
                    name: " Auditoria 2024 ".to_string(),
                    client: " ACME ".to_string(),
                    description: String::new(),
                    status: ProjectStatus::OnHold,
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Auditoria 2024");
        assert_eq!(updated.client, "ACME");
        assert_eq!(updated.status, ProjectStatus::OnHold);
        assert!(store.project_summaries()[0].next_milestone.is_none());
    }

    #[test]
    fn configured_default_template_is_the_first_fallback() {
        let settings = AppSettings {
            default_template: "consultoria".to_string(),
            ..AppSettings::default()
        };
        let mut store = GtdStore::with_settings(Arc::new(MemoryStore::new()), &settings);
        let project = store.create_project("Beta", "inexistente").expect("project");
        assert_eq!(store.project_milestones(&project.id).len(), 6);
        assert_eq!(store.contexts().len(), 5);
    }

    #[test]
    fn ui_cursor_is_persisted() {
        let (kv, mut store) = store();
        store.set_active_tab(MainTab::Gtd).expect("tab");
        store.set_gtd_subtab(ListType::Waiting).expect("subtab");
        store.select_project("p-1").expect("select");
        let ui = reloaded(&kv).ui;
        assert_eq!(ui.active_tab, MainTab::Gtd);
        assert_eq!(ui.gtd_subtab, ListType::Waiting);
        assert_eq!(ui.selected_project_id, "p-1");

        store.clear_selected_project().expect("clear");
        assert!(reloaded(&kv).ui.selected_project_id.is_empty());
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let (_kv, mut store) = store();
        store.capture("manter").expect("capture");
        let before = store.state().clone();

        assert!(store.import_backup("{}").is_err());
        assert!(store.import_backup("not json").is_err());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn import_replaces_state_and_reset_clears_it() {
        let (kv, mut store) = store();
        store.capture("antigo").expect("capture");
        store.set_active_tab(MainTab::Backup).expect("tab");

        let mut source = GtdStore::new(Arc::new(MemoryStore::new()));
        source.capture("novo").expect("capture");
        let text = source.export_backup().expect("export");

        store.import_backup(&text).expect("import");
        assert_eq!(store.state().tasks.len(), 1);
        assert_eq!(store.state().tasks[0].title, "novo");
        assert_eq!(store.state().ui.active_tab, MainTab::Agenda);
        assert_eq!(reloaded(&kv), store.state().clone());

        store.reset_all().expect("reset");
        assert_eq!(store.state(), &AppState::default());
        assert_eq!(reloaded(&kv), AppState::default());
    }

    #[test]
    fn failed_writes_leave_memory_unchanged() {
        let (_kv, mut seeded) = store();
        let task = seeded.capture("existente").expect("capture");
        let project = seeded.create_project("Auditoria", "simples").expect("project");
        let before = seeded.state().clone();

        let mut store = read_only_store_with(&before);
        assert_eq!(store.state(), &before);

        assert!(matches!(store.capture("novo"), Err(AppError::Io(_))));
        assert!(store.complete_task(&task.id).is_err());
        assert!(store.process_inbox_item(&task.id, ProcessDecision::Trash).is_err());
        assert!(store.create_project("Outro", "simples").is_err());
        let milestone_id = store.project_milestones(&project.id)[0].id.clone();
        assert!(store.complete_milestone(&milestone_id).is_err());
        assert!(store.set_active_tab(MainTab::Backup).is_err());
        assert_eq!(store.state(), &before);

        let mut source = GtdStore::new(Arc::new(MemoryStore::new()));
        source.capture("importada").expect("capture");
        let text = source.export_backup().expect("export");
        assert!(matches!(store.import_backup(&text), Err(AppError::Io(_))));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn unreadable_task_does_not_erase_the_others_on_next_save() {
        let kv = Arc::new(MemoryStore::new());
        let blob = serde_json::json!({
            "tasks": [
                { "id": "good", "title": "Ligar", "listType": "next" },
                { "id": "bad", "title": "Velha", "listType": "archived" }
            ],
            "projects": [],
            "milestones": []
        });
        kv.set(storage::STORAGE_KEY, &blob.to_string()).expect("seed");

        let mut store = GtdStore::new(kv.clone());
        assert_eq!(store.task("good").map(|t| t.list_type), Some(ListType::Next));
        store.capture("novo").expect("capture");

        let persisted = reloaded(&kv);
        assert_eq!(persisted.tasks.len(), 2);
        assert!(persisted.tasks.iter().any(|task| task.id == "good"));
    }

    #[test]
    fn only_inbox_items_can_be_processed() {
        let (_kv, mut store) = store();
        let task = store.capture("arquivar").expect("capture");
        store.process_inbox_item(&task.id, ProcessDecision::Reference).expect("reference");

        let error = store
            .process_inbox_item(
                &task.id,
                ProcessDecision::Project {
                    name: "Novo".to_string(),
                    template_id: "simples".to_string(),
                },
            )
            .expect_err("not in inbox");
        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(store.task(&task.id).map(|t| t.list_type), Some(ListType::Reference));
        assert!(store.state().projects.is_empty());
    }

    #[test]
    fn default_export_uses_configured_backup_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_kv, unconfigured) = store();
        assert!(matches!(unconfigured.export_backup_default(), Err(AppError::Validation(_))));

        let settings = AppSettings {
            backup_dir: Some(dir.path().join("backups").to_string_lossy().to_string()),
            ..AppSettings::default()
        };
        let mut store = GtdStore::with_settings(Arc::new(MemoryStore::new()), &settings);
        store.capture("salvar").expect("capture");
        let path = store.export_backup_default().expect("export");
        assert!(path.starts_with(dir.path().join("backups")));
        assert_eq!(storage::read_backup_file(&path).expect("read").tasks.len(), 1);
    }
}
