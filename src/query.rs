use crate::models::{
    Agenda, AgendaEntry, AgendaEntryKind, AppState, Milestone, MilestoneStatus, Project, ProjectStatus,
    ProjectSummary, Task, TaskFilter,
};
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

const UNKNOWN_PROJECT: &str = "Projeto";
const TASK_FALLBACK_EXTRA: &str = "Tarefa";

/// Strict `YYYY-MM-DD` calendar date; anything else means "no date".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if !DATE_PATTERN.is_match(trimmed) {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

fn parse_optional(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_date)
}

/// Dated values sort before dateless ones; two dateless values are equal.
pub fn compare_dates(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (parse_optional(a), parse_optional(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn project_name<'a>(projects: &'a [Project], project_id: &str) -> Option<&'a str> {
    projects
        .iter()
        .find(|project| project.id == project_id)
        .map(|project| project.name.as_str())
}

pub fn agenda(state: &AppState, today: NaiveDate) -> Agenda {
    let in_7 = today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
    let in_30 = today.checked_add_days(Days::new(30)).unwrap_or(NaiveDate::MAX);

    let tasks = state
        .tasks
        .iter()
        .filter(|task| !task.list_type.hidden_from_agenda())
        .filter_map(|task| {
            let date = task.due_date.as_ref()?;
            Some(AgendaEntry {
                kind: AgendaEntryKind::Task,
                id: task.id.clone(),
                title: task.title.clone(),
                date: date.clone(),
                extra: if task.context.is_empty() {
                    TASK_FALLBACK_EXTRA.to_string()
                } else {
                    task.context.clone()
                },
            })
        });

    let milestones = state.milestones.iter().filter_map(|milestone| {
        let date = milestone.planned_date.as_ref()?;
        let project = project_name(&state.projects, &milestone.project_id)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_PROJECT);
        Some(AgendaEntry {
            kind: AgendaEntryKind::Milestone,
            id: milestone.id.clone(),
            title: format!("{} ({})", milestone.name, project),
            date: date.clone(),
            extra: milestone.status.as_str().to_string(),
        })
    });

    let mut entries: Vec<AgendaEntry> = tasks.chain(milestones).collect();
    entries.sort_by(|a, b| compare_dates(Some(&a.date), Some(&b.date)));

    let mut result = Agenda::default();
    for entry in entries {
        let Some(date) = parse_date(&entry.date) else {
            continue;
        };
        if date < today {
            result.overdue.push(entry);
        } else if date == today {
            result.today.push(entry);
        } else if date <= in_7 {
            result.next_7_days.push(entry);
        } else if date <= in_30 {
            result.next_30_days.push(entry);
        }
    }
    result
}

/// Earliest pending milestone of a project; completed ones never qualify.
pub fn next_milestone<'a>(milestones: &'a [Milestone], project_id: &str) -> Option<&'a Milestone> {
    let mut pending: Vec<&Milestone> = milestones
        .iter()
        .filter(|milestone| milestone.project_id == project_id && milestone.status != MilestoneStatus::Done)
        .collect();
    pending.sort_by(|a, b| compare_dates(a.planned_date.as_deref(), b.planned_date.as_deref()));
    pending.into_iter().next()
}

pub fn project_milestones<'a>(milestones: &'a [Milestone], project_id: &str) -> Vec<&'a Milestone> {
    let mut owned: Vec<&Milestone> = milestones
        .iter()
        .filter(|milestone| milestone.project_id == project_id)
        .collect();
    owned.sort_by(|a, b| compare_dates(a.planned_date.as_deref(), b.planned_date.as_deref()));
    owned
}

pub fn project_summaries(state: &AppState) -> Vec<ProjectSummary> {
    state
        .projects
        .iter()
        .map(|project| ProjectSummary {
            project: project.clone(),
            next_milestone: if project.status == ProjectStatus::Active {
                next_milestone(&state.milestones, &project.id).cloned()
            } else {
                None
            },
        })
        .collect()
}

pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    let text = filter
        .text
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase);
    let context = filter.context.as_deref().filter(|value| !value.is_empty());
    let project_id = filter.project_id.as_deref().filter(|value| !value.is_empty());

    let mut matching: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.list_type == filter.list_type)
        .filter(|task| {
            text.as_ref()
                .map(|query| task.title.to_lowercase().contains(query.as_str()))
                .unwrap_or(true)
        })
        .filter(|task| context.map(|expected| task.context == expected).unwrap_or(true))
        .filter(|task| {
            project_id
                .map(|expected| task.project_id.as_deref() == Some(expected))
                .unwrap_or(true)
        })
        .collect();
    matching.sort_by(|a, b| compare_dates(a.due_date.as_deref(), b.due_date.as_deref()));
    matching
}

pub fn inbox_items(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.list_type == crate::models::ListType::Inbox)
        .collect()
}

pub fn next_inbox_item(tasks: &[Task]) -> Option<&Task> {
    inbox_items(tasks).into_iter().next()
}
