use crate::dates;
use crate::text;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pendente,
    EmAndamento,
    Concluida,
}

impl TaskStatus {
    /// Value used on the wire and in the `status` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pendente => "pendente",
            TaskStatus::EmAndamento => "em_andamento",
            TaskStatus::Concluida => "concluida",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pendente => "Pending",
            TaskStatus::EmAndamento => "In progress",
            TaskStatus::Concluida => "Done",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TaskStatus::Pendente => TaskStatus::EmAndamento,
            TaskStatus::EmAndamento => TaskStatus::Concluida,
            TaskStatus::Concluida => TaskStatus::Pendente,
        }
    }

    pub fn prev(self) -> Self {
        self.next().next()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    /// Accepts the wire values plus the labels older servers store
    /// (`Não iniciado`, `Em andamento`, `Concluído`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = text::fold(s.trim()).replace(['_', '-'], " ");
        match folded.as_str() {
            "pendente" | "nao iniciado" | "nao iniciada" => Ok(TaskStatus::Pendente),
            "em andamento" => Ok(TaskStatus::EmAndamento),
            "concluida" | "concluido" => Ok(TaskStatus::Concluida),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn status_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskStatus, D::Error> {
    Ok(Option::<TaskStatus>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,
    #[serde(default, with = "dates::flexible_date")]
    pub data_inicial: Option<NaiveDate>,
    #[serde(default, with = "dates::flexible_date")]
    pub data_limite: Option<NaiveDate>,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: TaskStatus,
    #[serde(with = "dates::flexible_timestamp")]
    pub created_at: NaiveDateTime,
}

impl Task {
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            data_inicial: self.data_inicial,
            data_limite: self.data_limite,
            status: self.status,
        }
    }
}

/// The writable part of a task, as sent on create and update.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub data_inicial: Option<NaiveDate>,
    pub data_limite: Option<NaiveDate>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Task title is required.")]
    MissingTitle,
    #[error("Could not understand the start date `{0}`.")]
    InvalidStartDate(String),
    #[error("Could not understand the due date `{0}`.")]
    InvalidDueDate(String),
}

/// Text fields behind the new-task form and the edit draft.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub data_inicial: String,
    pub data_limite: String,
    pub status: TaskStatus,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    #[default]
    Title,
    Description,
    StartDate,
    DueDate,
    Status,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Title,
        FormField::Description,
        FormField::StartDate,
        FormField::DueDate,
        FormField::Status,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

impl TaskForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            data_inicial: task.data_inicial.map(|d| d.to_string()).unwrap_or_default(),
            data_limite: task.data_limite.map(|d| d.to_string()).unwrap_or_default(),
            status: task.status,
        }
    }

    pub fn text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::StartDate => Some(&mut self.data_inicial),
            FormField::DueDate => Some(&mut self.data_limite),
            FormField::Status => None,
        }
    }

    /// Validates the form. Date fields accept anything the spoken date parser does.
    pub fn to_fields(&self, today: NaiveDate) -> Result<TaskFields, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::MissingTitle);
        }
        let data_inicial = parse_form_date(&self.data_inicial, today)
            .map_err(|_| FormError::InvalidStartDate(self.data_inicial.trim().to_string()))?;
        let data_limite = parse_form_date(&self.data_limite, today)
            .map_err(|_| FormError::InvalidDueDate(self.data_limite.trim().to_string()))?;
        Ok(TaskFields {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            data_inicial,
            data_limite,
            status: self.status,
        })
    }
}

fn parse_form_date(raw: &str, today: NaiveDate) -> Result<Option<NaiveDate>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    dates::parse_spoken_date(raw, today).map(Some).ok_or(())
}
