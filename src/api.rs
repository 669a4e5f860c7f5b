//! Client for the task HTTP API.
//!
//! One blocking round trip per call, no retries: a failed request surfaces straight to the
//! caller as an [`ApiError`].

use crate::task::{Task, TaskFields, TaskId, TaskStatus, User, UserId};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from the server: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Operations the client needs from the task service.
#[cfg_attr(test, mockall::automock)]
pub trait TaskApi {
    fn register(&self, email: &str, password: &str) -> Result<User, ApiError>;

    fn login(&self, email: &str, password: &str) -> Result<User, ApiError>;

    /// Lists a user's tasks, optionally only those with `status`.
    fn list_tasks(
        &self,
        user_id: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, ApiError>;

    fn create_task(&self, user_id: UserId, fields: &TaskFields) -> Result<Task, ApiError>;

    fn update_task(&self, task_id: TaskId, fields: &TaskFields) -> Result<Task, ApiError>;

    fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct TaskPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(flatten)]
    fields: &'a TaskFields,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Builds the error for a non-success response, preferring the server's `detail`.
pub fn error_from_body(status: u16, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(message) => Some(message),
            // validation errors arrive as [{"loc": [...], "msg": "...", ...}]
            serde_json::Value::Array(items) => items
                .first()
                .and_then(|item| item.get("msg"))
                .and_then(|msg| msg.as_str())
                .map(str::to_string),
            _ => None,
        })
        .filter(|message| !message.trim().is_empty());
    ApiError::Server {
        status,
        message: detail.unwrap_or_else(|| format!("Request failed (HTTP {status})")),
    }
}

pub struct HttpTaskApi {
    base_url: String,
    client: Client,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and returns the body of a successful response.
    fn send(&self, request: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let response = request.send().inspect_err(|err| {
            warn!(what, error = %err, "request failed to send");
        })?;
        let status = response.status();
        let body = response.text()?;
        if status.is_success() {
            info!(what, status = status.as_u16(), "request succeeded");
            Ok(body)
        } else {
            let err = error_from_body(status.as_u16(), &body);
            warn!(what, status = status.as_u16(), error = %err, "request rejected");
            Err(err)
        }
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        let body = self.send(request, what)?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl TaskApi for HttpTaskApi {
    fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .post(self.url("/register"))
            .json(&Credentials { email, password });
        self.send_json(request, "register")
    }

    fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = self
            .client
            .post(self.url("/login"))
            .json(&Credentials { email, password });
        self.send_json(request, "login")
    }

    fn list_tasks(
        &self,
        user_id: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, ApiError> {
        let mut query = vec![("user_id", user_id.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        let request = self.client.get(self.url("/tasks")).query(&query);
        self.send_json(request, "list tasks")
    }

    fn create_task(&self, user_id: UserId, fields: &TaskFields) -> Result<Task, ApiError> {
        let request = self.client.post(self.url("/tasks")).json(&TaskPayload {
            user_id: Some(user_id),
            fields,
        });
        self.send_json(request, "create task")
    }

    fn update_task(&self, task_id: TaskId, fields: &TaskFields) -> Result<Task, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/tasks/{task_id}")))
            .json(&TaskPayload {
                user_id: None,
                fields,
            });
        self.send_json(request, "update task")
    }

    fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/tasks/{task_id}")));
        self.send(request, "delete task").map(|_| ())
    }
}
