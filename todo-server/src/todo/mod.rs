use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use utoipa::ToSchema;

pub mod api;
pub mod repository;
pub mod validation;

use repository::{RepositoryError, TodoRepository};

/// A todo record as stored and returned by the service.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Store-assigned identifier, never reused
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(serialize_with = "serialize_timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

/// Validated payload for creating a todo.
#[derive(Debug, PartialEq, Eq, Clone, Default, ToSchema)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// Validated partial update. Only the fields that are `Some` are applied.
#[derive(Debug, PartialEq, Eq, Clone, Default, ToSchema)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Merges the present fields onto `todo`. Timestamps are left to the caller.
    pub fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = Some(description);
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}

/// ISO-8601 with exactly three fractional digits and a `Z` suffix.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(timestamp))
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// The underlying repository failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Business rules on top of a [`TodoRepository`].
#[derive(Clone)]
pub struct TodoService {
    repository: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        TodoService { repository }
    }

    /// Retrieves every todo in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        Ok(self.repository.find_all().await?)
    }

    /// Retrieves a todo by its ID, or `None` if no such todo exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo_by_id(&self, id: &str) -> Result<Option<Todo>, TodoServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Creates a new todo from an already validated payload.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(&self, new_todo: NewTodo) -> Result<Todo, TodoServiceError> {
        let todo = self.repository.create(new_todo).await?;
        tracing::debug!("Created todo {}", todo.id);
        Ok(todo)
    }

    /// Applies `changes` to an existing todo.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the todo does not exist. The repository is not asked to
    /// update anything in that case.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo(
        &self,
        id: &str,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, TodoServiceError> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Ok(None);
        }
        Ok(self.repository.update(id, changes).await?)
    }

    /// Deletes a todo.
    ///
    /// # Returns
    ///
    /// `Ok(false)` when the todo does not exist, without asking the repository to delete.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo(&self, id: &str) -> Result<bool, TodoServiceError> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.repository.delete(id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_completed_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        self.get_todos_by_status(true).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_pending_todos(&self) -> Result<Vec<Todo>, TodoServiceError> {
        self.get_todos_by_status(false).await
    }

    async fn get_todos_by_status(&self, completed: bool) -> Result<Vec<Todo>, TodoServiceError> {
        let todos = self
            .repository
            .find_all()
            .await?
            .into_iter()
            .filter(|todo| todo.completed == completed)
            .collect();
        Ok(todos)
    }
}
