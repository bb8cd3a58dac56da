//! Storage for todo records.
//!
//! [`TodoRepository`] is the contract the service layer talks to. Any backing
//! technology can implement it; [`InMemoryTodoRepository`] keeps everything in
//! process memory for the lifetime of the server.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use mockall::automock;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

use super::{NewTodo, Todo, TodoChanges};

/// Errors a repository may report. The in-memory store never produces them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// CRUD operations over todo records.
#[automock]
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Returns every stored todo, in insertion order.
    async fn find_all(&self) -> Result<Vec<Todo>, RepositoryError>;

    /// Returns the todo with `id`, or `None` if there is no such todo.
    async fn find_by_id(&self, id: &str) -> Result<Option<Todo>, RepositoryError>;

    /// Stores a new todo under a freshly allocated ID and returns it.
    async fn create(&self, new_todo: NewTodo) -> Result<Todo, RepositoryError>;

    /// Merges `changes` onto the todo with `id` and bumps `updated_at`.
    ///
    /// Returns `None` without side effects when there is no such todo.
    async fn update(
        &self,
        id: &str,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, RepositoryError>;

    /// Removes the todo with `id`. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Removes every todo and restarts ID allocation.
    async fn delete_all(&self) -> Result<(), RepositoryError>;
}

/// Source of the current time for the store.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Smallest step between two `updated_at` values of the same record.
const TIMESTAMP_RESOLUTION: TimeDelta = TimeDelta::milliseconds(1);

const FIRST_ID: u64 = 1;

#[derive(Debug)]
struct TodoTable {
    todos: BTreeMap<u64, Todo>,
    next_id: u64,
}

impl TodoTable {
    fn new() -> Self {
        Self {
            todos: BTreeMap::new(),
            next_id: FIRST_ID,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Todo> {
        let key = parse_id(id)?;
        self.todos.get_mut(&key).filter(|todo| todo.id == id)
    }

    fn get(&self, id: &str) -> Option<&Todo> {
        let key = parse_id(id)?;
        self.todos.get(&key).filter(|todo| todo.id == id)
    }

    fn remove(&mut self, id: &str) -> bool {
        match parse_id(id) {
            Some(key) if self.get(id).is_some() => self.todos.remove(&key).is_some(),
            _ => false,
        }
    }
}

fn parse_id(id: &str) -> Option<u64> {
    id.parse().ok()
}

/// Keeps todos in memory. Every mutation holds the write lock, so creates,
/// updates and deletes never interleave.
pub struct InMemoryTodoRepository {
    table: RwLock<TodoTable>,
    clock: Box<dyn Clock>,
}

impl Default for InMemoryTodoRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            table: RwLock::new(TodoTable::new()),
            clock: Box::new(clock),
        }
    }

    /// Current time truncated to the resolution timestamps are kept at.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }
}

/// Next `updated_at` for a record last touched at `previous`: the clock
/// reading, or one tick past `previous` if the clock has not moved on.
fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TIMESTAMP_RESOLUTION
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn find_all(&self) -> Result<Vec<Todo>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.todos.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Todo>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.get(id).cloned())
    }

    async fn create(&self, new_todo: NewTodo) -> Result<Todo, RepositoryError> {
        let mut table = self.table.write().await;
        let key = table.allocate_id();
        let now = self.now();
        let todo = Todo {
            id: key.to_string(),
            title: new_todo.title,
            description: new_todo.description,
            completed: new_todo.completed.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        table.todos.insert(key, todo.clone());
        Ok(todo)
    }

    async fn update(
        &self,
        id: &str,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, RepositoryError> {
        let mut table = self.table.write().await;
        let now = self.now();
        let Some(todo) = table.get_mut(id) else {
            return Ok(None);
        };
        changes.apply_to(todo);
        todo.updated_at = next_updated_at(todo.updated_at, now);
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        Ok(table.remove(id))
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        *table = TodoTable::new();
        Ok(())
    }
}
