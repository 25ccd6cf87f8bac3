pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod query;
pub mod storage;

use std::path::{Path, PathBuf};

use tracing::info;

pub use crate::{
    error::TodoError,
    model::{DEFAULT_CATEGORY, Priority, SUGGESTED_CATEGORIES, Task, TaskEdit},
    query::{CategoryCount, CategoryFilter, Stats, StatusFilter},
    storage::LoadStatus,
};

/// Result of [`TodoList::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Completed(Task),
    /// Nothing changed; not an error.
    AlreadyCompleted(Task),
}

/// The task list and the document it is persisted to.
///
/// Every mutator writes the whole list before touching memory, so a failed
/// save leaves the list as it was last persisted.
#[derive(Debug)]
pub struct TodoList {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl TodoList {
    /// Load the list at `path`, starting empty if it is missing or corrupt.
    pub fn open(path: impl Into<PathBuf>) -> (Self, LoadStatus) {
        let path = path.into();
        let loaded = storage::load(&path);
        (
            Self {
                path,
                tasks: loaded.tasks,
            },
            loaded.status,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tasks in storage order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter(&self, status: StatusFilter, category: &CategoryFilter) -> Vec<&Task> {
        query::filter(&self.tasks, status, category)
    }

    pub fn stats(&self) -> Stats {
        query::stats(&self.tasks)
    }

    /// Append a pending task. Its id is the current task count plus one.
    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        category: &str,
    ) -> Result<Task, TodoError> {
        if text.trim().is_empty() {
            return Err(TodoError::validation("task text must not be empty"));
        }

        let task = Task::builder()
            .text(text)
            .priority(priority)
            .category(category)
            .build(self.tasks.len() as u64 + 1);

        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next)?;

        info!(id = task.id, task = %task.text, "added task");
        Ok(task)
    }

    pub fn complete(&mut self, id: u64) -> Result<Completion, TodoError> {
        let mut next = self.tasks.clone();
        let task = find_mut(&mut next, id)?;
        if !task.mark_done() {
            return Ok(Completion::AlreadyCompleted(task.clone()));
        }
        let task = task.clone();
        self.commit(next)?;

        info!(id, "completed task");
        Ok(Completion::Completed(task))
    }

    pub fn edit(&mut self, id: u64, edit: TaskEdit) -> Result<Task, TodoError> {
        if edit.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TodoError::validation("task text must not be empty"));
        }

        let mut next = self.tasks.clone();
        let task = find_mut(&mut next, id)?;
        task.apply(edit);
        let task = task.clone();
        self.commit(next)?;

        info!(id, "edited task");
        Ok(task)
    }

    /// Remove every task carrying `id` and return them.
    pub fn delete(&mut self, id: u64) -> Result<Vec<Task>, TodoError> {
        // `partition` keeps storage order on both sides.
        let (removed, kept): (Vec<Task>, Vec<Task>) =
            self.tasks.iter().cloned().partition(|t| t.id == id);
        if removed.is_empty() {
            return Err(TodoError::NotFound(id));
        }
        self.commit(kept)?;

        info!(id, removed = removed.len(), "deleted task");
        Ok(removed)
    }

    /// Drop every task. Returns how many were removed.
    pub fn clear_all(&mut self) -> Result<usize, TodoError> {
        let count = self.tasks.len();
        self.commit(Vec::new())?;

        info!(count, "cleared all tasks");
        Ok(count)
    }

    fn commit(&mut self, next: Vec<Task>) -> Result<(), TodoError> {
        storage::save(&self.path, &next)?;
        self.tasks = next;
        Ok(())
    }
}

fn find_mut(tasks: &mut [Task], id: u64) -> Result<&mut Task, TodoError> {
    tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(TodoError::NotFound(id))
}
