use std::str::FromStr;

use serde::Serialize;

use crate::{error::TodoError, model::Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(TodoError::validation(format!(
                "invalid status '{s}': must be all, pending, or completed"
            ))),
        }
    }
}

/// `all`, or an exact (case-sensitive) category name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => task.category == *category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => Self::All,
            other => Self::Only(other.to_string()),
        })
    }
}

/// Tasks matching both filters, in storage order.
pub fn filter<'a>(
    tasks: &'a [Task],
    status: StatusFilter,
    category: &CategoryFilter,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| status.matches(t))
        .filter(|t| category.matches(t))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage in `0.0..=100.0`; `0.0` for an empty list.
    pub completion_rate: f64,
    /// One entry per category, in order of first appearance.
    pub category_counts: Vec<CategoryCount>,
}

pub fn stats(tasks: &[Task]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if total > 0 {
        completed as f64 * 100.0 / total as f64
    } else {
        0.0
    };

    let mut category_counts: Vec<CategoryCount> = Vec::new();
    for task in tasks {
        match category_counts
            .iter_mut()
            .find(|c| c.category == task.category)
        {
            Some(entry) => entry.count += 1,
            None => category_counts.push(CategoryCount {
                category: task.category.clone(),
                count: 1,
            }),
        }
    }

    Stats {
        total,
        completed,
        pending: total - completed,
        completion_rate,
        category_counts,
    }
}
