use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by todo list operations. None of them leave a partial
/// mutation behind.
#[derive(Error, Debug)]
pub enum TodoError {
    #[error("{0}")]
    Validation(String),

    #[error("task {0} not found")]
    NotFound(u64),

    #[error("failed to save {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TodoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TodoError::Validation(msg.into())
    }

    pub fn persistence(path: &Path, source: impl Into<std::io::Error>) -> Self {
        TodoError::Persistence {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}
