use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{what} not found: {}", path.display())]
    FileNotFound { what: &'static str, path: PathBuf },

    #[error("repository {id} not found in any {suffix} file under {}", dir.display())]
    RepoNotFound {
        id: String,
        suffix: String,
        dir: PathBuf,
    },

    #[error("repository {id} not found in {}", path.display())]
    EntryNotFound { id: String, path: PathBuf },

    #[error("{0}")]
    Layout(String),

    #[error("{0}")]
    Usage(String),

    #[error("{} already exists with different content, operation cancelled", path.display())]
    Conflict { path: PathBuf },

    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to download {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("{0}")]
    Unsupported(String),

    #[error("{program} exited with status {status}")]
    Command { program: String, status: String },

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RepoError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        RepoError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    #[cfg(test)]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RepoError::Unsupported(_))
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
