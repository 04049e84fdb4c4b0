use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitBoardError {
    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("GitHub CLI operation failed: {0}")]
    GitHubCli(String),

    #[error("GitHub CLI not found")]
    GitHubCliNotFound,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Embedded configuration is corrupted: {0}")]
    Corruption(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Script evaluation failed: {0}")]
    Sandbox(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<git2::Error> for GitBoardError {
    fn from(error: git2::Error) -> Self {
        GitBoardError::Git(error.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, GitBoardError>;
