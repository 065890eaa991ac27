use serde::Serialize;
use thiserror::Error;

/// Errors produced while checking or running a program. All three kinds are
/// terminal for the current run; nothing is retried or rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Error {
    #[error("syntax error at line {line} in {command}: {detail}")]
    Syntax {
        line: usize,
        command: String,
        detail: String,
    },

    #[error("unsupported command at line {line}: '{word}'")]
    Unsupported { line: usize, word: String },

    #[error("runtime error at line {line}: {detail}")]
    Runtime { line: usize, detail: String },
}

impl Error {
    pub fn line(&self) -> usize {
        match self {
            Error::Syntax { line, .. } | Error::Unsupported { line, .. } | Error::Runtime { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
