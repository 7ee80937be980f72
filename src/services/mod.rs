use thiserror::Error;

use crate::repositories::StoreError;

pub(crate) mod analytics;
pub(crate) mod attempts;
pub(crate) mod marking;
pub(crate) mod question_selection;
pub(crate) mod test_generation;
pub(crate) mod timing;

/// Outcome kinds of the exam engine, kept distinct so the HTTP layer can map each one.
#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("attempt {attempt_number} was already submitted")]
    Conflict { score: i32, attempt_number: i32 },
    #[error("storage failure: {0}")]
    Internal(#[from] StoreError),
}

pub(crate) type EngineResult<T> = Result<T, EngineError>;
