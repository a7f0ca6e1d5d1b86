use opsdesk_core::CoreError;

/// Errors surfaced by engine operations.
///
/// `Core` variants are typed rejections decided before any write; `Database`
/// covers transactional failures, which abort the whole unit of work (entity
/// mutation and audit entry together).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
