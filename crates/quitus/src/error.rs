use thiserror::Error;

use crate::auth::Role;
use crate::workflow::gates::GateRefusal;

#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Referenced record does not exist. Non-retriable.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The dossier is not in a status from which the attempted transition
    /// (or edit) is legal.
    #[error("Dossier '{dossier_id}': {reason}")]
    PreconditionFailed { dossier_id: String, reason: String },

    /// The actor's role is not permitted to perform this action.
    #[error("Role {role} is not permitted to perform {action}")]
    Forbidden { role: Role, action: String },

    /// A validation gate refused the transition.
    #[error("Validation gate refused: {0}")]
    Gate(#[from] GateRefusal),

    /// The numero_dossier collides with an existing dossier. Surfaced
    /// distinctly so callers can prompt for a new number.
    #[error("Numero dossier '{numero}' is already in use")]
    NumeroConflict { numero: String },

    /// Another transition committed first on the same dossier. Retriable
    /// after re-reading the dossier.
    #[error("Dossier '{dossier_id}' was modified concurrently, retry with fresh state")]
    ConcurrentTransition { dossier_id: String },

    /// A stored value could not be interpreted (corrupted status or
    /// nature column).
    #[error("Invalid stored data: {0}")]
    InvalidData(#[from] crate::workflow::statut::StatutError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence backend failure; the transition was not committed.
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl WorkflowError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            WorkflowError::ConcurrentTransition { .. } | WorkflowError::Database(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
