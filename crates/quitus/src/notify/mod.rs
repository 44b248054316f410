//! Notification fan-out for workflow events.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, WorkflowEvent};

use serde::{Deserialize, Serialize};

/// Notification priority, mirrored verbatim into the inbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priorite {
    Basse,
    Moyenne,
    Haute,
    Urgente,
}

impl Priorite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priorite::Basse => "BASSE",
            Priorite::Moyenne => "MOYENNE",
            Priorite::Haute => "HAUTE",
            Priorite::Urgente => "URGENTE",
        }
    }
}

/// What a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeNotification {
    Information,
    Confirmation,
    Validation,
    Rejet,
}

impl TypeNotification {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeNotification::Information => "INFORMATION",
            TypeNotification::Confirmation => "CONFIRMATION",
            TypeNotification::Validation => "VALIDATION",
            TypeNotification::Rejet => "REJET",
        }
    }
}
