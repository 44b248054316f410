//! Typed claims consumed by the workflow.
//!
//! The identity provider hands each request a decoded token; this module
//! turns it into a validated [`Claims`] value exactly once, at the
//! boundary. Everything past this point works with the closed [`Role`]
//! enum, never with raw role strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The custodian roles known to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Creates and owns dossiers; edits and (re)submits them.
    Secretaire,
    /// Budget controller: validates the operation type and substantive controls.
    ControleurBudgetaire,
    /// Approving officer: runs the mandatory verification checklist.
    Ordonnateur,
    /// Accounting agent: records payment/receipt and final clearance.
    AgentComptable,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Secretaire => "SECRETAIRE",
            Role::ControleurBudgetaire => "CONTROLEUR_BUDGETAIRE",
            Role::Ordonnateur => "ORDONNATEUR",
            Role::AgentComptable => "AGENT_COMPTABLE",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ClaimsError> {
        match s {
            "SECRETAIRE" => Ok(Role::Secretaire),
            "CONTROLEUR_BUDGETAIRE" => Ok(Role::ControleurBudgetaire),
            "ORDONNATEUR" => Ok(Role::Ordonnateur),
            "AGENT_COMPTABLE" => Ok(Role::AgentComptable),
            other => Err(ClaimsError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated request identity: who is acting, and as what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Builds claims from the raw fields of a decoded token.
    pub fn from_token_fields(user_id: &str, role: &str) -> Result<Self, ClaimsError> {
        if user_id.trim().is_empty() {
            return Err(ClaimsError::MissingUserId);
        }
        Ok(Self {
            user_id: user_id.to_string(),
            role: Role::parse(role)?,
        })
    }
}

#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("Unknown role: '{0}'")]
    UnknownRole(String),

    #[error("Token is missing a user id")]
    MissingUserId,
}
