//! Configuration schema.

use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Which role pool receives each forward-progress event.
    #[serde(default)]
    pub routage: RoutageConfig,
}

/// Role routing for notification fan-out. Each field names the custodian
/// pool notified after the corresponding stage; resolution happens
/// against the user registry at dispatch time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutageConfig {
    pub apres_soumission: Role,
    pub apres_validation_cb: Role,
    pub apres_approbation: Role,
}

impl Default for RoutageConfig {
    fn default() -> Self {
        Self {
            apres_soumission: Role::ControleurBudgetaire,
            apres_validation_cb: Role::Ordonnateur,
            apres_approbation: Role::AgentComptable,
        }
    }
}
