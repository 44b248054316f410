pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod report;
pub mod telemetry;
pub mod workflow;

pub use auth::{Claims, Role};
pub use config::{load_config, Config, RoutageConfig};
pub use db::Database;
pub use error::{ConfigError, Result, WorkflowError};
pub use notify::{Dispatcher, Priorite, TypeNotification, WorkflowEvent};
pub use report::{build_rapport, derive_quitus, RapportVerification};
pub use workflow::{
    ChecklistItem, DossierService, GateRefusal, ModificationDossier, Nature, NouveauDossier,
    Statut, Transition,
};
