//! Approval workflow: status graph, permissions, validation gates and the
//! orchestrating service.

pub mod gates;
pub mod permissions;
pub mod service;
pub mod statut;

pub use gates::{GateDecision, GateRefusal};
pub use service::{ChecklistItem, DossierService, ModificationDossier, NouveauDossier};
pub use statut::{Nature, Statut, Transition};
