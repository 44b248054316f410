//! Derived, read-only documents over the validation trail.

pub mod quitus;
pub mod verification;

pub use quitus::{derive_quitus, QuitusDerive};
pub use verification::{build_rapport, RapportVerification};
