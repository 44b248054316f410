//! Shared test utilities for quitus integration tests.
//!
//! This module provides:
//! - `TestHarness` for an isolated in-memory workflow environment with
//!   one seeded user per role
//! - Builder patterns for creating dossiers and checklists programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
