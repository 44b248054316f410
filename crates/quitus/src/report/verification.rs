//! Cross-role verification report.
//!
//! Aggregates the CB's substantive controls and the ordonnateur's
//! checklist into per-role totals plus an incoherence count: items where
//! the two roles answered the same underlying fact differently. Facts are
//! matched by label, lowercased with whitespace collapsed. Purely
//! derivational — reads, never writes, and is deterministic for a given
//! validation trail.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::db::validation_repo::{self, ControleFondRow};
use crate::db::verification_repo::{self, VerificationRow};
use crate::db::{dossier_repo, Database};
use crate::error::{Result, WorkflowError};

/// Totals for one role's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotauxRole {
    pub total: u64,
    pub satisfaits: u64,
}

/// The verification report for one dossier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RapportVerification {
    pub dossier_id: String,
    pub numero_dossier: String,
    pub controles_fond: TotauxRole,
    pub verifications: TotauxRole,
    /// Mandatory ordonnateur items still unanswered or negative.
    pub obligatoires_bloquantes: u64,
    /// Facts where CB and ordonnateur disagree. Reported, never blocking.
    pub incoherences: u64,
}

/// Builds the report for a dossier.
pub fn build_rapport(db: &Database, dossier_id: &str) -> Result<RapportVerification> {
    let dossier = dossier_repo::find_by_id(db, dossier_id)?.ok_or(WorkflowError::NotFound {
        entity: "dossier",
        id: dossier_id.to_string(),
    })?;

    let controles = validation_repo::list_controles_fond(db, dossier_id)?;
    let verifications = verification_repo::list_by_dossier(db, dossier_id)?;
    let obligatoires_bloquantes = verification_repo::count_blocking_mandatory(db, dossier_id)?;

    let satisfaits_cb = controles.iter().filter(|c| c.valide).count() as u64;
    let satisfaits_ord = verifications
        .iter()
        .filter(|v| v.satisfait == Some(true))
        .count() as u64;

    Ok(RapportVerification {
        dossier_id: dossier.id,
        numero_dossier: dossier.numero_dossier,
        controles_fond: TotauxRole {
            total: controles.len() as u64,
            satisfaits: satisfaits_cb,
        },
        verifications: TotauxRole {
            total: verifications.len() as u64,
            satisfaits: satisfaits_ord,
        },
        obligatoires_bloquantes,
        incoherences: count_incoherences(&controles, &verifications),
    })
}

/// Counts facts both roles answered with differing outcomes. Unanswered
/// ordonnateur items never pair with anything.
pub(crate) fn count_incoherences(
    controles: &[ControleFondRow],
    verifications: &[VerificationRow],
) -> u64 {
    // Latest answer wins when a label occurs twice; inputs arrive in
    // insertion order.
    let mut cb_facts: BTreeMap<String, bool> = BTreeMap::new();
    for c in controles {
        cb_facts.insert(normalize_libelle(&c.libelle), c.valide);
    }

    let mut ord_facts: BTreeMap<String, bool> = BTreeMap::new();
    for v in verifications {
        if let Some(satisfait) = v.satisfait {
            ord_facts.insert(normalize_libelle(&v.libelle), satisfait);
        }
    }

    cb_facts
        .iter()
        .filter(|(fact, valide)| ord_facts.get(*fact).is_some_and(|s| s != *valide))
        .count() as u64
}

/// Label normalization used to match the same fact across roles.
pub(crate) fn normalize_libelle(libelle: &str) -> String {
    libelle
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
