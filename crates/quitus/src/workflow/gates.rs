//! Validation Gate Engine — pure predicate evaluation over the stored
//! validation records. Gates never mutate state; they read fresh data and
//! answer with either a grant or a specific, structured refusal.

use thiserror::Error;

use crate::db::{validation_repo, verification_repo, Database, DatabaseError};
use crate::workflow::statut::Statut;

/// Why a gate refused a transition. Callers surface the specific cause,
/// never a generic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateRefusal {
    #[error("validation du type d'opération manquante pour le dossier '{dossier_id}'")]
    TypeValidationManquante { dossier_id: String },

    #[error("type d'opération non validé pour le dossier '{dossier_id}'")]
    TypeOperationNonValide { dossier_id: String },

    #[error("aucun contrôle de fond enregistré pour le dossier '{dossier_id}'")]
    AucunControleFond { dossier_id: String },

    #[error("contrôles de fond non validés pour le dossier '{dossier_id}' ({non_valides} non satisfait(s))")]
    ControlesFondNonValides {
        dossier_id: String,
        non_valides: u64,
    },

    #[error("vérifications obligatoires incomplètes pour le dossier '{dossier_id}' ({bloquantes} bloquante(s))")]
    VerificationsObligatoiresIncompletes { dossier_id: String, bloquantes: u64 },

    #[error("le dossier '{dossier_id}' est en statut {statut}, quitus possible uniquement en VALIDE_DEFINITIVEMENT")]
    StatutNonDefinitif { dossier_id: String, statut: Statut },
}

/// The outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Refused(GateRefusal),
}

impl GateDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateDecision::Granted)
    }

    pub fn into_result(self) -> Result<(), GateRefusal> {
        match self {
            GateDecision::Granted => Ok(()),
            GateDecision::Refused(refusal) => Err(refusal),
        }
    }
}

/// May the CB validate this dossier?
///
/// Requires exactly one type-of-operation validation AND at least one
/// substantive control AND every such record satisfied. An empty control
/// list fails closed: a dossier with zero controls can never auto-pass,
/// so the emptiness check comes before any all-satisfied scan.
pub fn can_validate_cb(db: &Database, dossier_id: &str) -> Result<GateDecision, DatabaseError> {
    let type_validation = match validation_repo::find_validation_cb(db, dossier_id)? {
        Some(v) => v,
        None => {
            return Ok(GateDecision::Refused(GateRefusal::TypeValidationManquante {
                dossier_id: dossier_id.to_string(),
            }))
        }
    };
    if !type_validation.type_operation_valide {
        return Ok(GateDecision::Refused(GateRefusal::TypeOperationNonValide {
            dossier_id: dossier_id.to_string(),
        }));
    }

    let controles = validation_repo::list_controles_fond(db, dossier_id)?;
    if controles.is_empty() {
        return Ok(GateDecision::Refused(GateRefusal::AucunControleFond {
            dossier_id: dossier_id.to_string(),
        }));
    }

    let non_valides = controles.iter().filter(|c| !c.valide).count() as u64;
    if non_valides > 0 {
        return Ok(GateDecision::Refused(GateRefusal::ControlesFondNonValides {
            dossier_id: dossier_id.to_string(),
            non_valides,
        }));
    }

    Ok(GateDecision::Granted)
}

/// May the ordonnateur approve this dossier?
///
/// Every mandatory checklist item must be answered affirmatively;
/// optional items never block.
pub fn can_approve_ordonnateur(
    db: &Database,
    dossier_id: &str,
) -> Result<GateDecision, DatabaseError> {
    let bloquantes = verification_repo::count_blocking_mandatory(db, dossier_id)?;
    if bloquantes > 0 {
        return Ok(GateDecision::Refused(
            GateRefusal::VerificationsObligatoiresIncompletes {
                dossier_id: dossier_id.to_string(),
                bloquantes,
            },
        ));
    }
    Ok(GateDecision::Granted)
}

/// May a quitus be generated? Pure function of the current status.
pub fn can_generate_quitus(dossier_id: &str, statut: Statut) -> GateDecision {
    if statut != Statut::ValideDefinitivement {
        return GateDecision::Refused(GateRefusal::StatutNonDefinitif {
            dossier_id: dossier_id.to_string(),
            statut,
        });
    }
    GateDecision::Granted
}
