//! Dossier state machine.
//!
//! Owns the authoritative status field and runs every transition through
//! the same stages: permission check, status-edge check, gate check,
//! compare-and-set status write, then notification fan-out. Gate failures
//! resolve before any write, so they never need rollback; a failed write
//! sends no notification; a failed notification never rolls back the
//! committed status.

use chrono::Utc;
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::auth::{Claims, Role};
use crate::config::RoutageConfig;
use crate::db::dossier_repo::{self, DossierFilter, DossierRow};
use crate::db::quitus_repo::{self, QuitusRow};
use crate::db::validation_repo::{self, ControleFondRow, ValidationCbRow};
use crate::db::verification_repo::{self, VerificationRow};
use crate::db::{Database, DatabaseError};
use crate::error::{Result, WorkflowError};
use crate::notify::{Dispatcher, WorkflowEvent};
use crate::report::{self, RapportVerification};
use crate::workflow::gates;
use crate::workflow::permissions;
use crate::workflow::statut::{Nature, Statut, Transition};

/// Fields supplied at dossier creation.
#[derive(Debug, Clone)]
pub struct NouveauDossier {
    pub numero_dossier: String,
    pub nature: Nature,
    pub objet: String,
    pub beneficiaire: String,
    pub poste_comptable: String,
    pub nature_document: String,
    pub dossier_source_id: Option<String>,
}

/// Descriptive-field changes from the owning secretary. Absent fields
/// keep their current value.
#[derive(Debug, Default, Clone)]
pub struct ModificationDossier {
    pub numero_dossier: Option<String>,
    pub objet: Option<String>,
    pub beneficiaire: Option<String>,
    pub poste_comptable: Option<String>,
    pub nature_document: Option<String>,
}

impl ModificationDossier {
    fn apply(&self, dossier: &mut DossierRow) {
        if let Some(ref numero) = self.numero_dossier {
            dossier.numero_dossier = numero.clone();
        }
        if let Some(ref objet) = self.objet {
            dossier.objet = objet.clone();
        }
        if let Some(ref beneficiaire) = self.beneficiaire {
            dossier.beneficiaire = beneficiaire.clone();
        }
        if let Some(ref poste) = self.poste_comptable {
            dossier.poste_comptable = poste.clone();
        }
        if let Some(ref nature_doc) = self.nature_document {
            dossier.nature_document = nature_doc.clone();
        }
    }
}

/// One checklist item to instantiate for the ordonnateur.
#[derive(Debug, Clone)]
pub struct ChecklistItem {
    pub categorie: String,
    pub ordre: i64,
    pub libelle: String,
    pub obligatoire: bool,
}

/// The workflow orchestrator.
pub struct DossierService {
    db: Database,
    dispatcher: Dispatcher,
}

impl DossierService {
    pub fn new(db: Database, routage: RoutageConfig) -> Self {
        let dispatcher = Dispatcher::new(db.clone(), routage);
        Self { db, dispatcher }
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    fn load(&self, dossier_id: &str) -> Result<DossierRow> {
        dossier_repo::find_by_id(&self.db, dossier_id)?.ok_or(WorkflowError::NotFound {
            entity: "dossier",
            id: dossier_id.to_string(),
        })
    }

    fn check_permission(claims: &Claims, transition: Transition) -> Result<()> {
        if !permissions::is_allowed(claims.role, transition) {
            return Err(WorkflowError::Forbidden {
                role: claims.role,
                action: transition.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn check_role(claims: &Claims, required: Role, action: &str) -> Result<()> {
        if claims.role != required {
            return Err(WorkflowError::Forbidden {
                role: claims.role,
                action: action.to_string(),
            });
        }
        Ok(())
    }

    fn check_owner(claims: &Claims, dossier: &DossierRow) -> Result<()> {
        if claims.user_id != dossier.secretaire_id {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id.clone(),
                reason: "only the owning secretary may act on this dossier".to_string(),
            });
        }
        Ok(())
    }

    /// Parses the stored status and verifies the transition edge.
    fn check_edge(dossier: &DossierRow, transition: Transition) -> Result<Statut> {
        let statut = Statut::parse(&dossier.statut)?;
        if !transition.allowed_from(statut) {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id.clone(),
                reason: format!("transition {} is not allowed from status {}", transition, statut),
            });
        }
        Ok(statut)
    }

    /// Compare-and-set write. On success, returns the row with its new
    /// revision; on CAS miss, surfaces the concurrent transition.
    fn commit_row(&self, mut dossier: DossierRow) -> Result<DossierRow> {
        let numero = dossier.numero_dossier.clone();
        let committed =
            dossier_repo::commit(&self.db, &dossier).map_err(|e| numero_conflict(e, &numero))?;
        if !committed {
            return Err(WorkflowError::ConcurrentTransition {
                dossier_id: dossier.id,
            });
        }
        dossier.revision += 1;
        Ok(dossier)
    }

    fn notify(&self, dossier: &DossierRow, transition: Transition, claims: &Claims) {
        self.dispatcher.dispatch(&WorkflowEvent {
            dossier,
            transition,
            actor: claims,
        });
    }

    // ── Creation and secretary edits ────────────────────────────────────

    /// Creates a dossier in BROUILLON, owned by the calling secretary.
    pub fn create_dossier(&self, claims: &Claims, nouveau: &NouveauDossier) -> Result<DossierRow> {
        let _span = info_span!("workflow.creer", numero = %nouveau.numero_dossier).entered();
        Self::check_permission(claims, Transition::Creer)?;

        let numero = nouveau.numero_dossier.trim();
        if numero.is_empty() {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: String::new(),
                reason: "numero_dossier must not be empty".to_string(),
            });
        }
        if dossier_repo::numero_exists(&self.db, numero, None)? {
            return Err(WorkflowError::NumeroConflict {
                numero: numero.to_string(),
            });
        }

        let now = Self::now();
        let dossier = DossierRow {
            id: Uuid::new_v4().to_string(),
            numero_dossier: numero.to_string(),
            nature: nouveau.nature.as_str().to_string(),
            objet: nouveau.objet.clone(),
            beneficiaire: nouveau.beneficiaire.clone(),
            poste_comptable: nouveau.poste_comptable.clone(),
            nature_document: nouveau.nature_document.clone(),
            dossier_source_id: nouveau.dossier_source_id.clone(),
            secretaire_id: claims.user_id.clone(),
            statut: Statut::Brouillon.as_str().to_string(),
            rejection_reason: None,
            rejection_details: None,
            revision: 0,
            date_depot: None,
            rejected_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        // The UNIQUE constraint closes the check-then-insert race.
        dossier_repo::insert(&self.db, &dossier).map_err(|e| numero_conflict(e, numero))?;
        debug!(dossier_id = %dossier.id, "dossier created");
        Ok(dossier)
    }

    /// Submits a dossier for CB review. Legal from BROUILLON and, for the
    /// resubmission cycle, from REJETE_CB; rejection fields are cleared on
    /// the way back to EN_ATTENTE. `fields` carries the descriptive
    /// values finalized at submission time.
    pub fn submit(
        &self,
        claims: &Claims,
        dossier_id: &str,
        fields: Option<&ModificationDossier>,
    ) -> Result<DossierRow> {
        let _span = info_span!("workflow.soumettre", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::Soumettre)?;
        Self::check_owner(claims, &dossier)?;
        Self::check_edge(&dossier, Transition::Soumettre)?;

        if let Some(fields) = fields {
            self.check_numero_change(&dossier, fields)?;
            fields.apply(&mut dossier);
        }

        let now = Self::now();
        dossier.statut = Statut::EnAttente.as_str().to_string();
        dossier.date_depot = Some(now.clone());
        dossier.rejection_reason = None;
        dossier.rejection_details = None;
        dossier.rejected_at = None;
        dossier.updated_at = now;

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::Soumettre, claims);
        Ok(dossier)
    }

    /// Edits descriptive fields. Only the owning secretary, only in an
    /// editable status. An edit of a dossier already under CB review
    /// re-notifies the CB pool that it changed.
    pub fn update(
        &self,
        claims: &Claims,
        dossier_id: &str,
        fields: &ModificationDossier,
    ) -> Result<DossierRow> {
        let _span = info_span!("workflow.modifier", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::Modifier)?;
        Self::check_owner(claims, &dossier)?;

        let statut = Statut::parse(&dossier.statut)?;
        if !statut.is_editable() {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id,
                reason: format!("a dossier in status {} can no longer be edited", statut),
            });
        }

        self.check_numero_change(&dossier, fields)?;
        fields.apply(&mut dossier);
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        if statut == Statut::EnAttente {
            self.notify(&dossier, Transition::Modifier, claims);
        }
        Ok(dossier)
    }

    fn check_numero_change(
        &self,
        dossier: &DossierRow,
        fields: &ModificationDossier,
    ) -> Result<()> {
        if let Some(ref numero) = fields.numero_dossier {
            if numero.trim().is_empty() {
                return Err(WorkflowError::PreconditionFailed {
                    dossier_id: dossier.id.clone(),
                    reason: "numero_dossier must not be empty".to_string(),
                });
            }
            if *numero != dossier.numero_dossier
                && dossier_repo::numero_exists(&self.db, numero, Some(&dossier.id))?
            {
                return Err(WorkflowError::NumeroConflict {
                    numero: numero.clone(),
                });
            }
        }
        Ok(())
    }

    // ── CB stage ────────────────────────────────────────────────────────

    /// Records the CB's type-of-operation validation. Once per dossier,
    /// while the dossier is under CB review.
    pub fn record_validation_type(
        &self,
        claims: &Claims,
        dossier_id: &str,
        valide: bool,
        commentaire: Option<&str>,
    ) -> Result<ValidationCbRow> {
        Self::check_role(claims, Role::ControleurBudgetaire, "RECORD_VALIDATION_TYPE")?;
        let dossier = self.load(dossier_id)?;
        Self::require_statut(&dossier, Statut::EnAttente)?;

        let row = ValidationCbRow {
            id: Uuid::new_v4().to_string(),
            dossier_id: dossier.id.clone(),
            cb_id: claims.user_id.clone(),
            type_operation_valide: valide,
            commentaire: commentaire.map(str::to_string),
            created_at: Self::now(),
        };
        validation_repo::insert_validation_cb(&self.db, &row).map_err(|e| {
            if e.is_unique_violation() {
                WorkflowError::PreconditionFailed {
                    dossier_id: dossier.id.clone(),
                    reason: "type-of-operation validation already recorded".to_string(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(row)
    }

    /// Appends one substantive control result while the dossier is under
    /// CB review.
    pub fn record_controle_fond(
        &self,
        claims: &Claims,
        dossier_id: &str,
        libelle: &str,
        valide: bool,
        commentaire: Option<&str>,
    ) -> Result<ControleFondRow> {
        Self::check_role(claims, Role::ControleurBudgetaire, "RECORD_CONTROLE_FOND")?;
        let dossier = self.load(dossier_id)?;
        Self::require_statut(&dossier, Statut::EnAttente)?;

        if libelle.trim().is_empty() {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id,
                reason: "a control needs a non-empty libelle".to_string(),
            });
        }

        let row = ControleFondRow {
            id: Uuid::new_v4().to_string(),
            dossier_id: dossier.id,
            libelle: libelle.trim().to_string(),
            valide,
            commentaire: commentaire.map(str::to_string),
            cb_id: claims.user_id.clone(),
            created_at: Self::now(),
        };
        validation_repo::insert_controle_fond(&self.db, &row)?;
        Ok(row)
    }

    /// CB validation: gate, then EN_ATTENTE → VALIDE_CB, then notify the
    /// secretary, the CB and the ordonnateur pool.
    pub fn validate_cb(&self, claims: &Claims, dossier_id: &str) -> Result<DossierRow> {
        let _span = info_span!("workflow.valider_cb", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::ValiderCb)?;
        Self::check_edge(&dossier, Transition::ValiderCb)?;

        // Re-reads fresh child records just before the status write.
        gates::can_validate_cb(&self.db, dossier_id)?.into_result()?;

        dossier.statut = Statut::ValideCb.as_str().to_string();
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::ValiderCb, claims);
        Ok(dossier)
    }

    /// CB rejection: EN_ATTENTE → REJETE_CB with a mandatory reason; the
    /// owning secretary is notified at high priority.
    pub fn reject_cb(
        &self,
        claims: &Claims,
        dossier_id: &str,
        reason: &str,
        details: Option<&str>,
    ) -> Result<DossierRow> {
        let _span = info_span!("workflow.rejeter_cb", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::RejeterCb)?;
        Self::check_edge(&dossier, Transition::RejeterCb)?;

        if reason.trim().is_empty() {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id,
                reason: "rejection requires a non-empty reason".to_string(),
            });
        }

        let now = Self::now();
        dossier.statut = Statut::RejeteCb.as_str().to_string();
        dossier.rejection_reason = Some(reason.trim().to_string());
        dossier.rejection_details = details.map(str::to_string);
        dossier.rejected_at = Some(now.clone());
        dossier.updated_at = now;

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::RejeterCb, claims);
        Ok(dossier)
    }

    // ── Ordonnateur stage ───────────────────────────────────────────────

    /// Instantiates the ordonnateur checklist for a CB-validated dossier.
    pub fn seed_verifications(
        &self,
        claims: &Claims,
        dossier_id: &str,
        items: &[ChecklistItem],
    ) -> Result<Vec<VerificationRow>> {
        Self::check_role(claims, Role::Ordonnateur, "SEED_VERIFICATIONS")?;
        let dossier = self.load(dossier_id)?;
        Self::require_statut(&dossier, Statut::ValideCb)?;

        let now = Self::now();
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let row = VerificationRow {
                id: Uuid::new_v4().to_string(),
                dossier_id: dossier.id.clone(),
                categorie: item.categorie.clone(),
                ordre: item.ordre,
                libelle: item.libelle.clone(),
                obligatoire: item.obligatoire,
                satisfait: None,
                commentaire: None,
                ordonnateur_id: None,
                answered_at: None,
                created_at: now.clone(),
            };
            verification_repo::insert(&self.db, &row)?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Records the ordonnateur's answer on one checklist item.
    pub fn answer_verification(
        &self,
        claims: &Claims,
        verification_id: &str,
        satisfait: bool,
        commentaire: Option<&str>,
    ) -> Result<VerificationRow> {
        Self::check_role(claims, Role::Ordonnateur, "ANSWER_VERIFICATION")?;
        let row = verification_repo::find_by_id(&self.db, verification_id)?.ok_or(
            WorkflowError::NotFound {
                entity: "verification",
                id: verification_id.to_string(),
            },
        )?;
        let dossier = self.load(&row.dossier_id)?;
        Self::require_statut(&dossier, Statut::ValideCb)?;

        verification_repo::answer(
            &self.db,
            verification_id,
            satisfait,
            commentaire,
            &claims.user_id,
            &Self::now(),
        )?;
        verification_repo::find_by_id(&self.db, verification_id)?.ok_or(
            WorkflowError::NotFound {
                entity: "verification",
                id: verification_id.to_string(),
            },
        )
    }

    /// Ordonnateur approval: gate, then VALIDE_CB → VALIDE_ORDONNATEUR.
    pub fn approve_ordonnateur(&self, claims: &Claims, dossier_id: &str) -> Result<DossierRow> {
        let _span = info_span!("workflow.approuver", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::ApprouverOrdonnateur)?;
        Self::check_edge(&dossier, Transition::ApprouverOrdonnateur)?;

        gates::can_approve_ordonnateur(&self.db, dossier_id)?.into_result()?;

        dossier.statut = Statut::ValideOrdonnateur.as_str().to_string();
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::ApprouverOrdonnateur, claims);
        Ok(dossier)
    }

    // ── AC stage ────────────────────────────────────────────────────────

    /// Settlement: VALIDE_ORDONNATEUR → PAYE for a DEPENSE dossier,
    /// RECETTE_ENREGISTREE for a RECETTE one. The two edges are mutually
    /// exclusive by nature.
    pub fn record_reglement(&self, claims: &Claims, dossier_id: &str) -> Result<DossierRow> {
        let _span = info_span!("workflow.reglement", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::EnregistrerReglement)?;
        Self::check_edge(&dossier, Transition::EnregistrerReglement)?;

        let nature = Nature::parse(&dossier.nature)?;
        dossier.statut = nature.statut_reglement().as_str().to_string();
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::EnregistrerReglement, claims);
        Ok(dossier)
    }

    /// PAYE / RECETTE_ENREGISTREE → VALIDE_DEFINITIVEMENT.
    pub fn validate_definitive(&self, claims: &Claims, dossier_id: &str) -> Result<DossierRow> {
        let _span = info_span!("workflow.valider_definitivement", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::ValiderDefinitivement)?;
        Self::check_edge(&dossier, Transition::ValiderDefinitivement)?;

        dossier.statut = Statut::ValideDefinitivement.as_str().to_string();
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::ValiderDefinitivement, claims);
        Ok(dossier)
    }

    /// VALIDE_DEFINITIVEMENT → TERMINE.
    pub fn cloturer(&self, claims: &Claims, dossier_id: &str) -> Result<DossierRow> {
        let _span = info_span!("workflow.cloturer", dossier_id = %dossier_id).entered();
        let mut dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::Cloturer)?;
        Self::check_edge(&dossier, Transition::Cloturer)?;

        dossier.statut = Statut::Termine.as_str().to_string();
        dossier.updated_at = Self::now();

        let dossier = self.commit_row(dossier)?;
        self.notify(&dossier, Transition::Cloturer, claims);
        Ok(dossier)
    }

    /// Generates (or returns) the quitus for a definitively-validated
    /// dossier. Side-effect-only: the status does not change, and the
    /// derived content is deterministic, so re-invocation is safe.
    pub fn generate_quitus(&self, claims: &Claims, dossier_id: &str) -> Result<QuitusRow> {
        let _span = info_span!("workflow.generer_quitus", dossier_id = %dossier_id).entered();
        let dossier = self.load(dossier_id)?;
        Self::check_permission(claims, Transition::GenererQuitus)?;

        let statut = Statut::parse(&dossier.statut)?;
        gates::can_generate_quitus(&dossier.id, statut).into_result()?;

        if let Some(existing) = quitus_repo::find_by_dossier(&self.db, dossier_id)? {
            return Ok(existing);
        }

        let derive = report::derive_quitus(&self.db, &dossier)?;
        let row = QuitusRow {
            id: Uuid::new_v4().to_string(),
            dossier_id: dossier.id.clone(),
            numero_dossier: dossier.numero_dossier.clone(),
            beneficiaire: dossier.beneficiaire.clone(),
            conforme: derive.conforme,
            contenu: derive.contenu,
            created_at: Self::now(),
        };
        match quitus_repo::insert(&self.db, &row) {
            Ok(()) => Ok(row),
            // Two generators raced; the stored one wins and both callers
            // see identical content.
            Err(e) if e.is_unique_violation() => quitus_repo::find_by_dossier(&self.db, dossier_id)?
                .ok_or(WorkflowError::NotFound {
                    entity: "quitus",
                    id: dossier_id.to_string(),
                }),
            Err(e) => Err(e.into()),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_dossier(&self, dossier_id: &str) -> Result<DossierRow> {
        self.load(dossier_id)
    }

    pub fn list_dossiers(&self, filter: &DossierFilter) -> Result<(Vec<DossierRow>, u64)> {
        Ok(dossier_repo::query(&self.db, filter)?)
    }

    /// Cross-role verification report; readable in any status.
    pub fn verification_report(&self, dossier_id: &str) -> Result<RapportVerification> {
        report::build_rapport(&self.db, dossier_id)
    }

    fn require_statut(dossier: &DossierRow, expected: Statut) -> Result<()> {
        let statut = Statut::parse(&dossier.statut)?;
        if statut != expected {
            return Err(WorkflowError::PreconditionFailed {
                dossier_id: dossier.id.clone(),
                reason: format!("dossier is in status {}, expected {}", statut, expected),
            });
        }
        Ok(())
    }
}

fn numero_conflict(e: DatabaseError, numero: &str) -> WorkflowError {
    if e.is_unique_violation() {
        WorkflowError::NumeroConflict {
            numero: numero.to_string(),
        }
    } else {
        e.into()
    }
}
