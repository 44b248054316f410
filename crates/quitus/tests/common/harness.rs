//! Test harness for isolated workflow execution.
//!
//! Each harness owns a fresh in-memory database with every migration
//! applied and one active user seeded per role, plus a `DossierService`
//! wired with the default routing. Helpers advance a dossier through
//! the stages so tests start at the status they care about.

#![allow(dead_code)]

use quitus::auth::{Claims, Role};
use quitus::config::RoutageConfig;
use quitus::db::dossier_repo::DossierRow;
use quitus::db::notification_repo::{self, NotificationRow};
use quitus::db::user_repo::{self, UserRow};
use quitus::db::Database;
use quitus::workflow::{ChecklistItem, DossierService, NouveauDossier};

use super::builders::DossierBuilder;

pub const SECRETAIRE_ID: &str = "user-secretaire";
pub const CB_ID: &str = "user-cb";
pub const ORDONNATEUR_ID: &str = "user-ordonnateur";
pub const AC_ID: &str = "user-ac";

/// Isolated workflow environment for one test.
pub struct TestHarness {
    pub db: Database,
    pub service: DossierService,
}

impl TestHarness {
    /// In-memory database, migrations applied, one user per role.
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("failed to open in-memory database");
        Self::with_db(db)
    }

    pub fn with_db(db: Database) -> Self {
        for (id, nom, role) in [
            (SECRETAIRE_ID, "Awa Ndiaye", Role::Secretaire),
            (CB_ID, "Moussa Diop", Role::ControleurBudgetaire),
            (ORDONNATEUR_ID, "Fatou Sall", Role::Ordonnateur),
            (AC_ID, "Ibrahima Ba", Role::AgentComptable),
        ] {
            user_repo::insert(
                &db,
                &UserRow {
                    id: id.to_string(),
                    nom: nom.to_string(),
                    role: role.as_str().to_string(),
                    actif: true,
                },
            )
            .expect("failed to seed user");
        }

        let service = DossierService::new(db.clone(), RoutageConfig::default());
        Self { db, service }
    }

    pub fn secretaire(&self) -> Claims {
        Claims::new(SECRETAIRE_ID, Role::Secretaire)
    }

    pub fn cb(&self) -> Claims {
        Claims::new(CB_ID, Role::ControleurBudgetaire)
    }

    pub fn ordonnateur(&self) -> Claims {
        Claims::new(ORDONNATEUR_ID, Role::Ordonnateur)
    }

    pub fn ac(&self) -> Claims {
        Claims::new(AC_ID, Role::AgentComptable)
    }

    /// Adds another active user with the given role, widening a pool.
    pub fn seed_user(&self, id: &str, role: Role) {
        user_repo::insert(
            &self.db,
            &UserRow {
                id: id.to_string(),
                nom: id.to_string(),
                role: role.as_str().to_string(),
                actif: true,
            },
        )
        .expect("failed to seed extra user");
    }

    /// All notifications delivered to a user, newest first.
    pub fn inbox(&self, user_id: &str) -> Vec<NotificationRow> {
        notification_repo::list_for_user(&self.db, user_id, false)
            .expect("failed to list notifications")
    }

    // ── Stage helpers ───────────────────────────────────────────────────

    /// Creates a dossier in BROUILLON from the builder.
    pub fn create(&self, nouveau: &NouveauDossier) -> DossierRow {
        self.service
            .create_dossier(&self.secretaire(), nouveau)
            .expect("create_dossier failed")
    }

    /// Creates and submits a dossier (EN_ATTENTE).
    pub fn submitted(&self, numero: &str) -> DossierRow {
        let d = self.create(&DossierBuilder::new(numero).build());
        self.service
            .submit(&self.secretaire(), &d.id, None)
            .expect("submit failed")
    }

    /// Records a passing type-of-operation validation and one passing
    /// substantive control.
    pub fn pass_cb_gate(&self, dossier_id: &str) {
        self.service
            .record_validation_type(&self.cb(), dossier_id, true, None)
            .expect("record_validation_type failed");
        self.service
            .record_controle_fond(&self.cb(), dossier_id, "Pièces justificatives", true, None)
            .expect("record_controle_fond failed");
    }

    /// Advances a submitted dossier to VALIDE_CB.
    pub fn to_valide_cb(&self, numero: &str) -> DossierRow {
        let d = self.submitted(numero);
        self.pass_cb_gate(&d.id);
        self.service
            .validate_cb(&self.cb(), &d.id)
            .expect("validate_cb failed")
    }

    /// Seeds one mandatory checklist item and answers it positively.
    pub fn pass_ordonnateur_gate(&self, dossier_id: &str) {
        let rows = self
            .service
            .seed_verifications(
                &self.ordonnateur(),
                dossier_id,
                &[ChecklistItem {
                    categorie: "PIECES".to_string(),
                    ordre: 1,
                    libelle: "Pièces justificatives".to_string(),
                    obligatoire: true,
                }],
            )
            .expect("seed_verifications failed");
        for row in &rows {
            self.service
                .answer_verification(&self.ordonnateur(), &row.id, true, None)
                .expect("answer_verification failed");
        }
    }

    /// Advances a dossier to VALIDE_ORDONNATEUR.
    pub fn to_valide_ordonnateur(&self, numero: &str) -> DossierRow {
        let d = self.to_valide_cb(numero);
        self.pass_ordonnateur_gate(&d.id);
        self.service
            .approve_ordonnateur(&self.ordonnateur(), &d.id)
            .expect("approve_ordonnateur failed")
    }

    /// Advances a dossier through settlement to VALIDE_DEFINITIVEMENT.
    pub fn to_definitive(&self, numero: &str) -> DossierRow {
        let d = self.to_valide_ordonnateur(numero);
        let d = self
            .service
            .record_reglement(&self.ac(), &d.id)
            .expect("record_reglement failed");
        self.service
            .validate_definitive(&self.ac(), &d.id)
            .expect("validate_definitive failed")
    }
}
