//! End-to-end workflow tests covering the full approval chain, the
//! rejection cycle, concurrent transitions and gate refusals.

mod common;

use common::{ChecklistBuilder, DossierBuilder, TestHarness};
use quitus::auth::{Claims, Role};
use quitus::db::dossier_repo::{self, DossierFilter};
use quitus::db::verification_repo;
use quitus::workflow::{ModificationDossier, Nature};
use quitus::WorkflowError;

#[test]
fn test_nominal_depense_chain() {
    let h = TestHarness::new();

    // Secretary drafts and submits.
    let d = h.create(&DossierBuilder::new("2026-DEP-001").build());
    assert_eq!(d.statut, "BROUILLON");
    let d = h.service.submit(&h.secretaire(), &d.id, None).unwrap();
    assert_eq!(d.statut, "EN_ATTENTE");
    assert!(d.date_depot.is_some());

    // CB records both control families, then validates.
    h.pass_cb_gate(&d.id);
    let d = h.service.validate_cb(&h.cb(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_CB");

    // Ordonnateur clears the checklist and approves.
    let rows = h
        .service
        .seed_verifications(
            &h.ordonnateur(),
            &d.id,
            &ChecklistBuilder::new()
                .mandatory("PIECES", "Pièces justificatives")
                .mandatory("IMPUTATION", "Imputation budgétaire")
                .optional("DIVERS", "Observations complémentaires")
                .build(),
        )
        .unwrap();
    for row in rows.iter().filter(|r| r.obligatoire) {
        h.service
            .answer_verification(&h.ordonnateur(), &row.id, true, None)
            .unwrap();
    }
    let d = h.service.approve_ordonnateur(&h.ordonnateur(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_ORDONNATEUR");

    // AC settles, validates definitively, generates the quitus, closes.
    let d = h.service.record_reglement(&h.ac(), &d.id).unwrap();
    assert_eq!(d.statut, "PAYE");
    let d = h.service.validate_definitive(&h.ac(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_DEFINITIVEMENT");

    let quitus = h.service.generate_quitus(&h.ac(), &d.id).unwrap();
    assert!(quitus.conforme);
    assert_eq!(quitus.numero_dossier, "2026-DEP-001");

    let d = h.service.cloturer(&h.ac(), &d.id).unwrap();
    assert_eq!(d.statut, "TERMINE");
}

#[test]
fn test_recette_settles_differently() {
    let h = TestHarness::new();
    let d = h.create(&DossierBuilder::new("2026-REC-001").nature(Nature::Recette).build());
    let d = h.service.submit(&h.secretaire(), &d.id, None).unwrap();
    h.pass_cb_gate(&d.id);
    h.service.validate_cb(&h.cb(), &d.id).unwrap();
    h.pass_ordonnateur_gate(&d.id);
    h.service.approve_ordonnateur(&h.ordonnateur(), &d.id).unwrap();

    let d = h.service.record_reglement(&h.ac(), &d.id).unwrap();
    assert_eq!(d.statut, "RECETTE_ENREGISTREE");

    let d = h.service.validate_definitive(&h.ac(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_DEFINITIVEMENT");
}

#[test]
fn test_rejection_and_resubmission_cycle() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-002");

    let d = h
        .service
        .reject_cb(&h.cb(), &d.id, "Pièces manquantes", Some("Facture originale absente"))
        .unwrap();
    assert_eq!(d.statut, "REJETE_CB");
    assert_eq!(d.rejection_reason.as_deref(), Some("Pièces manquantes"));
    assert!(d.rejected_at.is_some());

    // The secretary can still edit a rejected dossier.
    let d = h
        .service
        .update(
            &h.secretaire(),
            &d.id,
            &ModificationDossier {
                objet: Some("Achat de fournitures (facture jointe)".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(d.objet, "Achat de fournitures (facture jointe)");

    // Resubmission clears the rejection trace and re-enters CB review.
    let d = h.service.submit(&h.secretaire(), &d.id, None).unwrap();
    assert_eq!(d.statut, "EN_ATTENTE");
    assert!(d.rejection_reason.is_none());
    assert!(d.rejection_details.is_none());
    assert!(d.rejected_at.is_none());

    // Round two passes.
    h.pass_cb_gate(&d.id);
    let d = h.service.validate_cb(&h.cb(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_CB");
}

#[test]
fn test_rejection_is_only_available_from_en_attente() {
    let h = TestHarness::new();
    let d = h.to_valide_cb("2026-DEP-003");
    let err = h.service.reject_cb(&h.cb(), &d.id, "trop tard", None).unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));
}

#[test]
fn test_concurrent_validation_loses_cleanly() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-004");
    h.pass_cb_gate(&d.id);

    // First validation wins.
    h.service.validate_cb(&h.cb(), &d.id).unwrap();

    // A second CB acting on the same dossier observes the moved status.
    h.seed_user("user-cb-2", Role::ControleurBudgetaire);
    let cb2 = Claims::new("user-cb-2", Role::ControleurBudgetaire);
    let err = h.service.validate_cb(&cb2, &d.id).unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));
    assert_eq!(h.service.get_dossier(&d.id).unwrap().statut, "VALIDE_CB");
}

#[test]
fn test_stale_write_is_rejected_by_revision() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-005");

    // Capture a stale snapshot, then advance the dossier.
    let stale = dossier_repo::find_by_id(&h.db, &d.id).unwrap().unwrap();
    h.pass_cb_gate(&d.id);
    h.service.validate_cb(&h.cb(), &d.id).unwrap();

    // Writing through the stale revision commits nothing.
    let committed = dossier_repo::commit(&h.db, &stale).unwrap();
    assert!(!committed);
    assert_eq!(h.service.get_dossier(&d.id).unwrap().statut, "VALIDE_CB");
}

#[test]
fn test_concurrent_transition_is_retriable() {
    let err = WorkflowError::ConcurrentTransition {
        dossier_id: "d-1".to_string(),
    };
    assert!(err.is_retriable());
    let err = WorkflowError::Forbidden {
        role: Role::Secretaire,
        action: "VALIDER_CB".to_string(),
    };
    assert!(!err.is_retriable());
}

#[test]
fn test_cb_gate_refuses_unvalidated_controles() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-006");

    h.service
        .record_validation_type(&h.cb(), &d.id, true, None)
        .unwrap();
    h.service
        .record_controle_fond(&h.cb(), &d.id, "Disponibilité des crédits", false, Some("dépassement"))
        .unwrap();

    let err = h.service.validate_cb(&h.cb(), &d.id).unwrap_err();
    match err {
        WorkflowError::Gate(refusal) => {
            assert!(refusal.to_string().contains("contrôles de fond non validés"));
        }
        other => panic!("expected gate refusal, got {other:?}"),
    }
    assert_eq!(h.service.get_dossier(&d.id).unwrap().statut, "EN_ATTENTE");
}

#[test]
fn test_cb_gate_refuses_empty_controles() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-007");

    // Type validation alone is not enough; zero substantive controls
    // must not pass silently.
    h.service
        .record_validation_type(&h.cb(), &d.id, true, None)
        .unwrap();
    let err = h.service.validate_cb(&h.cb(), &d.id).unwrap_err();
    assert!(matches!(err, WorkflowError::Gate(_)));
}

#[test]
fn test_ordonnateur_gate_blocks_on_open_mandatory_items() {
    let h = TestHarness::new();
    let d = h.to_valide_cb("2026-DEP-008");

    let rows = h
        .service
        .seed_verifications(
            &h.ordonnateur(),
            &d.id,
            &ChecklistBuilder::new()
                .mandatory("PIECES", "Pièces justificatives")
                .mandatory("IMPUTATION", "Imputation budgétaire")
                .build(),
        )
        .unwrap();

    // Only one of two mandatory items answered.
    h.service
        .answer_verification(&h.ordonnateur(), &rows[0].id, true, None)
        .unwrap();
    let err = h.service.approve_ordonnateur(&h.ordonnateur(), &d.id).unwrap_err();
    assert!(matches!(err, WorkflowError::Gate(_)));

    // Answering the second negatively still blocks.
    h.service
        .answer_verification(&h.ordonnateur(), &rows[1].id, false, Some("imputation erronée"))
        .unwrap();
    let err = h.service.approve_ordonnateur(&h.ordonnateur(), &d.id).unwrap_err();
    assert!(matches!(err, WorkflowError::Gate(_)));
    assert_eq!(h.service.get_dossier(&d.id).unwrap().statut, "VALIDE_CB");
}

#[test]
fn test_unanswered_optional_items_do_not_block() {
    let h = TestHarness::new();
    let d = h.to_valide_cb("2026-DEP-009");

    let rows = h
        .service
        .seed_verifications(
            &h.ordonnateur(),
            &d.id,
            &ChecklistBuilder::new()
                .mandatory("PIECES", "Pièces justificatives")
                .optional("DIVERS", "Observations")
                .build(),
        )
        .unwrap();
    h.service
        .answer_verification(&h.ordonnateur(), &rows[0].id, true, None)
        .unwrap();

    let d = h.service.approve_ordonnateur(&h.ordonnateur(), &d.id).unwrap();
    assert_eq!(d.statut, "VALIDE_ORDONNATEUR");
}

#[test]
fn test_numero_is_unique_across_dossiers() {
    let h = TestHarness::new();
    h.create(&DossierBuilder::new("2026-DEP-010").build());
    let err = h
        .service
        .create_dossier(&h.secretaire(), &DossierBuilder::new("2026-DEP-010").build())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NumeroConflict { .. }));
}

#[test]
fn test_roles_cannot_cross_stages() {
    let h = TestHarness::new();
    let d = h.submitted("2026-DEP-011");
    h.pass_cb_gate(&d.id);

    for claims in [h.secretaire(), h.ordonnateur(), h.ac()] {
        let err = h.service.validate_cb(&claims, &d.id).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));
    }

    // And the CB cannot act past its own stage.
    h.service.validate_cb(&h.cb(), &d.id).unwrap();
    h.pass_ordonnateur_gate(&d.id);
    let err = h.service.approve_ordonnateur(&h.cb(), &d.id).unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden { .. }));
}

#[test]
fn test_checklist_is_frozen_after_approval() {
    let h = TestHarness::new();
    let d = h.to_valide_ordonnateur("2026-DEP-012");

    let rows = verification_repo::list_by_dossier(&h.db, &d.id).unwrap();
    let frozen = rows.first().expect("checklist row missing");
    let err = h
        .service
        .answer_verification(&h.ordonnateur(), &frozen.id, false, None)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));
}

#[test]
fn test_list_dossiers_filters_by_statut() {
    let h = TestHarness::new();
    h.create(&DossierBuilder::new("2026-DEP-013").build());
    h.submitted("2026-DEP-014");
    h.submitted("2026-DEP-015");

    let (rows, total) = h
        .service
        .list_dossiers(&DossierFilter {
            statut: Some("EN_ATTENTE".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(total, 2);
    assert!(rows.iter().all(|d| d.statut == "EN_ATTENTE"));
}
