//! File-backed end-to-end test: configuration loading, on-disk database,
//! a full approval chain and persistence across reopen.

mod common;

use common::TestHarness;
use quitus::config::{load_config, RoutageConfig};
use quitus::db::Database;
use quitus::workflow::DossierService;

#[test]
fn test_configured_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let db_path = dir.path().join("data/quitus.db");
    std::fs::write(
        &config_path,
        format!(
            r#"{{"version": "1.0", "databasePath": "{}"}}"#,
            db_path.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let db = Database::open(std::path::Path::new(&config.database_path)).unwrap();

    let h = TestHarness::with_db(db);
    let d = h.to_definitive("2026-E2E-001");
    let quitus = h.service.generate_quitus(&h.ac(), &d.id).unwrap();
    drop(h);

    // Reopen from disk; the dossier and its quitus are still there, and
    // regeneration returns the stored record untouched.
    let db = Database::open(std::path::Path::new(&config.database_path)).unwrap();
    let service = DossierService::new(db, config.routage);
    let reloaded = service.get_dossier(&d.id).unwrap();
    assert_eq!(reloaded.statut, "VALIDE_DEFINITIVEMENT");

    let ac = quitus::auth::Claims::new(common::harness::AC_ID, quitus::auth::Role::AgentComptable);
    let again = service.generate_quitus(&ac, &d.id).unwrap();
    assert_eq!(again.id, quitus.id);
    assert_eq!(again.contenu, quitus.contenu);
}

#[test]
fn test_default_routing_matches_stage_order() {
    let routage = RoutageConfig::default();
    assert_eq!(routage.apres_soumission, quitus::auth::Role::ControleurBudgetaire);
    assert_eq!(routage.apres_validation_cb, quitus::auth::Role::Ordonnateur);
    assert_eq!(routage.apres_approbation, quitus::auth::Role::AgentComptable);
}
