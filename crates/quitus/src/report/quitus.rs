//! Quitus derivation — the terminal clearance document.
//!
//! The quitus aggregates the whole validation trail for a dossier into a
//! JSON payload and a "conforme" conclusion. Derivation only reads source
//! records and contains no generation timestamp, so deriving twice over
//! the same trail yields byte-equivalent content.

use serde_json::json;

use crate::db::dossier_repo::DossierRow;
use crate::db::{validation_repo, verification_repo, Database, DatabaseError};
use crate::report::verification::count_incoherences;

/// The derived quitus, before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuitusDerive {
    pub conforme: bool,
    /// Deterministic JSON payload.
    pub contenu: String,
}

/// Derives the quitus content for a terminally-validated dossier.
///
/// `conforme` holds iff no cross-role incoherence remains and every
/// mandatory ordonnateur check is satisfied.
pub fn derive_quitus(db: &Database, dossier: &DossierRow) -> Result<QuitusDerive, DatabaseError> {
    let controles = validation_repo::list_controles_fond(db, &dossier.id)?;
    let verifications = verification_repo::list_by_dossier(db, &dossier.id)?;
    let bloquantes = verification_repo::count_blocking_mandatory(db, &dossier.id)?;

    let incoherences = count_incoherences(&controles, &verifications);
    let conforme = incoherences == 0 && bloquantes == 0;

    // serde_json orders object keys; repo queries order the arrays: the
    // rendered string is stable for a given trail.
    let contenu = json!({
        "numeroDossier": dossier.numero_dossier,
        "beneficiaire": dossier.beneficiaire,
        "objet": dossier.objet,
        "nature": dossier.nature,
        "posteComptable": dossier.poste_comptable,
        "natureDocument": dossier.nature_document,
        "dateDepot": dossier.date_depot,
        "controlesFond": controles
            .iter()
            .map(|c| json!({"libelle": c.libelle, "valide": c.valide}))
            .collect::<Vec<_>>(),
        "verifications": verifications
            .iter()
            .map(|v| json!({
                "categorie": v.categorie,
                "libelle": v.libelle,
                "obligatoire": v.obligatoire,
                "satisfait": v.satisfait,
            }))
            .collect::<Vec<_>>(),
        "incoherences": incoherences,
        "conforme": conforme,
    });

    Ok(QuitusDerive {
        conforme,
        contenu: contenu.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::validation_repo::ControleFondRow;
    use crate::db::verification_repo::VerificationRow;

    fn test_db() -> (Database, DossierRow) {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO dossiers (id, numero_dossier, nature, objet, beneficiaire,
                 poste_comptable, nature_document, secretaire_id, statut, date_depot,
                 created_at, updated_at)
                 VALUES ('d1', 'DOS-1', 'DEPENSE', 'Achat', 'Fournisseur SARL', 'PC-001',
                 'FACTURE', 's1', 'VALIDE_DEFINITIVEMENT', '2026-01-02T00:00:00Z',
                 '2026-01-01', '2026-01-01')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let dossier = crate::db::dossier_repo::find_by_id(&db, "d1").unwrap().unwrap();
        (db, dossier)
    }

    fn add_trail(db: &Database, satisfait: bool) {
        validation_repo::insert_controle_fond(
            db,
            &ControleFondRow {
                id: "c1".to_string(),
                dossier_id: "d1".to_string(),
                libelle: "Pièces justificatives".to_string(),
                valide: true,
                commentaire: None,
                cb_id: "cb-1".to_string(),
                created_at: "2026-01-02T00:00:00Z".to_string(),
            },
        )
        .unwrap();
        verification_repo::insert(
            db,
            &VerificationRow {
                id: "v1".to_string(),
                dossier_id: "d1".to_string(),
                categorie: "PIECES".to_string(),
                ordre: 1,
                libelle: "Pièces justificatives".to_string(),
                obligatoire: true,
                satisfait: Some(satisfait),
                commentaire: None,
                ordonnateur_id: Some("ord-1".to_string()),
                answered_at: Some("2026-01-03T00:00:00Z".to_string()),
                created_at: "2026-01-03T00:00:00Z".to_string(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_conforme_when_trail_is_clean() {
        let (db, dossier) = test_db();
        add_trail(&db, true);

        let derive = derive_quitus(&db, &dossier).unwrap();
        assert!(derive.conforme);
        assert!(derive.contenu.contains("\"numeroDossier\":\"DOS-1\""));
        assert!(derive.contenu.contains("\"conforme\":true"));
    }

    #[test]
    fn test_incoherence_breaks_conformity() {
        let (db, dossier) = test_db();
        // CB says valid, ordonnateur says not: one incoherence, and the
        // mandatory check is negative.
        add_trail(&db, false);

        let derive = derive_quitus(&db, &dossier).unwrap();
        assert!(!derive.conforme);
        assert!(derive.contenu.contains("\"incoherences\":1"));
    }

    #[test]
    fn test_empty_trail_has_no_incoherence_but_keeps_shape() {
        let (db, dossier) = test_db();

        let derive = derive_quitus(&db, &dossier).unwrap();
        assert!(derive.conforme);
        assert!(derive.contenu.contains("\"controlesFond\":[]"));
        assert!(derive.contenu.contains("\"verifications\":[]"));
    }

    #[test]
    fn test_derivation_is_byte_equivalent() {
        let (db, dossier) = test_db();
        add_trail(&db, true);

        let first = derive_quitus(&db, &dossier).unwrap();
        let second = derive_quitus(&db, &dossier).unwrap();
        assert_eq!(first.contenu, second.contenu);
    }
}
