//! Ordonnateur verification repository — the `verifications_ordonnateur`
//! checklist instance rows, grouped by category and ordered within it.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// One checklist item instance for a dossier. `satisfait` stays NULL
/// until the ordonnateur answers it.
#[derive(Debug, Clone)]
pub struct VerificationRow {
    pub id: String,
    pub dossier_id: String,
    pub categorie: String,
    pub ordre: i64,
    pub libelle: String,
    pub obligatoire: bool,
    pub satisfait: Option<bool>,
    pub commentaire: Option<String>,
    pub ordonnateur_id: Option<String>,
    pub answered_at: Option<String>,
    pub created_at: String,
}

impl VerificationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            dossier_id: row.get("dossier_id")?,
            categorie: row.get("categorie")?,
            ordre: row.get("ordre")?,
            libelle: row.get("libelle")?,
            obligatoire: row.get("obligatoire")?,
            satisfait: row.get("satisfait")?,
            commentaire: row.get("commentaire")?,
            ordonnateur_id: row.get("ordonnateur_id")?,
            answered_at: row.get("answered_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts one checklist row.
pub fn insert(db: &Database, v: &VerificationRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO verifications_ordonnateur (id, dossier_id, categorie, ordre,
             libelle, obligatoire, satisfait, commentaire, ordonnateur_id, answered_at,
             created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                v.id,
                v.dossier_id,
                v.categorie,
                v.ordre,
                v.libelle,
                v.obligatoire,
                v.satisfait,
                v.commentaire,
                v.ordonnateur_id,
                v.answered_at,
                v.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists all checklist rows for a dossier, grouped by category then order.
pub fn list_by_dossier(
    db: &Database,
    dossier_id: &str,
) -> Result<Vec<VerificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM verifications_ordonnateur WHERE dossier_id = ?1
             ORDER BY categorie, ordre, id",
        )?;
        let rows = stmt
            .query_map(params![dossier_id], VerificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds one checklist row by id.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<VerificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM verifications_ordonnateur WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], VerificationRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Records the ordonnateur's answer on one checklist row.
/// Returns `false` when the row does not exist.
pub fn answer(
    db: &Database,
    id: &str,
    satisfait: bool,
    commentaire: Option<&str>,
    ordonnateur_id: &str,
    answered_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE verifications_ordonnateur
             SET satisfait = ?2, commentaire = ?3, ordonnateur_id = ?4, answered_at = ?5
             WHERE id = ?1",
            params![id, satisfait, commentaire, ordonnateur_id, answered_at],
        )?;
        Ok(affected > 0)
    })
}

/// Counts mandatory rows that are unanswered or answered negatively.
pub fn count_blocking_mandatory(db: &Database, dossier_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM verifications_ordonnateur
             WHERE dossier_id = ?1 AND obligatoire = 1
               AND (satisfait IS NULL OR satisfait = 0)",
            params![dossier_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
