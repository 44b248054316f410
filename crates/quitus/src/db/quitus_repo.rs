//! Quitus repository — the derived clearance record, one per dossier,
//! append-only.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A stored quitus record.
#[derive(Debug, Clone)]
pub struct QuitusRow {
    pub id: String,
    pub dossier_id: String,
    pub numero_dossier: String,
    pub beneficiaire: String,
    pub conforme: bool,
    /// Deterministic JSON derived from the validation trail.
    pub contenu: String,
    pub created_at: String,
}

impl QuitusRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            dossier_id: row.get("dossier_id")?,
            numero_dossier: row.get("numero_dossier")?,
            beneficiaire: row.get("beneficiaire")?,
            conforme: row.get("conforme")?,
            contenu: row.get("contenu")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a quitus record. Fails with a unique violation if the dossier
/// already has one.
pub fn insert(db: &Database, q: &QuitusRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO quitus (id, dossier_id, numero_dossier, beneficiaire, conforme,
             contenu, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                q.id,
                q.dossier_id,
                q.numero_dossier,
                q.beneficiaire,
                q.conforme,
                q.contenu,
                q.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds the quitus for a dossier, if generated.
pub fn find_by_dossier(db: &Database, dossier_id: &str) -> Result<Option<QuitusRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM quitus WHERE dossier_id = ?1")?;
        let mut rows = stmt.query_map(params![dossier_id], QuitusRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
