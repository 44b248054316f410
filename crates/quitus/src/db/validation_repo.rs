//! Budget-control validation repository — `validations_cb` (one per
//! dossier, immutable) and `controles_fond` (append-only checklist items).

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// The CB's type-of-operation validation. At most one per dossier.
#[derive(Debug, Clone)]
pub struct ValidationCbRow {
    pub id: String,
    pub dossier_id: String,
    pub cb_id: String,
    pub type_operation_valide: bool,
    pub commentaire: Option<String>,
    pub created_at: String,
}

impl ValidationCbRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            dossier_id: row.get("dossier_id")?,
            cb_id: row.get("cb_id")?,
            type_operation_valide: row.get("type_operation_valide")?,
            commentaire: row.get("commentaire")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A substantive ("fond") control result.
#[derive(Debug, Clone)]
pub struct ControleFondRow {
    pub id: String,
    pub dossier_id: String,
    pub libelle: String,
    pub valide: bool,
    pub commentaire: Option<String>,
    pub cb_id: String,
    pub created_at: String,
}

impl ControleFondRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            dossier_id: row.get("dossier_id")?,
            libelle: row.get("libelle")?,
            valide: row.get("valide")?,
            commentaire: row.get("commentaire")?,
            cb_id: row.get("cb_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts the type-of-operation validation. Fails with a unique
/// violation if the dossier already has one.
pub fn insert_validation_cb(db: &Database, v: &ValidationCbRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO validations_cb (id, dossier_id, cb_id, type_operation_valide,
             commentaire, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                v.id,
                v.dossier_id,
                v.cb_id,
                v.type_operation_valide,
                v.commentaire,
                v.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds the type-of-operation validation for a dossier, if any.
pub fn find_validation_cb(
    db: &Database,
    dossier_id: &str,
) -> Result<Option<ValidationCbRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM validations_cb WHERE dossier_id = ?1")?;
        let mut rows = stmt.query_map(params![dossier_id], ValidationCbRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Appends a substantive control result.
pub fn insert_controle_fond(db: &Database, c: &ControleFondRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO controles_fond (id, dossier_id, libelle, valide, commentaire,
             cb_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                c.id,
                c.dossier_id,
                c.libelle,
                c.valide,
                c.commentaire,
                c.cb_id,
                c.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists all substantive controls for a dossier, oldest first.
pub fn list_controles_fond(
    db: &Database,
    dossier_id: &str,
) -> Result<Vec<ControleFondRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM controles_fond WHERE dossier_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![dossier_id], ControleFondRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
