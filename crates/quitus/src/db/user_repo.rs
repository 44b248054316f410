//! User registry repository — the `utilisateurs` table the dispatcher
//! resolves roles against.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A registered portal user.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub nom: String,
    pub role: String,
    pub actif: bool,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            nom: row.get("nom")?,
            role: row.get("role")?,
            actif: row.get("actif")?,
        })
    }
}

/// Inserts a user.
pub fn insert(db: &Database, user: &UserRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO utilisateurs (id, nom, role, actif) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.nom, user.role, user.actif],
        )?;
        Ok(())
    })
}

/// Finds a user by id.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM utilisateurs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], UserRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all active users holding the given role. May be empty.
pub fn find_active_by_role(db: &Database, role: &str) -> Result<Vec<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT * FROM utilisateurs WHERE role = ?1 AND actif = 1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![role], UserRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
