//! Dossier repository — CRUD for the `dossiers` table.
//!
//! Pure data access; no workflow rules live here. Status writes go through
//! [`commit`], a compare-and-set on the `revision` column so that two
//! concurrent transitions on the same dossier cannot both succeed.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw dossier row from the database.
#[derive(Debug, Clone)]
pub struct DossierRow {
    pub id: String,
    /// Human-readable case number, globally unique, immutable after creation.
    pub numero_dossier: String,
    /// Operation nature: "DEPENSE" or "RECETTE".
    pub nature: String,
    pub objet: String,
    pub beneficiaire: String,
    pub poste_comptable: String,
    pub nature_document: String,
    /// Optional source folder link.
    pub dossier_source_id: Option<String>,
    /// Owning secretary, immutable.
    pub secretaire_id: String,
    pub statut: String,
    pub rejection_reason: Option<String>,
    pub rejection_details: Option<String>,
    /// Optimistic-concurrency version, bumped by every committed write.
    pub revision: i64,
    pub date_depot: Option<String>,
    pub rejected_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DossierRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            numero_dossier: row.get("numero_dossier")?,
            nature: row.get("nature")?,
            objet: row.get("objet")?,
            beneficiaire: row.get("beneficiaire")?,
            poste_comptable: row.get("poste_comptable")?,
            nature_document: row.get("nature_document")?,
            dossier_source_id: row.get("dossier_source_id")?,
            secretaire_id: row.get("secretaire_id")?,
            statut: row.get("statut")?,
            rejection_reason: row.get("rejection_reason")?,
            rejection_details: row.get("rejection_details")?,
            revision: row.get("revision")?,
            date_depot: row.get("date_depot")?,
            rejected_at: row.get("rejected_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Query filter parameters for dossier listing.
#[derive(Debug, Default, Clone)]
pub struct DossierFilter {
    pub statut: Option<String>,
    pub secretaire_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new dossier row.
pub fn insert(db: &Database, dossier: &DossierRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO dossiers (id, numero_dossier, nature, objet, beneficiaire,
             poste_comptable, nature_document, dossier_source_id, secretaire_id, statut,
             rejection_reason, rejection_details, revision, date_depot, rejected_at,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                dossier.id,
                dossier.numero_dossier,
                dossier.nature,
                dossier.objet,
                dossier.beneficiaire,
                dossier.poste_comptable,
                dossier.nature_document,
                dossier.dossier_source_id,
                dossier.secretaire_id,
                dossier.statut,
                dossier.rejection_reason,
                dossier.rejection_details,
                dossier.revision,
                dossier.date_depot,
                dossier.rejected_at,
                dossier.created_at,
                dossier.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Compare-and-set write of all mutable fields.
///
/// `dossier.revision` must hold the revision the caller read. The write
/// only lands if that revision is still current, and bumps it by one.
/// Returns `false` when another write committed first.
pub fn commit(db: &Database, dossier: &DossierRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE dossiers SET numero_dossier=?2, nature=?3, objet=?4, beneficiaire=?5,
             poste_comptable=?6, nature_document=?7, dossier_source_id=?8, statut=?9,
             rejection_reason=?10, rejection_details=?11, date_depot=?12, rejected_at=?13,
             updated_at=?14, revision=?15 + 1
             WHERE id=?1 AND revision=?15",
            params![
                dossier.id,
                dossier.numero_dossier,
                dossier.nature,
                dossier.objet,
                dossier.beneficiaire,
                dossier.poste_comptable,
                dossier.nature_document,
                dossier.dossier_source_id,
                dossier.statut,
                dossier.rejection_reason,
                dossier.rejection_details,
                dossier.date_depot,
                dossier.rejected_at,
                dossier.updated_at,
                dossier.revision,
            ],
        )?;
        Ok(affected > 0)
    })
}

/// Finds a dossier by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DossierRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM dossiers WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], DossierRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Checks whether a numero_dossier is already taken, optionally excluding
/// one dossier id (for updates of that same dossier).
pub fn numero_exists(
    db: &Database,
    numero: &str,
    exclude_id: Option<&str>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = match exclude_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM dossiers WHERE numero_dossier = ?1 AND id != ?2",
                params![numero, id],
                |r| r.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM dossiers WHERE numero_dossier = ?1",
                params![numero],
                |r| r.get(0),
            )?,
        };
        Ok(count > 0)
    })
}

/// Queries dossiers with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &DossierFilter) -> Result<(Vec<DossierRow>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref statut) = filter.statut {
            conditions.push(format!("statut = ?{}", param_values.len() + 1));
            param_values.push(Box::new(statut.clone()));
        }
        if let Some(ref secretaire_id) = filter.secretaire_id {
            conditions.push(format!("secretaire_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(secretaire_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!("SELECT COUNT(*) FROM dossiers {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // Fetch paginated results.
        let limit = filter.limit.unwrap_or(100) as i64;
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM dossiers {} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<DossierRow> = stmt
            .query_map(params_ref.as_slice(), DossierRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}
