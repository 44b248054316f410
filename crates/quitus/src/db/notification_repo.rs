//! Notification repository — the per-recipient inbox rows written by the
//! dispatcher. Rows are never mutated by the workflow; only the read
//! state changes later, driven by the inbox consumer.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw notification row.
#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub notif_type: String,
    pub priority: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub action_link: Option<String>,
    /// Free-form JSON payload carrying dossier id/number for traceability.
    pub metadata: Option<String>,
    /// Idempotency key: `<dossier_id>:<transition>:<revision>`.
    pub event_key: String,
    pub created_at: String,
}

impl NotificationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            notif_type: row.get("notif_type")?,
            priority: row.get("priority")?,
            title: row.get("title")?,
            message: row.get("message")?,
            is_read: row.get("is_read")?,
            read_at: row.get("read_at")?,
            action_link: row.get("action_link")?,
            metadata: row.get("metadata")?,
            event_key: row.get("event_key")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a notification unless one already exists for the same
/// (event_key, user_id) pair. Returns whether a row was written, so
/// redelivery of the same event is a visible no-op.
pub fn insert_ignore(db: &Database, n: &NotificationRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "INSERT OR IGNORE INTO notifications (id, user_id, notif_type, priority,
             title, message, is_read, read_at, action_link, metadata, event_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                n.id,
                n.user_id,
                n.notif_type,
                n.priority,
                n.title,
                n.message,
                n.is_read,
                n.read_at,
                n.action_link,
                n.metadata,
                n.event_key,
                n.created_at,
            ],
        )?;
        Ok(affected > 0)
    })
}

/// Lists notifications for one recipient, newest first.
pub fn list_for_user(
    db: &Database,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<NotificationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ?1 AND is_read = 0
             ORDER BY created_at DESC, id"
        } else {
            "SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![user_id], NotificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Marks one notification as read. Returns `false` when it does not exist.
pub fn mark_read(db: &Database, id: &str, read_at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?2 WHERE id = ?1",
            params![id, read_at],
        )?;
        Ok(affected > 0)
    })
}
