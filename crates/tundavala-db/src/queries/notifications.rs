use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

use tundavala_types::models::{Notification, NotificationKind};

use crate::Database;
use crate::models::{parsed_col, ts_col, uuid_col};

impl Database {
    pub fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications
                    (id, user_id, kind, title, body, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    notification.id.to_string(),
                    notification.user_id.to_string(),
                    notification.kind.as_str(),
                    notification.title,
                    notification.body,
                    notification.is_read,
                    notification.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_notifications_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, title, body, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let notifications = stmt
                .query_map(params![user_id.to_string(), limit], map_notification)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notifications)
        })
    }

    pub fn unread_notification_count(&self, user_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Scoped to the owner so one user cannot clear another's notification.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?;
            Ok(changed as u32)
        })
    }
}

fn map_notification(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        kind: parsed_col(row, 2, NotificationKind::parse)?,
        title: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}
