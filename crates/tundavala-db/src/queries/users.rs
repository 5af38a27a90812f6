use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::{Role, User};

use crate::Database;
use crate::models::{UserRecord, parsed_col, ts_col, uuid_col};

impl Database {
    pub fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, name, role, photo_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.email,
                    password_hash,
                    user.name,
                    user.role.as_str(),
                    user.photo_url,
                    user.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password, name, role, photo_url, created_at
                 FROM users WHERE email = ?1",
            )?;
            let record = stmt
                .query_row([email], |row| {
                    Ok(UserRecord {
                        user: map_user_with_password(row)?,
                        password_hash: row.get(2)?,
                    })
                })
                .optional()?;
            Ok(record)
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password, name, role, photo_url, created_at
                 FROM users WHERE id = ?1",
            )?;
            let user = stmt
                .query_row([id.to_string()], map_user_with_password)
                .optional()?;
            Ok(user)
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, password, name, role, photo_url, created_at
                 FROM users ORDER BY created_at DESC",
            )?;
            let users = stmt
                .query_map([], map_user_with_password)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    pub fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    photo_url = COALESCE(?3, photo_url)
                 WHERE id = ?1",
                params![id.to_string(), name, photo_url],
            )?;
            Ok(changed > 0)
        })
    }

    /// Recipient list for admin-facing notifications (new user sign-ups).
    pub fn list_admin_ids(&self) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users WHERE role = 'admin'")?;
            let ids = stmt
                .query_map([], |row| uuid_col(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
    }
}

// Column order: id, email, password, name, role, photo_url, created_at.
// Password at index 2 is skipped here; the auth path reads it separately.
fn map_user_with_password(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        email: row.get(1)?,
        name: row.get(3)?,
        role: parsed_col(row, 4, Role::parse)?,
        photo_url: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}
