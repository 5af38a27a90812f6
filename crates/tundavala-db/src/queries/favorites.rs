use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use tundavala_types::models::GuideProfile;

use crate::Database;

impl Database {
    /// Idempotent: adding an existing favorite is a no-op. Returns whether a
    /// new row was inserted.
    pub fn add_favorite(&self, user_id: Uuid, guide_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO favorites (id, user_id, guide_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    guide_id.to_string(),
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn remove_favorite(&self, user_id: Uuid, guide_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND guide_id = ?2",
                params![user_id.to_string(), guide_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    /// Favorited guides with their live profiles, most recently saved first.
    pub fn list_favorite_guides(&self, user_id: Uuid) -> Result<Vec<GuideProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.bio, g.location, g.languages, g.price_per_day,
                        g.rating, g.review_count, g.verified, g.photo_url
                 FROM favorites f
                 JOIN guides g ON g.id = f.guide_id
                 WHERE f.user_id = ?1
                 ORDER BY f.created_at DESC",
            )?;
            let guides = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(GuideProfile {
                        id: crate::models::uuid_col(row, 0)?,
                        name: row.get(1)?,
                        bio: row.get(2)?,
                        location: row.get(3)?,
                        languages: row.get(4)?,
                        price_per_day: row.get(5)?,
                        rating: row.get(6)?,
                        review_count: row.get(7)?,
                        verified: row.get(8)?,
                        photo_url: row.get(9)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(guides)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_support::{guide, tourist};

    #[test]
    fn favorites_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");

        assert!(db.add_favorite(t, g).unwrap());
        assert!(!db.add_favorite(t, g).unwrap());
        assert_eq!(db.list_favorite_guides(t).unwrap().len(), 1);

        assert!(db.remove_favorite(t, g).unwrap());
        assert!(!db.remove_favorite(t, g).unwrap());
        assert!(db.list_favorite_guides(t).unwrap().is_empty());
    }
}
