use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::GuideProfile;

use crate::Database;
use crate::models::uuid_col;

impl Database {
    pub fn create_guide_profile(&self, profile: &GuideProfile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO guides
                    (id, name, bio, location, languages, price_per_day,
                     rating, review_count, verified, photo_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    profile.id.to_string(),
                    profile.name,
                    profile.bio,
                    profile.location,
                    profile.languages,
                    profile.price_per_day,
                    profile.rating,
                    profile.review_count,
                    profile.verified,
                    profile.photo_url,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_guide(&self, id: Uuid) -> Result<Option<GuideProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_GUIDE))?;
            let guide = stmt.query_row([id.to_string()], map_guide).optional()?;
            Ok(guide)
        })
    }

    /// Public guide directory, best-rated first. `location` filters by
    /// substring match when given.
    pub fn list_guides(&self, location: Option<&str>) -> Result<Vec<GuideProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE (?1 IS NULL OR location LIKE '%' || ?1 || '%')
                 ORDER BY rating DESC, review_count DESC",
                SELECT_GUIDE
            ))?;
            let guides = stmt
                .query_map([location], map_guide)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(guides)
        })
    }

    pub fn update_guide_profile(
        &self,
        id: Uuid,
        bio: Option<&str>,
        location: Option<&str>,
        languages: Option<&str>,
        price_per_day: Option<i64>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE guides SET
                    bio = COALESCE(?2, bio),
                    location = COALESCE(?3, location),
                    languages = COALESCE(?4, languages),
                    price_per_day = COALESCE(?5, price_per_day)
                 WHERE id = ?1",
                params![id.to_string(), bio, location, languages, price_per_day],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_guide_verified(&self, id: Uuid, verified: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE guides SET verified = ?2 WHERE id = ?1",
                params![id.to_string(), verified],
            )?;
            Ok(changed > 0)
        })
    }

    /// Recompute the guide's average rating from every stored review and
    /// persist it. Deliberately a full re-average rather than an incremental
    /// mean: O(review count) per call, but trivially idempotent.
    pub fn update_guide_rating(&self, guide_id: Uuid) -> Result<(f64, u32)> {
        self.with_tx(|tx| recompute_rating(tx, guide_id))
    }
}

pub(crate) fn recompute_rating(
    conn: &rusqlite::Connection,
    guide_id: Uuid,
) -> Result<(f64, u32)> {
    let (avg, count): (Option<f64>, u32) = conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE guide_id = ?1",
        [guide_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let rating = avg.unwrap_or(0.0);

    conn.execute(
        "UPDATE guides SET rating = ?2, review_count = ?3 WHERE id = ?1",
        params![guide_id.to_string(), rating, count],
    )?;

    Ok((rating, count))
}

const SELECT_GUIDE: &str = "SELECT id, name, bio, location, languages, price_per_day,
        rating, review_count, verified, photo_url
 FROM guides";

fn map_guide(row: &Row) -> rusqlite::Result<GuideProfile> {
    Ok(GuideProfile {
        id: uuid_col(row, 0)?,
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
}
