use anyhow::Result;
use rusqlite::{Row, params};
use uuid::Uuid;

use tundavala_types::models::Review;

use crate::Database;
use crate::models::{ts_col, uuid_col};
use crate::queries::guides::recompute_rating;

impl Database {
    /// Store a review, flag its booking as reviewed, and recompute the
    /// guide's average rating — one transaction. Returns the new
    /// (rating, review_count) pair.
    pub fn create_review(&self, review: &Review) -> Result<(f64, u32)> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO reviews
                    (id, booking_id, guide_id, tourist_id, tourist_name,
                     rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    review.id.to_string(),
                    review.booking_id.to_string(),
                    review.guide_id.to_string(),
                    review.tourist_id.to_string(),
                    review.tourist_name,
                    review.rating,
                    review.comment,
                    review.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "UPDATE bookings SET reviewed = 1 WHERE id = ?1",
                [review.booking_id.to_string()],
            )?;

            recompute_rating(tx, review.guide_id)
        })
    }

    pub fn list_reviews_for_guide(&self, guide_id: Uuid) -> Result<Vec<Review>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, booking_id, guide_id, tourist_id, tourist_name,
                        rating, comment, created_at
                 FROM reviews WHERE guide_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let reviews = stmt
                .query_map([guide_id.to_string()], map_review)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(reviews)
        })
    }
}

fn map_review(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: uuid_col(row, 0)?,
        booking_id: uuid_col(row, 1)?,
        guide_id: uuid_col(row, 2)?,
        tourist_id: uuid_col(row, 3)?,
        tourist_name: row.get(4)?,
        rating: row.get(5)?,
        comment: row.get(6)?,
        created_at: ts_col(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::test_support::{guide, review, tourist};

    #[test]
    fn rating_is_full_recompute() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        let t = tourist(&db, "Ana");

        let (r1, c1) = db.create_review(&review(&db, t, g, 5)).unwrap();
        assert_eq!((r1, c1), (5.0, 1));

        let (r2, c2) = db.create_review(&review(&db, t, g, 2)).unwrap();
        assert_eq!(c2, 2);
        assert!((r2 - 3.5).abs() < f64::EPSILON);

        let stored = db.get_guide(g).unwrap().unwrap();
        assert_eq!(stored.review_count, 2);
        assert!((stored.rating - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn recompute_is_idempotent_without_new_reviews() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        let t = tourist(&db, "Ana");
        db.create_review(&review(&db, t, g, 4)).unwrap();

        let first = db.update_guide_rating(g).unwrap();
        let second = db.update_guide_rating(g).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, (4.0, 1));
    }

    #[test]
    fn recompute_with_no_reviews_is_zero() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        assert_eq!(db.update_guide_rating(g).unwrap(), (0.0, 0));
    }
}
