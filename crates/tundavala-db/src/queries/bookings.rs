use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::{Booking, BookingStatus, WalletBalance};

use crate::models::{date_col, opt_uuid_col, parsed_col, ts_col, uuid_col};
use crate::queries::wallet::credit_earning_tx;
use crate::{Database, StoreError};

impl Database {
    pub fn create_booking(&self, booking: &Booking) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bookings
                    (id, tourist_id, tourist_name, guide_id, package_id, start_date,
                     people, total_price, status, reviewed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    booking.id.to_string(),
                    booking.tourist_id.to_string(),
                    booking.tourist_name,
                    booking.guide_id.to_string(),
                    booking.package_id.map(|id| id.to_string()),
                    booking.start_date.to_string(),
                    booking.people,
                    booking.total_price,
                    booking.status.as_str(),
                    booking.reviewed,
                    booking.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_BOOKING))?;
            let booking = stmt.query_row([id.to_string()], map_booking).optional()?;
            Ok(booking)
        })
    }

    pub fn list_bookings_for_tourist(&self, tourist_id: Uuid) -> Result<Vec<Booking>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE tourist_id = ?1 ORDER BY created_at DESC",
                SELECT_BOOKING
            ))?;
            let bookings = stmt
                .query_map([tourist_id.to_string()], map_booking)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bookings)
        })
    }

    pub fn list_bookings_for_guide(&self, guide_id: Uuid) -> Result<Vec<Booking>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE guide_id = ?1 ORDER BY created_at DESC",
                SELECT_BOOKING
            ))?;
            let bookings = stmt
                .query_map([guide_id.to_string()], map_booking)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bookings)
        })
    }

    /// Move a booking along pending -> confirmed -> completed (or cancel).
    /// Completion credits the guide's wallet with the booking price in the
    /// same transaction; the updated wallet is returned alongside.
    pub fn update_booking_status(
        &self,
        id: Uuid,
        next: BookingStatus,
    ) -> Result<(Booking, Option<WalletBalance>)> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(&format!("{} WHERE id = ?1", SELECT_BOOKING))?;
            let booking = stmt
                .query_row([id.to_string()], map_booking)
                .optional()?
                .ok_or(StoreError::NotFound)?;
            drop(stmt);

            if !booking.status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition.into());
            }

            tx.execute(
                "UPDATE bookings SET status = ?2 WHERE id = ?1",
                params![id.to_string(), next.as_str()],
            )?;

            let wallet = if next == BookingStatus::Completed {
                let (balance, _) = credit_earning_tx(
                    tx,
                    booking.guide_id,
                    booking.total_price,
                    &format!("Earning from booking {}", booking.id),
                )?;
                Some(balance)
            } else {
                None
            };

            Ok((
                Booking {
                    status: next,
                    ..booking
                },
                wallet,
            ))
        })
    }

    /// Flag a booking as reviewed, outside any review transaction. The normal
    /// path never calls this: `create_review` flips the flag inside its own
    /// transaction. This is the standalone soft-flag path, for repair jobs
    /// that need to mark a booking without touching review rows. Returns
    /// `Ok(false)` when the booking does not exist rather than an error.
    pub fn update_booking_review(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE bookings SET reviewed = 1 WHERE id = ?1",
                [id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

const SELECT_BOOKING: &str = "SELECT id, tourist_id, tourist_name, guide_id, package_id, start_date,
        people, total_price, status, reviewed, created_at
 FROM bookings";

pub(crate) fn map_booking(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: uuid_col(row, 0)?,
        tourist_id: uuid_col(row, 1)?,
        tourist_name: row.get(2)?,
        guide_id: uuid_col(row, 3)?,
        package_id: opt_uuid_col(row, 4)?,
        start_date: date_col(row, 5)?,
        people: row.get(6)?,
        total_price: row.get(7)?,
        status: parsed_col(row, 8, BookingStatus::parse)?,
        reviewed: row.get(9)?,
        created_at: ts_col(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use tundavala_types::models::BookingStatus;
    use uuid::Uuid;

    use crate::test_support::{booking, guide, tourist};
    use crate::{Database, StoreError};

    #[test]
    fn lifecycle_enforces_transitions() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let b = booking(&db, t, g, 10_000);

        // Completing a pending booking skips confirmation
        let err = db
            .update_booking_status(b.id, BookingStatus::Completed)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InvalidTransition)
        );

        let (b2, wallet) = db
            .update_booking_status(b.id, BookingStatus::Confirmed)
            .unwrap();
        assert_eq!(b2.status, BookingStatus::Confirmed);
        assert!(wallet.is_none());

        let (b3, wallet) = db
            .update_booking_status(b.id, BookingStatus::Completed)
            .unwrap();
        assert_eq!(b3.status, BookingStatus::Completed);
        assert_eq!(wallet.unwrap().total_earnings, 10_000);

        // Completed is final
        let err = db
            .update_booking_status(b.id, BookingStatus::Cancelled)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InvalidTransition)
        );
    }

    #[test]
    fn review_flag_is_a_soft_update() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let b = booking(&db, t, g, 10_000);

        assert!(db.update_booking_review(b.id).unwrap());
        assert!(db.get_booking(b.id).unwrap().unwrap().reviewed);

        // Missing booking is Ok(false), not an error
        assert!(!db.update_booking_review(Uuid::new_v4()).unwrap());
    }
}
