use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            name        TEXT NOT NULL,
            role        TEXT NOT NULL,
            photo_url   TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS guides (
            id              TEXT PRIMARY KEY REFERENCES users(id),
            name            TEXT NOT NULL,
            bio             TEXT NOT NULL DEFAULT '',
            location        TEXT NOT NULL DEFAULT '',
            languages       TEXT NOT NULL DEFAULT '',
            price_per_day   INTEGER NOT NULL DEFAULT 0,
            rating          REAL NOT NULL DEFAULT 0,
            review_count    INTEGER NOT NULL DEFAULT 0,
            verified        INTEGER NOT NULL DEFAULT 0,
            photo_url       TEXT
        );

        CREATE TABLE IF NOT EXISTS tour_packages (
            id              TEXT PRIMARY KEY,
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            location        TEXT NOT NULL,
            price           INTEGER NOT NULL,
            duration_days   INTEGER NOT NULL,
            max_people      INTEGER NOT NULL,
            image_url       TEXT,
            active          INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_packages_guide
            ON tour_packages(guide_id, created_at);

        CREATE TABLE IF NOT EXISTS bookings (
            id              TEXT PRIMARY KEY,
            tourist_id      TEXT NOT NULL REFERENCES users(id),
            tourist_name    TEXT NOT NULL,
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            package_id      TEXT REFERENCES tour_packages(id),
            start_date      TEXT NOT NULL,
            people          INTEGER NOT NULL,
            total_price     INTEGER NOT NULL,
            status          TEXT NOT NULL,
            reviewed        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_tourist
            ON bookings(tourist_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_bookings_guide
            ON bookings(guide_id, created_at);

        CREATE TABLE IF NOT EXISTS reviews (
            id              TEXT PRIMARY KEY,
            booking_id      TEXT NOT NULL UNIQUE REFERENCES bookings(id),
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            tourist_id      TEXT NOT NULL REFERENCES users(id),
            tourist_name    TEXT NOT NULL,
            rating          INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_guide
            ON reviews(guide_id, created_at);

        CREATE TABLE IF NOT EXISTS favorites (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            guide_id    TEXT NOT NULL REFERENCES guides(id),
            created_at  TEXT NOT NULL,
            UNIQUE(user_id, guide_id)
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id                  TEXT PRIMARY KEY,
            tourist_id          TEXT NOT NULL REFERENCES users(id),
            tourist_name        TEXT NOT NULL,
            tourist_photo_url   TEXT,
            guide_id            TEXT NOT NULL REFERENCES users(id),
            guide_name          TEXT NOT NULL,
            guide_photo_url     TEXT,
            last_message        TEXT NOT NULL DEFAULT '',
            last_message_at     TEXT,
            unread_count        INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            UNIQUE(tourist_id, guide_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                  TEXT PRIMARY KEY,
            conversation_id     TEXT NOT NULL REFERENCES conversations(id),
            sender_id           TEXT NOT NULL REFERENCES users(id),
            sender_name         TEXT NOT NULL,
            sender_photo_url    TEXT,
            receiver_id         TEXT NOT NULL REFERENCES users(id),
            content             TEXT NOT NULL,
            is_read             INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(conversation_id, receiver_id, is_read);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        CREATE TABLE IF NOT EXISTS bank_accounts (
            id              TEXT PRIMARY KEY,
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            bank_name       TEXT NOT NULL,
            account_number  TEXT NOT NULL,
            account_holder  TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wallet_balances (
            guide_id            TEXT PRIMARY KEY REFERENCES guides(id),
            total_earnings      INTEGER NOT NULL DEFAULT 0,
            current_balance     INTEGER NOT NULL DEFAULT 0,
            total_withdrawn     INTEGER NOT NULL DEFAULT 0,
            pending_withdrawal  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS withdrawal_requests (
            id              TEXT PRIMARY KEY,
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            amount          INTEGER NOT NULL,
            bank_account_id TEXT NOT NULL,
            bank_name       TEXT NOT NULL,
            account_number  TEXT NOT NULL,
            account_holder  TEXT NOT NULL,
            status          TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_withdrawals_guide
            ON withdrawal_requests(guide_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_withdrawals_status
            ON withdrawal_requests(status);

        -- Append-only ledger; rows are never updated or deleted.
        CREATE TABLE IF NOT EXISTS transactions (
            id              TEXT PRIMARY KEY,
            guide_id        TEXT NOT NULL REFERENCES guides(id),
            kind            TEXT NOT NULL,
            amount          INTEGER NOT NULL,
            description     TEXT NOT NULL,
            balance_before  INTEGER NOT NULL,
            balance_after   INTEGER NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_guide
            ON transactions(guide_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
