use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::{Conversation, Message};

use crate::models::{opt_ts_col, ts_col, uuid_col};
use crate::{Database, StoreError};

impl Database {
    /// Insert a fresh conversation. Callers look up an existing
    /// (tourist, guide) pair with [`Database::find_conversation_between`]
    /// first; the UNIQUE constraint backstops a missed check.
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations
                    (id, tourist_id, tourist_name, tourist_photo_url,
                     guide_id, guide_name, guide_photo_url,
                     last_message, last_message_at, unread_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    conversation.id.to_string(),
                    conversation.tourist_id.to_string(),
                    conversation.tourist_name,
                    conversation.tourist_photo_url,
                    conversation.guide_id.to_string(),
                    conversation.guide_name,
                    conversation.guide_photo_url,
                    conversation.last_message,
                    conversation.last_message_at.map(|t| t.to_rfc3339()),
                    conversation.unread_count,
                    conversation.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| read_conversation(conn, id))
    }

    pub fn find_conversation_between(
        &self,
        tourist_id: Uuid,
        guide_id: Uuid,
    ) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE tourist_id = ?1 AND guide_id = ?2",
                SELECT_CONVERSATION
            ))?;
            let conversation = stmt
                .query_row(
                    params![tourist_id.to_string(), guide_id.to_string()],
                    map_conversation,
                )
                .optional()?;
            Ok(conversation)
        })
    }

    /// Inbox for either side, most recent activity first.
    pub fn list_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE tourist_id = ?1 OR guide_id = ?1
                 ORDER BY COALESCE(last_message_at, created_at) DESC",
                SELECT_CONVERSATION
            ))?;
            let conversations = stmt
                .query_map([user_id.to_string()], map_conversation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(conversations)
        })
    }

    /// Store a message and update its conversation's inbox state (last
    /// message, timestamp, unread counter) in one transaction. Fails with
    /// [`StoreError::NotParticipant`] when sender or receiver does not belong
    /// to the conversation, so every stored message satisfies the
    /// participants invariant.
    pub fn send_message(&self, message: &Message) -> Result<Conversation> {
        self.with_tx(|tx| {
            let conversation = read_conversation(tx, message.conversation_id)?
                .ok_or(StoreError::NotFound)?;

            if !conversation.has_participant(message.sender_id)
                || !conversation.has_participant(message.receiver_id)
            {
                return Err(StoreError::NotParticipant.into());
            }

            tx.execute(
                "INSERT INTO messages
                    (id, conversation_id, sender_id, sender_name, sender_photo_url,
                     receiver_id, content, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_id.to_string(),
                    message.sender_name,
                    message.sender_photo_url,
                    message.receiver_id.to_string(),
                    message.content,
                    message.created_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                "UPDATE conversations SET
                    last_message = ?2,
                    last_message_at = ?3,
                    unread_count = unread_count + 1
                 WHERE id = ?1",
                params![
                    message.conversation_id.to_string(),
                    message.content,
                    message.created_at.to_rfc3339(),
                ],
            )?;

            Ok(Conversation {
                last_message: message.content.clone(),
                last_message_at: Some(message.created_at),
                unread_count: conversation.unread_count + 1,
                ..conversation
            })
        })
    }

    /// Flip every unread message addressed to `user_id` in the conversation
    /// and reset the unread counter — one transaction. Returns the number of
    /// messages flipped and the updated conversation.
    ///
    /// The counter reset is unconditional: with exactly two participants the
    /// scalar counter always belongs to the side calling this.
    pub fn mark_messages_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(u32, Conversation)> {
        self.with_tx(|tx| {
            let conversation =
                read_conversation(tx, conversation_id)?.ok_or(StoreError::NotFound)?;

            if !conversation.has_participant(user_id) {
                return Err(StoreError::NotParticipant.into());
            }

            let flipped = tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                params![conversation_id.to_string(), user_id.to_string()],
            )?;

            tx.execute(
                "UPDATE conversations SET unread_count = 0 WHERE id = ?1",
                [conversation_id.to_string()],
            )?;

            Ok((
                flipped as u32,
                Conversation {
                    unread_count: 0,
                    ..conversation
                },
            ))
        })
    }

    /// Messages in ascending timestamp order. `before` is a cursor for
    /// paging backwards through history: pass the timestamp of the oldest
    /// message from the previous page.
    pub fn get_messages(
        &self,
        conversation_id: Uuid,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, sender_name, sender_photo_url,
                        receiver_id, content, is_read, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                   AND (?2 IS NULL OR created_at < ?2)
                 ORDER BY created_at DESC
                 LIMIT ?3",
            )?;
            let mut messages = stmt
                .query_map(
                    params![
                        conversation_id.to_string(),
                        before.map(|t| t.to_rfc3339()),
                        limit,
                    ],
                    map_message,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            // Fetched newest-first for the LIMIT, delivered oldest-first.
            messages.reverse();
            Ok(messages)
        })
    }
}

const SELECT_CONVERSATION: &str = "SELECT id, tourist_id, tourist_name, tourist_photo_url,
        guide_id, guide_name, guide_photo_url,
        last_message, last_message_at, unread_count, created_at
 FROM conversations";

fn read_conversation(conn: &Connection, id: Uuid) -> Result<Option<Conversation>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_CONVERSATION))?;
    let conversation = stmt
        .query_row([id.to_string()], map_conversation)
        .optional()?;
    Ok(conversation)
}

fn map_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: uuid_col(row, 0)?,
        tourist_id: uuid_col(row, 1)?,
        tourist_name: row.get(2)?,
        tourist_photo_url: row.get(3)?,
        guide_id: uuid_col(row, 4)?,
        guide_name: row.get(5)?,
        guide_photo_url: row.get(6)?,
        last_message: row.get(7)?,
        last_message_at: opt_ts_col(row, 8)?,
        unread_count: row.get(9)?,
        created_at: ts_col(row, 10)?,
    })
}

fn map_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, 0)?,
        conversation_id: uuid_col(row, 1)?,
        sender_id: uuid_col(row, 2)?,
        sender_name: row.get(3)?,
        sender_photo_url: row.get(4)?,
        receiver_id: uuid_col(row, 5)?,
        content: row.get(6)?,
        is_read: row.get(7)?,
        created_at: ts_col(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use tundavala_types::models::Message;

    use crate::test_support::{conversation, guide, tourist};
    use crate::{Database, StoreError};

    fn message(conversation_id: Uuid, sender: Uuid, receiver: Uuid, n: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender,
            sender_name: "Ana".to_string(),
            sender_photo_url: None,
            receiver_id: receiver,
            content: format!("mensagem {}", n),
            is_read: false,
            // Spread timestamps so ordering is deterministic
            created_at: Utc::now() + Duration::milliseconds(n),
        }
    }

    #[test]
    fn unread_counts_sequential_sends() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let c = conversation(&db, t, g);

        for n in 1..=3 {
            let updated = db.send_message(&message(c.id, t, g, n)).unwrap();
            assert_eq!(updated.unread_count, n as u32);
            assert_eq!(updated.last_message, format!("mensagem {}", n));
        }

        let stored = db.get_conversation(c.id).unwrap().unwrap();
        assert_eq!(stored.unread_count, 3);
        assert!(stored.last_message_at.is_some());
    }

    #[test]
    fn mark_read_flips_messages_and_resets_counter() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let c = conversation(&db, t, g);

        for n in 1..=3 {
            db.send_message(&message(c.id, t, g, n)).unwrap();
        }

        let (flipped, updated) = db.mark_messages_read(c.id, g).unwrap();
        assert_eq!(flipped, 3);
        assert_eq!(updated.unread_count, 0);

        let messages = db.get_messages(c.id, 50, None).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.is_read));
        assert_eq!(db.get_conversation(c.id).unwrap().unwrap().unread_count, 0);
    }

    #[test]
    fn mark_read_only_touches_own_messages() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let c = conversation(&db, t, g);

        db.send_message(&message(c.id, t, g, 1)).unwrap();
        db.send_message(&message(c.id, g, t, 2)).unwrap();

        db.mark_messages_read(c.id, g).unwrap();

        let messages = db.get_messages(c.id, 50, None).unwrap();
        let to_guide = messages.iter().find(|m| m.receiver_id == g).unwrap();
        let to_tourist = messages.iter().find(|m| m.receiver_id == t).unwrap();
        assert!(to_guide.is_read);
        assert!(!to_tourist.is_read);
    }

    #[test]
    fn send_rejects_non_participants() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let stranger = tourist(&db, "Bento");
        let c = conversation(&db, t, g);

        let err = db.send_message(&message(c.id, stranger, g, 1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::NotParticipant)
        );
        assert!(db.get_messages(c.id, 50, None).unwrap().is_empty());
        assert_eq!(db.get_conversation(c.id).unwrap().unwrap().unread_count, 0);
    }

    #[test]
    fn messages_are_ascending_with_cursor() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g = guide(&db, "Zeferino");
        let c = conversation(&db, t, g);

        for n in 1..=5 {
            db.send_message(&message(c.id, t, g, n)).unwrap();
        }

        let latest = db.get_messages(c.id, 2, None).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].content, "mensagem 4");
        assert_eq!(latest[1].content, "mensagem 5");

        let older = db
            .get_messages(c.id, 10, Some(latest[0].created_at))
            .unwrap();
        assert_eq!(older.len(), 3);
        assert_eq!(older.last().unwrap().content, "mensagem 3");
    }

    #[test]
    fn inbox_sorts_by_last_activity() {
        let db = Database::open_in_memory().unwrap();
        let t = tourist(&db, "Ana");
        let g1 = guide(&db, "Zeferino");
        let g2 = guide(&db, "Madalena");
        let c1 = conversation(&db, t, g1);
        let c2 = conversation(&db, t, g2);

        db.send_message(&message(c1.id, t, g1, 1)).unwrap();
        db.send_message(&message(c2.id, t, g2, 500)).unwrap();

        let inbox = db.list_conversations_for_user(t).unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].id, c2.id);
        assert_eq!(inbox[1].id, c1.id);
    }
}
