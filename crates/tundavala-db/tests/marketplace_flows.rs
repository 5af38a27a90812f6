//! End-to-end flow: a tourist messages a guide, the guide catches up on the
//! conversation, then requests and cancels a payout.

use chrono::{Duration, Utc};
use uuid::Uuid;

use tundavala_db::Database;
use tundavala_types::models::{
    BankAccount, Booking, BookingStatus, Conversation, GuideProfile, Message, Role, User,
};

fn create_user(db: &Database, name: &str, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(
        &User {
            id,
            email: format!("{}@example.com", id),
            name: name.to_string(),
            role,
            photo_url: None,
            created_at: Utc::now(),
        },
        "argon2-hash",
    )
    .unwrap();
    id
}

#[test]
fn messaging_then_withdrawal_scenario() {
    let db = Database::open_in_memory().unwrap();

    let tourist = create_user(&db, "Ana", Role::Tourist);
    let guide = create_user(&db, "Zeferino", Role::Guide);
    db.create_guide_profile(&GuideProfile {
        id: guide,
        name: "Zeferino".to_string(),
        bio: "Serra da Leba day trips".to_string(),
        location: "Lubango".to_string(),
        languages: "Portuguese, English".to_string(),
        price_per_day: 25_000,
        rating: 0.0,
        review_count: 0,
        verified: true,
        photo_url: None,
    })
    .unwrap();

    // Fund the guide: a completed booking worth 10 000 Kz
    let booking = Booking {
        id: Uuid::new_v4(),
        tourist_id: tourist,
        tourist_name: "Ana".to_string(),
        guide_id: guide,
        package_id: None,
        start_date: Utc::now().date_naive(),
        people: 2,
        total_price: 10_000,
        status: BookingStatus::Pending,
        reviewed: false,
        created_at: Utc::now(),
    };
    db.create_booking(&booking).unwrap();
    db.update_booking_status(booking.id, BookingStatus::Confirmed)
        .unwrap();
    let (_, wallet) = db
        .update_booking_status(booking.id, BookingStatus::Completed)
        .unwrap();
    assert_eq!(wallet.unwrap().current_balance, 10_000);

    // Tourist opens a conversation and sends three messages
    let conversation = Conversation {
        id: Uuid::new_v4(),
        tourist_id: tourist,
        tourist_name: "Ana".to_string(),
        tourist_photo_url: None,
        guide_id: guide,
        guide_name: "Zeferino".to_string(),
        guide_photo_url: None,
        last_message: String::new(),
        last_message_at: None,
        unread_count: 0,
        created_at: Utc::now(),
    };
    db.create_conversation(&conversation).unwrap();

    for n in 1..=3 {
        db.send_message(&Message {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            sender_id: tourist,
            sender_name: "Ana".to_string(),
            sender_photo_url: None,
            receiver_id: guide,
            content: format!("Olá! ({})", n),
            is_read: false,
            created_at: Utc::now() + Duration::milliseconds(n),
        })
        .unwrap();
    }
    assert_eq!(
        db.get_conversation(conversation.id).unwrap().unwrap().unread_count,
        3
    );

    // Guide opens the conversation
    let (flipped, updated) = db.mark_messages_read(conversation.id, guide).unwrap();
    assert_eq!(flipped, 3);
    assert_eq!(updated.unread_count, 0);
    assert!(
        db.get_messages(conversation.id, 50, None)
            .unwrap()
            .iter()
            .all(|m| m.is_read)
    );

    // Guide requests a 4 000 Kz payout...
    let account = BankAccount {
        id: Uuid::new_v4(),
        guide_id: guide,
        bank_name: "Banco BAI".to_string(),
        account_number: "0040.0000.1234.5678".to_string(),
        account_holder: "Zeferino".to_string(),
        created_at: Utc::now(),
    };
    db.create_bank_account(&account).unwrap();

    let (request, wallet) = db.create_withdrawal_request(guide, 4_000, &account).unwrap();
    assert_eq!(wallet.current_balance, 6_000);
    assert_eq!(wallet.pending_withdrawal, 4_000);

    // ...then changes their mind
    let (_, wallet) = db.cancel_withdrawal_request(request.id, guide).unwrap();
    assert_eq!(wallet.current_balance, 10_000);
    assert_eq!(wallet.pending_withdrawal, 0);
    assert_eq!(
        wallet.current_balance + wallet.pending_withdrawal + wallet.total_withdrawn,
        wallet.total_earnings
    );
}
