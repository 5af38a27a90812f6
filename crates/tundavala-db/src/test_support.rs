//! Fixtures shared by the query-module tests.

use chrono::Utc;
use uuid::Uuid;

use tundavala_types::models::{
    BankAccount, Booking, BookingStatus, Conversation, GuideProfile, Review, Role, User,
};

use crate::Database;

pub fn user(db: &Database, name: &str, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    let user = User {
        id,
        email: format!("{}@example.com", id),
        name: name.to_string(),
        role,
        photo_url: None,
        created_at: Utc::now(),
    };
    db.create_user(&user, "argon2-hash").unwrap();
    id
}

pub fn tourist(db: &Database, name: &str) -> Uuid {
    user(db, name, Role::Tourist)
}

pub fn guide(db: &Database, name: &str) -> Uuid {
    let id = user(db, name, Role::Guide);
    db.create_guide_profile(&GuideProfile {
        id,
        name: name.to_string(),
        bio: String::new(),
        location: "Luanda".to_string(),
        languages: "Portuguese".to_string(),
        price_per_day: 20_000,
        rating: 0.0,
        review_count: 0,
        verified: false,
        photo_url: None,
    })
    .unwrap();
    id
}

pub fn booking(db: &Database, tourist_id: Uuid, guide_id: Uuid, total_price: i64) -> Booking {
    let tourist = db.get_user_by_id(tourist_id).unwrap().unwrap();
    let booking = Booking {
        id: Uuid::new_v4(),
        tourist_id,
        tourist_name: tourist.name,
        guide_id,
        package_id: None,
        start_date: Utc::now().date_naive(),
        people: 2,
        total_price,
        status: BookingStatus::Pending,
        reviewed: false,
        created_at: Utc::now(),
    };
    db.create_booking(&booking).unwrap();
    booking
}

pub fn review(db: &Database, tourist_id: Uuid, guide_id: Uuid, rating: u8) -> Review {
    let b = booking(db, tourist_id, guide_id, 50_000);
    Review {
        id: Uuid::new_v4(),
        booking_id: b.id,
        guide_id,
        tourist_id,
        tourist_name: b.tourist_name,
        rating,
        comment: "Boa experiência".to_string(),
        created_at: Utc::now(),
    }
}

pub fn conversation(db: &Database, tourist_id: Uuid, guide_id: Uuid) -> Conversation {
    let t = db.get_user_by_id(tourist_id).unwrap().unwrap();
    let g = db.get_user_by_id(guide_id).unwrap().unwrap();
    let conversation = Conversation {
        id: Uuid::new_v4(),
        tourist_id,
        tourist_name: t.name,
        tourist_photo_url: None,
        guide_id,
        guide_name: g.name,
        guide_photo_url: None,
        last_message: String::new(),
        last_message_at: None,
        unread_count: 0,
        created_at: Utc::now(),
    };
    db.create_conversation(&conversation).unwrap();
    conversation
}

pub fn bank_account(db: &Database, guide_id: Uuid) -> BankAccount {
    let account = BankAccount {
        id: Uuid::new_v4(),
        guide_id,
        bank_name: "Banco BAI".to_string(),
        account_number: "0040.0000.1234.5678".to_string(),
        account_holder: "Guia Local".to_string(),
        created_at: Utc::now(),
    };
    db.create_bank_account(&account).unwrap();
    account
}
