use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Kwanza, Role};

// -- JWT Claims --

/// JWT claims shared across tundavala-api (REST middleware) and
/// tundavala-gateway (WebSocket authentication). Canonical definition lives
/// here in tundavala-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// `tourist` or `guide`; admins are seeded via the create-admin binary.
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

// -- Guides --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGuideProfileRequest {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub languages: Option<String>,
    pub price_per_day: Option<Kwanza>,
}

// -- Packages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePackageRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: Kwanza,
    pub duration_days: u32,
    pub max_people: u32,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePackageRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price: Option<Kwanza>,
    pub duration_days: Option<u32>,
    pub max_people: Option<u32>,
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

// -- Bookings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookingRequest {
    pub guide_id: Uuid,
    pub package_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub people: u32,
    pub total_price: Kwanza,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBookingStatusRequest {
    pub status: crate::models::BookingStatus,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    pub rating: u8,
    pub comment: String,
}

// -- Conversations / messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    pub guide_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

// -- Bank accounts / withdrawals --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBankAccountRequest {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWithdrawalRequest {
    pub amount: Kwanza,
    pub bank_account_id: Uuid,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminAdjustmentRequest {
    /// Signed amount applied to the guide's available balance.
    pub amount: Kwanza,
    pub description: String,
}
