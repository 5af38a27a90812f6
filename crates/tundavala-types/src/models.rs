use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All monetary amounts are whole Kwanza (AOA). No floats in the ledger.
pub type Kwanza = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tourist,
    Guide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tourist => "tourist",
            Self::Guide => "guide",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tourist" => Some(Self::Tourist),
            "guide" => Some(Self::Guide),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideProfile {
    /// Same id as the guide's user record.
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub location: String,
    pub languages: String,
    pub price_per_day: Kwanza,
    pub rating: f64,
    pub review_count: u32,
    pub verified: bool,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourPackage {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: Kwanza,
    pub duration_days: u32,
    pub max_people: u32,
    pub image_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Valid transitions: pending -> confirmed -> completed,
    /// and pending/confirmed -> cancelled. Completed and cancelled are final.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
                | (Self::Confirmed, Self::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tourist_id: Uuid,
    pub tourist_name: String,
    pub guide_id: Uuid,
    pub package_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub people: u32,
    pub total_price: Kwanza,
    pub status: BookingStatus,
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub guide_id: Uuid,
    pub tourist_id: Uuid,
    pub tourist_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub guide_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A dyadic conversation between a tourist and a guide. Participant names and
/// photos are cached on the conversation so inbox rendering needs no joins.
///
/// `unread_count` is a single scalar meaning "unread messages for the side
/// that did not send them". This only works because conversations always have
/// exactly two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub tourist_id: Uuid,
    pub tourist_name: String,
    pub tourist_photo_url: Option<String>,
    pub guide_id: Uuid,
    pub guide_name: String,
    pub guide_photo_url: Option<String>,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.tourist_id == user_id || self.guide_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_photo_url: Option<String>,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One wallet per guide. Invariant after every committed mutation:
/// `current_balance + pending_withdrawal + total_withdrawn == total_earnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub guide_id: Uuid,
    pub total_earnings: Kwanza,
    pub current_balance: Kwanza,
    pub total_withdrawn: Kwanza,
    pub pending_withdrawal: Kwanza,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// pending -> approved -> processing -> completed, with rejection only
    /// from pending (guide cancel or admin reject). Approved may complete
    /// directly when the payout clears in one step.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Processing)
                | (Self::Approved, Self::Completed)
                | (Self::Processing, Self::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub amount: Kwanza,
    /// Snapshot of the destination account at request time; later edits to the
    /// bank account do not retroactively change the payout destination.
    pub bank_account_id: Uuid,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Earning,
    Withdrawal,
    AdminAdjustment,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earning => "earning",
            Self::Withdrawal => "withdrawal",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earning" => Some(Self::Earning),
            "withdrawal" => Some(Self::Withdrawal),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            _ => None,
        }
    }
}

/// Append-only audit entry written alongside every wallet mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub kind: LedgerKind,
    /// Signed: negative for debits against the available balance.
    pub amount: Kwanza,
    pub description: String,
    pub balance_before: Kwanza,
    pub balance_after: Kwanza,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewUser,
    NewBooking,
    BookingCancelled,
    LowRating,
    NewPackage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewUser => "new_user",
            Self::NewBooking => "new_booking",
            Self::BookingCancelled => "booking_cancelled",
            Self::LowRating => "low_rating",
            Self::NewPackage => "new_package",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_user" => Some(Self::NewUser),
            "new_booking" => Some(Self::NewBooking),
            "booking_cancelled" => Some(Self::BookingCancelled),
            "low_rating" => Some(Self::LowRating),
            "new_package" => Some(Self::NewPackage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub guide_id: Uuid,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn withdrawal_transitions() {
        use WithdrawalStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Processing));
        assert!(Approved.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
    }

    #[test]
    fn status_round_trips() {
        for s in ["pending", "approved", "processing", "completed", "rejected"] {
            assert_eq!(WithdrawalStatus::parse(s).unwrap().as_str(), s);
        }
        for s in ["pending", "confirmed", "completed", "cancelled"] {
            assert_eq!(BookingStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(WithdrawalStatus::parse("refunded").is_none());
    }
}
