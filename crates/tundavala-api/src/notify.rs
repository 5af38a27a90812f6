//! Notification constructors. Each inserts a Notification row and pushes it
//! to the recipient's live connection. They return `Result` so call sites can
//! log failures — a dropped notification should be visible in the logs, but
//! it never fails the request that triggered it.

use chrono::Utc;
use tokio::task::spawn_blocking;
use uuid::Uuid;

use tundavala_types::events::GatewayEvent;
use tundavala_types::models::{
    Booking, Notification, NotificationKind, TourPackage, User,
};

use crate::auth::AppState;

async fn push(
    state: &AppState,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    body: String,
) -> anyhow::Result<()> {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id,
        kind,
        title: title.to_string(),
        body,
        is_read: false,
        created_at: Utc::now(),
    };

    let app = state.clone();
    let stored = notification.clone();
    spawn_blocking(move || app.db.insert_notification(&stored)).await??;

    state
        .dispatcher
        .send_to_user(user_id, GatewayEvent::NotificationCreate { notification })
        .await;
    Ok(())
}

async fn admin_ids(state: &AppState) -> anyhow::Result<Vec<Uuid>> {
    let app = state.clone();
    Ok(spawn_blocking(move || app.db.list_admin_ids()).await??)
}

/// Tell every admin that a user signed up.
pub async fn notify_new_user(state: &AppState, user: &User) -> anyhow::Result<()> {
    for admin_id in admin_ids(state).await? {
        push(
            state,
            admin_id,
            NotificationKind::NewUser,
            "New user registered",
            format!("{} joined as {}", user.name, user.role.as_str()),
        )
        .await?;
    }
    Ok(())
}

/// Tell the guide they have a new booking.
pub async fn notify_new_booking(state: &AppState, booking: &Booking) -> anyhow::Result<()> {
    push(
        state,
        booking.guide_id,
        NotificationKind::NewBooking,
        "New booking",
        format!(
            "{} booked {} person(s) for {}",
            booking.tourist_name, booking.people, booking.start_date
        ),
    )
    .await
}

/// Tell the other side a booking was cancelled.
pub async fn notify_booking_cancelled(
    state: &AppState,
    booking: &Booking,
    recipient_id: Uuid,
) -> anyhow::Result<()> {
    push(
        state,
        recipient_id,
        NotificationKind::BookingCancelled,
        "Booking cancelled",
        format!("Booking for {} was cancelled", booking.start_date),
    )
    .await
}

/// Warn the guide about a poor review so they can follow up.
pub async fn notify_low_rating(
    state: &AppState,
    guide_id: Uuid,
    rating: u8,
    reviewer_name: &str,
) -> anyhow::Result<()> {
    push(
        state,
        guide_id,
        NotificationKind::LowRating,
        "Low rating received",
        format!("{} left a {}-star review", reviewer_name, rating),
    )
    .await
}

/// Put a freshly published package on the admin moderation queue.
pub async fn notify_new_package(
    state: &AppState,
    package: &TourPackage,
) -> anyhow::Result<()> {
    for admin_id in admin_ids(state).await? {
        push(
            state,
            admin_id,
            NotificationKind::NewPackage,
            "New tour package",
            format!("\"{}\" in {} awaits review", package.title, package.location),
        )
        .await?;
    }
    Ok(())
}
