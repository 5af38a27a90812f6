use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use tundavala_types::api::{Claims, CreateBookingRequest, UpdateBookingStatusRequest};
use tundavala_types::events::GatewayEvent;
use tundavala_types::models::{Booking, BookingStatus, Role};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;
use crate::notify;

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Tourist)?;

    if req.people == 0 {
        return Err(ApiError::Validation(
            "group size must be at least 1".to_string(),
        ));
    }
    if req.total_price <= 0 {
        return Err(ApiError::Validation(
            "total price must be positive".to_string(),
        ));
    }
    if req.start_date < Utc::now().date_naive() {
        return Err(ApiError::Validation(
            "start date cannot be in the past".to_string(),
        ));
    }

    let app = state.clone();
    let guide_id = req.guide_id;
    let package_id = req.package_id;
    let (guide, package) = blocking(move || {
        let guide = app.db.get_guide(guide_id)?;
        let package = match package_id {
            Some(id) => app.db.get_package(id)?,
            None => None,
        };
        Ok((guide, package))
    })
    .await?;
    let guide = guide.ok_or(ApiError::NotFound("guide not found"))?;

    // A package booking must point at one of this guide's active packages
    if req.package_id.is_some() {
        let package = package.ok_or(ApiError::NotFound("package not found"))?;
        if package.guide_id != guide.id || !package.active {
            return Err(ApiError::Validation(
                "package is not offered by this guide".to_string(),
            ));
        }
        if req.people > package.max_people {
            return Err(ApiError::Validation(format!(
                "package is limited to {} people",
                package.max_people
            )));
        }
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        tourist_id: claims.sub,
        tourist_name: claims.name.clone(),
        guide_id: guide.id,
        package_id: req.package_id,
        start_date: req.start_date,
        people: req.people,
        total_price: req.total_price,
        status: BookingStatus::Pending,
        reviewed: false,
        created_at: Utc::now(),
    };
    let app = state.clone();
    let stored = booking.clone();
    blocking(move || app.db.create_booking(&stored)).await?;

    if let Err(e) = notify::notify_new_booking(&state, &booking).await {
        warn!("failed to notify guide about booking {}: {:#}", booking.id, e);
    }
    state
        .dispatcher
        .send_to_user(
            booking.guide_id,
            GatewayEvent::BookingUpdate {
                booking: booking.clone(),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let bookings = blocking(move || match claims.role {
        Role::Guide => app.db.list_bookings_for_guide(claims.sub),
        _ => app.db.list_bookings_for_tourist(claims.sub),
    })
    .await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let booking = blocking(move || app.db.get_booking(booking_id))
        .await?
        .ok_or(ApiError::NotFound("booking not found"))?;
    if booking.tourist_id != claims.sub && booking.guide_id != claims.sub {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(booking))
}

/// Drive the booking through its lifecycle. Guides confirm and complete,
/// either side may cancel while the booking is still live. Completion credits
/// the guide's wallet in the same transaction as the status change.
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let booking = blocking(move || app.db.get_booking(booking_id))
        .await?
        .ok_or(ApiError::NotFound("booking not found"))?;

    let allowed = match req.status {
        BookingStatus::Confirmed | BookingStatus::Completed => booking.guide_id == claims.sub,
        BookingStatus::Cancelled => {
            booking.guide_id == claims.sub || booking.tourist_id == claims.sub
        }
        BookingStatus::Pending => false,
    };
    if !allowed {
        return Err(ApiError::Forbidden);
    }

    let app = state.clone();
    let next = req.status;
    let (updated, wallet) =
        blocking(move || app.db.update_booking_status(booking_id, next)).await?;

    if updated.status == BookingStatus::Cancelled {
        let recipient = if claims.sub == updated.tourist_id {
            updated.guide_id
        } else {
            updated.tourist_id
        };
        if let Err(e) = notify::notify_booking_cancelled(&state, &updated, recipient).await {
            warn!(
                "failed to notify about cancelled booking {}: {:#}",
                updated.id, e
            );
        }
    }

    for party in [updated.tourist_id, updated.guide_id] {
        state
            .dispatcher
            .send_to_user(
                party,
                GatewayEvent::BookingUpdate {
                    booking: updated.clone(),
                },
            )
            .await;
    }
    if let Some(balance) = wallet {
        state
            .dispatcher
            .send_to_user(updated.guide_id, GatewayEvent::WalletUpdate { balance })
            .await;
    }

    Ok(Json(updated))
}
