use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use tundavala_types::api::{Claims, CreateReviewRequest};
use tundavala_types::models::{BookingStatus, Review, Role};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;
use crate::notify;

const MAX_COMMENT_LEN: usize = 1000;
const LOW_RATING_THRESHOLD: u8 = 2;

/// One review per completed booking, by the tourist who made it. Inserting
/// the review, flagging the booking and recomputing the guide's aggregate
/// rating happen in one transaction.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Tourist)?;

    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    if req.comment.len() > MAX_COMMENT_LEN {
        return Err(ApiError::Validation("comment is too long".to_string()));
    }

    let app = state.clone();
    let booking_id = req.booking_id;
    let booking = blocking(move || app.db.get_booking(booking_id))
        .await?
        .ok_or(ApiError::NotFound("booking not found"))?;
    if booking.tourist_id != claims.sub {
        return Err(ApiError::Forbidden);
    }
    if booking.status != BookingStatus::Completed {
        return Err(ApiError::Conflict(
            "only completed bookings can be reviewed".to_string(),
        ));
    }
    if booking.reviewed {
        return Err(ApiError::Conflict(
            "booking has already been reviewed".to_string(),
        ));
    }

    let review = Review {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        guide_id: booking.guide_id,
        tourist_id: claims.sub,
        tourist_name: claims.name.clone(),
        rating: req.rating,
        comment: req.comment,
        created_at: Utc::now(),
    };

    let app = state.clone();
    let stored = review.clone();
    blocking(move || app.db.create_review(&stored)).await?;

    if review.rating <= LOW_RATING_THRESHOLD
        && let Err(e) =
            notify::notify_low_rating(&state, review.guide_id, review.rating, &review.tourist_name)
                .await
    {
        warn!(
            "failed to notify guide {} about low rating: {:#}",
            review.guide_id, e
        );
    }

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_guide_reviews(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let reviews = blocking(move || app.db.list_reviews_for_guide(guide_id)).await?;
    Ok(Json(reviews))
}
