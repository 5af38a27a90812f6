use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use tundavala_types::api::{Claims, UpdateGuideProfileRequest};
use tundavala_types::models::Role;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;

#[derive(Debug, Deserialize)]
pub struct GuideQuery {
    /// Substring match against the guide's listed location.
    pub location: Option<String>,
}

pub async fn list_guides(
    State(state): State<AppState>,
    Query(query): Query<GuideQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let guides = blocking(move || app.db.list_guides(query.location.as_deref())).await?;
    Ok(Json(guides))
}

pub async fn get_guide(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let guide = blocking(move || app.db.get_guide(guide_id))
        .await?
        .ok_or(ApiError::NotFound("guide not found"))?;
    Ok(Json(guide))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGuideProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    if let Some(price) = req.price_per_day
        && price < 0
    {
        return Err(ApiError::Validation(
            "price per day cannot be negative".to_string(),
        ));
    }

    let app = state.clone();
    let profile = blocking(move || {
        let updated = app.db.update_guide_profile(
            claims.sub,
            req.bio.as_deref(),
            req.location.as_deref(),
            req.languages.as_deref(),
            req.price_per_day,
        )?;
        if !updated {
            return Ok(None);
        }
        app.db.get_guide(claims.sub)
    })
    .await?
    .ok_or(ApiError::NotFound("guide profile not found"))?;
    Ok(Json(profile))
}
