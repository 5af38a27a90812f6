use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tundavala_types::api::Claims;
use tundavala_types::models::Role;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;

pub async fn add_favorite(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Tourist)?;

    let app = state.clone();
    if blocking(move || app.db.get_guide(guide_id)).await?.is_none() {
        return Err(ApiError::NotFound("guide not found"));
    }

    // Repeated favourites are a no-op, not an error
    let app = state.clone();
    let inserted = blocking(move || app.db.add_favorite(claims.sub, guide_id)).await?;
    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(status)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    if !blocking(move || app.db.remove_favorite(claims.sub, guide_id)).await? {
        return Err(ApiError::NotFound("favorite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let guides = blocking(move || app.db.list_favorite_guides(claims.sub)).await?;
    Ok(Json(guides))
}
