use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use tundavala_types::api::{Claims, CreatePackageRequest, UpdatePackageRequest};
use tundavala_types::models::{Role, TourPackage};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;
use crate::notify;

#[derive(Debug, Deserialize)]
pub struct PackageQuery {
    pub location: Option<String>,
}

/// Public catalogue: active packages only, optionally filtered by location.
pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<PackageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let packages =
        blocking(move || app.db.list_active_packages(query.location.as_deref())).await?;
    Ok(Json(packages))
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let package = blocking(move || app.db.get_package(package_id))
        .await?
        .ok_or(ApiError::NotFound("package not found"))?;
    Ok(Json(package))
}

pub async fn list_guide_packages(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let packages = blocking(move || app.db.list_packages_for_guide(guide_id)).await?;
    Ok(Json(packages))
}

pub async fn create_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePackageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    validate_package(&req.title, &req.location, req.price, req.duration_days, req.max_people)?;

    let package = TourPackage {
        id: Uuid::new_v4(),
        guide_id: claims.sub,
        title: req.title.trim().to_string(),
        description: req.description,
        location: req.location,
        price: req.price,
        duration_days: req.duration_days,
        max_people: req.max_people,
        image_url: req.image_url,
        active: true,
        created_at: Utc::now(),
    };
    let app = state.clone();
    let stored = package.clone();
    blocking(move || app.db.create_package(&stored)).await?;

    if let Err(e) = notify::notify_new_package(&state, &package).await {
        warn!("failed to notify admins about package {}: {:#}", package.id, e);
    }

    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn update_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePackageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    if let Some(price) = req.price
        && price <= 0
    {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }
    if req.duration_days == Some(0) || req.max_people == Some(0) {
        return Err(ApiError::Validation(
            "duration and group size must be at least 1".to_string(),
        ));
    }

    // guide_id in the WHERE clause keeps guides out of each other's listings
    let app = state.clone();
    let package = blocking(move || {
        let updated = app.db.update_package(
            package_id,
            claims.sub,
            req.title.as_deref(),
            req.description.as_deref(),
            req.location.as_deref(),
            req.price,
            req.duration_days,
            req.max_people,
            req.image_url.as_deref(),
            req.active,
        )?;
        if !updated {
            return Ok(None);
        }
        app.db.get_package(package_id)
    })
    .await?
    .ok_or(ApiError::NotFound("package not found"))?;
    Ok(Json(package))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    let app = state.clone();
    if !blocking(move || app.db.delete_package(package_id, claims.sub)).await? {
        return Err(ApiError::NotFound("package not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn validate_package(
    title: &str,
    location: &str,
    price: i64,
    duration_days: u32,
    max_people: u32,
) -> Result<(), ApiError> {
    if title.trim().is_empty() || title.len() > 120 {
        return Err(ApiError::Validation("invalid package title".to_string()));
    }
    if location.trim().is_empty() {
        return Err(ApiError::Validation("location is required".to_string()));
    }
    if price <= 0 {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }
    if duration_days == 0 || max_people == 0 {
        return Err(ApiError::Validation(
            "duration and group size must be at least 1".to_string(),
        ));
    }
    Ok(())
}
