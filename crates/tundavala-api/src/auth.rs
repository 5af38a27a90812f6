use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use tundavala_db::Database;
use tundavala_gateway::dispatcher::Dispatcher;
use tundavala_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UpdateProfileRequest,
};
use tundavala_types::models::{GuideProfile, Role, User};

use crate::blocking;
use crate::error::ApiError;
use crate::notify;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if !req.email.contains('@') || req.email.len() > 254 {
        return Err(ApiError::Validation("invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    if req.name.trim().is_empty() || req.name.len() > 64 {
        return Err(ApiError::Validation("invalid display name".to_string()));
    }
    // Admins are seeded with the create-admin tool, never self-registered
    if req.role == Role::Admin {
        return Err(ApiError::Validation(
            "cannot register as admin".to_string(),
        ));
    }

    let app = state.clone();
    let email = req.email.clone();
    let taken = blocking(move || Ok(app.db.get_user_by_email(&email)?.is_some())).await?;
    if taken {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    // Argon2 is CPU-heavy, keep it off the async runtime too
    let password = req.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let user = User {
        id: Uuid::new_v4(),
        email: req.email,
        name: req.name.trim().to_string(),
        role: req.role,
        photo_url: None,
        created_at: Utc::now(),
    };

    let app = state.clone();
    let stored = user.clone();
    blocking(move || {
        app.db.create_user(&stored, &password_hash)?;
        // Guides get an empty public profile and a zeroed wallet up front
        if stored.role == Role::Guide {
            app.db.create_guide_profile(&GuideProfile {
                id: stored.id,
                name: stored.name.clone(),
                bio: String::new(),
                location: String::new(),
                languages: String::new(),
                price_per_day: 0,
                rating: 0.0,
                review_count: 0,
                verified: false,
                photo_url: None,
            })?;
            app.db.get_or_create_wallet(stored.id)?;
        }
        Ok(())
    })
    .await?;

    if let Err(e) = notify::notify_new_user(&state, &user).await {
        warn!("failed to notify admins about new user {}: {:#}", user.id, e);
    }

    let token = create_token(&state.jwt_secret, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let email = req.email;
    let record = blocking(move || app.db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&record.password_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let token = create_token(&state.jwt_secret, &record.user)?;

    Ok(Json(LoginResponse {
        user_id: record.user.id,
        name: record.user.name,
        role: record.user.role,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let user = blocking(move || app.db.get_user_by_id(claims.sub))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &req.name
        && (name.trim().is_empty() || name.len() > 64)
    {
        return Err(ApiError::Validation("invalid display name".to_string()));
    }

    let app = state.clone();
    let user = blocking(move || {
        app.db.update_user_profile(
            claims.sub,
            req.name.as_deref().map(str::trim),
            req.photo_url.as_deref(),
        )?;
        app.db.get_user_by_id(claims.sub)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn create_token(secret: &str, user: &User) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        name: user.name.clone(),
        role: user.role,
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))
}
