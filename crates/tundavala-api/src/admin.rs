use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tundavala_types::api::AdminAdjustmentRequest;
use tundavala_types::events::GatewayEvent;
use tundavala_types::models::WithdrawalStatus;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let users = blocking(move || app.db.list_users()).await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyGuideRequest {
    pub verified: bool,
}

pub async fn verify_guide(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
    Json(req): Json<VerifyGuideRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    if !blocking(move || app.db.set_guide_verified(guide_id, req.verified)).await? {
        return Err(ApiError::NotFound("guide not found"));
    }
    info!(%guide_id, verified = req.verified, "guide verification updated");
    Ok(Json(json!({ "verified": req.verified })))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalQueueQuery {
    #[serde(default = "default_queue_status")]
    pub status: WithdrawalStatus,
}

fn default_queue_status() -> WithdrawalStatus {
    WithdrawalStatus::Pending
}

/// Payout queue, oldest first, filtered by status.
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Query(query): Query<WithdrawalQueueQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let requests = blocking(move || app.db.list_withdrawals_by_status(query.status)).await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawalTransitionRequest {
    pub status: WithdrawalStatus,
}

/// Move a payout request along its lifecycle. Rejection refunds the reserved
/// amount, completion settles it; both happen atomically with the status
/// change, and the guide sees the new balance immediately.
pub async fn transition_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
    Json(req): Json<WithdrawalTransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state.clone();
    let next = req.status;
    let (request, balance) =
        blocking(move || app.db.transition_withdrawal(withdrawal_id, next)).await?;

    info!(
        withdrawal = %request.id,
        guide = %request.guide_id,
        status = request.status.as_str(),
        "withdrawal transitioned"
    );

    if let Some(balance) = balance {
        state
            .dispatcher
            .send_to_user(request.guide_id, GatewayEvent::WalletUpdate { balance })
            .await;
    }

    Ok(Json(request))
}

/// Manual balance correction, recorded in the guide's ledger.
pub async fn record_adjustment(
    State(state): State<AppState>,
    Path(guide_id): Path<Uuid>,
    Json(req): Json<AdminAdjustmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.amount == 0 {
        return Err(ApiError::Validation(
            "adjustment amount cannot be zero".to_string(),
        ));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::Validation(
            "adjustment requires a description".to_string(),
        ));
    }
    let app = state.clone();
    if blocking(move || app.db.get_guide(guide_id)).await?.is_none() {
        return Err(ApiError::NotFound("guide not found"));
    }

    let app = state.clone();
    let amount = req.amount;
    let description = req.description.clone();
    let (balance, entry) =
        blocking(move || app.db.record_admin_adjustment(guide_id, amount, &description)).await?;

    info!(%guide_id, amount, "admin wallet adjustment recorded");

    state
        .dispatcher
        .send_to_user(
            guide_id,
            GatewayEvent::WalletUpdate {
                balance: balance.clone(),
            },
        )
        .await;

    Ok(Json(json!({ "balance": balance, "entry": entry })))
}
