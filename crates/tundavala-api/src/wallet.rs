use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use tundavala_types::api::{Claims, CreateBankAccountRequest, CreateWithdrawalRequest};
use tundavala_types::events::GatewayEvent;
use tundavala_types::models::{BankAccount, Role};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::require_role;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(default = "default_ledger_limit")]
    pub limit: u32,
}

fn default_ledger_limit() -> u32 {
    50
}

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    let balance = blocking(move || app.db.get_or_create_wallet(claims.sub)).await?;
    Ok(Json(balance))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    let limit = query.limit.min(200);
    let entries =
        blocking(move || app.db.list_transactions_for_guide(claims.sub, limit)).await?;
    Ok(Json(entries))
}

// -- Bank accounts --

pub async fn create_bank_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBankAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    if req.bank_name.trim().is_empty()
        || req.account_number.trim().is_empty()
        || req.account_holder.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "bank name, account number and holder are required".to_string(),
        ));
    }

    let account = BankAccount {
        id: Uuid::new_v4(),
        guide_id: claims.sub,
        bank_name: req.bank_name.trim().to_string(),
        account_number: req.account_number.trim().to_string(),
        account_holder: req.account_holder.trim().to_string(),
        created_at: Utc::now(),
    };
    let app = state.clone();
    let stored = account.clone();
    blocking(move || app.db.create_bank_account(&stored)).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_bank_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    let accounts = blocking(move || app.db.list_bank_accounts_for_guide(claims.sub)).await?;
    Ok(Json(accounts))
}

pub async fn delete_bank_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    if !blocking(move || app.db.delete_bank_account(account_id, claims.sub)).await? {
        return Err(ApiError::NotFound("bank account not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Withdrawals --

/// Reserve part of the available balance against a snapshot of the chosen
/// bank account. The debit and the request row commit together.
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateWithdrawalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    let app = state.clone();
    let bank_account_id = req.bank_account_id;
    let bank = blocking(move || app.db.get_bank_account(bank_account_id))
        .await?
        .filter(|b| b.guide_id == claims.sub)
        .ok_or(ApiError::NotFound("bank account not found"))?;

    let app = state.clone();
    let amount = req.amount;
    let (request, balance) =
        blocking(move || app.db.create_withdrawal_request(claims.sub, amount, &bank)).await?;

    state
        .dispatcher
        .send_to_user(claims.sub, GatewayEvent::WalletUpdate { balance })
        .await;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;

    let app = state.clone();
    let (request, balance) =
        blocking(move || app.db.cancel_withdrawal_request(withdrawal_id, claims.sub)).await?;

    state
        .dispatcher
        .send_to_user(claims.sub, GatewayEvent::WalletUpdate { balance })
        .await;

    Ok(Json(request))
}

pub async fn get_withdrawal(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    let request = blocking(move || app.db.get_withdrawal(withdrawal_id))
        .await?
        .filter(|r| r.guide_id == claims.sub)
        .ok_or(ApiError::NotFound("withdrawal not found"))?;
    Ok(Json(request))
}

pub async fn list_my_withdrawals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&claims, Role::Guide)?;
    let app = state.clone();
    let requests = blocking(move || app.db.list_withdrawals_for_guide(claims.sub)).await?;
    Ok(Json(requests))
}
