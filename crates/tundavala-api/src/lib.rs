pub mod admin;
pub mod auth;
pub mod bookings;
pub mod conversations;
pub mod error;
pub mod favorites;
pub mod guides;
pub mod middleware;
pub mod notifications;
pub mod notify;
pub mod packages;
pub mod reviews;
pub mod wallet;

use crate::error::ApiError;

/// Run a blocking database closure off the async runtime and fold both the
/// join error and the store error into [`ApiError`].
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task join error: {}", e)))?
        .map_err(ApiError::from)
}
