use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tundavala_api::auth::{self, AppState, AppStateInner};
use tundavala_api::middleware::{require_admin, require_auth};
use tundavala_api::{
    admin, bookings, conversations, favorites, guides, notifications, packages, reviews, wallet,
};
use tundavala_gateway::connection;
use tundavala_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tundavala=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("TUNDAVALA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TUNDAVALA_DB_PATH").unwrap_or_else(|_| "tundavala.db".into());
    let host = std::env::var("TUNDAVALA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TUNDAVALA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = tundavala_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: jwt_secret.clone(),
        dispatcher: dispatcher.clone(),
    });

    let ws_state = ServerState {
        dispatcher,
        jwt_secret,
    };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/guides", get(guides::list_guides))
        .route("/guides/{guide_id}", get(guides::get_guide))
        .route("/guides/{guide_id}/packages", get(packages::list_guide_packages))
        .route("/guides/{guide_id}/reviews", get(reviews::list_guide_reviews))
        .route("/packages", get(packages::list_packages))
        .route("/packages/{package_id}", get(packages::get_package))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/guides/me/profile", put(guides::update_my_profile))
        .route("/packages", post(packages::create_package))
        .route(
            "/packages/{package_id}",
            put(packages::update_package).delete(packages::delete_package),
        )
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_my_bookings),
        )
        .route("/bookings/{booking_id}", get(bookings::get_booking))
        .route("/bookings/{booking_id}/status", put(bookings::update_booking_status))
        .route("/reviews", post(reviews::create_review))
        .route("/favorites", get(favorites::list_favorites))
        .route(
            "/favorites/{guide_id}",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        .route(
            "/conversations",
            post(conversations::create_conversation).get(conversations::list_conversations),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/conversations/{conversation_id}/read", post(conversations::mark_read))
        .route("/wallet", get(wallet::get_balance))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route(
            "/wallet/bank-accounts",
            post(wallet::create_bank_account).get(wallet::list_bank_accounts),
        )
        .route(
            "/wallet/bank-accounts/{account_id}",
            delete(wallet::delete_bank_account),
        )
        .route(
            "/wallet/withdrawals",
            post(wallet::create_withdrawal).get(wallet::list_my_withdrawals),
        )
        .route("/wallet/withdrawals/{withdrawal_id}", get(wallet::get_withdrawal))
        .route(
            "/wallet/withdrawals/{withdrawal_id}/cancel",
            post(wallet::cancel_withdrawal),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread", get(notifications::unread_count))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    // require_admin runs after require_auth has injected the claims
    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/guides/{guide_id}/verify", put(admin::verify_guide))
        .route(
            "/admin/guides/{guide_id}/adjustments",
            post(admin::record_adjustment),
        )
        .route("/admin/withdrawals", get(admin::list_withdrawals))
        .route(
            "/admin/withdrawals/{withdrawal_id}/status",
            put(admin::transition_withdrawal),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(ws_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Tundavala server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.jwt_secret)
    })
}
