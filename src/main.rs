//! Quote Console Backend
//!
//! Admin console service for the B2B quoting system: menu authorization,
//! company scoping and account management on top of the quoting backend.

mod api;
mod auth;
mod backend;
mod config;
mod db;
mod editor;
mod errors;
mod hierarchy;
mod menus;
mod models;
mod scope;
mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backend::BackendClient;
use config::Config;
use db::Repository;
use editor::EditorRegistry;
use session::SessionManager;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub sessions: SessionManager,
    pub editors: Arc<EditorRegistry>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quote Console Backend");
    tracing::info!("Quoting backend: {}", config.backend_url);
    tracing::info!("Session database: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let sessions = SessionManager::new(
        Repository::new(pool),
        Arc::new(EditorRegistry::new()),
        config.idle_timeout,
    );

    let backend = BackendClient::new(
        &config.backend_url,
        config.request_timeout,
        config.retry_backoff,
    )?;

    spawn_idle_purge(sessions.clone(), config.idle_timeout);

    // Create application state
    let state = AppState {
        backend: Arc::new(backend),
        editors: sessions.editors().clone(),
        sessions,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Sweep idle sessions and their editors in the background. Expired sessions
/// are also rejected on access; this covers sessions never seen again.
fn spawn_idle_purge(sessions: SessionManager, idle_timeout: Duration) {
    let period = (idle_timeout / 4).max(Duration::from_secs(30));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = sessions.purge_idle().await {
                tracing::warn!("Idle session purge failed: {}", e);
            }
        }
    });
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sessions = state.sessions.clone();

    // Session-protected routes
    let protected_routes = Router::new()
        // Session
        .route(
            "/session",
            get(api::current_session).delete(api::logout),
        )
        // Navigation & roles
        .route("/navigation", get(api::get_navigation))
        .route("/roles", get(api::list_roles))
        // Role-menu editor
        .route("/role-menus/editor", get(api::get_editor))
        .route("/role-menus/editor/select", post(api::select_role))
        .route("/role-menus/editor/toggle", post(api::toggle_menu))
        .route("/role-menus/editor/save", post(api::save_role_menus))
        // Menu definitions
        .route("/menus", get(api::list_menus).post(api::create_menu))
        .route(
            "/menus/{id}",
            put(api::update_menu).delete(api::delete_menu),
        )
        // Companies
        .route("/companies", get(api::list_companies))
        .route("/companies", post(api::create_company))
        .route("/companies/selectable", get(api::selectable_companies))
        .route("/companies/parent-options", get(api::parent_options))
        .route(
            "/companies/{id}",
            put(api::update_company).delete(api::delete_company),
        )
        .route("/companies/{id}/ancestors", get(api::company_ancestors))
        // Accounts
        .route("/accounts", get(api::list_accounts))
        .route("/accounts", post(api::create_account))
        .route(
            "/accounts/{id}",
            put(api::update_account).delete(api::delete_account),
        )
        .route("/accounts/{id}/password", put(api::reset_password))
        // Customers
        .route("/customers", get(api::list_customers))
        .route("/customers", post(api::create_customer))
        .route("/customers/{id}", get(api::get_customer))
        .route("/customers/{id}", put(api::update_customer))
        .route("/customers/{id}", delete(api::delete_customer))
        // Apply session auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(sessions.clone(), req, next)
        }));

    // Login is the only unauthenticated API route
    let public_routes = Router::new().route("/session", post(api::login));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", protected_routes.merge(public_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
