//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiQuoteAdapter, SharedPool, Stores},
    config::Config,
    error::ApiError,
    web::{
        auth::{check_handler, login_handler, logout_handler, register_handler},
        require_auth,
        rest::{
            day_view_handler, explain_handler, get_progress_handler, plan_day_handler,
            plan_handler, quote_handler, reset_progress_handler, save_progress_handler,
            summary_handler, toggle_task_handler, ApiDoc,
        },
        state::AppState,
        ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use study_tracker_core::{quotes::StaticQuotes, PlanCatalog, QuoteService};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let stores = match config.database_url.as_ref() {
        Some(database_url) => {
            info!("Connecting to database...");
            let shared_pool = Arc::new(SharedPool::new(
                database_url.clone(),
                config.db_max_connections,
            ));
            let db_adapter = Arc::new(DbAdapter::new(shared_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Stores::postgres(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; all data is kept in memory and lost on restart.");
            Stores::in_memory()
        }
    };

    // --- 3. Initialize Domain Services & Adapters ---
    let catalog = PlanCatalog::standard();
    info!(
        "Plan loaded: {} days, {} tasks.",
        catalog.last_day(),
        catalog.len()
    );

    let quotes: Arc<dyn QuoteService> = match config.openai_api_key.as_ref() {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Arc::new(OpenAiQuoteAdapter::new(
                openai_client,
                config.quote_model.clone(),
            ))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; quotes use the static fallback text.");
            Arc::new(StaticQuotes)
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), catalog, stores, quotes));

    // --- 5. CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/check", get(check_handler))
        .route("/plan", get(plan_handler))
        .route("/plan/days/{day}", get(plan_day_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/progress",
            get(get_progress_handler)
                .post(save_progress_handler)
                .delete(reset_progress_handler),
        )
        .route("/progress/tasks/{task_id}/toggle", post(toggle_task_handler))
        .route("/days/{day}", get(day_view_handler))
        .route("/summary", get(summary_handler))
        .route("/quote", get(quote_handler))
        .route("/explain", get(explain_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
