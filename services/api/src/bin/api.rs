//! services/api/src/bin/api.rs

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use learning_api_lib::{
    adapters::{MockCatalogAdapter, TemplateResponder},
    config::{Config, ConfigError},
    error::ApiError,
    web::{
        rest::{
            course_progress_handler, discussions_handler, enroll_handler, get_assessment_handler,
            get_avatar_handler, get_course_handler, get_profile_handler, leaderboard_handler,
            list_assessments_handler, list_courses_handler, list_user_courses_handler,
            submit_assessment_handler, update_profile_handler, upload_avatar_handler, ApiDoc,
        },
        state::AppState,
        ws_handler,
    },
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
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

    // --- 2. Initialize Service Adapters ---
    let responder = Arc::new(TemplateResponder::new());
    let catalog = Arc::new(MockCatalogAdapter::new());

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        responder,
        catalog,
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let rest_routes = Router::new()
        .route("/courses", get(list_courses_handler))
        .route("/courses/{course_id}", get(get_course_handler))
        .route("/courses/{course_id}/enroll", post(enroll_handler))
        .route("/courses/{course_id}/progress", get(course_progress_handler))
        .route("/users/courses", get(list_user_courses_handler))
        .route(
            "/users/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/users/avatar", post(upload_avatar_handler))
        .route("/users/{user_id}/avatar", get(get_avatar_handler))
        .route("/assessments", get(list_assessments_handler))
        .route("/assessments/{assessment_id}", get(get_assessment_handler))
        .route(
            "/assessments/{assessment_id}/submit",
            post(submit_assessment_handler),
        )
        .route("/community/leaderboard", get(leaderboard_handler))
        .route("/community/discussions", get(discussions_handler));

    let api_prefix = config.api_prefix();
    let api_router = Router::new()
        .nest(&api_prefix, rest_routes)
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("REST routes mounted under {} ({})", api_prefix, config.api_base_url);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
