use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod store;

use config::Config;
use middleware::rate_limit::RateLimiter;
use services::gemini::GeminiClient;
use services::suggestion::{Resolver, SuggestionModel};
use store::{ClubStore, PgClubStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClubStore>,
    pub config: Arc<Config>,
    pub resolver: Resolver,
    pub rate_limiter: RateLimiter,
    pub suggest_rate_limiter: RateLimiter,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    // --- Auth routes (no auth required) ---
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let suggestion_routes = Router::new()
        .route("/club", post(routes::suggestions::suggest_club))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::suggest_rate_limit,
        ));

    // --- Club routes: listing is public, everything else needs a session ---
    let club_routes = Router::new()
        .route(
            "/",
            post(routes::clubs::create_club)
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::auth::authenticate,
                ))
                .get(routes::clubs::list_clubs),
        )
        .merge(
            Router::new()
                .route(
                    "/:id",
                    get(routes::clubs::get_club)
                        .put(routes::clubs::update_club)
                        .delete(routes::clubs::delete_club),
                )
                .route("/:id/join", post(routes::members::join_club))
                .route("/:id/leave", post(routes::members::leave_club))
                .route("/:id/members", post(routes::members::add_member))
                .route("/:id/requests", get(routes::members::list_requests))
                .route(
                    "/:id/requests/:requestId/approve",
                    post(routes::members::approve_request),
                )
                .route(
                    "/:id/requests/:requestId/reject",
                    post(routes::members::reject_request),
                )
                .route("/:id/events", post(routes::clubs::create_event))
                .route(
                    "/:id/announcements",
                    post(routes::clubs::create_announcement),
                )
                .layer(axum_mw::from_fn_with_state(
                    state.clone(),
                    middleware::auth::authenticate,
                )),
        );

    let user_routes = Router::new()
        .route(
            "/me",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/me/clubs", get(routes::users::my_clubs))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // Multipart framing needs headroom over the file cap itself.
    let upload_routes = Router::new()
        .route("/", post(routes::uploads::upload_image))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_bytes + 64 * 1024))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Compose full API ---
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/suggestions", suggestion_routes)
        .nest("/clubs", club_routes)
        .nest("/users", user_routes)
        .nest("/uploads", upload_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        .nest_service(
            &state.config.uploads.public_path,
            ServeDir::new(&state.config.uploads.dir),
        )
        // Global middleware. optional_auth sits outside the limiter so that
        // signed-in callers are counted per user rather than per IP.
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let store = PgClubStore::connect(&config).await?;

    let model = GeminiClient::new(&config.ai).map(|c| Arc::new(c) as Arc<dyn SuggestionModel>);
    if model.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, club suggestions use keyword matching only");
    }
    let resolver = Resolver::new(model, Duration::from_secs(config.ai.timeout_secs));

    let rate_limiter =
        RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);
    let suggest_rate_limiter = RateLimiter::new(
        config.rate_limit.suggest_max,
        config.rate_limit.window_secs,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState {
        store: Arc::new(store),
        config: Arc::new(config),
        resolver,
        rate_limiter,
        suggest_rate_limiter,
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Club Hub API listening");
    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
