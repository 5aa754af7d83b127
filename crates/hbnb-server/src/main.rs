//! HBnB API Server
//!
//! REST API over states, cities, amenities, places, reviews and users,
//! backed by a JSON file or an embedded SQLite database.

mod config;
mod handlers;
mod storage;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use hbnb_core::Storage;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Held by each request for its whole unit of work
    pub unit_of_work: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            unit_of_work: Arc::new(Mutex::new(())),
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        error!("PANIC at {:?}: {}", location, payload);
    }));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting HBnB API v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    info!(
        "Config loaded: bind={}, storage={:?}",
        config.bind_address(),
        config.type_storage
    );

    let storage = storage::open(&config).await?;
    let app = build_router(AppState::new(storage));

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            storage::close_storage,
        ))
        .layer(CatchPanicLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    use handlers::{amenities, cities, index, place_amenities, places, reviews, states, users};

    Router::new()
        .route("/status", get(index::status))
        .route("/stats", get(index::stats))
        .route("/states", get(states::list).post(states::create))
        .route(
            "/states/:id",
            get(states::get).put(states::update).delete(states::delete),
        )
        .route(
            "/states/:id/cities",
            get(cities::list).post(cities::create),
        )
        .route(
            "/cities/:id",
            get(cities::get).put(cities::update).delete(cities::delete),
        )
        .route("/amenities", get(amenities::list).post(amenities::create))
        .route(
            "/amenities/:id",
            get(amenities::get)
                .put(amenities::update)
                .delete(amenities::delete),
        )
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route(
            "/cities/:id/places",
            get(places::list).post(places::create),
        )
        .route(
            "/places/:id",
            get(places::get).put(places::update).delete(places::delete),
        )
        .route("/places_search", post(places::search))
        .route(
            "/places/:id/reviews",
            get(reviews::list).post(reviews::create),
        )
        .route(
            "/reviews/:id",
            get(reviews::get).put(reviews::update).delete(reviews::delete),
        )
        .route("/places/:id/amenities", get(place_amenities::list))
        .route(
            "/places/:id/amenities/:amenity_id",
            post(place_amenities::link).delete(place_amenities::unlink),
        )
        .fallback(handlers::not_found)
}
