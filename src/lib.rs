pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod rooms;
pub mod session;
pub mod socket;
pub mod uploads;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use config::Config;
use error::EventError;
use socket::ConnectionRegistry;
use uploads::UploadDir;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub registry: ConnectionRegistry,
    pub uploads: UploadDir,
    pub config: Config,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> AppState {
        AppState {
            db_pool,
            registry: ConnectionRegistry::new(),
            uploads: UploadDir::new(&config.upload_dir, &config.upload_url, config.max_upload_bytes),
            config,
        }
    }
}

/// Every route this crate serves. Session handling is layered on by the caller.
pub fn app(state: AppState) -> Router {
    let cors = match state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin).allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin = %state.config.cors_origin, "unparsable cors origin, allowing any");
            CorsLayer::new().allow_origin(Any)
        }
    };

    let files = ServeDir::new(state.uploads.root());
    let router = Router::new()
        .merge(socket::router())
        .nest("/chat", chat::router())
        .nest("/rooms", rooms::router());
    let router = match state.uploads.url_prefix() {
        "" => router.fallback_service(files),
        prefix => router.nest_service(prefix, files),
    };

    router
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<EventError>() {
            Some(EventError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(EventError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(EventError::Unauthorized | EventError::NotMember { .. }) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(err = %self.0, "request failed\n{}", self.0.backtrace());
        }

        (status, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
