//! Blog backend: users, categories, articles and comments over HTTP, with referential checks
//! before every write and dependency-ordered cascading deletes.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{AppConfig, StorageBackend};
pub use error::{AppError, ConfigError};
pub use routes::{common_routes, entity_routes};
pub use schema::{ensure_database_exists, ensure_schema};
pub use service::{CrudService, DeletionPlan, ReferenceValidator};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Storage, Transaction};

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Full application router: common endpoints plus the four resource collections.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(entity_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}
