//! sqlroute: declarative SQL endpoints compiled into axum handlers.
//!
//! An endpoint is a route pattern, an HTTP method and a query with `$name` placeholders.
//! Registration validates the three against each other; the installed handler binds route,
//! body and caller values positionally, and shapes read results from the query string.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod summary;
pub mod value;

pub use auth::{CallerIdentity, JwtVerifier, TokenVerifier};
pub use config::{load_definitions, EndpointDefinition, EndpointSpec, OperationKind, Settings};
pub use error::{AppError, ConfigError, ConfigWarning};
pub use routes::{common_routes, common_routes_with_ready, Registrar};
pub use service::{DataAccess, FilterSpec, PgDataAccess, WriteResult};
pub use state::AppState;
pub use summary::{ApiSummary, EndpointSummary};
pub use value::{Row, Value};
