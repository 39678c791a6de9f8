//! Routers: declared endpoints plus the health routes.

pub mod common;
pub mod endpoint;
pub use common::{common_routes, common_routes_with_ready};
pub use endpoint::Registrar;
