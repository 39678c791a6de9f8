//! Data access behind endpoints, and shaping of read results.

mod data;
mod postgres;
pub mod shaper;
pub use data::{DataAccess, WriteResult};
pub use postgres::PgDataAccess;
pub use shaper::{shape, FilterSpec};
