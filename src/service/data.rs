//! Data-access seam: endpoints hand a positional query and its bound values to an implementation of this trait.

use crate::error::AppError;
use crate::value::{Row, Value};
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of an INSERT/UPDATE/DELETE.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WriteResult {
    pub affected_rows: u64,
    /// Rows from a `RETURNING` clause, when the statement has one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub returning: Vec<Row>,
}

#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn execute_read(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError>;

    async fn execute_write(&self, sql: &str, params: &[Value]) -> Result<WriteResult, AppError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
