//! PostgreSQL implementation of [`DataAccess`] over a sqlx pool.

use crate::error::AppError;
use crate::service::data::{DataAccess, WriteResult};
use crate::sql::PgBindValue;
use crate::value::{Row, Value};
use async_trait::async_trait;
use regex::Regex;
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo, PgTypeKind};
use sqlx::query::Query;
use sqlx::{Either, Executor, PgPool, Postgres, Statement};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

fn returning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\breturning\b").expect("returning regex"))
}

#[derive(Clone)]
pub struct PgDataAccess {
    pool: PgPool,
    /// Parameter types per statement text, from the server's prepare.
    param_types: Arc<RwLock<HashMap<String, Arc<Vec<PgTypeInfo>>>>>,
}

impl PgDataAccess {
    pub fn new(pool: PgPool) -> Self {
        PgDataAccess {
            pool,
            param_types: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn cached_types(&self, sql: &str) -> Option<Arc<Vec<PgTypeInfo>>> {
        self.param_types.read().ok()?.get(sql).cloned()
    }

    /// Parameter types of `sql`, prepared once per statement text.
    async fn param_types(&self, sql: &str) -> Result<Arc<Vec<PgTypeInfo>>, AppError> {
        if let Some(types) = self.cached_types(sql) {
            return Ok(types);
        }
        let statement = (&self.pool).prepare(sql).await?;
        let types = match statement.parameters() {
            Some(Either::Left(types)) => types.to_vec(),
            _ => Vec::new(),
        };
        tracing::debug!(sql = %sql, params = ?types, "described statement");
        let types = Arc::new(types);
        if let Ok(mut cache) = self.param_types.write() {
            cache.insert(sql.to_string(), Arc::clone(&types));
        }
        Ok(types)
    }

    async fn bind_all<'q>(&self, sql: &'q str, params: &[Value]) -> Result<Query<'q, Postgres, PgArguments>, AppError> {
        let types = self.param_types(sql).await?;
        let mut query = sqlx::query(sql);
        for (i, p) in params.iter().enumerate() {
            let value = match types.get(i) {
                Some(ty) => PgBindValue::coerce(p, ty)
                    .map_err(|e| AppError::BadRequest(format!("parameter {}: {}", i + 1, e)))?,
                None => PgBindValue::from_value(p),
            };
            query = query.bind(value);
        }
        Ok(query)
    }
}

#[async_trait]
impl DataAccess for PgDataAccess {
    async fn execute_read(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let rows = self.bind_all(sql, params).await?.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(pg_row_to_row).collect())
    }

    async fn execute_write(&self, sql: &str, params: &[Value]) -> Result<WriteResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "update");
        let query = self.bind_all(sql, params).await?;
        if returning_re().is_match(sql) {
            let rows = query.fetch_all(&self.pool).await?;
            return Ok(WriteResult {
                affected_rows: rows.len() as u64,
                returning: rows.iter().map(pg_row_to_row).collect(),
            });
        }
        let done = query.execute(&self.pool).await?;
        Ok(WriteResult {
            affected_rows: done.rows_affected(),
            returning: Vec::new(),
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn pg_row_to_row(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.ordinal())))
        .collect()
}

fn json_array<T: serde::Serialize>(items: Vec<T>) -> Value {
    serde_json::to_value(items).map(|j| Value::from_json(&j)).unwrap_or(Value::Null)
}

/// Decode one cell by trying the supported column types in turn.
/// Enums decode as their label. A type with no decoding is logged and becomes null.
fn cell_to_value(row: &PgRow, idx: usize) -> Value {
    use rust_decimal::prelude::ToPrimitive;
    use sqlx::{Column, Row as _, TypeInfo};
    if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
        return v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v.map(|n| Value::Float(n.into())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        return match v {
            None => Value::Null,
            Some(d) => d.to_f64().map(Value::Float).unwrap_or_else(|| Value::Text(d.to_string())),
        };
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
        return v.map(|u| Value::Text(u.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|d| Value::Text(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|d| Value::Text(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|d| Value::Text(d.format("%Y-%m-%d").to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v.map(|t| Value::Text(t.format("%H:%M:%S%.f").to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return v.map(|j| Value::from_json(&j)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|bytes| {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                Value::Text(format!("\\x{}", hex))
            })
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<i64>>, _>(idx) {
        return v.map(json_array).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<i32>>, _>(idx) {
        return v.map(json_array).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<f64>>, _>(idx) {
        return v.map(json_array).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<bool>>, _>(idx) {
        return v.map(json_array).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<String>>, _>(idx) {
        return v.map(json_array).unwrap_or(Value::Null);
    }

    let column = &row.columns()[idx];
    let type_info = column.type_info();
    if matches!(type_info.kind(), PgTypeKind::Enum(_)) {
        if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
            return v.map(Value::Text).unwrap_or(Value::Null);
        }
    }
    tracing::warn!(
        column = %column.name(),
        pg_type = %type_info.name(),
        "no decoding for column type, returning null; cast it to ::text in the query"
    );
    Value::Null
}
