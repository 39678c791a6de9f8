//! Convert row values to types that sqlx can bind.
//!
//! Parameter types come from the prepared statement, so a value is converted to what the
//! column expects: `"42"` binds as text against a text column and as `int4` against an
//! integer one. Types whose binary form is their text (enums, `json`, the character types)
//! are sent as text under the described type.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type, TypeInfo};
use std::str::FromStr;

/// A value that can be bound to a PostgreSQL query. Each variant declares its own parameter type.
#[derive(Clone, Debug)]
pub enum PgBindValue {
    /// Null, typed as the described parameter when known.
    Null(Option<PgTypeInfo>),
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Numeric(Decimal),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Jsonb(serde_json::Value),
    String(String),
    /// Text sent under a type whose binary input is its text form.
    Labelled(String, PgTypeInfo),
}

impl PgBindValue {
    /// Bind without a described type: the value's own shape decides.
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null(None),
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Int(n) => PgBindValue::I64(*n),
            Value::Float(f) => PgBindValue::F64(*f),
            Value::Text(s) => PgBindValue::String(s.clone()),
        }
    }

    /// Convert `v` to the parameter type `ty`. The error names the expected type.
    pub fn coerce(v: &Value, ty: &PgTypeInfo) -> Result<Self, String> {
        if v.is_null() {
            return Ok(PgBindValue::Null(Some(ty.clone())));
        }
        let name = ty.name().to_ascii_uppercase();
        let bad = || format!("'{}' is not a valid {}", v.as_text(), name);
        let text = v.as_text();
        let text = text.trim();
        Ok(match name.as_str() {
            "BOOL" => PgBindValue::Bool(match v {
                Value::Bool(b) => *b,
                Value::Int(0) => false,
                Value::Int(1) => true,
                _ => match text.to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" | "yes" | "on" => true,
                    "false" | "f" | "0" | "no" | "off" => false,
                    _ => return Err(bad()),
                },
            }),
            "INT2" => PgBindValue::I16(i16::try_from(as_integer(v).ok_or_else(bad)?).map_err(|_| bad())?),
            "INT4" => PgBindValue::I32(i32::try_from(as_integer(v).ok_or_else(bad)?).map_err(|_| bad())?),
            "INT8" => PgBindValue::I64(as_integer(v).ok_or_else(bad)?),
            "FLOAT4" => PgBindValue::F32(as_float(v).ok_or_else(bad)? as f32),
            "FLOAT8" => PgBindValue::F64(as_float(v).ok_or_else(bad)?),
            "NUMERIC" => match v {
                Value::Int(n) => PgBindValue::Numeric(Decimal::from(*n)),
                Value::Bool(_) => return Err(bad()),
                _ => PgBindValue::Numeric(Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).map_err(|_| bad())?),
            },
            "UUID" => PgBindValue::Uuid(uuid::Uuid::parse_str(text).map_err(|_| bad())?),
            "DATE" => PgBindValue::Date(NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| bad())?),
            "TIME" => PgBindValue::Time(
                NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                    .map_err(|_| bad())?,
            ),
            "TIMESTAMP" => PgBindValue::Timestamp(parse_naive_datetime(text).ok_or_else(bad)?),
            "TIMESTAMPTZ" => PgBindValue::TimestampTz(
                DateTime::parse_from_rfc3339(text)
                    .map(|d| d.with_timezone(&Utc))
                    .ok()
                    .or_else(|| parse_naive_datetime(text).map(|d| d.and_utc()))
                    .ok_or_else(bad)?,
            ),
            "JSONB" => PgBindValue::Jsonb(match v {
                Value::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone())),
                other => serde_json::to_value(other).map_err(|e| e.to_string())?,
            }),
            "TEXT" => PgBindValue::String(v.as_text().into_owned()),
            // Character types, json, enums and other types whose binary input is text.
            _ => PgBindValue::Labelled(v.as_text().into_owned(), ty.clone()),
        })
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.naive_utc()))
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null(_) => IsNull::Yes,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I16(n) => <i16 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::I32(n) => <i32 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F32(n) => <f32 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::Numeric(d) => <Decimal as Encode<Postgres>>::encode_by_ref(d, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            PgBindValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf)?,
            PgBindValue::Time(t) => <NaiveTime as Encode<Postgres>>::encode_by_ref(t, buf)?,
            PgBindValue::Timestamp(t) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(t, buf)?,
            PgBindValue::TimestampTz(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf)?,
            PgBindValue::Jsonb(j) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(j, buf)?,
            PgBindValue::String(s) | PgBindValue::Labelled(s, _) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null(Some(ty)) => ty.clone(),
            // Unspecified: the server infers the type from context, which is safe for NULL.
            PgBindValue::Null(None) => PgTypeInfo::with_oid(Oid(0)),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I16(_) => <i16 as Type<Postgres>>::type_info(),
            PgBindValue::I32(_) => <i32 as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F32(_) => <f32 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Numeric(_) => <Decimal as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            PgBindValue::Date(_) => <NaiveDate as Type<Postgres>>::type_info(),
            PgBindValue::Time(_) => <NaiveTime as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => <NaiveDateTime as Type<Postgres>>::type_info(),
            PgBindValue::TimestampTz(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
            PgBindValue::Jsonb(_) => <serde_json::Value as Type<Postgres>>::type_info(),
            PgBindValue::String(_) => <&str as Type<Postgres>>::type_info(),
            PgBindValue::Labelled(_, ty) => ty.clone(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}
