//! Request-time handler shared by every declared endpoint.

use crate::auth::{check_session, identity_value};
use crate::config::{EndpointSpec, OperationKind};
use crate::error::AppError;
use crate::extractors::Caller;
use crate::service::{shape, FilterSpec};
use crate::sql::LOGGED_ID;
use crate::state::AppState;
use crate::value::Value;
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, FromRequest, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Body of a write request, decoded by content type.
pub type BodyMap = HashMap<String, Value>;

/// Axum handler for one endpoint. Reads and writes share the gate and route parameter handling.
pub async fn serve_endpoint(
    spec: Arc<EndpointSpec>,
    State(state): State<AppState>,
    Caller(identity): Caller,
    path: Result<Path<HashMap<String, String>>, PathRejection>,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<Response, AppError> {
    if spec.auth_required {
        check_session(
            identity.as_ref(),
            &spec.allowed_roles,
            state.settings.auth.role_claim.as_deref(),
        )?;
    }

    let mut params: HashMap<String, Value> = HashMap::new();
    let route_values: HashMap<String, Value> = route_params(&spec, path)?
        .into_iter()
        .map(|(k, v)| (k, Value::Text(v)))
        .collect();

    if spec.operation == OperationKind::Read {
        params.extend(route_values);
        if spec.uses_identity {
            params.insert(LOGGED_ID.to_string(), identity_value(identity.as_ref(), &state.settings.auth.identity_claim));
        }
        let binds = bind_in_order(&spec.query_params, &params);
        let rows = state.data.execute_read(&spec.positional_sql, &binds).await?;
        let rows = shape(rows, &FilterSpec::from_query(&query));
        if rows.is_empty() && spec.single_resource {
            return Err(AppError::NotFound(format!("no result for {}", spec.label())));
        }
        return Ok((StatusCode::OK, Json(rows)).into_response());
    }

    let mut body = read_body(request).await?;
    for name in &spec.body_params {
        params.insert(name.clone(), body.remove(name).unwrap_or(Value::Null));
    }
    params.extend(route_values);
    if spec.uses_identity {
        params.insert(LOGGED_ID.to_string(), identity_value(identity.as_ref(), &state.settings.auth.identity_claim));
    }
    if state.settings.display_body_params {
        tracing::info!(endpoint = %spec.label(), params = ?params, "bound parameters");
    }
    let binds = bind_in_order(&spec.query_params, &params);
    let result = state.data.execute_write(&spec.positional_sql, &binds).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

/// Decoded route segments. A segment that fails to decode is a 400, never a missing value.
fn route_params(
    spec: &EndpointSpec,
    path: Result<Path<HashMap<String, String>>, PathRejection>,
) -> Result<HashMap<String, String>, AppError> {
    if spec.route_params.is_empty() {
        return Ok(HashMap::new());
    }
    match path {
        Ok(Path(p)) => Ok(p),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// One value per placeholder occurrence. Names without a value bind as null.
pub fn bind_in_order(query_params: &[String], params: &HashMap<String, Value>) -> Vec<Value> {
    query_params
        .iter()
        .map(|name| params.get(name).cloned().unwrap_or(Value::Null))
        .collect()
}

/// JSON object for JSON bodies, url-encoded fields (as text) for forms, nothing otherwise.
pub async fn read_body(request: Request) -> Result<BodyMap, AppError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| body_rejection(e.status(), e.body_text()))?;
        let mut out = BodyMap::new();
        for (k, v) in fields {
            out.entry(k).or_insert(Value::Text(v));
        }
        return Ok(out);
    }

    if !content_type.contains("json") {
        return Ok(BodyMap::new());
    }
    let bytes = Bytes::from_request(request, &())
        .await
        .map_err(|e| body_rejection(e.status(), e.body_text()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BodyMap::new());
    }
    let parsed: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
    match parsed {
        serde_json::Value::Object(m) => Ok(m.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn body_rejection(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(text)
    }
}
