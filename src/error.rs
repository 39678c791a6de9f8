//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Fatal registration/startup errors. A misconfigured endpoint is never served.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the SQL query '{sql}' in endpoint {endpoint} is not supported, use only SELECT/INSERT/UPDATE/DELETE")]
    UnsupportedOperation { endpoint: String, sql: String },
    #[error("error creating endpoint {endpoint}: the parameters {} are expected by the SQL query but they are not provided in the URL or the request body", dollar_list(.params))]
    MissingParameters { endpoint: String, params: Vec<String> },
    #[error("the value '{value}' for allowed_roles in endpoint {endpoint} is not allowed, it must be a list of role names")]
    InvalidAllowedRoles { endpoint: String, value: String },
    #[error("unsupported HTTP method '{method}' in endpoint {route}")]
    UnsupportedMethod { method: String, route: String },
    #[error("invalid route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },
    #[error("endpoint {method} {route} is declared more than once")]
    DuplicateEndpoint { method: String, route: String },
    #[error("route '{route}' conflicts with '{existing}' (different parameter names at the same position)")]
    ConflictingRoute { route: String, existing: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("settings: {0}")]
    Settings(String),
}

fn dollar_list(params: &[String]) -> String {
    params.iter().map(|p| format!("${}", p)).collect::<Vec<_>>().join(", ")
}

/// Non-fatal registration findings. Registration proceeds; each one is logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    #[error("the '{declared}' HTTP verb is not correct for the SQL {operation} operation in endpoint {endpoint}, the correct verb is {expected}")]
    VerbMismatch {
        endpoint: String,
        declared: String,
        operation: &'static str,
        expected: &'static str,
    },
    #[error("allowed roles are specified in endpoint {endpoint} but auth_required is false, so every caller has access regardless of role")]
    RolesIgnored { endpoint: String },
    #[error("auth_required is true in endpoint {endpoint} but the list of allowed roles is empty, so nobody can access it")]
    UnreachableEndpoint { endpoint: String },
    #[error("endpoint {endpoint} uses $loggedId but does not require authentication, the logged user's id may be null")]
    NullableIdentity { endpoint: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("data access: {0}")]
    Data(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Data(_) => (StatusCode::INTERNAL_SERVER_ERROR, "data_error"),
        };
        // Server-side failures are logged in full; the caller only sees the code.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_message_lists_dollar_names() {
        let err = ConfigError::MissingParameters {
            endpoint: "GET /users".into(),
            params: vec!["id".into(), "name".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("GET /users"));
        assert!(msg.contains("$id, $name"));
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn request_errors_map_to_status_codes() {
        assert_eq!(AppError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PayloadTooLarge.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = AppError::BadRequest("name is missing".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["message"], "bad request: name is missing");

        let resp = AppError::Data("connection refused on 10.0.0.7".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "data_error");
        assert_eq!(body["error"]["message"], "internal error");

        let resp = AppError::Db(sqlx::Error::PoolTimedOut).into_response();
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "database_error");
        assert_eq!(body["error"]["message"], "internal error");
        assert!(body["error"].get("details").is_none());
    }
}
