//! Request-time authorization: who is calling, and may they use this endpoint.

use crate::auth::token::{CallerIdentity, TokenVerifier};
use crate::error::AppError;
use crate::value::Value;
use axum::http::HeaderMap;

/// Token from `header_name`, trimmed, with an optional `Bearer ` prefix removed. Empty counts as absent.
pub fn bearer_token(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let raw = headers.get(header_name)?.to_str().ok()?.trim();
    let token = match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => raw[7..].trim(),
        _ => raw,
    };
    (!token.is_empty()).then(|| token.to_string())
}

/// Identity for an optional token. A token that fails verification is treated as no token.
pub fn logged_user(verifier: &dyn TokenVerifier, token: Option<&str>) -> Option<CallerIdentity> {
    let token = token?;
    match verifier.verify(token) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::debug!(error = %e, "the caller sent an invalid token");
            None
        }
    }
}

/// Require an identity and, when a role claim is configured, a role in `allowed_roles` (or the `*` wildcard).
pub fn check_session(
    identity: Option<&CallerIdentity>,
    allowed_roles: &[String],
    role_claim: Option<&str>,
) -> Result<(), AppError> {
    let identity = identity.ok_or(AppError::Unauthorized)?;
    let Some(role_claim) = role_claim else {
        return Ok(());
    };
    if allowed_roles.iter().any(|r| r == "*") {
        return Ok(());
    }
    let role = identity.claim_ignore_case(role_claim).map(Value::from_json);
    tracing::debug!(allowed = ?allowed_roles, role = ?role, "checking role");
    match role {
        Some(role) if !role.is_null() && allowed_roles.iter().any(|r| *r == role.as_text()) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Value bound to `$loggedId`: the caller's primary-key claim, or null.
pub fn identity_value(identity: Option<&CallerIdentity>, identity_claim: &str) -> Value {
    identity
        .and_then(|i| i.claim(identity_claim))
        .map(Value::from_json)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenError;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn identity(v: serde_json::Value) -> CallerIdentity {
        CallerIdentity::new(v.as_object().cloned().unwrap())
    }

    fn roles(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    struct Rejecting;

    impl TokenVerifier for Rejecting {
        fn verify(&self, _token: &str) -> Result<CallerIdentity, TokenError> {
            Err(TokenError::Invalid("bad signature".into()))
        }
    }

    #[test]
    fn reads_plain_and_bearer_tokens() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers, "Token"), None);
        headers.insert("token", HeaderValue::from_static("abc"));
        assert_eq!(bearer_token(&headers, "Token").as_deref(), Some("abc"));
        headers.insert("token", HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token(&headers, "token").as_deref(), Some("xyz"));
        headers.insert("token", HeaderValue::from_static("   "));
        assert_eq!(bearer_token(&headers, "Token"), None);
    }

    #[test]
    fn invalid_token_is_no_identity() {
        assert!(logged_user(&Rejecting, Some("t")).is_none());
        assert!(logged_user(&Rejecting, None).is_none());
    }

    #[test]
    fn session_requires_identity() {
        assert!(matches!(check_session(None, &roles(&["*"]), None), Err(AppError::Unauthorized)));
        let user = identity(json!({"id": 1}));
        assert!(check_session(Some(&user), &roles(&[]), None).is_ok());
    }

    #[test]
    fn role_must_be_allowed_when_role_claim_is_configured() {
        let admin = identity(json!({"id": 1, "ROLE": "admin"}));
        let guest = identity(json!({"id": 2, "role": "guest"}));
        let nobody = identity(json!({"id": 3}));
        let allowed = roles(&["admin"]);
        assert!(check_session(Some(&admin), &allowed, Some("role")).is_ok());
        assert!(check_session(Some(&guest), &allowed, Some("role")).is_err());
        assert!(check_session(Some(&nobody), &allowed, Some("role")).is_err());
        assert!(check_session(Some(&guest), &roles(&["*"]), Some("role")).is_ok());
        assert!(check_session(Some(&guest), &roles(&[]), Some("role")).is_err());
    }

    #[test]
    fn identity_value_defaults_to_null() {
        let user = identity(json!({"id": 42}));
        assert_eq!(identity_value(Some(&user), "id"), Value::Int(42));
        assert_eq!(identity_value(Some(&user), "userId"), Value::Null);
        assert_eq!(identity_value(None, "id"), Value::Null);
    }
}
