//! Extract the caller's identity from the configured session token header.

use crate::auth::{bearer_token, logged_user, CallerIdentity};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Verified caller, or `None` when the token is absent or invalid. Never rejects.
#[derive(Clone, Debug)]
pub struct Caller(pub Option<CallerIdentity>);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers, &state.settings.auth.token_header);
        Ok(Caller(logged_user(state.verifier.as_ref(), token.as_deref())))
    }
}
