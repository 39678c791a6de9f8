//! Shared application state for all routes. Everything in it is immutable after startup.

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::service::DataAccess;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<dyn DataAccess>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(data: Arc<dyn DataAccess>, verifier: Arc<dyn TokenVerifier>, settings: Settings) -> Self {
        AppState {
            data,
            verifier,
            settings: Arc::new(settings),
        }
    }
}
