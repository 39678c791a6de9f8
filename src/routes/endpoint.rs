//! Endpoint registrar: validates definitions and installs one handler per (method, route).

use crate::config::{resolve_endpoint, EndpointDefinition, EndpointSpec};
use crate::error::{ConfigError, ConfigWarning};
use crate::extractors::Caller;
use crate::handlers::serve_endpoint;
use crate::sql::{routes_conflict, OPENAPI_ROUTE, SUMMARY_ROUTE};
use crate::state::AppState;
use crate::summary::{ApiSummary, EndpointSummary};
use axum::{
    extract::{rejection::PathRejection, Path, Query, Request, State},
    http::Method,
    routing::{get, on, MethodFilter},
    Json, Router,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Owns the route table while endpoints are registered. Consumed by [`Registrar::into_router`].
pub struct Registrar {
    state: AppState,
    router: Router<AppState>,
    summary: ApiSummary,
    installed: HashSet<(Method, String)>,
    /// Distinct full routes, in registration order.
    routes: Vec<String>,
}

impl Registrar {
    pub fn new(state: AppState) -> Self {
        Registrar {
            state,
            router: Router::new(),
            summary: ApiSummary::default(),
            installed: HashSet::new(),
            routes: Vec::new(),
        }
    }

    /// Validate and install one endpoint. On error nothing is installed.
    pub fn register(&mut self, def: &EndpointDefinition) -> Result<Vec<ConfigWarning>, ConfigError> {
        let (spec, warnings) = resolve_endpoint(def, &self.state.settings.api_prefix)?;
        for w in &warnings {
            tracing::warn!("{}", w);
        }

        let key = (spec.method.clone(), spec.full_route.clone());
        if self.installed.contains(&key) {
            return Err(ConfigError::DuplicateEndpoint {
                method: spec.method.to_string(),
                route: spec.full_route.clone(),
            });
        }
        if let Some(existing) = self.routes.iter().find(|r| routes_conflict(r, &spec.full_route)) {
            return Err(ConfigError::ConflictingRoute {
                route: spec.full_route.clone(),
                existing: existing.clone(),
            });
        }
        let filter = MethodFilter::try_from(spec.method.clone()).map_err(|_| ConfigError::UnsupportedMethod {
            method: spec.method.to_string(),
            route: spec.route.clone(),
        })?;

        self.summary.push(EndpointSummary::from_spec(&spec));
        self.installed.insert(key);
        if !self.routes.contains(&spec.full_route) {
            self.routes.push(spec.full_route.clone());
        }

        let axum_route = spec.axum_route.clone();
        tracing::debug!(endpoint = %spec.label(), route = %axum_route, "endpoint installed");
        let spec: Arc<EndpointSpec> = Arc::new(spec);
        let handler = move |state: State<AppState>,
                            caller: Caller,
                            path: Result<Path<HashMap<String, String>>, PathRejection>,
                            query: Query<Vec<(String, String)>>,
                            request: Request| {
            let spec = Arc::clone(&spec);
            async move { serve_endpoint(spec, state, caller, path, query, request).await }
        };
        let router = std::mem::take(&mut self.router);
        self.router = router.route(&axum_route, on(filter, handler));
        Ok(warnings)
    }

    /// Register in order, stopping at the first error.
    pub fn register_all<'a, I>(&mut self, defs: I) -> Result<Vec<ConfigWarning>, ConfigError>
    where
        I: IntoIterator<Item = &'a EndpointDefinition>,
    {
        let mut warnings = Vec::new();
        for def in defs {
            warnings.extend(self.register(def)?);
        }
        Ok(warnings)
    }

    pub fn summary(&self) -> &ApiSummary {
        &self.summary
    }

    /// Finish registration: add the summary routes and the body limit, and bind the state.
    pub fn into_router(self) -> Router {
        let prefix = self.state.settings.api_prefix.clone();
        let body_limit = self.state.settings.body_limit;
        tracing::info!(count = self.summary.len(), prefix = %prefix, "endpoints registered");

        let summary = Arc::new(self.summary);
        let listing = Arc::clone(&summary);
        let openapi = Arc::new(summary.to_openapi(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));

        self.router
            .route(
                &format!("{}{}", prefix, SUMMARY_ROUTE),
                get(move || {
                    let listing = Arc::clone(&listing);
                    async move { Json(listing.as_ref().clone()) }
                }),
            )
            .route(
                &format!("{}{}", prefix, OPENAPI_ROUTE),
                get(move || {
                    let openapi = Arc::clone(&openapi);
                    async move { Json(openapi.as_ref().clone()) }
                }),
            )
            .layer(RequestBodyLimitLayer::new(body_limit))
            .with_state(self.state)
    }
}
