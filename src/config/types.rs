//! Raw endpoint definitions, as written in code or in endpoint JSON files.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_allowed_roles() -> Value {
    Value::Array(vec![Value::String("*".into())])
}

/// One declared endpoint. `allowed_roles` stays untyped until validation so malformed values are reported, not rejected by serde.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub route: String,
    pub method: String,
    pub sql: String,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub request_body_params: Vec<String>,
}

impl EndpointDefinition {
    pub fn new(route: impl Into<String>, method: impl Into<String>, sql: impl Into<String>) -> Self {
        EndpointDefinition {
            route: route.into(),
            method: method.into(),
            sql: sql.into(),
            auth_required: false,
            allowed_roles: default_allowed_roles(),
            description: None,
            request_body_params: Vec::new(),
        }
    }

    pub fn auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    pub fn allowed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roles = Value::Array(roles.into_iter().map(|r| Value::String(r.into())).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn body_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_body_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// `METHOD /route`, used to name the endpoint in diagnostics.
    pub fn label(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.route)
    }
}
