//! Resolved endpoint model: a definition validated and flattened for request-time use.

use axum::http::Method;
use std::fmt;

/// SQL operation, inferred from the leading keyword of the query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => Some(OperationKind::Read),
            "INSERT" => Some(OperationKind::Create),
            "UPDATE" => Some(OperationKind::Update),
            "DELETE" => Some(OperationKind::Delete),
            _ => None,
        }
    }

    pub fn canonical_method(self) -> Method {
        match self {
            OperationKind::Read => Method::GET,
            OperationKind::Create => Method::POST,
            OperationKind::Update => Method::PUT,
            OperationKind::Delete => Method::DELETE,
        }
    }

    pub fn canonical_verb(self) -> &'static str {
        match self {
            OperationKind::Read => "GET",
            OperationKind::Create => "POST",
            OperationKind::Update => "PUT",
            OperationKind::Delete => "DELETE",
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Read => "SELECT",
            OperationKind::Create => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }

    /// Whether body parameters may fill query placeholders.
    pub fn accepts_body(self) -> bool {
        matches!(self, OperationKind::Create | OperationKind::Update)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Clone, Debug)]
pub struct EndpointSpec {
    pub method: Method,
    /// Route as declared, without the API prefix.
    pub route: String,
    /// Prefix + route, still in `$name` form.
    pub full_route: String,
    /// Prefix + route in axum capture syntax.
    pub axum_route: String,
    pub operation: OperationKind,
    /// Query placeholders in bind order (duplicates kept).
    pub query_params: Vec<String>,
    pub route_params: Vec<String>,
    pub body_params: Vec<String>,
    /// Query with placeholders rewritten to `$1..$n`.
    pub positional_sql: String,
    pub auth_required: bool,
    pub allowed_roles: Vec<String>,
    pub description: Option<String>,
    pub uses_identity: bool,
    /// Route ends in a placeholder: an empty read is a 404.
    pub single_resource: bool,
}

impl EndpointSpec {
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.full_route)
    }
}
