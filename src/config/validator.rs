//! Registration checks: verb vs. operation, auth/role consistency, and placeholder coverage.

use crate::config::OperationKind;
use crate::error::{ConfigError, ConfigWarning};
use crate::sql::LOGGED_ID;
use axum::http::Method;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

const ROUTABLE_METHODS: &[Method] = &[
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Leading keyword of the query, e.g. `SELECT`.
fn leading_keyword(sql: &str) -> &str {
    sql.trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
}

pub fn infer_operation(sql: &str, endpoint: &str) -> Result<OperationKind, ConfigError> {
    OperationKind::from_keyword(leading_keyword(sql)).ok_or_else(|| ConfigError::UnsupportedOperation {
        endpoint: endpoint.to_string(),
        sql: sql.to_string(),
    })
}

pub fn parse_method(method: &str, route: &str) -> Result<Method, ConfigError> {
    let unsupported = || ConfigError::UnsupportedMethod {
        method: method.to_string(),
        route: route.to_string(),
    };
    let parsed = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| unsupported())?;
    if ROUTABLE_METHODS.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(unsupported())
    }
}

/// Infer the operation and warn when the declared verb is not the canonical one. Unknown operations are fatal.
pub fn check_method(
    sql: &str,
    method: &Method,
    endpoint: &str,
) -> Result<(OperationKind, Option<ConfigWarning>), ConfigError> {
    let op = infer_operation(sql, endpoint)?;
    let expected = op.canonical_method();
    let warning = (*method != expected).then(|| ConfigWarning::VerbMismatch {
        endpoint: endpoint.to_string(),
        declared: method.to_string(),
        operation: op.keyword(),
        expected: op.canonical_verb(),
    });
    Ok((op, warning))
}

/// Parse `allowed_roles` (must be a list of strings) and warn about combinations that ignore or block every role.
pub fn check_auth_roles(
    auth_required: bool,
    allowed_roles: &Value,
    endpoint: &str,
) -> Result<(Vec<String>, Vec<ConfigWarning>), ConfigError> {
    let invalid = || ConfigError::InvalidAllowedRoles {
        endpoint: endpoint.to_string(),
        value: allowed_roles.to_string(),
    };
    let roles = allowed_roles
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|r| r.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(invalid)?;

    let mut warnings = Vec::new();
    let only_wildcard = roles.len() == 1 && roles[0] == "*";
    if !auth_required && !roles.is_empty() && !only_wildcard {
        warnings.push(ConfigWarning::RolesIgnored {
            endpoint: endpoint.to_string(),
        });
    }
    if auth_required && roles.is_empty() {
        warnings.push(ConfigWarning::UnreachableEndpoint {
            endpoint: endpoint.to_string(),
        });
    }
    Ok((roles, warnings))
}

/// Every query placeholder except `loggedId` must be provided by `available`.
pub fn check_params_match(sql_params: &[String], available: &[String], endpoint: &str) -> Result<(), ConfigError> {
    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    let missing: BTreeSet<&str> = sql_params
        .iter()
        .map(String::as_str)
        .filter(|p| *p != LOGGED_ID && !available.contains(p))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ConfigError::MissingParameters {
        endpoint: endpoint.to_string(),
        params: missing.into_iter().map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn verb_mismatch_is_a_warning() {
        let (op, warning) = check_method("SELECT * FROM users", &Method::POST, "POST /users").unwrap();
        assert_eq!(op, OperationKind::Read);
        assert!(matches!(warning, Some(ConfigWarning::VerbMismatch { expected: "GET", .. })));

        let (_, none) = check_method("  insert into users values ($a)", &Method::POST, "POST /users").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn unknown_keyword_is_fatal() {
        let err = check_method("MERGE INTO users USING x ON true", &Method::POST, "POST /users").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedOperation { .. }));
        assert!(infer_operation("", "GET /x").is_err());
    }

    #[test]
    fn allowed_roles_must_be_a_string_list() {
        assert!(matches!(
            check_auth_roles(true, &json!("admin"), "GET /x"),
            Err(ConfigError::InvalidAllowedRoles { .. })
        ));
        assert!(check_auth_roles(true, &json!(["admin", 3]), "GET /x").is_err());
        let (roles, warnings) = check_auth_roles(true, &json!(["admin", "editor"]), "GET /x").unwrap();
        assert_eq!(roles, names(&["admin", "editor"]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn roles_without_auth_warn() {
        let (_, warnings) = check_auth_roles(false, &json!(["admin"]), "GET /x").unwrap();
        assert_eq!(warnings, vec![ConfigWarning::RolesIgnored { endpoint: "GET /x".into() }]);

        let (_, wildcard) = check_auth_roles(false, &json!(["*"]), "GET /x").unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn auth_with_no_roles_warns_unreachable() {
        let (_, warnings) = check_auth_roles(true, &json!([]), "GET /x").unwrap();
        assert_eq!(warnings, vec![ConfigWarning::UnreachableEndpoint { endpoint: "GET /x".into() }]);
    }

    #[test]
    fn params_match_ignores_logged_id_and_reports_missing_sorted() {
        assert!(check_params_match(&names(&["id", "loggedId"]), &names(&["id"]), "GET /x").is_ok());
        let err = check_params_match(&names(&["z", "id", "a", "z"]), &names(&["id"]), "GET /x").unwrap_err();
        match err {
            ConfigError::MissingParameters { params, .. } => assert_eq!(params, names(&["a", "z"])),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn methods_are_case_insensitive_and_routable() {
        assert_eq!(parse_method("get", "/x").unwrap(), Method::GET);
        assert!(parse_method("CONNECT", "/x").is_err());
        assert!(parse_method("not a method", "/x").is_err());
    }
}
