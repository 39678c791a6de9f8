//! Load endpoint definitions from JSON files and resolve them into validated endpoint specs.

use crate::config::resolved::EndpointSpec;
use crate::config::types::EndpointDefinition;
use crate::config::validator::{check_auth_roles, check_method, check_params_match, parse_method};
use crate::error::{ConfigError, ConfigWarning};
use crate::sql::{
    check_route_syntax, ends_with_placeholder, extract_params, query_to_positional, route_to_axum, LOGGED_ID,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Validate one definition and flatten it for request-time use. Nothing is installed here.
pub fn resolve_endpoint(
    def: &EndpointDefinition,
    api_prefix: &str,
) -> Result<(EndpointSpec, Vec<ConfigWarning>), ConfigError> {
    let endpoint = def.label();
    tracing::debug!(endpoint = %endpoint, "setting up endpoint");

    check_route_syntax(&def.route).map_err(|reason| ConfigError::InvalidRoute {
        route: def.route.clone(),
        reason,
    })?;
    let method = parse_method(&def.method, &def.route)?;

    let mut warnings = Vec::new();
    let uses_identity = extract_params(&def.sql).iter().any(|p| p == LOGGED_ID);
    if uses_identity && !def.auth_required {
        warnings.push(ConfigWarning::NullableIdentity {
            endpoint: endpoint.clone(),
        });
    }

    let (operation, verb_warning) = check_method(&def.sql, &method, &endpoint)?;
    warnings.extend(verb_warning);

    let (allowed_roles, role_warnings) = check_auth_roles(def.auth_required, &def.allowed_roles, &endpoint)?;
    warnings.extend(role_warnings);

    let query_params = extract_params(&def.sql);
    let route_params = extract_params(&def.route);
    let body_params = def.request_body_params.clone();

    if operation.accepts_body() {
        let available: Vec<String> = route_params.iter().chain(body_params.iter()).cloned().collect();
        check_params_match(&query_params, &available, &endpoint)?;
    } else {
        check_params_match(&query_params, &route_params, &endpoint)?;
    }

    let full_route = format!("{}{}", api_prefix, def.route);
    let spec = EndpointSpec {
        method,
        route: def.route.clone(),
        axum_route: route_to_axum(&full_route),
        full_route,
        operation,
        query_params,
        route_params,
        body_params,
        positional_sql: query_to_positional(&def.sql),
        auth_required: def.auth_required,
        allowed_roles,
        description: def.description.clone(),
        uses_identity,
        single_resource: ends_with_placeholder(&def.route),
    };
    Ok((spec, warnings))
}

/// Read every `*.json` in `dir` and `dir/auto`, sorted by path. Each file maps endpoint names to definitions.
/// A missing directory yields no definitions.
pub async fn load_definitions(dir: &Path) -> Result<Vec<EndpointDefinition>, ConfigError> {
    let mut files = json_files(dir).await?;
    files.extend(json_files(&dir.join("auto")).await?);
    files.sort();

    let mut out = Vec::new();
    for path in files {
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let defs: BTreeMap<String, EndpointDefinition> =
            serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(file = %path.display(), count = defs.len(), "loaded endpoint definitions");
        out.extend(defs.into_values());
    }
    Ok(out)
}

async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ConfigError::Load(format!("{}: {}", dir.display(), e))),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperationKind;

    #[test]
    fn resolves_read_endpoint() {
        let def = EndpointDefinition::new("/users/$id", "GET", "SELECT * FROM users WHERE id = $id");
        let (spec, warnings) = resolve_endpoint(&def, "/api").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(spec.operation, OperationKind::Read);
        assert_eq!(spec.full_route, "/api/users/$id");
        assert_eq!(spec.axum_route, "/api/users/:id");
        assert_eq!(spec.positional_sql, "SELECT * FROM users WHERE id = $1");
        assert!(spec.single_resource);
        assert_eq!(spec.allowed_roles, vec!["*"]);
    }

    #[test]
    fn reads_cannot_use_body_params() {
        let def = EndpointDefinition::new("/users", "GET", "SELECT * FROM users WHERE name = $name").body_params(["name"]);
        assert!(matches!(resolve_endpoint(&def, ""), Err(ConfigError::MissingParameters { .. })));

        let del = EndpointDefinition::new("/users", "DELETE", "DELETE FROM users WHERE id = $id").body_params(["id"]);
        assert!(matches!(resolve_endpoint(&del, ""), Err(ConfigError::MissingParameters { .. })));
    }

    #[test]
    fn writes_use_route_and_body_params() {
        let def = EndpointDefinition::new("/users/$id", "PUT", "UPDATE users SET name = $name WHERE id = $id")
            .auth_required(true)
            .body_params(["name"]);
        let (spec, warnings) = resolve_endpoint(&def, "").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(spec.query_params, vec!["name", "id"]);
    }

    #[test]
    fn logged_id_needs_no_source_but_warns_without_auth() {
        let def = EndpointDefinition::new("/me", "GET", "SELECT * FROM users WHERE id = $loggedId");
        let (spec, warnings) = resolve_endpoint(&def, "").unwrap();
        assert!(spec.uses_identity);
        assert!(matches!(warnings.as_slice(), [ConfigWarning::NullableIdentity { .. }]));
    }

    #[tokio::test]
    async fn loads_user_and_auto_definitions() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir(dir.path().join("auto")).await.unwrap();
        tokio::fs::write(
            dir.path().join("custom.json"),
            r#"{"me": {"route": "/me", "method": "GET", "sql": "SELECT * FROM users WHERE id = $loggedId", "auth_required": true}}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("auto").join("users.json"),
            r#"{"getAll": {"route": "/users", "method": "GET", "sql": "SELECT * FROM users"}}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let defs = load_definitions(dir.path()).await.unwrap();
        let routes: Vec<&str> = defs.iter().map(|d| d.route.as_str()).collect();
        assert_eq!(routes.len(), 2);
        assert!(routes.contains(&"/me"));
        assert!(routes.contains(&"/users"));
    }

    #[tokio::test]
    async fn missing_dir_is_empty_and_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_definitions(&dir.path().join("nope")).await.unwrap().is_empty());

        tokio::fs::write(dir.path().join("broken.json"), "{not json").await.unwrap();
        assert!(matches!(load_definitions(dir.path()).await, Err(ConfigError::Load(_))));
    }
}
