//! Summary of every registered endpoint, served as JSON and as an OpenAPI document.

use crate::config::{EndpointSpec, OperationKind};
use crate::sql::route_to_openapi;
use axum::http::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::{
    ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Required, ResponseBuilder,
};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EndpointSummary {
    pub route: String,
    pub method: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub auth_required: bool,
    pub allowed_roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub request_body_params: Vec<String>,
}

impl EndpointSummary {
    pub fn from_spec(spec: &EndpointSpec) -> Self {
        EndpointSummary {
            route: spec.full_route.clone(),
            method: spec.method.to_string(),
            operation: spec.operation.to_string(),
            description: spec.description.clone(),
            auth_required: spec.auth_required,
            allowed_roles: spec.allowed_roles.clone(),
            request_body_params: spec.body_params.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ApiSummary {
    pub endpoints: Vec<EndpointSummary>,
}

fn http_method(method: &str) -> Option<HttpMethod> {
    Some(match Method::from_bytes(method.as_bytes()).ok()? {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::DELETE => HttpMethod::Delete,
        Method::PATCH => HttpMethod::Patch,
        Method::HEAD => HttpMethod::Head,
        Method::OPTIONS => HttpMethod::Options,
        Method::TRACE => HttpMethod::Trace,
        _ => return None,
    })
}

impl ApiSummary {
    pub fn push(&mut self, entry: EndpointSummary) {
        self.endpoints.push(entry);
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// OpenAPI 3 document: one operation per endpoint, path params from the route, body params as a form-or-JSON body.
    pub fn to_openapi(&self, title: &str, version: &str) -> OpenApi {
        let mut grouped: BTreeMap<String, Vec<&EndpointSummary>> = BTreeMap::new();
        for e in &self.endpoints {
            grouped.entry(route_to_openapi(&e.route)).or_default().push(e);
        }

        let mut paths = PathsBuilder::new();
        for (path, entries) in grouped {
            let mut item = PathItemBuilder::new();
            for e in entries {
                let Some(method) = http_method(&e.method) else {
                    continue;
                };
                item = item.operation(method, operation_for(e));
            }
            paths = paths.path(path, item.build());
        }

        OpenApiBuilder::new()
            .info(InfoBuilder::new().title(title).version(version).build())
            .paths(paths.build())
            .build()
    }
}

fn operation_for(e: &EndpointSummary) -> utoipa::openapi::path::Operation {
    let mut op = OperationBuilder::new()
        .summary(Some(format!("{} {}", e.operation, e.route)))
        .description(e.description.clone());
    for name in crate::sql::extract_params(&e.route) {
        op = op.parameter(
            ParameterBuilder::new()
                .name(name)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .build(),
        );
    }
    let is_read = e.operation == OperationKind::Read.to_string();
    if is_read {
        for control in ["_sort", "_order", "_limit", "_page"] {
            op = op.parameter(
                ParameterBuilder::new()
                    .name(control)
                    .parameter_in(ParameterIn::Query)
                    .required(Required::False)
                    .build(),
            );
        }
    }
    if !e.request_body_params.is_empty() {
        op = op.request_body(Some(
            RequestBodyBuilder::new()
                .description(Some(format!("fields: {}", e.request_body_params.join(", "))))
                .content("application/json", ContentBuilder::new().build())
                .content("application/x-www-form-urlencoded", ContentBuilder::new().build())
                .build(),
        ));
    }
    let ok = if is_read { "matching rows" } else { "affected row count" };
    op = op.response("200", ResponseBuilder::new().description(ok).build());
    if e.auth_required {
        op = op.response("401", ResponseBuilder::new().description("missing or rejected session token").build());
    }
    op.build()
}
