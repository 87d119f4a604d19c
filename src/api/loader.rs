//! Swagger 2.0 / OpenAPI 3.x document loading.
//!
//! # Responsibilities
//! - Read a YAML or JSON API document from disk
//! - Walk `paths` in declaration order and build one descriptor per operation
//! - Collect producible media types, 200 response headers and examples
//! - Reject documents that would register the same route twice
//!
//! # Design Decisions
//! - Documents are walked as `serde_json::Value`; schemas are not validated
//! - YAML keys are stringified (`200:` and `'200':` are the same response)
//! - Only local `$ref`s (`#/...`) are followed; remote references are left as is

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::api::endpoint::{EndpointDescriptor, ExampleSet, HttpMethod};

/// Name given to an example that is declared without one.
pub const DEFAULT_EXAMPLE_NAME: &str = "default";

/// Error type for API document loading.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("cannot read API document {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not a Swagger 2.0 or OpenAPI 3 document: {0}")]
    UnsupportedDocument(String),

    #[error("endpoint {method} {uri} is declared more than once")]
    DuplicateEndpoint { method: HttpMethod, uri: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Swagger2,
    OpenApi3,
}

/// Load the endpoint descriptors of the API document at `path`.
pub fn load_api(path: &Path) -> Result<Vec<EndpointDescriptor>, ApiError> {
    let content = std::fs::read_to_string(path).map_err(|source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let endpoints = if is_json {
        load_api_from_json(&content)?
    } else {
        load_api_from_yaml(&content)?
    };

    tracing::info!(
        path = %path.display(),
        endpoints = endpoints.len(),
        "API document loaded"
    );
    Ok(endpoints)
}

/// Load endpoint descriptors from YAML text.
pub fn load_api_from_yaml(content: &str) -> Result<Vec<EndpointDescriptor>, ApiError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    load_api_from_value(&yaml_to_json(yaml))
}

/// Load endpoint descriptors from JSON text.
pub fn load_api_from_json(content: &str) -> Result<Vec<EndpointDescriptor>, ApiError> {
    let value: Value = serde_json::from_str(content)?;
    load_api_from_value(&value)
}

/// Build endpoint descriptors from an already parsed document.
pub fn load_api_from_value(doc: &Value) -> Result<Vec<EndpointDescriptor>, ApiError> {
    let flavor = detect_flavor(doc)?;
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::UnsupportedDocument("missing `paths` object".into()))?;

    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();

    for (uri, item) in paths {
        let Some(item) = item.as_object() else { continue };
        for (key, operation) in item {
            let Some(method) = HttpMethod::parse(key) else { continue };
            let endpoint = build_endpoint(doc, flavor, uri, method, operation);

            if !seen.insert((method, endpoint.route_shape())) {
                return Err(ApiError::DuplicateEndpoint {
                    method,
                    uri: uri.clone(),
                });
            }
            endpoints.push(endpoint);
        }
    }

    tracing::debug!(
        endpoints = ?endpoints.iter().map(|e| (e.method.as_str(), e.jsf_uri.as_str())).collect::<Vec<_>>(),
        "Endpoint map"
    );
    Ok(endpoints)
}

fn detect_flavor(doc: &Value) -> Result<Flavor, ApiError> {
    if let Some(version) = doc.get("swagger").and_then(Value::as_str) {
        if version.starts_with('2') {
            return Ok(Flavor::Swagger2);
        }
        return Err(ApiError::UnsupportedDocument(format!("swagger {}", version)));
    }
    if let Some(version) = doc.get("openapi").and_then(Value::as_str) {
        if version.starts_with('3') {
            return Ok(Flavor::OpenApi3);
        }
        return Err(ApiError::UnsupportedDocument(format!("openapi {}", version)));
    }
    Err(ApiError::UnsupportedDocument(
        "neither `swagger` nor `openapi` version field present".into(),
    ))
}

fn build_endpoint(
    doc: &Value,
    flavor: Flavor,
    uri: &str,
    method: HttpMethod,
    operation: &Value,
) -> EndpointDescriptor {
    let mut endpoint = EndpointDescriptor::new(method, uri);
    endpoint.operation_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .map(str::to_string);
    endpoint.summary = operation
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    let success = operation
        .get("responses")
        .and_then(|r| r.get("200"))
        .map(|r| resolve_ref(doc, r));

    match flavor {
        Flavor::Swagger2 => {
            endpoint.produces = media_types(operation.get("produces").or_else(|| doc.get("produces")));
            endpoint.consumes = media_types(operation.get("consumes").or_else(|| doc.get("consumes")));
            if let Some(examples) = success.and_then(|r| r.get("examples")).and_then(Value::as_object) {
                for (media_type, value) in examples {
                    let mut set = ExampleSet::new();
                    set.insert(DEFAULT_EXAMPLE_NAME.to_string(), value.clone());
                    endpoint.response.examples.insert(media_type.clone(), set);
                }
            }
        }
        Flavor::OpenApi3 => {
            endpoint.consumes = operation
                .get("requestBody")
                .map(|b| resolve_ref(doc, b))
                .and_then(|b| b.get("content"))
                .and_then(Value::as_object)
                .map(|content| content.keys().cloned().collect())
                .unwrap_or_default();
            if let Some(content) = success.and_then(|r| r.get("content")).and_then(Value::as_object) {
                for (media_type, media) in content {
                    endpoint.produces.push(media_type.clone());
                    let set = openapi_examples(doc, media);
                    if !set.is_empty() {
                        endpoint.response.examples.insert(media_type.clone(), set);
                    }
                }
            }
        }
    }

    if let Some(headers) = success.and_then(|r| r.get("headers")).and_then(Value::as_object) {
        for (name, header) in headers {
            if let Some(value) = header_value(resolve_ref(doc, header)) {
                endpoint
                    .response
                    .headers
                    .insert(name.to_ascii_lowercase(), value);
            }
        }
    }

    endpoint
}

fn media_types(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn openapi_examples(doc: &Value, media: &Value) -> ExampleSet {
    let mut set = ExampleSet::new();
    if let Some(examples) = media.get("examples").and_then(Value::as_object) {
        for (name, example) in examples {
            if let Some(value) = resolve_ref(doc, example).get("value") {
                set.insert(name.clone(), value.clone());
            }
        }
    }
    if set.is_empty() {
        if let Some(example) = media.get("example") {
            set.insert(DEFAULT_EXAMPLE_NAME.to_string(), example.clone());
        }
    }
    set
}

/// A header's concrete value: `example`, then `default`, then the schema's.
fn header_value(header: &Value) -> Option<String> {
    let candidates = [
        header.get("example"),
        header.get("default"),
        header.get("schema").and_then(|s| s.get("example")),
        header.get("schema").and_then(|s| s.get("default")),
    ];
    candidates.into_iter().flatten().find_map(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Follow a local `$ref`, returning the value itself when it is not one.
fn resolve_ref<'a>(doc: &'a Value, value: &'a Value) -> &'a Value {
    value
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| doc.pointer(pointer))
        .unwrap_or(value)
}

/// Convert a YAML tree into JSON, stringifying non-string mapping keys.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SWAGGER: &str = r#"
swagger: "2.0"
info:
  title: Test API
  version: "1.0"
produces:
  - application/json
paths:
  /monitoring/isAlive:
    get:
      operationId: monitoring.isAlive
      responses:
        200:
          description: alive
          headers:
            X-Api-Version:
              type: string
              default: "1.0"
          examples:
            application/json:
              status: OK
  /currencies/{currency}:
    x-owner: payments
    get:
      produces:
        - application/json
        - text/plain
      responses:
        '200':
          description: a currency
    put:
      responses:
        '200':
          description: updated
"#;

    const OPENAPI: &str = r#"
openapi: 3.0.0
info:
  title: Test API
  version: "1.0"
components:
  examples:
    eur:
      value: { code: EUR }
paths:
  /currencies:
    post:
      requestBody:
        content:
          application/json: {}
      responses:
        200:
          description: created
          content:
            application/json:
              examples:
                euro:
                  $ref: '#/components/examples/eur'
                dollar:
                  value: { code: USD }
            text/plain:
              example: EUR
"#;

    #[test]
    fn test_swagger2_document() {
        let endpoints = load_api_from_yaml(SWAGGER).unwrap();
        assert_eq!(endpoints.len(), 3);

        let alive = &endpoints[0];
        assert_eq!(alive.method, HttpMethod::Get);
        assert_eq!(alive.uri, "/monitoring/isAlive");
        assert_eq!(alive.operation_id.as_deref(), Some("monitoring.isAlive"));
        assert_eq!(alive.produces, vec!["application/json"]);
        assert_eq!(
            alive.examples_for("application/json").unwrap()[DEFAULT_EXAMPLE_NAME],
            json!({ "status": "OK" })
        );
        assert_eq!(
            alive.response.headers.get("x-api-version").map(String::as_str),
            Some("1.0")
        );

        let currency = &endpoints[1];
        assert_eq!(currency.jsf_uri, "/currencies/{currency}");
        assert_eq!(currency.operation_id, None);
        assert_eq!(currency.produces, vec!["application/json", "text/plain"]);
        assert!(currency.response.examples.is_empty());

        assert_eq!(endpoints[2].method, HttpMethod::Put);
    }

    #[test]
    fn test_openapi3_document() {
        let endpoints = load_api_from_yaml(OPENAPI).unwrap();
        assert_eq!(endpoints.len(), 1);

        let post = &endpoints[0];
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.consumes, vec!["application/json"]);
        assert_eq!(post.produces, vec!["application/json", "text/plain"]);

        let json_examples = post.examples_for("application/json").unwrap();
        let names: Vec<&String> = json_examples.keys().collect();
        assert_eq!(names, vec!["euro", "dollar"]);
        assert_eq!(json_examples["euro"], json!({ "code": "EUR" }));
        assert_eq!(
            post.examples_for("text/plain").unwrap()[DEFAULT_EXAMPLE_NAME],
            json!("EUR")
        );
    }

    #[test]
    fn test_json_document() {
        let doc = json!({
            "swagger": "2.0",
            "paths": { "/x": { "delete": { "responses": {} } } }
        });
        let endpoints = load_api_from_json(&doc.to_string()).unwrap();
        assert_eq!(endpoints[0].method, HttpMethod::Delete);
        assert!(endpoints[0].produces.is_empty());
    }

    #[test]
    fn test_rejects_unknown_document() {
        let err = load_api_from_value(&json!({ "paths": {} })).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedDocument(_)));

        let err = load_api_from_value(&json!({ "openapi": "4.0", "paths": {} })).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedDocument(_)));
    }

    #[test]
    fn test_rejects_conflicting_routes() {
        let doc = json!({
            "openapi": "3.0.3",
            "paths": {
                "/users/{id}": { "get": {} },
                "/users/{userId}": { "get": {} }
            }
        });
        let err = load_api_from_value(&doc).unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEndpoint { method: HttpMethod::Get, .. }));
    }

    #[test]
    fn test_load_api_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yml");
        std::fs::write(&path, SWAGGER).unwrap();
        assert_eq!(load_api(&path).unwrap().len(), 3);

        let missing = dir.path().join("missing.yml");
        assert!(matches!(load_api(&missing), Err(ApiError::Io { .. })));
    }
}
