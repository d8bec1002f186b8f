//! OpenAPI document model.
//!
//! Maps are `BTreeMap`s so that two generation passes over the same endpoints serialize
//! to identical bytes.

use crate::endpoint::HttpMethod;
use crate::error::Result;
use crate::schema::Schema;
use crate::security::SecurityScheme;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.0.1";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Info {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
        }
    }
}

impl Default for Info {
    fn default() -> Self {
        Self::new("Generated API", "1.0.0")
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Slot holding the operation for `method`. `CONNECT` has no slot in OpenAPI 3.0.
    fn slot_mut(&mut self, method: HttpMethod) -> Option<&mut Option<Operation>> {
        match method {
            HttpMethod::Get => Some(&mut self.get),
            HttpMethod::Put => Some(&mut self.put),
            HttpMethod::Post => Some(&mut self.post),
            HttpMethod::Delete => Some(&mut self.delete),
            HttpMethod::Options => Some(&mut self.options),
            HttpMethod::Head => Some(&mut self.head),
            HttpMethod::Patch => Some(&mut self.patch),
            HttpMethod::Trace => Some(&mut self.trace),
            HttpMethod::Connect => None,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
            HttpMethod::Connect => None,
        }
    }

    /// Operations present on this path, in method order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Parameters (path, query, header)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code, or `default`
    pub responses: BTreeMap<String, Response>,
}

/// Where a document parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Schema>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty()
    }
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDocument {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

impl ApiDocument {
    pub fn new(info: Info) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            paths: BTreeMap::new(),
            components: Components::default(),
        }
    }

    /// Adds `operation` under `path` and `method`.
    ///
    /// Returns `false` and leaves the document untouched when that pair is already
    /// present, or when the method has no OpenAPI slot.
    pub fn put_operation(&mut self, path: &str, method: HttpMethod, operation: Operation) -> bool {
        if method == HttpMethod::Connect {
            debug!("No OpenAPI slot for {} {}, skipping", method, path);
            return false;
        }
        let path_item = self.paths.entry(path.to_string()).or_default();
        let Some(slot) = path_item.slot_mut(method) else {
            return false;
        };
        if slot.is_some() {
            debug!("Operation {} {} already present", method, path);
            return false;
        }
        debug!("Adding operation {} {}", method, path);
        *slot = Some(operation);
        true
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.operation(method))
    }

    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations().count()).sum()
    }

    /// Serializes the document as JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Every schema node embedded in the document: parameters, bodies, responses and
    /// components.
    fn for_each_schema<'a>(&'a self, visit: &mut dyn FnMut(&'a Schema)) {
        for item in self.paths.values() {
            for (_, operation) in item.operations() {
                for parameter in &operation.parameters {
                    parameter.schema.walk(visit);
                }
                if let Some(body) = &operation.request_body {
                    for media in body.content.values() {
                        media.schema.walk(visit);
                    }
                }
                for response in operation.responses.values() {
                    for media in response.content.values() {
                        media.schema.walk(visit);
                    }
                }
            }
        }
        for schema in self.components.schemas.values() {
            schema.walk(visit);
        }
    }

    /// Names referenced with `$ref` that have no entry in `components.schemas`.
    pub fn unresolved_references(&self) -> BTreeSet<String> {
        let mut unresolved = BTreeSet::new();
        self.for_each_schema(&mut |schema| {
            if let Some(name) = schema.referenced_name() {
                if !self.components.schemas.contains_key(name) {
                    unresolved.insert(name.to_string());
                }
            }
        });
        unresolved
    }
}

impl Default for ApiDocument {
    fn default() -> Self {
        Self::new(Info::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn operation(id: &str) -> Operation {
        Operation {
            operation_id: Some(id.to_string()),
            ..Operation::default()
        }
    }

    #[test]
    fn test_new_document() {
        let document = ApiDocument::new(Info::new("My API", "2.0.0"));
        assert_eq!(document.openapi, "3.0.1");
        assert_eq!(document.info.title, "My API");
        assert!(document.paths.is_empty());
        assert!(document.components.is_empty());
    }

    #[test]
    fn test_put_operation_is_idempotent() {
        let mut document = ApiDocument::default();
        assert!(document.put_operation("/todos", HttpMethod::Get, operation("first")));
        assert!(!document.put_operation("/todos", HttpMethod::Get, operation("second")));
        assert!(document.put_operation("/todos", HttpMethod::Post, operation("create")));

        assert_eq!(document.operation_count(), 2);
        let get = document.operation("/todos", HttpMethod::Get).unwrap();
        assert_eq!(get.operation_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_connect_has_no_slot() {
        let mut document = ApiDocument::default();
        assert!(!document.put_operation("/tunnel", HttpMethod::Connect, operation("tunnel")));
        assert!(document.paths.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut document = ApiDocument::default();
        let mut responses = BTreeMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "OK".to_string(),
                content: BTreeMap::new(),
            },
        );
        document.put_operation(
            "/todos/{id}",
            HttpMethod::Get,
            Operation {
                operation_id: Some("get_todo".to_string()),
                parameters: vec![Parameter {
                    name: "id".to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: Schema::of_type("integer"),
                    description: None,
                }],
                responses,
                ..Operation::default()
            },
        );

        let json: serde_json::Value =
            serde_json::from_slice(&document.to_json_bytes().unwrap()).unwrap();
        let get = &json["paths"]["/todos/{id}"]["get"];
        assert_eq!(get["operationId"], "get_todo");
        assert_eq!(get["parameters"][0]["in"], "path");
        assert_eq!(get["responses"]["200"]["description"], "OK");
        assert!(get.get("requestBody").is_none());
        assert!(get["responses"]["200"].get("content").is_none());
        assert!(json.get("components").is_none());
    }

    #[test]
    fn test_unresolved_references() {
        let mut document = ApiDocument::default();
        let mut responses = BTreeMap::new();
        let mut content = BTreeMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: Schema::reference("Todo"),
            },
        );
        responses.insert(
            "200".to_string(),
            Response {
                description: "OK".to_string(),
                content,
            },
        );
        document.put_operation(
            "/todos",
            HttpMethod::Get,
            Operation {
                responses,
                ..Operation::default()
            },
        );
        assert_eq!(
            document.unresolved_references().into_iter().collect::<Vec<_>>(),
            vec!["Todo".to_string()]
        );

        document
            .components
            .schemas
            .insert("Todo".to_string(), Schema::of_type("object"));
        assert!(document.unresolved_references().is_empty());
    }
}
