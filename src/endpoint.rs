//! Endpoint descriptors: what the routing layer tells us about each handler.
//!
//! An [`EndpointDescriptor`] is the input contract of the engine. It carries the route
//! pattern, the HTTP methods, the handler's parameters and return type, plus any
//! explicit metadata attached at registration time. Descriptors come from an
//! [`EndpointSource`]; the manifest loader is one such source.

use crate::document::Operation;
use crate::error::{Error, Result};
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP methods an endpoint can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
    Connect,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
        HttpMethod::Connect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }

    /// Methods whose requests are not expected to carry a body.
    pub fn disables_inferred_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::Get
                | HttpMethod::Delete
                | HttpMethod::Head
                | HttpMethod::Options
                | HttpMethod::Trace
                | HttpMethod::Connect
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown HTTP method: {}", s)))
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Explicit route/query/header/form binding, optionally renamed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamedSource {
    pub name: Option<String>,
}

/// Explicit body binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BodySource {
    /// An empty body is accepted, so the body is not required
    pub allow_empty: bool,
}

/// One argument of a handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandlerParameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub from_route: Option<NamedSource>,
    #[serde(default)]
    pub from_query: Option<NamedSource>,
    #[serde(default)]
    pub from_header: Option<NamedSource>,
    #[serde(default)]
    pub from_body: Option<BodySource>,
    #[serde(default)]
    pub from_form: Option<NamedSource>,
    #[serde(default)]
    pub from_services: bool,
    /// Declared default value; a parameter with a default is optional
    #[serde(default, rename = "default")]
    pub default_value: Option<Value>,
}

impl HandlerParameter {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::unnamed(ty)
        }
    }

    /// A parameter whose name is not known.
    pub fn unnamed(ty: TypeRef) -> Self {
        Self {
            name: None,
            ty,
            from_route: None,
            from_query: None,
            from_header: None,
            from_body: None,
            from_form: None,
            from_services: false,
            default_value: None,
        }
    }

    /// Binds from a route placeholder, named `placeholder` when given.
    pub fn in_route(mut self, placeholder: Option<&str>) -> Self {
        self.from_route = Some(NamedSource {
            name: placeholder.map(str::to_string),
        });
        self
    }

    pub fn in_query(mut self) -> Self {
        self.from_query = Some(NamedSource::default());
        self
    }

    /// Binds from a header, named `header` when given.
    pub fn in_header(mut self, header: Option<&str>) -> Self {
        self.from_header = Some(NamedSource {
            name: header.map(str::to_string),
        });
        self
    }

    pub fn in_body(mut self, allow_empty: bool) -> Self {
        self.from_body = Some(BodySource { allow_empty });
        self
    }

    pub fn in_form(mut self) -> Self {
        self.from_form = Some(NamedSource::default());
        self
    }

    pub fn as_service(mut self) -> Self {
        self.from_services = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn route_source(&self) -> Option<&NamedSource> {
        self.from_route.as_ref()
    }

    pub fn query_source(&self) -> Option<&NamedSource> {
        self.from_query.as_ref()
    }

    pub fn header_source(&self) -> Option<&NamedSource> {
        self.from_header.as_ref()
    }

    pub fn body_source(&self) -> Option<&BodySource> {
        self.from_body.as_ref()
    }

    pub fn form_source(&self) -> Option<&NamedSource> {
        self.from_form.as_ref()
    }
}

/// Request body declared at registration time, used when no parameter binds the body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AcceptsMetadata {
    #[serde(rename = "type")]
    pub request_type: Option<TypeRef>,
    pub content_types: Vec<String>,
    /// The body may be omitted
    pub optional: bool,
}

/// One declared response of an endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseMetadata {
    pub status: u16,
    /// Response type; absent or `()` means "same as the handler's return type"
    #[serde(default, rename = "type")]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub content_types: Vec<String>,
    /// Emitted as the `default` response
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

impl ResponseMetadata {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ty: None,
            content_types: Vec::new(),
            is_default: false,
        }
    }

    pub fn with_type(mut self, ty: TypeRef) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_content_types(mut self, content_types: &[&str]) -> Self {
        self.content_types = content_types.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Callback that may replace the generated operation of one endpoint.
/// Returning `None` keeps the generated operation.
pub type OperationCustomizer = Arc<dyn Fn(&Operation) -> Option<Operation> + Send + Sync>;

/// Everything known about one endpoint.
#[derive(Clone, Deserialize)]
pub struct EndpointDescriptor {
    /// Route pattern, e.g. `/todos/{id:int}` or `/todos/:id`
    pub route: String,
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    /// Operation id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Grouping names, emitted as operation tags
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<HandlerParameter>,
    /// Declared return type of the handler
    #[serde(default = "TypeRef::void")]
    pub returns: TypeRef,
    #[serde(default)]
    pub accepts: Option<AcceptsMetadata>,
    /// Response metadata registered explicitly on the endpoint
    #[serde(default)]
    pub produces: Vec<ResponseMetadata>,
    /// Response metadata declared on the handler itself
    #[serde(default)]
    pub response_attributes: Vec<ResponseMetadata>,
    #[serde(default)]
    pub exclude_from_description: bool,
    #[serde(skip)]
    pub customizer: Option<OperationCustomizer>,
}

impl EndpointDescriptor {
    pub fn new(route: &str, methods: &[HttpMethod]) -> Self {
        Self {
            route: route.to_string(),
            methods: methods.to_vec(),
            name: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            returns: TypeRef::void(),
            accepts: None,
            produces: Vec::new(),
            response_attributes: Vec::new(),
            exclude_from_description: false,
            customizer: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_parameter(mut self, parameter: HandlerParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.returns = ty;
        self
    }

    pub fn with_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&Operation) -> Option<Operation> + Send + Sync + 'static,
    {
        self.customizer = Some(Arc::new(customizer));
        self
    }

    /// True if any method of this endpoint disables body inference.
    pub fn disables_inferred_body(&self) -> bool {
        self.methods.iter().any(HttpMethod::disables_inferred_body)
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("route", &self.route)
            .field("methods", &self.methods)
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("returns", &self.returns)
            .field("accepts", &self.accepts)
            .field("produces", &self.produces)
            .field("response_attributes", &self.response_attributes)
            .field("exclude_from_description", &self.exclude_from_description)
            .field("customizer", &self.customizer.is_some())
            .finish_non_exhaustive()
    }
}

/// Supplies the endpoints to document.
pub trait EndpointSource: Send + Sync {
    fn endpoints(&self) -> Vec<EndpointDescriptor>;
}

impl EndpointSource for Vec<EndpointDescriptor> {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        self.clone()
    }
}

/// Answers whether a type is resolved from the service container.
pub trait ServiceLookup: Send + Sync {
    fn is_service(&self, ty: &TypeRef) -> bool;
}

/// A lookup that knows no services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoServices;

impl ServiceLookup for NoServices {
    fn is_service(&self, _ty: &TypeRef) -> bool {
        false
    }
}

/// Services registered by simple type name.
#[derive(Debug, Clone, Default)]
pub struct ServiceNames {
    names: HashSet<String>,
}

impl ServiceNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ServiceLookup for ServiceNames {
    fn is_service(&self, ty: &TypeRef) -> bool {
        self.names.contains(&ty.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("FETCH".parse::<HttpMethod>().is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_any_bodiless_method_disables_inference() {
        let endpoint = EndpointDescriptor::new("/todos", &[HttpMethod::Post, HttpMethod::Get]);
        assert!(endpoint.disables_inferred_body());
        let endpoint = EndpointDescriptor::new("/todos", &[HttpMethod::Post, HttpMethod::Put]);
        assert!(!endpoint.disables_inferred_body());
    }

    #[test]
    fn test_deserialize_endpoint() {
        let yaml = r#"
route: /todos/{id}
methods: [get, DELETE]
name: get_todo
parameters:
  - name: id
    type: i32
    from_route: {}
  - type: TodoDb
    from_services: true
returns: Option<Todo>
produces:
  - status: 404
"#;
        let endpoint: EndpointDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(endpoint.methods, vec![HttpMethod::Get, HttpMethod::Delete]);
        assert_eq!(endpoint.parameters.len(), 2);
        assert_eq!(endpoint.parameters[0].from_route, Some(NamedSource::default()));
        assert!(endpoint.parameters[1].name.is_none());
        assert!(endpoint.returns.nullable);
        assert_eq!(endpoint.produces[0].status, 404);
        assert!(endpoint.customizer.is_none());
    }

    #[test]
    fn test_service_names() {
        let services = ServiceNames::new(["TodoDb", "Clock"]);
        assert!(services.is_service(&TypeRef::named("db::TodoDb")));
        assert!(!services.is_service(&TypeRef::named("Todo")));
        assert!(!NoServices.is_service(&TypeRef::named("TodoDb")));
    }
}
