//! Parameter and response metadata extraction.
//!
//! For every handler parameter the extractor decides where the value comes from by
//! walking a fixed precedence chain:
//!
//! 1. explicit route, query, header, body and form bindings, in that order;
//! 2. service inference: context types, self-binding types and registered services
//!    are injected by the framework and never appear in the document;
//! 3. text-parseable types bind from the route when a placeholder has the same name,
//!    otherwise from the query string;
//! 4. uploaded files bind from the form;
//! 5. when one of the endpoint's methods carries no body, collections of
//!    text-parseable values bind from the query string and anything else is treated
//!    as a service; otherwise the parameter is the request body.
//!
//! Response metadata is merged from explicitly registered entries first, then from
//! declarative entries. The first entry for a status code wins.

use crate::classifier::{TypeClassifier, SEQUENCE_TYPES};
use crate::endpoint::{EndpointDescriptor, HandlerParameter, HttpMethod, ResponseMetadata, ServiceLookup};
use crate::error::{Error, Result};
use crate::route::{RouteConstraint, RoutePattern};
use crate::types::{TypeCatalog, TypeKind, TypeRef, FUTURE, INTO_RESPONSE};
use log::debug;
use serde_json::Value;

/// Framework context types that are always injected.
pub const SERVICE_TYPES: &[&str] = &[
    "Request",
    "Parts",
    "HeaderMap",
    "Extensions",
    "Extension",
    "State",
    "Method",
    "Uri",
    "ConnectInfo",
    "CancellationToken",
    "HttpRequest",
    "HttpResponse",
    "RequestContext",
    "ClaimsPrincipal",
];

/// Uploaded file types.
pub const FILE_TYPES: &[&str] = &["UploadedFile", "FormFile", "Multipart"];

/// Uploaded file collections.
pub const FILE_COLLECTION_TYPES: &[&str] = &["FormFileCollection"];

/// Response types whose body shape cannot be inferred.
pub const RESULT_WRAPPER_TYPES: &[&str] = &[INTO_RESPONSE, "Response", "HttpResponse", "Responder"];

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Where a parameter value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    Path,
    Query,
    Header,
    Body,
    FormFile,
    Service,
}

/// A handler parameter as it will be documented.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescription {
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Type shown in the document; custom text-parsed types are shown as strings
    pub display_type: TypeRef,
    pub source: ParameterSource,
    pub required: bool,
    /// Constraints of the matching route placeholder
    pub constraints: Vec<RouteConstraint>,
    pub default_value: Option<Value>,
    /// Request content types, for bodies synthesized from accepts metadata
    pub content_types: Vec<String>,
}

/// One documented response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescription {
    pub status: u16,
    pub ty: TypeRef,
    pub content_types: Vec<String>,
    pub is_default: bool,
}

/// Everything extracted from one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointDescription {
    pub route: RoutePattern,
    pub methods: Vec<HttpMethod>,
    /// Parameters in declaration order, services excluded
    pub parameters: Vec<ParameterDescription>,
    /// Responses in merge order, one per status code
    pub responses: Vec<ResponseDescription>,
    /// Content types declared by accepts metadata
    pub request_formats: Vec<String>,
}

impl EndpointDescription {
    pub fn body(&self) -> Option<&ParameterDescription> {
        self.parameters
            .iter()
            .find(|p| p.source == ParameterSource::Body)
    }

    pub fn form_files(&self) -> impl Iterator<Item = &ParameterDescription> {
        self.parameters
            .iter()
            .filter(|p| p.source == ParameterSource::FormFile)
    }

    pub fn response(&self, status: u16) -> Option<&ResponseDescription> {
        self.responses.iter().find(|r| r.status == status)
    }
}

/// Extracts parameter and response metadata from endpoint descriptors.
pub struct MetadataExtractor<'a> {
    catalog: &'a TypeCatalog,
    classifier: &'a TypeClassifier,
    services: &'a dyn ServiceLookup,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(
        catalog: &'a TypeCatalog,
        classifier: &'a TypeClassifier,
        services: &'a dyn ServiceLookup,
    ) -> Self {
        Self {
            catalog,
            classifier,
            services,
        }
    }

    /// Describes one endpoint.
    ///
    /// Fails with [`Error::UnnamedParameter`] when a parameter has no name; callers
    /// skip that endpoint and keep going.
    pub fn describe(&self, endpoint: &EndpointDescriptor) -> Result<EndpointDescription> {
        debug!("Extracting metadata for route: {}", endpoint.route);
        let route = RoutePattern::parse(&endpoint.route);
        let disable_inferred_body = endpoint.disables_inferred_body();

        let mut parameters = Vec::new();
        let mut has_body_or_form_file = false;
        for parameter in &endpoint.parameters {
            let Some(description) = self.describe_parameter(parameter, &route, disable_inferred_body)?
            else {
                continue;
            };
            has_body_or_form_file |= matches!(
                description.source,
                ParameterSource::Body | ParameterSource::FormFile
            );
            parameters.push(description);
        }

        let mut request_formats = Vec::new();
        if let Some(accepts) = &endpoint.accepts {
            if !has_body_or_form_file {
                let ty = accepts.request_type.clone().unwrap_or_else(TypeRef::void);
                debug!("Adding body parameter from accepts metadata: {}", ty);
                parameters.push(ParameterDescription {
                    name: ty.name.clone(),
                    display_type: ty.clone(),
                    ty,
                    source: ParameterSource::Body,
                    required: !accepts.optional,
                    constraints: Vec::new(),
                    default_value: None,
                    content_types: accepts.content_types.clone(),
                });
            }
            request_formats = accepts.content_types.clone();
        }

        Ok(EndpointDescription {
            route,
            methods: endpoint.methods.clone(),
            parameters,
            responses: self.describe_responses(endpoint),
            request_formats,
        })
    }

    /// Describes one parameter, or `None` for service parameters.
    pub fn describe_parameter(
        &self,
        parameter: &HandlerParameter,
        route: &RoutePattern,
        disable_inferred_body: bool,
    ) -> Result<Option<ParameterDescription>> {
        let Some(declared_name) = parameter.name.as_deref() else {
            return Err(Error::UnnamedParameter {
                route: route.raw().to_string(),
                type_name: parameter.ty.to_string(),
            });
        };

        let (source, name, allow_empty, display_type) =
            self.source_and_name(parameter, declared_name, route, disable_inferred_body);
        if source == ParameterSource::Service {
            debug!("Parameter {} is injected, not documented", declared_name);
            return Ok(None);
        }

        let placeholder = match source {
            ParameterSource::Path => route.parameter(&name),
            _ => None,
        };
        let optional = parameter.default_value.is_some()
            || parameter.ty.nullable
            || allow_empty
            || (source == ParameterSource::Path && placeholder.is_some_and(|p| p.optional));
        let default_value = parameter.default_value.clone().or_else(|| {
            placeholder
                .and_then(|p| p.default.as_ref())
                .map(|d| Value::String(d.clone()))
        });

        Ok(Some(ParameterDescription {
            name,
            ty: parameter.ty.clone(),
            display_type,
            source,
            required: !optional,
            constraints: placeholder.map(|p| p.constraints.clone()).unwrap_or_default(),
            default_value,
            content_types: Vec::new(),
        }))
    }

    fn source_and_name(
        &self,
        parameter: &HandlerParameter,
        declared_name: &str,
        route: &RoutePattern,
        disable_inferred_body: bool,
    ) -> (ParameterSource, String, bool, TypeRef) {
        let declared = || parameter.ty.clone();
        let rename = |name: &Option<String>| name.clone().unwrap_or_else(|| declared_name.to_string());

        if let Some(source) = parameter.route_source() {
            return (ParameterSource::Path, rename(&source.name), false, declared());
        }
        if let Some(source) = parameter.query_source() {
            return (ParameterSource::Query, rename(&source.name), false, declared());
        }
        if let Some(source) = parameter.header_source() {
            return (ParameterSource::Header, rename(&source.name), false, declared());
        }
        if let Some(source) = parameter.body_source() {
            return (
                ParameterSource::Body,
                declared_name.to_string(),
                source.allow_empty,
                declared(),
            );
        }
        if let Some(source) = parameter.form_source() {
            return (ParameterSource::FormFile, rename(&source.name), false, declared());
        }

        let name = declared_name.to_string();
        if self.is_service(parameter) {
            return (ParameterSource::Service, name, false, declared());
        }
        if self.classifier.is_text_parseable(&parameter.ty, self.catalog) {
            let display = self.display_type(&parameter.ty);
            if route.parameter(declared_name).is_some() {
                return (ParameterSource::Path, name, false, display);
            }
            return (ParameterSource::Query, name, false, display);
        }
        if is_file(&parameter.ty) {
            return (ParameterSource::FormFile, name, false, declared());
        }
        if disable_inferred_body {
            if self.is_parseable_sequence(&parameter.ty) {
                return (ParameterSource::Query, name, false, declared());
            }
            debug!(
                "Inferred body disabled, treating {} as injected",
                parameter.ty
            );
            return (ParameterSource::Service, name, false, declared());
        }
        (ParameterSource::Body, name, false, declared())
    }

    fn is_service(&self, parameter: &HandlerParameter) -> bool {
        let ty = &parameter.ty;
        parameter.from_services
            || SERVICE_TYPES.contains(&ty.name.as_str())
            || self
                .catalog
                .get(&ty.name)
                .is_some_and(|d| d.capabilities.async_bind)
            || self.services.is_service(ty)
    }

    fn is_parseable_sequence(&self, ty: &TypeRef) -> bool {
        SEQUENCE_TYPES.contains(&ty.name.as_str())
            && ty
                .first_arg()
                .is_some_and(|element| self.classifier.is_text_parseable(element, self.catalog))
    }

    /// Custom text-parsed types are documented as strings.
    fn display_type(&self, ty: &TypeRef) -> TypeRef {
        if self.classifier.table().get(&ty.name).is_some() || !self.catalog.contains(&ty.name) {
            return ty.clone();
        }
        if matches!(
            self.catalog.get(&ty.name).map(|d| &d.kind),
            Some(TypeKind::Enum(_))
        ) {
            return ty.clone();
        }
        TypeRef {
            nullable: ty.nullable,
            ..TypeRef::named("String")
        }
    }

    /// Effective response type of the handler: futures unwrapped, result wrappers
    /// replaced by `()`.
    pub fn response_type(&self, returns: &TypeRef) -> TypeRef {
        let mut ty = returns.clone();
        while ty.name == FUTURE {
            ty = ty.first_arg().cloned().unwrap_or_else(TypeRef::void);
        }
        let wrapper = RESULT_WRAPPER_TYPES.contains(&ty.name.as_str())
            || self
                .catalog
                .get(&ty.name)
                .is_some_and(|d| d.capabilities.result_wrapper);
        if wrapper {
            debug!("Response type {} cannot be inferred", ty);
            return TypeRef::void();
        }
        ty
    }

    pub fn describe_responses(&self, endpoint: &EndpointDescriptor) -> Vec<ResponseDescription> {
        let response_type = self.response_type(&endpoint.returns);

        let metadata = endpoint
            .produces
            .iter()
            .map(|entry| self.explicit_response(entry, &response_type))
            .chain(
                endpoint
                    .response_attributes
                    .iter()
                    .map(|entry| self.declared_response(entry, &response_type)),
            );

        let mut responses: Vec<ResponseDescription> = Vec::new();
        for response in metadata {
            if responses.iter().any(|r| r.status == response.status) {
                debug!("Response {} already described, keeping the first", response.status);
                continue;
            }
            responses.push(response);
        }

        if responses.is_empty() {
            responses.push(ResponseDescription {
                status: 200,
                content_types: self.default_content_types(&response_type),
                ty: response_type,
                is_default: false,
            });
        }
        responses
    }

    /// Explicitly registered entries without a type take the handler's type for
    /// 200 and 201 only.
    fn explicit_response(&self, entry: &ResponseMetadata, response_type: &TypeRef) -> ResponseDescription {
        let ty = match &entry.ty {
            Some(ty) if !ty.is_void() => ty.clone(),
            _ if matches!(entry.status, 200 | 201) => response_type.clone(),
            _ => TypeRef::void(),
        };
        self.response_description(entry, ty)
    }

    /// Declarative entries without a type take the handler's type for success statuses.
    fn declared_response(&self, entry: &ResponseMetadata, response_type: &TypeRef) -> ResponseDescription {
        let ty = match &entry.ty {
            Some(ty) if !ty.is_void() => ty.clone(),
            _ if entry.status < 300 => response_type.clone(),
            _ => TypeRef::void(),
        };
        self.response_description(entry, ty)
    }

    fn response_description(&self, entry: &ResponseMetadata, ty: TypeRef) -> ResponseDescription {
        let content_types = if entry.content_types.is_empty() {
            self.default_content_types(&ty)
        } else {
            entry.content_types.clone()
        };
        ResponseDescription {
            status: entry.status,
            ty,
            content_types,
            is_default: entry.is_default,
        }
    }

    fn default_content_types(&self, ty: &TypeRef) -> Vec<String> {
        if ty.is_void() {
            Vec::new()
        } else if ty.name == "String" || ty.name == "str" {
            vec![TEXT_CONTENT_TYPE.to_string()]
        } else {
            vec![JSON_CONTENT_TYPE.to_string()]
        }
    }
}

/// Uploaded files and file collections.
pub fn is_file(ty: &TypeRef) -> bool {
    let name = ty.name.as_str();
    FILE_TYPES.contains(&name)
        || FILE_COLLECTION_TYPES.contains(&name)
        || (SEQUENCE_TYPES.contains(&name)
            && ty
                .first_arg()
                .is_some_and(|element| FILE_TYPES.contains(&element.name.as_str())))
}
