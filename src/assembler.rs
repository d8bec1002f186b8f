//! Document assembly.
//!
//! [`DocumentAssembler`] turns a list of endpoint descriptors into one [`ApiDocument`]:
//! it extracts metadata per endpoint, compiles every parameter, body and response type
//! against a fresh [`SchemaRegistry`], adds one operation per (path, method), then
//! injects security schemes and runs the document customizer.
//!
//! [`DocumentService`] owns the inputs and serializes generation passes. Readers only
//! ever see a document that was completely built.

use crate::classifier::{TypeClassifier, SEQUENCE_TYPES};
use crate::document::{
    ApiDocument, Info, MediaType, Operation, Parameter, ParameterLocation, RequestBody, Response,
};
use crate::endpoint::{EndpointDescriptor, EndpointSource, NoServices, ServiceLookup};
use crate::extractor::{
    is_file, EndpointDescription, MetadataExtractor, ParameterDescription, ParameterSource,
    JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};
use crate::schema::{Schema, SchemaRegistry};
use crate::schema_compiler::SchemaCompiler;
use crate::security::{inject_security_schemes, AuthScheme};
use crate::types::TypeCatalog;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Callback that may replace the finished document. Returning `None` keeps it.
pub type DocumentCustomizer = Arc<dyn Fn(&ApiDocument) -> Option<ApiDocument> + Send + Sync>;

/// Document-wide settings of a generation pass.
#[derive(Clone, Default)]
pub struct DocumentOptions {
    pub info: Info,
    pub auth_schemes: Vec<AuthScheme>,
    pub customizer: Option<DocumentCustomizer>,
}

impl DocumentOptions {
    pub fn new(info: Info) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub fn with_auth_schemes(mut self, auth_schemes: Vec<AuthScheme>) -> Self {
        self.auth_schemes = auth_schemes;
        self
    }

    pub fn with_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&ApiDocument) -> Option<ApiDocument> + Send + Sync + 'static,
    {
        self.customizer = Some(Arc::new(customizer));
        self
    }
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("info", &self.info)
            .field("auth_schemes", &self.auth_schemes)
            .field("customizer", &self.customizer.is_some())
            .finish()
    }
}

/// Builds one document from a set of endpoints.
pub struct DocumentAssembler<'a> {
    catalog: &'a TypeCatalog,
    classifier: &'a TypeClassifier,
    services: &'a dyn ServiceLookup,
    options: &'a DocumentOptions,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(
        catalog: &'a TypeCatalog,
        classifier: &'a TypeClassifier,
        services: &'a dyn ServiceLookup,
        options: &'a DocumentOptions,
    ) -> Self {
        Self {
            catalog,
            classifier,
            services,
            options,
        }
    }

    /// Runs one generation pass.
    ///
    /// Endpoints that cannot be described are logged and left out; they never abort
    /// the pass.
    pub fn generate(&self, endpoints: &[EndpointDescriptor]) -> ApiDocument {
        let extractor = MetadataExtractor::new(self.catalog, self.classifier, self.services);
        let compiler = SchemaCompiler::new(self.catalog, self.classifier);
        let mut registry = SchemaRegistry::new();
        let mut document = ApiDocument::new(self.options.info.clone());
        let mut skipped = 0usize;

        for endpoint in endpoints {
            if endpoint.exclude_from_description {
                debug!("Endpoint {} excluded from description", endpoint.route);
                continue;
            }
            if endpoint.methods.is_empty() {
                debug!("Endpoint {} declares no HTTP methods, skipping", endpoint.route);
                continue;
            }

            let description = match extractor.describe(endpoint) {
                Ok(description) => description,
                Err(err) => {
                    warn!("Skipping endpoint {}: {}", endpoint.route, err);
                    skipped += 1;
                    continue;
                }
            };

            let path = description.route.openapi_path();
            let operation = self.build_operation(endpoint, &description, &compiler, &mut registry);
            let operation = customize_operation(endpoint, operation);
            for method in &description.methods {
                document.put_operation(&path, *method, operation.clone());
            }
        }

        document.components.schemas = registry.into_schemas();
        inject_security_schemes(&mut document, &self.options.auth_schemes);

        let unresolved = document.unresolved_references();
        if !unresolved.is_empty() {
            warn!("Unresolved schema references: {:?}", unresolved);
        }

        let document = match &self.options.customizer {
            Some(customizer) => apply_customizer(document, |d| customizer(d)),
            None => document,
        };

        info!(
            "Generated {} operations across {} paths with {} schemas ({} endpoints skipped)",
            document.operation_count(),
            document.paths.len(),
            document.components.schemas.len(),
            skipped
        );
        document
    }

    fn build_operation(
        &self,
        endpoint: &EndpointDescriptor,
        description: &EndpointDescription,
        compiler: &SchemaCompiler<'_>,
        registry: &mut SchemaRegistry,
    ) -> Operation {
        let parameters = description
            .parameters
            .iter()
            .filter_map(|p| self.build_parameter(p, compiler, registry))
            .collect();

        let request_body = self
            .build_form_body(description, compiler, registry)
            .or_else(|| self.build_json_body(description, compiler, registry));

        let mut responses = BTreeMap::new();
        for response in &description.responses {
            let key = if response.is_default {
                "default".to_string()
            } else {
                response.status.to_string()
            };
            let content = if response.ty.is_void() {
                BTreeMap::new()
            } else {
                let schema = compiler.compile(&response.ty, registry);
                media_types(&response.content_types, &schema)
            };
            responses.insert(
                key,
                Response {
                    description: reason_phrase(response.status).to_string(),
                    content,
                },
            );
        }

        Operation {
            tags: endpoint.tags.clone(),
            summary: endpoint.summary.clone(),
            description: endpoint.description.clone(),
            operation_id: endpoint.name.clone(),
            parameters,
            request_body,
            responses,
        }
    }

    fn build_parameter(
        &self,
        parameter: &ParameterDescription,
        compiler: &SchemaCompiler<'_>,
        registry: &mut SchemaRegistry,
    ) -> Option<Parameter> {
        let location = match parameter.source {
            ParameterSource::Path => ParameterLocation::Path,
            ParameterSource::Query => ParameterLocation::Query,
            ParameterSource::Header => ParameterLocation::Header,
            _ => return None,
        };
        let mut schema = compiler.compile(&parameter.display_type, registry);
        for constraint in &parameter.constraints {
            constraint.apply(&mut schema);
        }
        if let Some(default) = &parameter.default_value {
            schema.default = Some(default.clone());
        }
        Some(Parameter {
            name: parameter.name.clone(),
            location,
            required: parameter.required,
            schema,
            description: None,
        })
    }

    fn build_json_body(
        &self,
        description: &EndpointDescription,
        compiler: &SchemaCompiler<'_>,
        registry: &mut SchemaRegistry,
    ) -> Option<RequestBody> {
        let body = description.body()?;
        let schema = compiler.compile(&body.ty, registry);
        let content_types = if !body.content_types.is_empty() {
            body.content_types.clone()
        } else if !description.request_formats.is_empty() {
            description.request_formats.clone()
        } else if body.ty.name == "String" {
            vec![TEXT_CONTENT_TYPE.to_string()]
        } else {
            vec![JSON_CONTENT_TYPE.to_string()]
        };
        Some(RequestBody {
            description: None,
            required: body.required,
            content: media_types(&content_types, &schema),
        })
    }

    /// Form-bound parameters become one `multipart/form-data` object.
    fn build_form_body(
        &self,
        description: &EndpointDescription,
        compiler: &SchemaCompiler<'_>,
        registry: &mut SchemaRegistry,
    ) -> Option<RequestBody> {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        for parameter in description.form_files() {
            let schema = if is_file(&parameter.ty) {
                file_schema(&parameter.ty.name)
            } else {
                compiler.compile(&parameter.ty, registry)
            };
            if parameter.required {
                required.push(parameter.name.clone());
            }
            properties.insert(parameter.name.clone(), schema);
        }
        if properties.is_empty() {
            return None;
        }

        let schema = Schema {
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required.clone()),
            ..Schema::of_type("object")
        };
        Some(RequestBody {
            description: None,
            required: !required.is_empty(),
            content: media_types(&[MULTIPART_CONTENT_TYPE.to_string()], &schema),
        })
    }
}

fn file_schema(type_name: &str) -> Schema {
    let binary = Schema {
        format: Some("binary".to_string()),
        ..Schema::of_type("string")
    };
    if type_name == "FormFileCollection" || SEQUENCE_TYPES.contains(&type_name) {
        Schema {
            items: Some(Box::new(binary)),
            ..Schema::of_type("array")
        }
    } else {
        binary
    }
}

fn media_types(content_types: &[String], schema: &Schema) -> BTreeMap<String, MediaType> {
    content_types
        .iter()
        .map(|content_type| {
            (
                content_type.clone(),
                MediaType {
                    schema: schema.clone(),
                },
            )
        })
        .collect()
}

/// Keeps `value` unless `customize` returns something different.
fn apply_customizer<T, F>(value: T, customize: F) -> T
where
    T: PartialEq,
    F: Fn(&T) -> Option<T>,
{
    match customize(&value) {
        Some(replacement) if replacement != value => {
            debug!("Customizer replaced the generated value");
            replacement
        }
        _ => value,
    }
}

fn customize_operation(endpoint: &EndpointDescriptor, operation: Operation) -> Operation {
    match &endpoint.customizer {
        Some(customizer) => apply_customizer(operation, |op| customizer(op)),
        None => operation,
    }
}

/// Reason phrase used as the response description.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        100..=199 => "Informational",
        200..=299 => "Success",
        300..=399 => "Redirection",
        400..=499 => "Client Error",
        _ => "Server Error",
    }
}

/// Owns the generation inputs and the last published document.
///
/// Generation passes are serialized. Each pass builds into its own registry and
/// document, and publishes the finished document atomically, so [`current`] never
/// observes a partial result.
///
/// [`current`]: DocumentService::current
pub struct DocumentService {
    source: Box<dyn EndpointSource>,
    catalog: TypeCatalog,
    classifier: TypeClassifier,
    services: Box<dyn ServiceLookup>,
    options: DocumentOptions,
    generation: Mutex<()>,
    published: RwLock<Option<Arc<ApiDocument>>>,
}

impl DocumentService {
    pub fn new<S>(source: S, catalog: TypeCatalog) -> Self
    where
        S: EndpointSource + 'static,
    {
        Self {
            source: Box::new(source),
            catalog,
            classifier: TypeClassifier::default(),
            services: Box::new(NoServices),
            options: DocumentOptions::default(),
            generation: Mutex::new(()),
            published: RwLock::new(None),
        }
    }

    pub fn with_services<L>(mut self, services: L) -> Self
    where
        L: ServiceLookup + 'static,
    {
        self.services = Box::new(services);
        self
    }

    pub fn with_classifier(mut self, classifier: TypeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Runs a generation pass and publishes its result.
    pub fn generate(&self) -> Arc<ApiDocument> {
        let _generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        let endpoints = self.source.endpoints();
        debug!("Generating document for {} endpoints", endpoints.len());

        let assembler = DocumentAssembler::new(
            &self.catalog,
            &self.classifier,
            self.services.as_ref(),
            &self.options,
        );
        let document = Arc::new(assembler.generate(&endpoints));

        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        *published = Some(Arc::clone(&document));
        document
    }

    /// The last published document, if any pass has completed.
    pub fn current(&self) -> Option<Arc<ApiDocument>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The last published document, generating one first if needed.
    pub fn document(&self) -> Arc<ApiDocument> {
        match self.current() {
            Some(document) => document,
            None => self.generate(),
        }
    }
}

impl fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentService")
            .field("catalog", &self.catalog.len())
            .field("options", &self.options)
            .field("published", &self.current().is_some())
            .finish_non_exhaustive()
    }
}
