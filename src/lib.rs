//! API document synthesis.
//!
//! Given the endpoints of an HTTP application and a catalog of the types their handlers
//! accept and return, this crate produces one deduplicated OpenAPI 3 document. Every
//! named type is compiled once into `components.schemas` and referenced everywhere else;
//! recursive and mutually recursive types terminate through placeholder registration, and
//! polymorphic roots are described with `oneOf` / `allOf`.
//!
//! # Architecture
//!
//! 1. [`types`] - type references and the [`types::TypeCatalog`] of named types
//! 2. [`scanner`], [`parser`], [`source_types`] - fill a catalog from Rust sources
//! 3. [`classifier`] - decides the shape (primitive, sequence, map, object...) of a type
//! 4. [`schema`], [`schema_compiler`] - schema nodes, the registry, type compilation
//! 5. [`endpoint`], [`route`] - endpoint descriptors and route templates
//! 6. [`extractor`] - parameter sources and response metadata per endpoint
//! 7. [`assembler`], [`security`], [`document`] - document assembly and publication
//! 8. [`manifest`], [`serializer`], [`cli`] - configuration files and output
//!
//! # Example
//!
//! ```
//! use apidoc_synth::assembler::DocumentService;
//! use apidoc_synth::endpoint::{EndpointDescriptor, HandlerParameter, HttpMethod};
//! use apidoc_synth::types::{PropertyDescriptor, TypeCatalog, TypeDescriptor, TypeRef};
//!
//! let mut catalog = TypeCatalog::new();
//! catalog.insert(TypeDescriptor::object(
//!     "Todo",
//!     vec![PropertyDescriptor::new("title", TypeRef::named("String"))],
//! ));
//!
//! let endpoints = vec![EndpointDescriptor::new("/todos/{id}", &[HttpMethod::Get])
//!     .with_parameter(HandlerParameter::new("id", TypeRef::named("i32")))
//!     .returning(TypeRef::named("Todo"))];
//!
//! let service = DocumentService::new(endpoints, catalog);
//! let document = service.generate();
//! assert!(document.components.schemas.contains_key("Todo"));
//! assert!(document.operation("/todos/{id}", HttpMethod::Get).is_some());
//! ```

pub mod assembler;
pub mod classifier;
pub mod cli;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod parser;
pub mod route;
pub mod scanner;
pub mod schema;
pub mod schema_compiler;
pub mod security;
pub mod serializer;
pub mod source_types;
pub mod types;
