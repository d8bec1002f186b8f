//! Manifest files.
//!
//! A manifest describes, in YAML or JSON, everything a generation pass needs that is not
//! found in Rust sources: the endpoints, the services resolved from the container, the
//! authentication schemes and document info. It can also declare types by hand and
//! attach derived-type tables to polymorphic roots.
//!
//! ```yaml
//! info:
//!   title: Todo API
//!   version: "1.0"
//! services: [TodoDb]
//! auth_schemes:
//!   - kind: bearer
//!     name: Bearer
//! types:
//!   Priority:
//!     kind: enum
//!     variants: [Low, High]
//! derived_types:
//!   Shape: [Circle, Square]
//! endpoints:
//!   - route: /todos/{id}
//!     methods: [GET]
//!     parameters:
//!       - { name: id, type: i32 }
//!     returns: Option<Todo>
//! ```

use crate::assembler::{DocumentOptions, DocumentService};
use crate::document::Info;
use crate::endpoint::{EndpointDescriptor, EndpointSource, ServiceNames};
use crate::error::{Error, Result};
use crate::security::AuthScheme;
use crate::types::{
    Capabilities, EnumDef, EnumVariant, ObjectDef, PropertyDescriptor, TypeCatalog,
    TypeDescriptor, TypeKind, TypeRef,
};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub info: Info,
    /// Simple names of the types resolved from the service container
    pub services: Vec<String>,
    pub auth_schemes: Vec<AuthScheme>,
    pub types: BTreeMap<String, TypeEntry>,
    /// Polymorphic root -> types substitutable for it
    pub derived_types: BTreeMap<String, Vec<String>>,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// A hand-declared type.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeEntry {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(flatten)]
    pub shape: TypeShape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    Scalar,
    Enum {
        #[serde(default)]
        repr: Option<String>,
        variants: Vec<VariantEntry>,
    },
    Object {
        #[serde(default)]
        properties: Vec<PropertyEntry>,
    },
}

/// An enum variant, either a bare name or a name with its discriminant.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VariantEntry {
    Name(String),
    Valued { name: String, value: i64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
}

impl TypeEntry {
    pub fn to_descriptor(&self, name: &str) -> TypeDescriptor {
        let kind = match &self.shape {
            TypeShape::Scalar => TypeKind::Scalar,
            TypeShape::Enum { repr, variants } => TypeKind::Enum(EnumDef {
                repr: repr.clone(),
                variants: variants
                    .iter()
                    .map(|variant| match variant {
                        VariantEntry::Name(name) => EnumVariant {
                            name: name.clone(),
                            discriminant: None,
                        },
                        VariantEntry::Valued { name, value } => EnumVariant {
                            name: name.clone(),
                            discriminant: Some(*value),
                        },
                    })
                    .collect(),
            }),
            TypeShape::Object { properties } => TypeKind::Object(ObjectDef {
                properties: properties.iter().map(PropertyEntry::to_descriptor).collect(),
                derived_types: Vec::new(),
            }),
        };
        TypeDescriptor {
            name: name.to_string(),
            description: self.description.clone(),
            kind,
            capabilities: self.capabilities,
        }
    }
}

impl PropertyEntry {
    fn to_descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor {
            readable: !self.write_only,
            writable: !self.read_only,
            default: self.default.clone(),
            description: self.description.clone(),
            ..PropertyDescriptor::new(&self.name, self.ty.clone())
        }
    }
}

impl Manifest {
    /// Loads a manifest, choosing the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let manifest = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(Error::Manifest(format!(
                "unsupported manifest format: {} (expected .yaml, .yml or .json)",
                path.display()
            ))),
        }?;
        info!(
            "Loaded manifest {} with {} endpoints and {} types",
            path.display(),
            manifest.endpoints.len(),
            manifest.types.len()
        );
        Ok(manifest)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Manifest(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Manifest(e.to_string()))
    }

    /// Adds the declared types to `catalog`, then attaches the derived-type tables.
    ///
    /// Declared types replace same-named types collected from sources. A derived-type
    /// table whose root or any derived entry is not an object type is an error.
    pub fn apply_types(&self, catalog: &mut TypeCatalog) -> Result<()> {
        for (name, entry) in &self.types {
            if catalog.insert(entry.to_descriptor(name)).is_some() {
                debug!("Manifest type {} replaces the collected one", name);
            }
        }
        for (root, derived) in &self.derived_types {
            if let Some(name) = derived
                .iter()
                .find(|name| catalog.get(name).and_then(|d| d.object_def()).is_none())
            {
                return Err(Error::Manifest(format!(
                    "derived type {} of {} is not a known object type",
                    name, root
                )));
            }
            if !catalog.declare_derived(root, derived.clone()) {
                return Err(Error::Manifest(format!(
                    "derived types declared for {}, which is not a known object type",
                    root
                )));
            }
        }
        Ok(())
    }

    pub fn services(&self) -> ServiceNames {
        ServiceNames::new(self.services.iter().cloned())
    }

    pub fn options(&self) -> DocumentOptions {
        DocumentOptions::new(self.info.clone()).with_auth_schemes(self.auth_schemes.clone())
    }

    /// Builds a document service over this manifest and the types in `catalog`.
    pub fn into_service(self, mut catalog: TypeCatalog) -> Result<DocumentService> {
        self.apply_types(&mut catalog)?;
        let services = self.services();
        let options = self.options();
        Ok(DocumentService::new(self, catalog)
            .with_services(services)
            .with_options(options))
    }
}

impl EndpointSource for Manifest {
    fn endpoints(&self) -> Vec<EndpointDescriptor> {
        self.endpoints.clone()
    }
}
