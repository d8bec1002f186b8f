//! Type introspection model.
//!
//! Handlers and properties refer to types through [`TypeRef`], a parsed Rust type
//! expression. What a named type looks like is answered by the [`TypeCatalog`], which
//! holds one [`TypeDescriptor`] per simple type name. The catalog is the only "live type
//! system" the schema compiler sees: it can be filled from Rust sources (see
//! [`crate::source_types`]), from a manifest (see [`crate::manifest`]), or by hand.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name used for the unit type `()`.
pub const VOID: &str = "()";
/// Normalized name for awaitable types (`impl Future<Output = T>`, `BoxFuture<'_, T>`).
pub const FUTURE: &str = "Future";
/// Normalized name for opaque response values (`impl IntoResponse`).
pub const INTO_RESPONSE: &str = "IntoResponse";

/// Wrappers that do not change the documented shape of their first type argument.
const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Arc", "Rc", "Cow", "Pin", "Json"];

/// Reference to a type as written in a handler signature or a property declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    /// Simple name, the last path segment (e.g. `User` for `models::User`)
    pub name: String,
    /// Full path as written, without generic arguments (e.g. `models::User`)
    pub path: String,
    /// Generic type arguments
    pub args: Vec<TypeRef>,
    /// Whether the value may be absent (`Option<T>`)
    pub nullable: bool,
}

impl TypeRef {
    /// Creates a reference to a non-generic type.
    pub fn named(path: &str) -> Self {
        let name = path.rsplit("::").next().unwrap_or(path).to_string();
        Self {
            name,
            path: path.to_string(),
            args: Vec::new(),
            nullable: false,
        }
    }

    /// Creates a reference to a generic type.
    pub fn generic(path: &str, args: Vec<TypeRef>) -> Self {
        Self {
            args,
            ..Self::named(path)
        }
    }

    /// The unit type.
    pub fn void() -> Self {
        Self::named(VOID)
    }

    /// Wraps `inner` in a `Vec`.
    pub fn vec(inner: TypeRef) -> Self {
        Self::generic("Vec", vec![inner])
    }

    /// Marks this reference as `Option<Self>`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Same type with nullability removed.
    pub fn non_nullable(&self) -> Self {
        let mut inner = self.clone();
        inner.nullable = false;
        inner
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID
    }

    pub fn first_arg(&self) -> Option<&TypeRef> {
        self.args.first()
    }

    pub fn last_arg(&self) -> Option<&TypeRef> {
        self.args.last()
    }

    /// Parses a Rust type expression such as `Option<Vec<models::Todo>>`.
    pub fn parse(text: &str) -> Result<Self> {
        let ty = syn::parse_str::<syn::Type>(text).map_err(|e| Error::InvalidType {
            text: text.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_syn(&ty))
    }

    /// Converts a `syn` type into a reference, peeling references, smart pointers and
    /// `Option`, and normalizing slices, futures and `impl IntoResponse`.
    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Slice(slice) => Self::vec(Self::from_syn(&slice.elem)),
            syn::Type::Array(array) => Self::vec(Self::from_syn(&array.elem)),
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => Self::void(),
            syn::Type::ImplTrait(impl_trait) => Self::from_bounds(impl_trait.bounds.iter()),
            syn::Type::TraitObject(object) => Self::from_bounds(object.bounds.iter()),
            _ => {
                debug!("Unsupported type expression, treating as unknown");
                Self::named("Unknown")
            }
        }
    }

    fn from_path(path: &syn::Path) -> Self {
        let Some(segment) = path.segments.last() else {
            return Self::named("Unknown");
        };
        let name = segment.ident.to_string();
        let full_path = path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect::<Vec<_>>()
            .join("::");

        let mut args = Vec::new();
        let mut output = None;
        if let syn::PathArguments::AngleBracketed(generics) = &segment.arguments {
            for arg in &generics.args {
                match arg {
                    syn::GenericArgument::Type(inner) => args.push(Self::from_syn(inner)),
                    syn::GenericArgument::AssocType(assoc) if assoc.ident == "Output" => {
                        output = Some(Self::from_syn(&assoc.ty));
                    }
                    _ => {}
                }
            }
        }

        if name == "Option" {
            if let Some(inner) = args.into_iter().next() {
                return inner.nullable();
            }
            return Self::named("Unknown").nullable();
        }

        if TRANSPARENT_WRAPPERS.contains(&name.as_str()) {
            if let Some(inner) = args.into_iter().next() {
                return inner;
            }
            return Self::named(&full_path);
        }

        if matches!(name.as_str(), "Future" | "BoxFuture" | "LocalBoxFuture") {
            let result = output.or_else(|| args.pop()).unwrap_or_else(Self::void);
            return Self::generic(FUTURE, vec![result]);
        }

        if matches!(name.as_str(), "IntoResponse" | "Responder") {
            return Self::named(INTO_RESPONSE);
        }

        Self {
            name,
            path: full_path,
            args,
            nullable: false,
        }
    }

    fn from_bounds<'a>(bounds: impl Iterator<Item = &'a syn::TypeParamBound>) -> Self {
        for bound in bounds {
            if let syn::TypeParamBound::Trait(trait_bound) = bound {
                return Self::from_path(&trait_bound.path);
            }
        }
        Self::named("Unknown")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<")?;
        }
        write!(f, "{}", self.path)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        if self.nullable {
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TypeRef {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

/// Everything the catalog knows about one named type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Serialized as a single value (newtypes over text, ids, ...)
    Scalar,
    Enum(EnumDef),
    Object(ObjectDef),
}

/// Capabilities a type exposes to request binding and response inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Can be parsed from text (`FromStr`)
    pub parse: bool,
    /// Binds itself from the request (`FromRequest`, `FromRequestParts`)
    pub async_bind: bool,
    /// Response wrapper whose body shape is not known statically (`IntoResponse`)
    pub result_wrapper: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDef {
    /// Underlying numeric representation (`#[repr(u8)]`)
    pub repr: Option<String>,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    /// Explicit discriminant, if any
    pub discriminant: Option<i64>,
}

impl EnumDef {
    /// Numeric value of every variant, following Rust's implicit discriminant rules.
    pub fn discriminants(&self) -> Vec<i64> {
        let mut next = 0i64;
        self.variants
            .iter()
            .map(|variant| {
                let value = variant.discriminant.unwrap_or(next);
                next = value.wrapping_add(1);
                value
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDef {
    pub properties: Vec<PropertyDescriptor>,
    /// Derived-type table: names of the types substitutable for this one
    pub derived_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: TypeRef,
    /// Exposed when serializing (has a getter)
    pub readable: bool,
    /// Accepted when deserializing (has a setter)
    pub writable: bool,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(name: &str, ty: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            ty,
            readable: true,
            writable: true,
            default: None,
            description: None,
        }
    }
}

impl TypeDescriptor {
    pub fn scalar(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            kind: TypeKind::Scalar,
            capabilities: Capabilities::default(),
        }
    }

    pub fn object(name: &str, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            kind: TypeKind::Object(ObjectDef {
                properties,
                derived_types: Vec::new(),
            }),
            capabilities: Capabilities::default(),
        }
    }

    pub fn enumeration(name: &str, repr: Option<&str>, variants: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            kind: TypeKind::Enum(EnumDef {
                repr: repr.map(str::to_string),
                variants: variants
                    .iter()
                    .map(|v| EnumVariant {
                        name: v.to_string(),
                        discriminant: None,
                    })
                    .collect(),
            }),
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn object_def(&self) -> Option<&ObjectDef> {
        match &self.kind {
            TypeKind::Object(def) => Some(def),
            _ => None,
        }
    }
}

/// Lookup table of named types, keyed by simple name.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a descriptor, returning the one it replaced.
    pub fn insert(&mut self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        debug!("Registering type descriptor: {}", descriptor.name);
        self.types.insert(descriptor.name.clone(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Polymorphic roots whose derived-type table lists `name`.
    pub fn roots_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TypeDescriptor> {
        self.iter().filter(move |descriptor| {
            descriptor
                .object_def()
                .is_some_and(|def| def.derived_types.iter().any(|d| d == name))
        })
    }

    /// Attaches a derived-type table to an object type. Returns `false` if `root` is
    /// not a known object type.
    pub fn declare_derived(&mut self, root: &str, derived: Vec<String>) -> bool {
        match self.types.get_mut(root).map(|d| &mut d.kind) {
            Some(TypeKind::Object(def)) => {
                debug!("Declaring {} derived types for {}", derived.len(), root);
                def.derived_types = derived;
                true
            }
            _ => false,
        }
    }

    /// Copies every descriptor of `other` into this catalog, replacing same-named ones.
    pub fn extend(&mut self, other: TypeCatalog) {
        for (_, descriptor) in other.types {
            self.insert(descriptor);
        }
    }

    /// Derived types declared for `name`, empty when it is not a polymorphic root.
    pub fn derived_types(&self, name: &str) -> &[String] {
        self.get(name)
            .and_then(TypeDescriptor::object_def)
            .map(|def| def.derived_types.as_slice())
            .unwrap_or(&[])
    }
}
