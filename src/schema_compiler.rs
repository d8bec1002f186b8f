//! Recursive type-to-schema compiler.
//!
//! Named object types are compiled once into the [`SchemaRegistry`] and referenced from
//! everywhere else. An object's registry slot is reserved before its properties are
//! compiled, which is what stops self-referential types from recursing forever.

use crate::classifier::{PrimitiveSchema, ShapeKind, TypeClassifier};
use crate::schema::{Schema, SchemaRegistry};
use crate::types::{ObjectDef, TypeCatalog, TypeKind, TypeRef};
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

/// Enum reprs whose table entry is not an integer.
const BYTE_REPRS: &[&str] = &["u8", "i8"];

/// Schema compiler - converts type references to OpenAPI schemas
pub struct SchemaCompiler<'a> {
    catalog: &'a TypeCatalog,
    classifier: &'a TypeClassifier,
}

impl<'a> SchemaCompiler<'a> {
    pub fn new(catalog: &'a TypeCatalog, classifier: &'a TypeClassifier) -> Self {
        Self {
            catalog,
            classifier,
        }
    }

    pub fn classifier(&self) -> &TypeClassifier {
        self.classifier
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.catalog
    }

    /// Compiles `ty` into a schema, registering every named object type it reaches.
    ///
    /// Object types come back as references into `registry`; polymorphic roots come back
    /// as a `oneOf` over the root and its derived types.
    pub fn compile(&self, ty: &TypeRef, registry: &mut SchemaRegistry) -> Schema {
        if registry.contains(&ty.name) {
            debug!("Schema for {} already registered", ty.name);
            return with_nullable(self.registered_reference(&ty.name), ty.nullable);
        }

        match self.classifier.classify(ty, self.catalog) {
            ShapeKind::Void => Schema::default(),
            ShapeKind::Primitive(primitive) => Schema::primitive(&primitive, false),
            ShapeKind::NullablePrimitive(primitive) => Schema::primitive(&primitive, true),
            ShapeKind::Opaque => {
                debug!("No primitive mapping for {}, using string", ty.name);
                Schema {
                    nullable: ty.nullable.then_some(true),
                    ..Schema::of_type("string")
                }
            }
            ShapeKind::Enum => self.enum_schema(ty),
            ShapeKind::Map { value } => Schema {
                additional_properties: Some(Box::new(self.compile(&value, registry))),
                nullable: ty.nullable.then_some(true),
                ..Schema::of_type("object")
            },
            ShapeKind::Sequence { element } => Schema {
                items: Some(Box::new(self.compile(&element, registry))),
                nullable: ty.nullable.then_some(true),
                ..Schema::of_type("array")
            },
            ShapeKind::Object | ShapeKind::Polymorphic => {
                with_nullable(self.compile_object(ty, registry), ty.nullable)
            }
        }
    }

    /// What callers get for a type that is already registered.
    fn registered_reference(&self, name: &str) -> Schema {
        let derived: Vec<&String> = self
            .catalog
            .derived_types(name)
            .iter()
            .filter(|d| self.is_registrable(d))
            .collect();
        if derived.is_empty() {
            return Schema::reference(name);
        }
        let mut one_of = vec![Schema::reference(name)];
        one_of.extend(derived.into_iter().map(|d| Schema::reference(d)));
        Schema {
            one_of: Some(one_of),
            ..Schema::default()
        }
    }

    /// Only catalog object types ever get a registry entry.
    fn is_registrable(&self, name: &str) -> bool {
        self.catalog.get(name).and_then(|d| d.object_def()).is_some()
    }

    fn enum_schema(&self, ty: &TypeRef) -> Schema {
        let Some(TypeKind::Enum(def)) = self.catalog.get(&ty.name).map(|d| &d.kind) else {
            return Schema::of_type("string");
        };

        let numeric = def.repr.as_deref().and_then(|repr| {
            match self.classifier.table().get(repr) {
                Some(primitive) if primitive.schema_type == "integer" => Some(primitive.clone()),
                // u8/i8 map to bytes as values, but a byte-sized repr is still a number
                _ if BYTE_REPRS.contains(&repr) => {
                    Some(PrimitiveSchema::new("integer", Some("int32")))
                }
                _ => None,
            }
        });

        let mut schema = match numeric {
            Some(primitive) => {
                let mut schema = Schema::primitive(&primitive, false);
                schema.enum_values = Some(def.discriminants().into_iter().map(Value::from).collect());
                schema
            }
            None => {
                let mut schema = Schema::of_type("string");
                schema.enum_values = Some(
                    def.variants
                        .iter()
                        .map(|v| Value::String(v.name.clone()))
                        .collect(),
                );
                schema
            }
        };
        schema.nullable = ty.nullable.then_some(true);
        schema.description = self.catalog.get(&ty.name).and_then(|d| d.description.clone());
        schema
    }

    fn compile_object(&self, ty: &TypeRef, registry: &mut SchemaRegistry) -> Schema {
        let name = ty.name.as_str();
        let Some(descriptor) = self.catalog.get(name) else {
            debug!("Unknown type: {}, using object placeholder", name);
            return Schema::of_type("object");
        };
        let Some(def) = descriptor.object_def() else {
            return Schema::of_type("object");
        };

        debug!("Generating object schema for: {}", name);
        registry.reserve(name);

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        for property in &def.properties {
            let mut schema = self.compile(&property.ty, registry);
            if let Some(default) = &property.default {
                schema.default = Some(default.clone());
            }
            if !property.writable {
                schema.read_only = Some(true);
            }
            if !property.readable {
                schema.write_only = Some(true);
            }
            if property.description.is_some() {
                schema.description = property.description.clone();
            }
            if !property.ty.nullable && property.default.is_none() {
                required.push(property.name.clone());
            }
            properties.insert(property.name.clone(), schema);
        }

        let schema = Schema {
            description: descriptor.description.clone(),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            ..Schema::of_type("object")
        };
        registry.fill(name, schema);

        // This type may itself be derived from a root that is already registered.
        for root in self.catalog.roots_of(name) {
            if registry.contains(&root.name) {
                if let Some(root_def) = root.object_def() {
                    Self::link_derived(&root.name, root_def, name, registry);
                }
            }
        }

        for derived in &def.derived_types {
            if !self.is_registrable(derived) {
                debug!("Derived type {} of {} is not an object type, skipping", derived, name);
                continue;
            }
            self.compile(&TypeRef::named(derived), registry);
            Self::link_derived(name, def, derived, registry);
        }

        self.registered_reference(name)
    }

    /// Points a derived schema at its root with `allOf` and drops the properties the
    /// root already declares.
    fn link_derived(root: &str, root_def: &ObjectDef, derived: &str, registry: &mut SchemaRegistry) {
        let Some(schema) = registry.get_mut(derived) else {
            debug!("Derived schema {} not ready yet", derived);
            return;
        };
        debug!("Linking derived schema {} to {}", derived, root);

        let base = Schema::reference(root);
        let all_of = schema.all_of.get_or_insert_with(Vec::new);
        if !all_of.contains(&base) {
            all_of.push(base);
        }

        for property in &root_def.properties {
            if let Some(properties) = schema.properties.as_mut() {
                properties.remove(&property.name);
            }
            if let Some(required) = schema.required.as_mut() {
                required.retain(|r| r != &property.name);
            }
        }
        if schema.required.as_ref().is_some_and(Vec::is_empty) {
            schema.required = None;
        }
    }
}

/// Marks `schema` nullable. A `$ref` takes no sibling keywords, so a nullable
/// reference is wrapped in `allOf`.
fn with_nullable(schema: Schema, nullable: bool) -> Schema {
    if !nullable {
        return schema;
    }
    if schema.is_reference() {
        return Schema {
            all_of: Some(vec![schema]),
            nullable: Some(true),
            ..Schema::default()
        };
    }
    Schema {
        nullable: Some(true),
        ..schema
    }
}
