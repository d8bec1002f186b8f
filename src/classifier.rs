//! Type shape classification.
//!
//! [`TypeClassifier::classify`] decides which schema shape a type reference takes. It
//! never fails: anything it cannot place is a plain object.

use crate::types::{TypeCatalog, TypeKind, TypeRef};
use std::collections::HashMap;

/// Type names documented as JSON objects keyed by string.
pub const MAP_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

/// Type names documented as JSON arrays.
pub const SEQUENCE_TYPES: &[&str] = &[
    "Vec",
    "VecDeque",
    "LinkedList",
    "HashSet",
    "BTreeSet",
    "IndexSet",
];

/// OpenAPI `type`/`format` pair for a well-known scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSchema {
    pub schema_type: String,
    pub format: Option<String>,
}

impl PrimitiveSchema {
    pub fn new(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            format: format.map(str::to_string),
        }
    }

    /// True for the opaque-object entry, which is not parseable from text.
    pub fn is_object(&self) -> bool {
        self.schema_type == "object"
    }
}

/// Table of well-known primitive mappings. Callers may add or override entries.
#[derive(Debug, Clone)]
pub struct PrimitiveTable {
    entries: HashMap<String, PrimitiveSchema>,
}

impl Default for PrimitiveTable {
    fn default() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };
        table.insert_all(&["bool"], "boolean", None);
        table.insert_all(&["u8"], "string", Some("byte"));
        table.insert_all(&["i8", "i16", "i32", "u16", "u32"], "integer", Some("int32"));
        table.insert_all(
            &["i64", "i128", "isize", "u64", "u128", "usize"],
            "integer",
            Some("int64"),
        );
        table.insert_all(&["f32"], "number", Some("float"));
        table.insert_all(&["f64", "Decimal"], "number", Some("double"));
        table.insert_all(
            &["DateTime", "NaiveDateTime", "OffsetDateTime", "PrimitiveDateTime", "SystemTime"],
            "string",
            Some("date-time"),
        );
        table.insert_all(&["NaiveDate", "Date"], "string", Some("date"));
        table.insert_all(&["Uuid"], "string", Some("uuid"));
        table.insert_all(&["char", "String", "str", "Url", "Uri"], "string", None);
        table.insert_all(&["Value"], "object", None);
        table
    }
}

impl PrimitiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the mapping for `name`.
    pub fn insert(&mut self, name: &str, schema: PrimitiveSchema) {
        self.entries.insert(name.to_string(), schema);
    }

    fn insert_all(&mut self, names: &[&str], schema_type: &str, format: Option<&str>) {
        for name in names {
            self.insert(name, PrimitiveSchema::new(schema_type, format));
        }
    }

    pub fn get(&self, name: &str) -> Option<&PrimitiveSchema> {
        self.entries.get(name)
    }
}

/// The schema shape a type takes.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// `()`, no content
    Void,
    Primitive(PrimitiveSchema),
    NullablePrimitive(PrimitiveSchema),
    Enum,
    Map { value: TypeRef },
    Sequence { element: TypeRef },
    /// Object with a derived-type table
    Polymorphic,
    Object,
    /// Scalar known to the catalog but absent from the primitive table
    Opaque,
}

#[derive(Debug, Clone, Default)]
pub struct TypeClassifier {
    table: PrimitiveTable,
}

impl TypeClassifier {
    pub fn new(table: PrimitiveTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PrimitiveTable {
        &self.table
    }

    pub fn classify(&self, ty: &TypeRef, catalog: &TypeCatalog) -> ShapeKind {
        if ty.is_void() {
            return ShapeKind::Void;
        }

        if let Some(primitive) = self.table.get(&ty.name) {
            return if ty.nullable {
                ShapeKind::NullablePrimitive(primitive.clone())
            } else {
                ShapeKind::Primitive(primitive.clone())
            };
        }

        if MAP_TYPES.contains(&ty.name.as_str()) {
            let value = ty
                .args
                .get(1)
                .or_else(|| ty.last_arg())
                .cloned()
                .unwrap_or_else(|| TypeRef::named("Value"));
            return ShapeKind::Map { value };
        }

        if SEQUENCE_TYPES.contains(&ty.name.as_str()) {
            let element = ty
                .first_arg()
                .cloned()
                .unwrap_or_else(|| TypeRef::named("Value"));
            return ShapeKind::Sequence { element };
        }

        match catalog.get(&ty.name).map(|d| &d.kind) {
            Some(TypeKind::Enum(_)) => ShapeKind::Enum,
            Some(TypeKind::Scalar) => ShapeKind::Opaque,
            Some(TypeKind::Object(def)) if !def.derived_types.is_empty() => ShapeKind::Polymorphic,
            _ => ShapeKind::Object,
        }
    }

    /// Whether values of `ty` can be bound from a single text value (route segment,
    /// query item, header).
    pub fn is_text_parseable(&self, ty: &TypeRef, catalog: &TypeCatalog) -> bool {
        if let Some(primitive) = self.table.get(&ty.name) {
            return !primitive.is_object();
        }
        match catalog.get(&ty.name) {
            Some(descriptor) => {
                descriptor.capabilities.parse || matches!(descriptor.kind, TypeKind::Enum(_))
            }
            None => false,
        }
    }
}
