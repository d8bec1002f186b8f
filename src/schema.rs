//! Schema nodes and the shared schema registry.

use crate::classifier::PrimitiveSchema;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of every component schema reference.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// OpenAPI Schema object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Literal values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Value schema for map types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Schema {
    /// Reference to the component schema registered under `name`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Self::default()
        }
    }

    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    pub fn primitive(primitive: &PrimitiveSchema, nullable: bool) -> Self {
        Self {
            schema_type: Some(primitive.schema_type.clone()),
            format: primitive.format.clone(),
            nullable: nullable.then_some(true),
            ..Self::default()
        }
    }

    /// Component name this schema points at, if it is a reference.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Visits every schema nested in this one, including itself.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Schema)) {
        visit(self);
        if let Some(items) = &self.items {
            items.walk(visit);
        }
        if let Some(additional) = &self.additional_properties {
            additional.walk(visit);
        }
        for property in self.properties.iter().flat_map(|p| p.values()) {
            property.walk(visit);
        }
        for nested in self.one_of.iter().chain(self.all_of.iter()).flatten() {
            nested.walk(visit);
        }
    }
}

/// Registry entry. A pending slot marks a type whose schema is being compiled.
#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(Schema),
}

/// Named component schemas of one generation pass.
///
/// Insertion is idempotent: the first schema stored under a name is kept.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    slots: BTreeMap<String, Slot>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `name` is registered, finished or still in progress.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Pending))
    }

    /// Finished schema registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        match self.slots.get(name) {
            Some(Slot::Ready(schema)) => Some(schema),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Schema> {
        match self.slots.get_mut(name) {
            Some(Slot::Ready(schema)) => Some(schema),
            _ => None,
        }
    }

    /// Marks `name` as in progress. Returns `false` if the name is already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        debug!("Reserving schema slot: {}", name);
        self.slots.insert(name.to_string(), Slot::Pending);
        true
    }

    /// Completes a reserved slot. A slot that already holds a schema is left untouched.
    pub fn fill(&mut self, name: &str, schema: Schema) -> bool {
        match self.slots.get(name) {
            Some(Slot::Ready(_)) => {
                debug!("Schema {} already registered, keeping the first", name);
                false
            }
            _ => {
                self.slots.insert(name.to_string(), Slot::Ready(schema));
                true
            }
        }
    }

    /// Stores `schema` under `name` unless the name is taken.
    pub fn put_if_absent(&mut self, name: &str, schema: Schema) -> bool {
        if self.contains(name) {
            debug!("Schema {} already exists", name);
            return false;
        }
        self.slots.insert(name.to_string(), Slot::Ready(schema));
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Finished schemas keyed by name. Pending slots are dropped.
    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.slots
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Ready(schema) => Some((name, schema)),
                Slot::Pending => None,
            })
            .collect()
    }
}
