//! Capability definitions: the unit the selection engine hands to an agent.
//!
//! A capability is a named callable action with a description and a JSON
//! input schema. The store keeps it as a [`StoredCapability`], which adds the
//! origin (`source`), searchable tags and an opaque handler reference.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::store::{IndexSchema, Record, Table, Tables, INDEX_SOURCE, INDEX_TAGS};

/// Source of capabilities registered directly by the host application.
pub const SOURCE_NATIVE: &str = "native";

/// Prefix of the source of capabilities owned by a bundle.
pub const BUNDLE_SOURCE_PREFIX: &str = "bundle:";

/// Source tag of capabilities owned by bundle `name`.
pub fn bundle_source(name: &str) -> String {
    format!("{}{}", BUNDLE_SOURCE_PREFIX, name)
}

// ---------------------------------------------------------------------------
// CapabilityDef
// ---------------------------------------------------------------------------

/// Descriptor shown to the model: name, description and input schema.
///
/// Example YAML (inside a bundle manifest):
/// ```yaml
/// - name: "web_search"
///   description: "Search the web for information on a topic"
///   input_schema:
///     type: object
///     properties:
///       query: { type: string, description: "The search query" }
///     required: [query]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDef {
    /// Unique capability name
    pub name: String,

    /// Tells the model when and why to call the capability
    #[serde(default)]
    pub description: String,

    /// JSON schema of the input object
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl CapabilityDef {
    /// Create a descriptor with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

// ---------------------------------------------------------------------------
// Schema helpers
// ---------------------------------------------------------------------------

/// `{"type": "string", "description": ...}`
pub fn string_param(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// `{"type": "integer", "description": ...}`
pub fn int_param(description: &str) -> Value {
    json!({"type": "integer", "description": description})
}

/// `{"type": "boolean", "description": ...}`
pub fn bool_param(description: &str) -> Value {
    json!({"type": "boolean", "description": description})
}

/// String parameter restricted to `values`.
pub fn enum_param(description: &str, values: &[&str]) -> Value {
    json!({"type": "string", "description": description, "enum": values})
}

/// Object schema from `(property, schema)` pairs. `required` is omitted
/// when empty.
pub fn object_schema<I>(properties: I, required: &[&str]) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

// ---------------------------------------------------------------------------
// HandlerRef
// ---------------------------------------------------------------------------

/// Opaque reference to whatever executes a capability.
///
/// The store keeps and returns it unchanged; it is never called here.
/// Dispatch layers recover their concrete handler type with
/// [`HandlerRef::downcast_ref`]. Two references are equal when they point at
/// the same handler allocation.
#[derive(Clone)]
pub struct HandlerRef(Arc<dyn Any + Send + Sync>);

impl HandlerRef {
    pub fn new<T: Any + Send + Sync>(handler: T) -> Self {
        Self(Arc::new(handler))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &HandlerRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerRef({:p})", Arc::as_ptr(&self.0))
    }
}

// ---------------------------------------------------------------------------
// StoredCapability
// ---------------------------------------------------------------------------

/// Capability row in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCapability {
    pub definition: CapabilityDef,
    /// `native`, `bundle:<name>` or `mcp:<server>`
    pub source: String,
    pub tags: Vec<String>,
    /// Not indexed
    pub handler: Option<HandlerRef>,
}

impl StoredCapability {
    /// A capability registered directly by the host, without tags or handler.
    pub fn native(definition: CapabilityDef) -> Self {
        Self {
            definition,
            source: SOURCE_NATIVE.to_string(),
            tags: Vec::new(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Name of the owning bundle, if the capability came from one.
    pub fn bundle(&self) -> Option<&str> {
        self.source.strip_prefix(BUNDLE_SOURCE_PREFIX)
    }
}

fn capability_source(capability: &StoredCapability) -> Vec<String> {
    vec![capability.source.clone()]
}

fn capability_tags(capability: &StoredCapability) -> Vec<String> {
    capability.tags.clone()
}

impl Record for StoredCapability {
    const TABLE: &'static str = "capabilities";
    const INDEXES: &'static [IndexSchema<Self>] = &[
        IndexSchema {
            name: INDEX_SOURCE,
            allow_missing: false,
            extract: capability_source,
        },
        IndexSchema {
            name: INDEX_TAGS,
            allow_missing: true,
            extract: capability_tags,
        },
    ];

    fn primary_key(&self) -> &str {
        &self.definition.name
    }

    fn table(tables: &Tables) -> &Table<Self> {
        &tables.capabilities
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        Arc::make_mut(&mut tables.capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capability_yaml() {
        let yaml = r#"
name: "fetch_page"
description: "Fetch and extract text content from a URL"
input_schema:
  type: object
  properties:
    url:
      type: string
  required: [url]
"#;
        let def: CapabilityDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.name, "fetch_page");
        assert_eq!(def.input_schema["required"], json!(["url"]));
    }

    #[test]
    fn test_missing_schema_defaults_to_empty_object() {
        let def: CapabilityDef = serde_yaml::from_str("name: ping").unwrap();
        assert_eq!(def.description, "");
        assert_eq!(def.input_schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_object_schema_helpers() {
        let schema = object_schema(
            [
                ("query", string_param("The search query")),
                ("limit", int_param("Max results")),
                ("mode", enum_param("Search mode", &["fast", "deep"])),
            ],
            &["query"],
        );
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["mode"]["enum"], json!(["fast", "deep"]));
        assert_eq!(schema["required"], json!(["query"]));

        let open = object_schema([("flag", bool_param("A flag"))], &[]);
        assert!(open.get("required").is_none());
    }

    #[test]
    fn test_handler_ref_is_opaque_and_identity_compared() {
        let handler = HandlerRef::new(|input: &str| input.len());
        let copy = handler.clone();
        let other = HandlerRef::new(42u32);

        assert_eq!(handler, copy);
        assert_ne!(handler, other);
        assert_eq!(other.downcast_ref::<u32>(), Some(&42));
        assert!(other.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_bundle_owner_from_source() {
        let mut cap = StoredCapability::native(CapabilityDef::new("calc", "Calculate"));
        assert_eq!(cap.bundle(), None);
        cap.source = bundle_source("math");
        assert_eq!(cap.source, "bundle:math");
        assert_eq!(cap.bundle(), Some("math"));
    }
}
