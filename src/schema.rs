//! Schema tree.
//!
//! Nodes are immutable once built. Children are held behind `Arc`, so
//! [`Schema::with_metadata`] produces a new node that shares every subtree
//! with the original.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::{EnumValue, ScalarKind, TypeDescriptor};

/// Attributes shared by every schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMeta {
    type_: TypeDescriptor,
    name: String,
    description: String,
}

impl SchemaMeta {
    pub fn new(type_: TypeDescriptor, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_,
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.type_
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn with(&self, name: Option<&str>, description: Option<&str>) -> Self {
        Self {
            type_: self.type_.clone(),
            name: name.map_or_else(|| self.name.clone(), String::from),
            description: description.map_or_else(|| self.description.clone(), String::from),
        }
    }
}

/// Ordered property map; keys are the external field names.
pub type Properties = IndexMap<String, Arc<Schema>>;

/// Schema without a known type.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedSchema {
    meta: SchemaMeta,
}

impl MixedSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: SchemaMeta::new(TypeDescriptor::Mixed, name, description),
        }
    }
}

/// Scalar leaf, optionally restricted to literal values.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSchema {
    meta: SchemaMeta,
    enum_values: Option<Vec<EnumValue>>,
}

impl ScalarSchema {
    pub fn new(kind: ScalarKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: SchemaMeta::new(TypeDescriptor::Scalar(kind), name, description),
            enum_values: None,
        }
    }

    /// Restrict to literal values; an empty list clears the restriction.
    pub fn with_enum_values(mut self, values: Option<Vec<EnumValue>>) -> Self {
        self.enum_values = values.filter(|v| !v.is_empty());
        self
    }

    pub fn kind(&self) -> ScalarKind {
        self.meta.type_.scalar_kind().unwrap_or(ScalarKind::String)
    }

    pub fn enum_values(&self) -> Option<&[EnumValue]> {
        self.enum_values.as_deref()
    }
}

/// Object bound to a class (or a class-less document root).
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    meta: SchemaMeta,
    properties: Properties,
    required: Vec<String>,
}

impl ObjectSchema {
    pub fn new(
        type_: TypeDescriptor,
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Properties,
        required: Vec<String>,
    ) -> Self {
        Self {
            meta: SchemaMeta::new(type_, name, description),
            properties,
            required,
        }
    }

    /// Object with no properties.
    pub fn empty(type_: TypeDescriptor, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(type_, name, description, Properties::new(), Vec::new())
    }

    pub fn class_name(&self) -> Option<&str> {
        self.meta.type_.class_name()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties.get(name).map(Arc::as_ref)
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Copy with new metadata, sharing the property subtrees.
    pub fn with_metadata(&self, name: Option<&str>, description: Option<&str>) -> Self {
        Self {
            meta: self.meta.with(name, description),
            properties: self.properties.clone(),
            required: self.required.clone(),
        }
    }
}

/// Object shape without a bound class.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShapeSchema {
    meta: SchemaMeta,
    properties: Properties,
    required: Vec<String>,
}

impl ArrayShapeSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Properties,
        required: Vec<String>,
    ) -> Self {
        Self {
            meta: SchemaMeta::new(TypeDescriptor::Array, name, description),
            properties,
            required,
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// Homogeneous list.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    meta: SchemaMeta,
    item: Arc<Schema>,
}

impl CollectionSchema {
    pub fn new(
        item_type: TypeDescriptor,
        name: impl Into<String>,
        description: impl Into<String>,
        item: Arc<Schema>,
    ) -> Self {
        Self {
            meta: SchemaMeta::new(TypeDescriptor::collection(item_type), name, description),
            item,
        }
    }

    pub fn item(&self) -> &Schema {
        &self.item
    }
}

/// Untyped list.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    meta: SchemaMeta,
}

impl ArraySchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: SchemaMeta::new(TypeDescriptor::Array, name, description),
        }
    }
}

/// Enum with literal values and an optional backing kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    meta: SchemaMeta,
    values: Vec<EnumValue>,
    backing: Option<ScalarKind>,
}

impl EnumSchema {
    pub fn new(
        type_: TypeDescriptor,
        name: impl Into<String>,
        description: impl Into<String>,
        values: Vec<EnumValue>,
        backing: Option<ScalarKind>,
    ) -> Self {
        Self {
            meta: SchemaMeta::new(type_, name, description),
            values,
            backing,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.meta.type_.class_name()
    }

    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    pub fn backing(&self) -> Option<ScalarKind> {
        self.backing
    }
}

/// Placeholder for an object rendered out of line.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRefSchema {
    meta: SchemaMeta,
}

impl ObjectRefSchema {
    pub fn new(type_: TypeDescriptor, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: SchemaMeta::new(type_, name, description),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.meta.type_.class_name()
    }
}

/// A node of the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Mixed(MixedSchema),
    Scalar(ScalarSchema),
    Object(ObjectSchema),
    ArrayShape(ArrayShapeSchema),
    Collection(CollectionSchema),
    Array(ArraySchema),
    Enum(EnumSchema),
    ObjectRef(ObjectRefSchema),
}

impl Schema {
    fn meta(&self) -> &SchemaMeta {
        match self {
            Schema::Mixed(s) => &s.meta,
            Schema::Scalar(s) => &s.meta,
            Schema::Object(s) => &s.meta,
            Schema::ArrayShape(s) => &s.meta,
            Schema::Collection(s) => &s.meta,
            Schema::Array(s) => &s.meta,
            Schema::Enum(s) => &s.meta,
            Schema::ObjectRef(s) => &s.meta,
        }
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        self.meta().type_descriptor()
    }

    pub fn name(&self) -> &str {
        self.meta().name()
    }

    pub fn description(&self) -> &str {
        self.meta().description()
    }

    /// Bound class of object, enum and reference nodes.
    pub fn class_name(&self) -> Option<&str> {
        self.type_descriptor().class_name()
    }

    /// Literal values of enum nodes and restricted scalars.
    pub fn enum_values(&self) -> Option<&[EnumValue]> {
        match self {
            Schema::Enum(s) => Some(s.values()),
            Schema::Scalar(s) => s.enum_values(),
            _ => None,
        }
    }

    /// Property map of object and shape nodes.
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            Schema::Object(s) => Some(&s.properties),
            Schema::ArrayShape(s) => Some(&s.properties),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties()?.get(name).map(Arc::as_ref)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties()
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn required(&self) -> &[String] {
        match self {
            Schema::Object(s) => &s.required,
            Schema::ArrayShape(s) => &s.required,
            _ => &[],
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Schema::Scalar(s) if s.enum_values.is_none())
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Schema::Object(_) | Schema::ObjectRef(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Schema::Enum(_)) || matches!(self, Schema::Scalar(s) if s.enum_values.is_some())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Schema::Array(_) | Schema::Collection(_) | Schema::ArrayShape(_))
    }

    /// Copy of this node with replaced name and/or description; children are shared.
    pub fn with_metadata(&self, name: Option<&str>, description: Option<&str>) -> Schema {
        let meta = self.meta().with(name, description);
        match self {
            Schema::Mixed(_) => Schema::Mixed(MixedSchema { meta }),
            Schema::Scalar(s) => Schema::Scalar(ScalarSchema {
                meta,
                enum_values: s.enum_values.clone(),
            }),
            Schema::Object(s) => Schema::Object(ObjectSchema {
                meta,
                properties: s.properties.clone(),
                required: s.required.clone(),
            }),
            Schema::ArrayShape(s) => Schema::ArrayShape(ArrayShapeSchema {
                meta,
                properties: s.properties.clone(),
                required: s.required.clone(),
            }),
            Schema::Collection(s) => Schema::Collection(CollectionSchema {
                meta,
                item: Arc::clone(&s.item),
            }),
            Schema::Array(_) => Schema::Array(ArraySchema { meta }),
            Schema::Enum(s) => Schema::Enum(EnumSchema {
                meta,
                values: s.values.clone(),
                backing: s.backing,
            }),
            Schema::ObjectRef(_) => Schema::ObjectRef(ObjectRefSchema { meta }),
        }
    }
}

macro_rules! impl_node_meta {
    ($($node:ident),* $(,)?) => {
        $(
            impl $node {
                pub fn name(&self) -> &str {
                    self.meta.name()
                }

                pub fn description(&self) -> &str {
                    self.meta.description()
                }

                pub fn type_descriptor(&self) -> &TypeDescriptor {
                    self.meta.type_descriptor()
                }
            }
        )*
    };
}

impl_node_meta!(
    MixedSchema,
    ScalarSchema,
    ObjectSchema,
    ArrayShapeSchema,
    CollectionSchema,
    ArraySchema,
    EnumSchema,
    ObjectRefSchema,
);

macro_rules! impl_from_node {
    ($($node:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$node> for Schema {
                fn from(node: $node) -> Self {
                    Schema::$variant(node)
                }
            }
        )*
    };
}

impl_from_node! {
    MixedSchema => Mixed,
    ScalarSchema => Scalar,
    ObjectSchema => Object,
    ArrayShapeSchema => ArrayShape,
    CollectionSchema => Collection,
    ArraySchema => Array,
    EnumSchema => Enum,
    ObjectRefSchema => ObjectRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ObjectSchema {
        let mut properties = Properties::new();
        properties.insert(
            "id".to_string(),
            Arc::new(ScalarSchema::new(ScalarKind::Int, "id", "").into()),
        );
        ObjectSchema::new(
            TypeDescriptor::Object("App\\User".into()),
            "User",
            "A user",
            properties,
            vec!["id".to_string()],
        )
    }

    #[test]
    fn with_metadata_shares_children() {
        let original = Schema::from(user());
        let renamed = original.with_metadata(Some("Account"), None);

        assert_eq!(renamed.name(), "Account");
        assert_eq!(renamed.description(), "A user");
        assert_eq!(original.name(), "User");

        let (Some(a), Some(b)) = (original.properties(), renamed.properties()) else {
            panic!("expected object properties");
        };
        assert!(Arc::ptr_eq(&a["id"], &b["id"]));
    }

    #[test]
    fn accessors() {
        let schema = Schema::from(user());
        assert_eq!(schema.class_name(), Some("App\\User"));
        assert_eq!(schema.property_names(), vec!["id"]);
        assert_eq!(schema.required(), ["id".to_string()]);
        assert!(schema.is_object());
        assert!(schema.has_property("id"));
        assert!(!schema.has_property("name"));
    }

    #[test]
    fn scalar_enum_restriction() {
        let plain = Schema::from(ScalarSchema::new(ScalarKind::String, "", ""));
        assert!(plain.is_scalar());
        assert!(!plain.is_enum());

        let restricted = Schema::from(
            ScalarSchema::new(ScalarKind::String, "", "")
                .with_enum_values(Some(vec!["a".into(), "b".into()])),
        );
        assert!(restricted.is_enum());
        assert_eq!(restricted.enum_values().map(<[EnumValue]>::len), Some(2));

        let cleared = ScalarSchema::new(ScalarKind::String, "", "").with_enum_values(Some(vec![]));
        assert!(cleared.enum_values().is_none());
    }
}
