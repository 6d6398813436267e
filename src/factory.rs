//! Schema building - turns classes, type expressions and runtime values into
//! schema trees.
//!
//! # Object expansion
//!
//! Objects are expanded inline. Each class may appear at most
//! [`MAX_INLINE_DEPTH`] times on the current expansion chain; deeper
//! occurrences become objects with no properties, which terminates
//! self-referential class graphs.
//!
//! With object references enabled, every nested object (never the root)
//! becomes an [`ObjectRefSchema`] and the reference listener is notified with
//! the class name.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{SchemaError, SchemaMappingError};
use crate::parser::JsonSchemaParser;
use crate::reflection::{ClassInfo, PropertyInfo};
use crate::registry::ClassSource;
use crate::renderer::JsonSchemaRenderer;
use crate::schema::{
    ArraySchema, CollectionSchema, EnumSchema, MixedSchema, ObjectRefSchema, ObjectSchema,
    Properties, ScalarSchema, Schema,
};
use crate::type_resolver::{TypeResolver, TypeSpec};
use crate::types::{EnumValue, RuntimeValue, ScalarKind, TypeDescriptor};

/// Number of times one class may be inlined on a single expansion chain.
pub const MAX_INLINE_DEPTH: usize = 2;

const VALUE_NAME: &str = "value";
const VALUE_DESCRIPTION: &str = "Correctly extracted value";
const ITEM_NAME: &str = "item";

/// A value that describes itself as a ready schema tree.
pub trait SchemaProvider {
    fn to_schema(&self) -> Schema;
}

/// A value that describes itself as a JSON Schema document.
pub trait JsonSchemaProvider {
    fn to_json_schema(&self) -> Value;
}

/// Anything [`SchemaFactory::schema`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaInput {
    /// Returned unchanged.
    Schema(Schema),
    /// Parsed as a root object document.
    JsonSchema(Value),
    /// Resolved, then built.
    Type(TypeSpec),
}

impl SchemaInput {
    pub fn from_provider(provider: &dyn SchemaProvider) -> Self {
        SchemaInput::Schema(provider.to_schema())
    }

    pub fn from_json_provider(provider: &dyn JsonSchemaProvider) -> Self {
        SchemaInput::JsonSchema(provider.to_json_schema())
    }
}

impl From<Value> for SchemaInput {
    fn from(value: Value) -> Self {
        SchemaInput::JsonSchema(value)
    }
}

impl From<Schema> for SchemaInput {
    fn from(value: Schema) -> Self {
        SchemaInput::Schema(value)
    }
}

impl From<ObjectSchema> for SchemaInput {
    fn from(value: ObjectSchema) -> Self {
        SchemaInput::Schema(value.into())
    }
}

impl From<TypeSpec> for SchemaInput {
    fn from(value: TypeSpec) -> Self {
        SchemaInput::Type(value)
    }
}

macro_rules! impl_type_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SchemaInput {
                fn from(value: $ty) -> Self {
                    SchemaInput::Type(TypeSpec::from(value))
                }
            }
        )*
    };
}

impl_type_input!(&str, String, TypeDescriptor, RuntimeValue);

macro_rules! impl_value_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SchemaInput {
                fn from(value: $ty) -> Self {
                    SchemaInput::Type(TypeSpec::Value(RuntimeValue::from(value)))
                }
            }
        )*
    };
}

impl_value_input!(i64, i32, f64, bool);

/// Builds schema trees from class metadata.
///
/// Each factory owns its caches; build calls on one instance must not run
/// concurrently.
pub struct SchemaFactory<'a> {
    source: &'a dyn ClassSource,
    resolver: TypeResolver<'a>,
    use_object_references: bool,
    schema_cache: HashMap<String, Schema>,
    property_cache: HashMap<String, Arc<Schema>>,
    expansion_depth: BTreeMap<String, usize>,
    reference_listener: Option<Box<dyn FnMut(&str) + 'a>>,
    parser: JsonSchemaParser,
    renderer: JsonSchemaRenderer,
}

impl<'a> SchemaFactory<'a> {
    pub fn new(source: &'a dyn ClassSource) -> Self {
        Self {
            source,
            resolver: TypeResolver::new(source),
            use_object_references: false,
            schema_cache: HashMap::new(),
            property_cache: HashMap::new(),
            expansion_depth: BTreeMap::new(),
            reference_listener: None,
            parser: JsonSchemaParser::default(),
            renderer: JsonSchemaRenderer::default(),
        }
    }

    /// Emit nested objects as references instead of inlining them.
    pub fn use_object_references(mut self, enabled: bool) -> Self {
        self.use_object_references = enabled;
        self
    }

    pub fn with_parser(mut self, parser: JsonSchemaParser) -> Self {
        self.parser = parser;
        self
    }

    /// Called with the class name each time an object reference is built.
    pub fn on_object_reference(mut self, listener: impl FnMut(&str) + 'a) -> Self {
        self.reference_listener = Some(Box::new(listener));
        self
    }

    pub fn uses_object_references(&self) -> bool {
        self.use_object_references
    }

    pub fn source(&self) -> &'a dyn ClassSource {
        self.source
    }

    pub fn parser(&self) -> &JsonSchemaParser {
        &self.parser
    }

    pub fn renderer(&self) -> &JsonSchemaRenderer {
        &self.renderer
    }

    /// Copy of `schema` with a new name and/or description.
    pub fn with_metadata(schema: &Schema, name: Option<&str>, description: Option<&str>) -> Schema {
        schema.with_metadata(name, description)
    }

    /// Build a schema for a class name, type expression, descriptor or
    /// runtime value. A `Schema` is returned as is and a JSON Schema document
    /// is parsed without defaults.
    ///
    /// Results are cached per canonical type.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the type cannot be resolved or mapped, or the
    /// document cannot be parsed.
    pub fn schema(&mut self, input: impl Into<SchemaInput>) -> Result<Schema, SchemaError> {
        let spec = match input.into() {
            SchemaInput::Schema(schema) => return Ok(schema),
            SchemaInput::JsonSchema(document) => return Ok(self.parser.parse(&document)?.into()),
            SchemaInput::Type(spec) => spec,
        };

        let descriptor = self.resolver.resolve(spec)?;
        let key = descriptor.cache_key();
        if let Some(cached) = self.schema_cache.get(&key) {
            trace!(key = %key, "schema cache hit");
            return Ok(cached.clone());
        }

        let schema = self.make_schema(&descriptor)?;
        self.schema_cache.insert(key, schema.clone());
        Ok(schema)
    }

    /// Build a property-level schema for a type.
    pub fn property_schema(
        &mut self,
        type_: TypeDescriptor,
        name: &str,
        description: &str,
        enum_values: Option<Vec<EnumValue>>,
    ) -> Result<Schema, SchemaError> {
        let type_ = self.resolver.normalize(type_)?;
        self.make_property_schema(&type_, name, description, enum_values)
    }

    pub fn from_type(
        &mut self,
        spec: impl Into<TypeSpec>,
        name: &str,
        description: &str,
    ) -> Result<Schema, SchemaError> {
        let type_ = self.resolver.resolve(spec)?;
        self.make_property_schema(&type_, name, description, None)
    }

    pub fn string(&self, name: &str, description: &str) -> ScalarSchema {
        ScalarSchema::new(ScalarKind::String, name, description)
    }

    pub fn int(&self, name: &str, description: &str) -> ScalarSchema {
        ScalarSchema::new(ScalarKind::Int, name, description)
    }

    pub fn float(&self, name: &str, description: &str) -> ScalarSchema {
        ScalarSchema::new(ScalarKind::Float, name, description)
    }

    pub fn bool(&self, name: &str, description: &str) -> ScalarSchema {
        ScalarSchema::new(ScalarKind::Bool, name, description)
    }

    pub fn array(&self, name: &str, description: &str) -> ArraySchema {
        ArraySchema::new(name, description)
    }

    /// Object schema for `class`.
    ///
    /// Empty arguments are filled from the class: name from the class name,
    /// description from its annotations, properties and required list from
    /// its metadata.
    pub fn object(
        &mut self,
        class: &str,
        name: &str,
        description: &str,
        properties: Properties,
        required: Vec<String>,
    ) -> Result<ObjectSchema, SchemaError> {
        let info = ClassInfo::new(self.source, class)?;
        let properties = if properties.is_empty() {
            self.property_schemas(&info)?
        } else {
            properties
        };
        let required = if required.is_empty() {
            info.required_properties()?
        } else {
            required
        };

        Ok(ObjectSchema::new(
            TypeDescriptor::object(info.class())?,
            non_empty_or(name, info.class()),
            non_empty_or(description, &info.description()),
            properties,
            required,
        ))
    }

    pub fn enumeration(
        &self,
        class: &str,
        name: &str,
        description: &str,
    ) -> Result<EnumSchema, SchemaError> {
        let info = ClassInfo::new(self.source, class)?;
        Ok(EnumSchema::new(
            TypeDescriptor::enumeration(info.class())?,
            name,
            description,
            info.enum_values(),
            info.backing_kind(),
        ))
    }

    /// Collection of `item_type`; the item schema is built unless given.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMappingError::InvalidCollectionNestedType` when the item
    /// type is itself an array or collection.
    pub fn collection(
        &mut self,
        item_type: &str,
        name: &str,
        description: &str,
        item_schema: Option<Schema>,
    ) -> Result<CollectionSchema, SchemaError> {
        let item_type = self.resolver.resolve_expression(item_type)?;
        let item = match item_schema {
            Some(schema) => schema,
            None => self.make_item_schema(&item_type)?,
        };
        Ok(CollectionSchema::new(item_type, name, description, Arc::new(item)))
    }

    /// Object schema named after the fully-qualified class name.
    pub fn from_class_info(&mut self, info: &ClassInfo<'a>) -> Result<ObjectSchema, SchemaError> {
        Ok(ObjectSchema::new(
            TypeDescriptor::object(info.class())?,
            info.class(),
            info.description(),
            self.property_schemas(info)?,
            info.required_properties()?,
        ))
    }

    pub fn from_property_info(&mut self, info: &PropertyInfo<'a>) -> Result<Schema, SchemaError> {
        let type_ = info.type_descriptor()?;
        self.make_property_schema(&type_, info.name(), &info.description(), None)
    }

    pub fn to_json_schema(&self, schema: &Schema) -> Value {
        self.renderer.render(schema)
    }

    /// Render, calling `on_object_ref` for every `$ref` emitted.
    pub fn to_json_schema_with(&self, schema: &Schema, on_object_ref: &mut dyn FnMut(&str)) -> Value {
        self.renderer.render_with(schema, on_object_ref)
    }

    pub fn from_json_schema(
        &self,
        document: &Value,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ObjectSchema, SchemaError> {
        Ok(self.parser.from_json_schema(document, name, description)?)
    }

    // --- Internals ---

    fn property_schemas(&mut self, info: &ClassInfo<'a>) -> Result<Properties, SchemaError> {
        let mut properties = Properties::new();
        for property in info.properties() {
            if !property.is_deserializable() {
                continue;
            }

            // the truncation of a nested object depends on the expansion chain
            let key = format!(
                "{}::{}@{}",
                property.class(),
                property.name(),
                self.expansion_signature()
            );
            let schema = match self.property_cache.get(&key) {
                Some(cached) => {
                    trace!(key = %key, "property cache hit");
                    Arc::clone(cached)
                }
                None => {
                    let built = Arc::new(self.from_property_info(property)?);
                    self.property_cache.insert(key, Arc::clone(&built));
                    built
                }
            };
            properties.insert(property.name().to_string(), schema);
        }
        Ok(properties)
    }

    /// Canonical form of the current expansion chain, e.g. `App\A:1,App\B:2`.
    fn expansion_signature(&self) -> String {
        self.expansion_depth
            .iter()
            .map(|(class, depth)| format!("{}:{}", class, depth))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Root-level mapping.
    fn make_schema(&mut self, type_: &TypeDescriptor) -> Result<Schema, SchemaError> {
        match type_ {
            TypeDescriptor::Collection(item) => {
                let item_schema = self.make_item_schema(item)?;
                Ok(CollectionSchema::new((**item).clone(), "", "", Arc::new(item_schema)).into())
            }
            TypeDescriptor::Enum(class) => {
                let description = self.class_description(class);
                Ok(self.enum_schema(type_, class, &description, None).into())
            }
            TypeDescriptor::Object(class) => {
                let description = self.class_description(class);
                self.make_object_schema(type_, &type_.short_name(), &description, false)
            }
            TypeDescriptor::AnonymousObject => Ok(ObjectSchema::empty(type_.clone(), "", "").into()),
            TypeDescriptor::Array => Ok(ArraySchema::new("", "").into()),
            TypeDescriptor::Scalar(kind) => {
                Ok(ScalarSchema::new(*kind, VALUE_NAME, VALUE_DESCRIPTION).into())
            }
            TypeDescriptor::Mixed => Ok(MixedSchema::new(VALUE_NAME, VALUE_DESCRIPTION).into()),
            TypeDescriptor::Union(_) => Err(unknown_type(type_)),
        }
    }

    /// Property-level mapping; objects may become references.
    fn make_property_schema(
        &mut self,
        type_: &TypeDescriptor,
        name: &str,
        description: &str,
        enum_values: Option<Vec<EnumValue>>,
    ) -> Result<Schema, SchemaError> {
        match type_ {
            TypeDescriptor::Collection(item) => {
                let item_schema = self.make_item_schema(item)?;
                Ok(CollectionSchema::new((**item).clone(), name, description, Arc::new(item_schema)).into())
            }
            TypeDescriptor::Enum(_) => {
                Ok(self.enum_schema(type_, name, description, enum_values).into())
            }
            TypeDescriptor::Object(_) => self.make_object_schema(type_, name, description, true),
            TypeDescriptor::Scalar(kind) => Ok(ScalarSchema::new(*kind, name, description)
                .with_enum_values(enum_values)
                .into()),
            TypeDescriptor::AnonymousObject => {
                Ok(ObjectSchema::empty(type_.clone(), name, description).into())
            }
            TypeDescriptor::Array => Ok(ArraySchema::new(name, description).into()),
            TypeDescriptor::Mixed => Ok(MixedSchema::new(name, description).into()),
            TypeDescriptor::Union(_) => Err(unknown_type(type_)),
        }
    }

    /// Collection item mapping; nested arrays are rejected.
    fn make_item_schema(&mut self, item: &TypeDescriptor) -> Result<Schema, SchemaError> {
        let description = format!("Correctly extract items of type: {}", item.short_name());
        match item {
            TypeDescriptor::Collection(_) | TypeDescriptor::Array => {
                Err(SchemaMappingError::InvalidCollectionNestedType {
                    type_name: item.to_string(),
                }
                .into())
            }
            TypeDescriptor::Object(_) => self.make_object_schema(item, ITEM_NAME, &description, true),
            TypeDescriptor::Enum(_) => Ok(self.enum_schema(item, ITEM_NAME, &description, None).into()),
            TypeDescriptor::Scalar(kind) => Ok(ScalarSchema::new(*kind, ITEM_NAME, description).into()),
            TypeDescriptor::AnonymousObject => {
                Ok(ObjectSchema::empty(item.clone(), ITEM_NAME, description).into())
            }
            TypeDescriptor::Mixed => Ok(MixedSchema::new(ITEM_NAME, description).into()),
            TypeDescriptor::Union(_) => Err(unknown_type(item)),
        }
    }

    fn make_object_schema(
        &mut self,
        type_: &TypeDescriptor,
        name: &str,
        description: &str,
        allow_reference: bool,
    ) -> Result<Schema, SchemaError> {
        let class = type_.class_name().unwrap_or_default();

        if self.use_object_references && allow_reference {
            debug!(class, "creating object reference");
            if let Some(listener) = self.reference_listener.as_mut() {
                listener(class);
            }
            return Ok(ObjectRefSchema::new(type_.clone(), name, description).into());
        }

        if !self.source.has_class(class) {
            return Ok(ObjectSchema::empty(type_.clone(), name, description).into());
        }

        let depth = self.expansion_depth.get(class).copied().unwrap_or(0);
        if depth >= MAX_INLINE_DEPTH {
            debug!(class, depth, "inline expansion depth reached");
            return Ok(ObjectSchema::empty(type_.clone(), name, description).into());
        }

        self.expansion_depth.insert(class.to_string(), depth + 1);
        let result = self.expand_object(type_, class, name, description);
        if depth == 0 {
            self.expansion_depth.remove(class);
        } else {
            self.expansion_depth.insert(class.to_string(), depth);
        }
        result
    }

    fn expand_object(
        &mut self,
        type_: &TypeDescriptor,
        class: &str,
        name: &str,
        description: &str,
    ) -> Result<Schema, SchemaError> {
        let info = ClassInfo::new(self.source, class)?;
        let properties = self.property_schemas(&info)?;
        let required = info.required_properties()?;
        Ok(ObjectSchema::new(type_.clone(), name, description, properties, required).into())
    }

    fn enum_schema(
        &self,
        type_: &TypeDescriptor,
        name: &str,
        description: &str,
        enum_values: Option<Vec<EnumValue>>,
    ) -> EnumSchema {
        let info = type_
            .class_name()
            .and_then(|class| ClassInfo::new(self.source, class).ok());
        let (values, backing) = match info {
            Some(info) => (info.enum_values(), info.backing_kind()),
            None => (Vec::new(), None),
        };
        EnumSchema::new(
            type_.clone(),
            name,
            description,
            enum_values.unwrap_or(values),
            backing,
        )
    }

    fn class_description(&self, class: &str) -> String {
        ClassInfo::new(self.source, class)
            .map(|info| info.description())
            .unwrap_or_default()
    }
}

fn unknown_type(type_: &TypeDescriptor) -> SchemaError {
    SchemaMappingError::UnknownSchemaType {
        type_name: type_.to_string(),
    }
    .into()
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
