//! Class Schema
//!
//! Bidirectional mapping between class metadata and JSON Schema documents.
//!
//! Class metadata (properties, types, descriptions, enum cases) is served by a
//! [`ClassSource`], usually a [`ClassRegistry`] built in code or loaded from a
//! JSON manifest. A [`SchemaFactory`] turns classes, type expressions and
//! runtime values into schema trees, which render to JSON Schema and parse back.
//!
//! # Example
//!
//! ```
//! use class_schema::{ClassDef, ClassRegistry, PropertyDef, SchemaFactory};
//!
//! let registry = ClassRegistry::new().with(
//!     ClassDef::class("App\\User")
//!         .described("A registered user")
//!         .property(PropertyDef::public("name", Some("string")))
//!         .property(PropertyDef::public("age", Some("?int"))),
//! );
//!
//! let mut factory = SchemaFactory::new(&registry);
//! let schema = factory.schema("App\\User").unwrap();
//! let document = factory.to_json_schema(&schema);
//!
//! assert_eq!(document["type"], "object");
//! assert_eq!(document["x-title"], "User");
//! assert_eq!(document["x-php-class"], "App\\User");
//! assert_eq!(document["properties"]["name"]["type"], "string");
//! assert_eq!(document["required"], serde_json::json!(["name"]));
//! assert_eq!(document["additionalProperties"], false);
//! ```
//!
//! # Type mapping
//!
//! | Type expression | Rendered as |
//! |-----------------|-------------|
//! | `int`, `float`, `string`, `bool` | `integer`, `number`, `string`, `boolean` |
//! | `?T`, `T\|null` | `T` (the property is not required) |
//! | `int\|float` | `number` |
//! | `string\|int` | untyped (mixed) |
//! | `T[]`, `array<T>`, `list<T>` | `{type: array, items: T}` |
//! | `array` | `{type: array}` with open items |
//! | class name | inline object, or `$ref` with object references |
//! | enum name | `{type: string\|integer, enum: [...]}` |
//! | `DateTime`, `DateTimeImmutable` | `{type: string}` |

pub mod descriptions;
mod error;
mod factory;
mod loader;
mod parser;
mod reflection;
mod registry;
mod renderer;
mod schema;
mod tool_call;
mod type_resolver;
mod types;

pub use error::{
    LoadError, ReflectionError, SchemaError, SchemaMappingError, SchemaParsingError,
    TypeResolutionError,
};
pub use factory::{
    JsonSchemaProvider, SchemaFactory, SchemaInput, SchemaProvider, MAX_INLINE_DEPTH,
};
pub use loader::{load_document, load_document_str, load_registry, load_registry_str};
pub use parser::{JsonSchemaParser, DEFAULT_DESCRIPTION, DEFAULT_NAME};
pub use reflection::{ClassInfo, FunctionInfo, PropertyFilter, PropertyInfo};
pub use registry::{
    Annotation, ClassDef, ClassKind, ClassRegistry, ClassSource, EnumCaseDef, FunctionDef,
    ParamDef, PropertyDef, RegistryManifest, Visibility,
};
pub use renderer::{open_items, JsonSchemaRenderer};
pub use schema::{
    ArraySchema, ArrayShapeSchema, CollectionSchema, EnumSchema, MixedSchema, ObjectRefSchema,
    ObjectSchema, Properties, ScalarSchema, Schema, SchemaMeta,
};
pub use tool_call::{render_with_definitions, tool_call};
pub use type_resolver::{expression_allows_null, TypeExpr, TypeResolver, TypeSpec};
pub use types::{
    class_key, json_type_name, normalize_class_name, short_class_name, EnumValue, JsonType,
    RuntimeValue, ScalarKind, TypeDescriptor, CLASS_TAG, DEFS_LABEL, TITLE_TAG,
};
