//! Error types for type resolution, class metadata lookup, schema building and parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while turning a type expression, descriptor or runtime value into a
/// normalized `TypeDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeResolutionError {
    #[error("type specification cannot be empty")]
    EmptySpecification,

    #[error("object type must have a class name: {source_type}")]
    MissingObjectClass { source_type: String },

    #[error("enum type must have a class: {source_type}")]
    MissingEnumClass { source_type: String },

    #[error("unsupported type: {source_type}")]
    UnsupportedType { source_type: String },

    #[error("union types with multiple non-null branches are not supported: {source_type}")]
    UnsupportedUnion { source_type: String },

    #[error("invalid type expression `{source_type}`: {message}")]
    InvalidSyntax {
        source_type: String,
        message: String,
    },
}

/// Errors raised by the class metadata adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectionError {
    #[error("cannot create ClassInfo for `{class}`")]
    ClassNotFound { class: String },

    #[error("property `{property}` not found in class `{class}`")]
    PropertyNotFound { property: String, class: String },

    #[error("method `{method}` not found in class `{class}`")]
    MethodNotFound { method: String, class: String },

    #[error("function `{function}` not found")]
    FunctionNotFound { function: String },

    #[error("parameter `{parameter}` not found in function `{function}`")]
    ParameterNotFound { parameter: String, function: String },
}

/// Errors while mapping a `TypeDescriptor` onto a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMappingError {
    #[error("unknown type: {type_name}")]
    UnknownSchemaType { type_name: String },

    #[error("collections cannot contain nested type: {type_name}")]
    InvalidCollectionNestedType { type_name: String },
}

/// Errors while reading a JSON Schema document into a schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaParsingError {
    #[error("root JSON Schema must be an object, got: {type_name}")]
    NonObjectRoot { type_name: String },

    #[error("collection must define `items` schema at {path}")]
    MissingCollectionItems { path: String },

    #[error("unsupported type {type_name} at {path}")]
    UnsupportedType { path: String, type_name: String },

    #[error("enum values at {path} require a scalar type or a bound class")]
    NonScalarEnum { path: String },
}

/// Umbrella error for factory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),

    #[error(transparent)]
    Reflection(#[from] ReflectionError),

    #[error(transparent)]
    Mapping(#[from] SchemaMappingError),

    #[error(transparent)]
    Parsing(#[from] SchemaParsingError),
}

impl SchemaError {
    /// Returns the exit code for this error type.
    ///
    /// All schema errors are input errors; IO lives in `LoadError`.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while loading documents and class registries.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid class registry: {source}")]
    InvalidRegistry {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}
