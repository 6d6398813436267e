//! Core types: normalized type descriptors, runtime values and wire constants.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeResolutionError;

/// Label of the definitions map in rendered documents.
pub const DEFS_LABEL: &str = "$defs";

/// Extension key carrying the fully-qualified bound class name.
pub const CLASS_TAG: &str = "x-php-class";

/// Extension key carrying the human label of a schema node.
pub const TITLE_TAG: &str = "x-title";

/// Built-in classes rendered as strings instead of objects.
pub const DATE_TIME_CLASSES: &[&str] = &["DateTime", "DateTimeImmutable"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strips a leading namespace separator from a class name.
pub fn normalize_class_name(class: &str) -> &str {
    class.trim().trim_start_matches('\\')
}

/// Key of a class in the definitions map (`App\Models\User` -> `App.Models.User`).
pub fn class_key(class: &str) -> String {
    normalize_class_name(class).replace('\\', ".")
}

/// Last segment of a namespaced class name.
pub fn short_class_name(class: &str) -> &str {
    let class = normalize_class_name(class);
    class.rsplit('\\').next().unwrap_or(class)
}

/// Returns true for classes rendered as `{type: string}`.
pub fn is_date_time_class(class: &str) -> bool {
    DATE_TIME_CLASSES.contains(&normalize_class_name(class))
}

/// Primitive type tokens of a JSON Schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl JsonType {
    /// Parse a `type` token. Returns `None` for unknown tokens.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            "string" => Some(JsonType::String),
            "integer" => Some(JsonType::Integer),
            "number" => Some(JsonType::Number),
            "boolean" => Some(JsonType::Boolean),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Null => "null",
        }
    }

    /// Scalar kind for primitive tokens, `None` for object/array/null.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            JsonType::String => Some(ScalarKind::String),
            JsonType::Integer => Some(ScalarKind::Int),
            JsonType::Number => Some(ScalarKind::Float),
            JsonType::Boolean => Some(ScalarKind::Bool),
            _ => None,
        }
    }
}

/// Scalar kinds of the host type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "double")]
    Float,
    String,
    #[serde(alias = "boolean")]
    Bool,
}

impl ScalarKind {
    /// Parse a scalar type keyword (`int`, `integer`, `true`, ...).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(ScalarKind::Int),
            "float" | "double" => Some(ScalarKind::Float),
            "string" => Some(ScalarKind::String),
            // literal booleans normalize to the generic bool
            "bool" | "boolean" | "true" | "false" => Some(ScalarKind::Bool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
        }
    }

    pub fn json_type(&self) -> JsonType {
        match self {
            ScalarKind::Int => JsonType::Integer,
            ScalarKind::Float => JsonType::Number,
            ScalarKind::String => JsonType::String,
            ScalarKind::Bool => JsonType::Boolean,
        }
    }
}

/// A literal enum value: string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Int(i64),
    Str(String),
}

impl EnumValue {
    /// Converts a JSON literal; other JSON kinds are not enum values.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(EnumValue::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(EnumValue::Int),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            EnumValue::Int(i) => Value::from(*i),
            EnumValue::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for EnumValue {
    fn from(value: &str) -> Self {
        EnumValue::Str(value.to_string())
    }
}

impl From<i64> for EnumValue {
    fn from(value: i64) -> Self {
        EnumValue::Int(value)
    }
}

/// Normalized, language-agnostic description of a value's type shape.
///
/// Two descriptors with the same canonical string (`Display`) are
/// interchangeable; the canonical string is used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    Object(String),
    /// Object shape with no bound class, such as an untagged document root.
    AnonymousObject,
    Enum(String),
    /// Untyped list or map.
    Array,
    /// Homogeneous list with a known, non-mixed item type.
    Collection(Box<TypeDescriptor>),
    /// Raw union; normalization removes it or rejects it.
    Union(Vec<TypeDescriptor>),
    Mixed,
}

impl TypeDescriptor {
    /// Object descriptor bound to `class`.
    pub fn object(class: &str) -> Result<Self, TypeResolutionError> {
        let class = normalize_class_name(class);
        if class.is_empty() {
            return Err(TypeResolutionError::MissingObjectClass {
                source_type: "object".into(),
            });
        }
        Ok(TypeDescriptor::Object(class.to_string()))
    }

    /// Enum descriptor bound to `class`.
    pub fn enumeration(class: &str) -> Result<Self, TypeResolutionError> {
        let class = normalize_class_name(class);
        if class.is_empty() {
            return Err(TypeResolutionError::MissingEnumClass {
                source_type: "enum".into(),
            });
        }
        Ok(TypeDescriptor::Enum(class.to_string()))
    }

    /// Collection of `item`; a mixed item collapses to a plain `Array`.
    pub fn collection(item: TypeDescriptor) -> Self {
        match item {
            TypeDescriptor::Mixed => TypeDescriptor::Array,
            item => TypeDescriptor::Collection(Box::new(item)),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Object(class) | TypeDescriptor::Enum(class) => Some(class),
            _ => None,
        }
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            TypeDescriptor::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn item_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Collection(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeDescriptor::Object(_) | TypeDescriptor::AnonymousObject)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, TypeDescriptor::Enum(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDescriptor::Collection(_))
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, TypeDescriptor::Mixed)
    }

    pub fn is_date_time(&self) -> bool {
        matches!(self, TypeDescriptor::Object(class) if is_date_time_class(class))
    }

    /// Short class name for class-bound types, canonical form otherwise.
    pub fn short_name(&self) -> String {
        match self.class_name() {
            Some(class) => short_class_name(class).to_string(),
            None => self.to_string(),
        }
    }

    /// Canonical string form used as a cache key.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }

    /// JSON primitive kind of the descriptor, `None` for mixed and unions.
    pub fn json_type(&self) -> Option<JsonType> {
        match self {
            TypeDescriptor::Scalar(kind) => Some(kind.json_type()),
            TypeDescriptor::Object(_) | TypeDescriptor::AnonymousObject => Some(JsonType::Object),
            TypeDescriptor::Array | TypeDescriptor::Collection(_) => Some(JsonType::Array),
            // enum kind depends on the backing type, not on the descriptor
            TypeDescriptor::Enum(_) | TypeDescriptor::Union(_) | TypeDescriptor::Mixed => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => f.write_str(kind.as_str()),
            TypeDescriptor::Object(class) | TypeDescriptor::Enum(class) => f.write_str(class),
            TypeDescriptor::AnonymousObject => f.write_str("object"),
            TypeDescriptor::Array => f.write_str("array"),
            TypeDescriptor::Collection(item) => write!(f, "list<{}>", item),
            TypeDescriptor::Union(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}", branch)?;
                }
                Ok(())
            }
            TypeDescriptor::Mixed => f.write_str("mixed"),
        }
    }
}

/// A concrete runtime value whose type can be inferred.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RuntimeValue>),
    /// Keyed container; typed by its values.
    Map(IndexMap<String, RuntimeValue>),
    /// Instance of a registered class or enum.
    Instance { class: String },
    /// Values with no schema counterpart (open handles, closures, ...).
    Opaque,
}

impl RuntimeValue {
    pub fn instance(class: impl Into<String>) -> Self {
        RuntimeValue::Instance {
            class: class.into(),
        }
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        RuntimeValue::Bool(value)
    }
}

impl From<i64> for RuntimeValue {
    fn from(value: i64) -> Self {
        RuntimeValue::Int(value)
    }
}

impl From<i32> for RuntimeValue {
    fn from(value: i32) -> Self {
        RuntimeValue::Int(value.into())
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        RuntimeValue::Float(value)
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::Str(value.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        RuntimeValue::Str(value)
    }
}

impl<T: Into<RuntimeValue>> From<Vec<T>> for RuntimeValue {
    fn from(values: Vec<T>) -> Self {
        RuntimeValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for RuntimeValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RuntimeValue::Null,
            Value::Bool(b) => RuntimeValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RuntimeValue::Int(i),
                None => n.as_f64().map(RuntimeValue::Float).unwrap_or(RuntimeValue::Opaque),
            },
            Value::String(s) => RuntimeValue::Str(s.clone()),
            Value::Array(items) => RuntimeValue::List(items.iter().map(RuntimeValue::from).collect()),
            Value::Object(map) => RuntimeValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), RuntimeValue::from(v)))
                    .collect(),
            ),
        }
    }
}
