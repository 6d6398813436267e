//! JSON Schema parsing - turns a JSON Schema document into a schema tree.
//!
//! Class identity comes only from the `x-php-class` tag; no class metadata is
//! consulted. A `null` entry in a `type` list marks nullability and is
//! otherwise ignored.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SchemaParsingError;
use crate::renderer::open_items;
use crate::schema::{
    ArraySchema, ArrayShapeSchema, CollectionSchema, EnumSchema, MixedSchema, ObjectSchema,
    Properties, ScalarSchema, Schema,
};
use crate::types::{
    is_date_time_class, json_type_name, EnumValue, JsonType, TypeDescriptor, CLASS_TAG, TITLE_TAG,
};

/// Default root name applied by [`JsonSchemaParser::from_json_schema`].
pub const DEFAULT_NAME: &str = "extract_object";

/// Default root description applied by [`JsonSchemaParser::from_json_schema`].
pub const DEFAULT_DESCRIPTION: &str = "Extract data from chat content";

/// Parses JSON Schema documents into [`ObjectSchema`] trees.
#[derive(Debug, Clone)]
pub struct JsonSchemaParser {
    default_name: String,
    default_description: String,
}

impl Default for JsonSchemaParser {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_NAME.to_string(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

impl JsonSchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback root name and description.
    pub fn with_defaults(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.default_name = name.into();
        self.default_description = description.into();
        self
    }

    /// Parse a document whose root is an object.
    ///
    /// The root keeps the document's own title and description (empty when
    /// absent). A root without a class tag yields a class-less `ObjectSchema`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaParsingError::NonObjectRoot` if the root is not an object
    /// schema, or any error raised while parsing nested properties.
    pub fn parse(&self, document: &Value) -> Result<ObjectSchema, SchemaParsingError> {
        let Value::Object(map) = document else {
            return Err(SchemaParsingError::NonObjectRoot {
                type_name: json_type_name(document).to_string(),
            });
        };
        let root = Node { map, path: "#".to_string() };

        match root.json_type()? {
            Some(JsonType::Object) => {}
            other => {
                return Err(SchemaParsingError::NonObjectRoot {
                    type_name: other.map_or("unknown", |t| t.as_str()).to_string(),
                })
            }
        }

        let type_ = match root.class_tag() {
            Some(class) => TypeDescriptor::Object(class.to_string()),
            None => TypeDescriptor::AnonymousObject,
        };

        Ok(ObjectSchema::new(
            type_,
            root.title().unwrap_or_default(),
            root.description(),
            self.properties(&root)?,
            root.required(),
        ))
    }

    /// Parse a document and apply metadata.
    ///
    /// Name and description fall back to the document's own, then to the
    /// parser defaults.
    pub fn from_json_schema(
        &self,
        document: &Value,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ObjectSchema, SchemaParsingError> {
        let schema = self.parse(document)?;

        let name = first_non_empty(&[name, Some(schema.name()), Some(self.default_name.as_str())]);
        let description = first_non_empty(&[
            description,
            Some(schema.description()),
            Some(self.default_description.as_str()),
        ]);
        Ok(schema.with_metadata(Some(&name), Some(&description)))
    }

    fn properties(&self, node: &Node<'_>) -> Result<Properties, SchemaParsingError> {
        let mut properties = Properties::new();
        let Some(Value::Object(declared)) = node.map.get("properties") else {
            return Ok(properties);
        };

        for (key, value) in declared {
            let path = format!("{}/properties/{}", node.path, key);
            let schema = match value {
                Value::Object(map) => self.property(key, &Node { map, path })?,
                // boolean and other non-object schemas carry no shape
                _ => MixedSchema::new(key.as_str(), "").into(),
            };
            properties.insert(key.clone(), Arc::new(schema));
        }

        Ok(properties)
    }

    fn property(&self, key: &str, node: &Node<'_>) -> Result<Schema, SchemaParsingError> {
        let name = node.title().unwrap_or(key);
        let description = node.description();
        let json_type = node.json_type()?;
        let class = node.class_tag();

        if let Some(values) = node.enum_values() {
            return match (class, json_type.and_then(|t| t.scalar_kind())) {
                (Some(class), kind) => {
                    Ok(EnumSchema::new(enum_type(class), name, description, values, kind).into())
                }
                (None, Some(kind)) => Ok(ScalarSchema::new(kind, name, description)
                    .with_enum_values(Some(values))
                    .into()),
                (None, None) => Err(SchemaParsingError::NonScalarEnum {
                    path: node.path.clone(),
                }),
            };
        }

        let Some(json_type) = json_type else {
            return Ok(MixedSchema::new(name, description).into());
        };

        match (json_type, class) {
            (JsonType::Object, Some(class)) => Ok(ObjectSchema::new(
                TypeDescriptor::Object(class.to_string()),
                name,
                description,
                self.properties(node)?,
                node.required(),
            )
            .into()),
            (JsonType::Object, None) => Ok(ArrayShapeSchema::new(
                name,
                description,
                self.properties(node)?,
                node.required(),
            )
            .into()),
            (JsonType::Array, _) => self.array(name, description, node),
            (JsonType::String, Some(class)) if is_date_time_class(class) => Ok(ObjectSchema::empty(
                TypeDescriptor::Object(class.to_string()),
                name,
                description,
            )
            .into()),
            // a class-tagged scalar is an enum whose cases were not listed
            (scalar, Some(class)) if scalar.scalar_kind().is_some() => Ok(EnumSchema::new(
                enum_type(class),
                name,
                description,
                Vec::new(),
                scalar.scalar_kind(),
            )
            .into()),
            (scalar, _) => match scalar.scalar_kind() {
                Some(kind) => Ok(ScalarSchema::new(kind, name, description).into()),
                None => Err(SchemaParsingError::UnsupportedType {
                    path: node.path.clone(),
                    type_name: scalar.as_str().to_string(),
                }),
            },
        }
    }

    fn array(&self, name: &str, description: &str, node: &Node<'_>) -> Result<Schema, SchemaParsingError> {
        match node.map.get("items") {
            None => Ok(ArraySchema::new(name, description).into()),
            Some(items) if is_open_items(items) => Ok(ArraySchema::new(name, description).into()),
            Some(Value::Object(map)) => {
                let item_node = Node {
                    map,
                    path: format!("{}/items", node.path),
                };
                let item = self.property("", &item_node)?;
                Ok(CollectionSchema::new(
                    item.type_descriptor().clone(),
                    name,
                    description,
                    Arc::new(item),
                )
                .into())
            }
            Some(_) => Err(SchemaParsingError::MissingCollectionItems {
                path: node.path.clone(),
            }),
        }
    }
}

fn enum_type(class: &str) -> TypeDescriptor {
    TypeDescriptor::Enum(class.to_string())
}

fn first_non_empty(candidates: &[Option<&str>]) -> String {
    candidates
        .iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Whether `items` is the open wildcard emitted for untyped arrays.
fn is_open_items(items: &Value) -> bool {
    if *items == open_items() {
        return true;
    }
    let Some(Value::Array(branches)) = items.get("anyOf") else {
        return false;
    };
    let mut types: Vec<&str> = branches
        .iter()
        .filter_map(|b| b.get("type").and_then(Value::as_str))
        .collect();
    types.sort_unstable();
    types == ["boolean", "integer", "number", "object", "string"] && branches.len() == 5
}

/// A JSON Schema object node with its location in the document.
struct Node<'v> {
    map: &'v Map<String, Value>,
    path: String,
}

impl<'v> Node<'v> {
    /// The single non-null `type` token, if any.
    fn json_type(&self) -> Result<Option<JsonType>, SchemaParsingError> {
        let tokens: Vec<&str> = match self.map.get("type") {
            None => return Ok(None),
            Some(Value::String(token)) => vec![token.as_str()],
            Some(Value::Array(tokens)) => tokens.iter().filter_map(Value::as_str).collect(),
            Some(other) => {
                return Err(SchemaParsingError::UnsupportedType {
                    path: self.path.clone(),
                    type_name: json_type_name(other).to_string(),
                })
            }
        };

        let non_null: Vec<&str> = tokens.into_iter().filter(|t| *t != "null").collect();
        match non_null.as_slice() {
            [] => Ok(None),
            [token] => JsonType::parse(token)
                .map(Some)
                .ok_or_else(|| SchemaParsingError::UnsupportedType {
                    path: self.path.clone(),
                    type_name: token.to_string(),
                }),
            many => {
                debug!(path = %self.path, types = ?many, "multiple non-null types");
                Err(SchemaParsingError::UnsupportedType {
                    path: self.path.clone(),
                    type_name: many.join("|"),
                })
            }
        }
    }

    fn class_tag(&self) -> Option<&'v str> {
        self.map
            .get(CLASS_TAG)
            .and_then(Value::as_str)
            .map(|s| s.trim_start_matches('\\'))
            .filter(|s| !s.is_empty())
    }

    fn title(&self) -> Option<&'v str> {
        self.map
            .get(TITLE_TAG)
            .or_else(|| self.map.get("title"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn description(&self) -> &'v str {
        self.map
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn required(&self) -> Vec<String> {
        match self.map.get("required") {
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Literal `enum` values; `None` when absent or empty.
    fn enum_values(&self) -> Option<Vec<EnumValue>> {
        let Some(Value::Array(values)) = self.map.get("enum") else {
            return None;
        };
        let values: Vec<EnumValue> = values.iter().filter_map(EnumValue::from_json).collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}
