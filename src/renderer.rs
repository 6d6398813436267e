//! Schema rendering - turns a schema tree into a JSON Schema document.

use serde_json::{json, Map, Value};
use tracing::trace;

use crate::schema::{
    ArrayShapeSchema, CollectionSchema, EnumSchema, ObjectRefSchema, ObjectSchema, Properties,
    ScalarSchema, Schema,
};
use crate::types::{class_key, JsonType, CLASS_TAG, DEFS_LABEL, TITLE_TAG};

/// JSON primitive kinds accepted by untyped arrays.
const OPEN_ITEM_TYPES: [&str; 5] = ["string", "integer", "number", "boolean", "object"];

/// The `items` value of an untyped array.
pub fn open_items() -> Value {
    let any_of: Vec<Value> = OPEN_ITEM_TYPES.iter().map(|t| json!({ "type": t })).collect();
    json!({ "anyOf": any_of })
}

/// Renders schema trees as JSON Schema documents.
///
/// Empty names, descriptions, property maps and required lists are omitted;
/// `additionalProperties: false` is always present on class-bound objects.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaRenderer;

impl JsonSchemaRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a schema, ignoring object references.
    pub fn render(&self, schema: &Schema) -> Value {
        self.render_with(schema, &mut |_| {})
    }

    /// Render a schema, calling `on_object_ref` with the raw class name of
    /// every `$ref` emitted.
    pub fn render_with(&self, schema: &Schema, on_object_ref: &mut dyn FnMut(&str)) -> Value {
        match schema {
            Schema::Array(_) => {
                let mut map = Map::new();
                map.insert("type".into(), JsonType::Array.as_str().into());
                map.insert("items".into(), open_items());
                put_text(&mut map, "description", schema.description());
                Value::Object(map)
            }
            Schema::Collection(collection) => self.render_collection(collection, on_object_ref),
            Schema::Object(object) => self.render_object(object, on_object_ref),
            Schema::ArrayShape(shape) => self.render_shape(shape, on_object_ref),
            Schema::Enum(enumeration) => render_enum(enumeration),
            Schema::Scalar(scalar) => render_scalar(scalar),
            Schema::ObjectRef(reference) => render_reference(reference, on_object_ref),
            Schema::Mixed(_) => {
                let mut map = Map::new();
                put_text(&mut map, "description", schema.description());
                Value::Object(map)
            }
        }
    }

    fn render_collection(
        &self,
        collection: &CollectionSchema,
        on_object_ref: &mut dyn FnMut(&str),
    ) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), JsonType::Array.as_str().into());
        map.insert("items".into(), self.render_with(collection.item(), on_object_ref));
        put_text(&mut map, "description", collection.description());
        Value::Object(map)
    }

    fn render_object(&self, object: &ObjectSchema, on_object_ref: &mut dyn FnMut(&str)) -> Value {
        let mut map = Map::new();

        if object.type_descriptor().is_date_time() {
            map.insert("type".into(), JsonType::String.as_str().into());
            put_text(&mut map, TITLE_TAG, object.name());
            put_text(&mut map, "description", object.description());
            put_text(&mut map, CLASS_TAG, object.class_name().unwrap_or_default());
            return Value::Object(map);
        }

        map.insert("type".into(), JsonType::Object.as_str().into());
        put_text(&mut map, TITLE_TAG, object.name());
        put_text(&mut map, "description", object.description());
        self.put_properties(&mut map, object.properties(), object.required(), on_object_ref);
        put_text(&mut map, CLASS_TAG, object.class_name().unwrap_or_default());
        map.insert("additionalProperties".into(), Value::Bool(false));
        Value::Object(map)
    }

    fn render_shape(&self, shape: &ArrayShapeSchema, on_object_ref: &mut dyn FnMut(&str)) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), JsonType::Object.as_str().into());
        put_text(&mut map, TITLE_TAG, shape.name());
        put_text(&mut map, "description", shape.description());
        self.put_properties(&mut map, shape.properties(), shape.required(), on_object_ref);
        Value::Object(map)
    }

    fn put_properties(
        &self,
        map: &mut Map<String, Value>,
        properties: &Properties,
        required: &[String],
        on_object_ref: &mut dyn FnMut(&str),
    ) {
        if !properties.is_empty() {
            // map keys are the field names; nested schema names are labels only
            let rendered: Map<String, Value> = properties
                .iter()
                .map(|(key, property)| (key.clone(), self.render_with(property, on_object_ref)))
                .collect();
            map.insert("properties".into(), Value::Object(rendered));
        }
        if !required.is_empty() {
            map.insert("required".into(), json!(required));
        }
    }
}

fn render_enum(enumeration: &EnumSchema) -> Value {
    let type_name = enumeration
        .backing()
        .map(|kind| kind.json_type())
        .unwrap_or(JsonType::String);

    let mut map = Map::new();
    map.insert("type".into(), type_name.as_str().into());
    put_text(&mut map, "description", enumeration.description());
    if !enumeration.values().is_empty() {
        let values: Vec<Value> = enumeration.values().iter().map(|v| v.to_json()).collect();
        map.insert("enum".into(), Value::Array(values));
    }
    put_text(&mut map, CLASS_TAG, enumeration.class_name().unwrap_or_default());
    Value::Object(map)
}

fn render_scalar(scalar: &ScalarSchema) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), scalar.kind().json_type().as_str().into());
    put_text(&mut map, "description", scalar.description());
    if let Some(values) = scalar.enum_values() {
        let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
        map.insert("enum".into(), Value::Array(values));
    }
    Value::Object(map)
}

fn render_reference(reference: &ObjectRefSchema, on_object_ref: &mut dyn FnMut(&str)) -> Value {
    let class = reference.class_name().unwrap_or("object");
    let id = format!("#/{}/{}", DEFS_LABEL, class_key(class));
    trace!(class, id = %id, "rendering object reference");
    on_object_ref(class);

    let mut map = Map::new();
    map.insert("$ref".into(), Value::String(id));
    put_text(&mut map, "description", reference.description());
    put_text(&mut map, CLASS_TAG, class);
    Value::Object(map)
}

fn put_text(map: &mut Map<String, Value>, key: &str, text: &str) {
    if !text.is_empty() {
        map.insert(key.to_string(), Value::String(text.to_string()));
    }
}
