//! Rendering with shared definitions, and the function-calling envelope.

use std::collections::VecDeque;

use indexmap::IndexSet;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::factory::SchemaFactory;
use crate::schema::Schema;
use crate::types::{class_key, normalize_class_name, DEFS_LABEL};

/// Render `schema` and attach every referenced class under `$defs`.
///
/// Referenced classes are rendered once each, with the same factory, until no
/// new references appear. Definitions are keyed by [`class_key`] and kept in
/// discovery order.
///
/// # Errors
///
/// Returns `SchemaError` if a referenced class cannot be built.
pub fn render_with_definitions(
    factory: &mut SchemaFactory<'_>,
    schema: &Schema,
) -> Result<Value, SchemaError> {
    let mut pending: VecDeque<String> = VecDeque::new();
    let mut document = factory.to_json_schema_with(schema, &mut |class| {
        pending.push_back(normalize_class_name(class).to_string());
    });

    let mut rendered: IndexSet<String> = IndexSet::new();
    let mut definitions = Map::new();
    while let Some(class) = pending.pop_front() {
        if !rendered.insert(class.clone()) {
            continue;
        }
        debug!(class = %class, "rendering definition");

        let definition = factory.schema(class.as_str())?;
        let value = factory.to_json_schema_with(&definition, &mut |nested| {
            pending.push_back(normalize_class_name(nested).to_string());
        });
        definitions.insert(class_key(&class), value);
    }

    if !definitions.is_empty() {
        if let Value::Object(map) = &mut document {
            map.insert(DEFS_LABEL.to_string(), Value::Object(definitions));
        }
    }
    Ok(document)
}

/// Wrap a parameters document in the function-calling envelope.
///
/// ```
/// use class_schema::tool_call;
/// use serde_json::json;
///
/// let call = tool_call("extract", "Extract data", json!({ "type": "object" }));
/// assert_eq!(call[0]["type"], "function");
/// assert_eq!(call[0]["function"]["name"], "extract");
/// ```
pub fn tool_call(name: &str, description: &str, parameters: Value) -> Value {
    json!([{
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    }])
}
