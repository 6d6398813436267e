//! Integration tests for building, rendering and parsing class schemas.

use class_schema::{
    render_with_definitions, tool_call, ClassDef, ClassRegistry, EnumValue, FunctionDef,
    JsonSchemaParser, ParamDef, PropertyDef, ScalarKind, Schema, SchemaError, SchemaFactory,
    TypeResolutionError, Visibility,
};
use serde_json::json;

fn catalog_registry() -> ClassRegistry {
    ClassRegistry::new()
        .with(
            ClassDef::class("App\\Catalog")
                .described("A product catalog")
                .property(PropertyDef::public("name", Some("string")).described("Catalog name"))
                .property(PropertyDef::public("price", Some("float")))
                .property(PropertyDef::public("tags", None).doc_type("string[]"))
                .property(PropertyDef::public("priority", Some("App\\Priority")))
                .property(PropertyDef::public("status", Some("?App\\Status")))
                .property(PropertyDef::public("created", Some("DateTime")))
                .property(PropertyDef::public("owner", Some("App\\Owner")))
                .property(PropertyDef::public("extra", Some("array")))
                .property(PropertyDef::public("notes", None)),
        )
        .with(
            ClassDef::class("App\\Owner")
                .property(PropertyDef::public("email", Some("string")))
                .property(PropertyDef::public("active", Some("bool"))),
        )
        .with(ClassDef::backed_enum(
            "App\\Priority",
            ScalarKind::Int,
            vec![("Low", EnumValue::Int(1)), ("High", EnumValue::Int(2))],
        ))
        .with(ClassDef::backed_enum(
            "App\\Status",
            ScalarKind::String,
            vec![("Open", "open".into()), ("Closed", "closed".into())],
        ))
}

mod object_expansion {
    use super::*;

    fn parent_registry() -> ClassRegistry {
        ClassRegistry::new().with(
            ClassDef::class("App\\Parent")
                .property(PropertyDef::public("name", Some("string")))
                .property(PropertyDef::public("parent", Some("?App\\Parent"))),
        )
    }

    #[test]
    fn self_reference_stops_after_two_levels() {
        let registry = parent_registry();
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Parent").unwrap();

        assert_eq!(
            factory.to_json_schema(&schema),
            json!({
                "type": "object",
                "x-title": "Parent",
                "properties": {
                    "name": { "type": "string" },
                    "parent": {
                        "type": "object",
                        "x-title": "parent",
                        "properties": {
                            "name": { "type": "string" },
                            "parent": {
                                "type": "object",
                                "x-title": "parent",
                                "x-php-class": "App\\Parent",
                                "additionalProperties": false
                            }
                        },
                        "required": ["name"],
                        "x-php-class": "App\\Parent",
                        "additionalProperties": false
                    }
                },
                "required": ["name"],
                "x-php-class": "App\\Parent",
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn repeated_builds_give_the_same_shape() {
        let registry = parent_registry();
        let mut factory = SchemaFactory::new(&registry);
        let first = factory.schema("App\\Parent").unwrap();
        let second = factory.schema("\\App\\Parent").unwrap();
        assert_eq!(factory.to_json_schema(&first), factory.to_json_schema(&second));
    }

    fn cycle_registry() -> ClassRegistry {
        ClassRegistry::new()
            .with(ClassDef::class("App\\A").property(PropertyDef::public("b", Some("?App\\B"))))
            .with(ClassDef::class("App\\B").property(PropertyDef::public("a", Some("?App\\A"))))
    }

    #[test]
    fn mutual_reference_does_not_depend_on_build_order() {
        let registry = cycle_registry();

        let mut warm = SchemaFactory::new(&registry);
        warm.schema("App\\A").unwrap();
        let after_a = warm.schema("App\\B").unwrap();

        let mut fresh = SchemaFactory::new(&registry);
        let alone = fresh.schema("App\\B").unwrap();

        assert_eq!(warm.to_json_schema(&after_a), fresh.to_json_schema(&alone));
    }

    #[test]
    fn mutual_reference_inlines_each_class_twice() {
        let registry = cycle_registry();
        let mut factory = SchemaFactory::new(&registry);
        factory.schema("App\\A").unwrap();
        let schema = factory.schema("App\\B").unwrap();
        let document = factory.to_json_schema(&schema);

        let a = &document["properties"]["a"];
        let b = &a["properties"]["b"];
        let a_again = &b["properties"]["a"];
        let stub = &a_again["properties"]["b"];
        assert_eq!(a["x-php-class"], "App\\A");
        assert_eq!(b["x-php-class"], "App\\B");
        assert_eq!(a_again["x-php-class"], "App\\A");
        assert_eq!(
            stub,
            &json!({
                "type": "object",
                "x-title": "b",
                "x-php-class": "App\\B",
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn catalog_renders_every_kind() {
        let registry = catalog_registry();
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Catalog").unwrap();
        let document = factory.to_json_schema(&schema);

        assert_eq!(document["description"], "A product catalog");
        assert_eq!(document["properties"]["name"]["description"], "Catalog name");
        assert_eq!(document["properties"]["price"]["type"], "number");
        assert_eq!(
            document["properties"]["tags"],
            json!({
                "type": "array",
                "items": { "type": "string", "description": "Correctly extract items of type: string" }
            })
        );
        assert_eq!(
            document["properties"]["priority"],
            json!({ "type": "integer", "enum": [1, 2], "x-php-class": "App\\Priority" })
        );
        assert_eq!(document["properties"]["status"]["enum"], json!(["open", "closed"]));
        assert_eq!(
            document["properties"]["created"],
            json!({ "type": "string", "x-title": "created", "x-php-class": "DateTime" })
        );
        assert_eq!(document["properties"]["owner"]["required"], json!(["email", "active"]));
        assert_eq!(document["properties"]["extra"]["items"]["anyOf"][0], json!({ "type": "string" }));
        assert_eq!(document["properties"]["notes"], json!({}));
        assert_eq!(
            document["required"],
            json!(["name", "price", "tags", "priority", "created", "owner", "extra"])
        );
    }
}

mod type_policy {
    use super::*;

    #[test]
    fn scalar_unions_are_widened() {
        let registry = ClassRegistry::new().with(
            ClassDef::class("App\\Reading")
                .property(PropertyDef::public("value", Some("int|float")))
                .property(PropertyDef::public("label", Some("string|int")))
                .property(PropertyDef::public("unit", Some("?string"))),
        );
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Reading").unwrap();
        let document = factory.to_json_schema(&schema);

        assert_eq!(document["properties"]["value"], json!({ "type": "number" }));
        assert_eq!(document["properties"]["label"], json!({}));
        assert_eq!(document["properties"]["unit"], json!({ "type": "string" }));
        assert_eq!(document["required"], json!(["value", "label"]));
    }

    #[test]
    fn object_union_is_rejected() {
        let registry = catalog_registry().with(
            ClassDef::class("App\\Holder")
                .property(PropertyDef::public("either", Some("App\\Owner|string"))),
        );
        let mut factory = SchemaFactory::new(&registry);
        let err = factory.schema("App\\Holder").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeResolution(TypeResolutionError::UnsupportedUnion { .. })
        ));
    }

    #[test]
    fn runtime_integer_builds_value_schema() {
        let registry = ClassRegistry::new();
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema(42).unwrap();
        assert_eq!(
            factory.to_json_schema(&schema),
            json!({ "type": "integer", "description": "Correctly extracted value" })
        );
    }

    #[test]
    fn unknown_class_is_missing_object_class() {
        let registry = ClassRegistry::new();
        let mut factory = SchemaFactory::new(&registry);
        let err = factory.schema("App\\Nowhere").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeResolution(TypeResolutionError::MissingObjectClass { .. })
        ));
    }
}

mod deserializable_properties {
    use super::*;

    fn account_registry() -> ClassRegistry {
        ClassRegistry::new().with(
            ClassDef::class("App\\Account")
                .property(PropertyDef::public("id", Some("int")))
                .property(PropertyDef::private("secret", Some("string")))
                .property(PropertyDef::private("token", Some("string")))
                .property(PropertyDef::private("internal", Some("string")))
                .property(PropertyDef::public("instances", Some("int")).class_level())
                .method(
                    FunctionDef::new("setSecret")
                        .param(ParamDef::new("secret", Some("string")))
                        .returns("void"),
                )
                .method(
                    FunctionDef::new("setToken")
                        .param(ParamDef::new("token", Some("string")))
                        .returns("Fluent&Chainable"),
                )
                .method(
                    FunctionDef::new("setInternal")
                        .param(ParamDef::new("internal", Some("string")))
                        .visibility(Visibility::Private),
                ),
        )
    }

    #[test]
    fn setters_and_visibility_decide_membership() {
        let registry = account_registry();
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Account").unwrap();

        assert_eq!(schema.property_names(), vec!["id", "secret"]);
        assert_eq!(schema.required(), ["id".to_string(), "secret".to_string()]);
    }

    #[test]
    fn constructor_parameters_decide_required() {
        let registry = ClassRegistry::new().with(
            ClassDef::class("App\\Point")
                .property(PropertyDef::private("x", Some("int")))
                .property(PropertyDef::private("y", Some("int")))
                .constructor(
                    FunctionDef::new("__construct")
                        .param(ParamDef::new("x", Some("int")))
                        .param(ParamDef::new("y", Some("int")).with_default(json!(0))),
                ),
        );
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Point").unwrap();

        assert_eq!(schema.property_names(), vec!["x", "y"]);
        assert_eq!(schema.required(), ["x".to_string()]);
    }
}

mod object_references {
    use super::*;

    fn order_registry() -> ClassRegistry {
        ClassRegistry::new()
            .with(ClassDef::class("App\\A\\Item").property(PropertyDef::public("sku", Some("string"))))
            .with(ClassDef::class("App\\B\\Item").property(PropertyDef::public("code", Some("int"))))
            .with(
                ClassDef::class("App\\Order")
                    .property(PropertyDef::public("first", Some("App\\A\\Item")))
                    .property(PropertyDef::public("second", Some("App\\B\\Item")))
                    .property(PropertyDef::public("more", None).doc_type("App\\A\\Item[]")),
            )
    }

    #[test]
    fn colliding_short_names_get_separate_definitions() {
        let registry = order_registry();
        let mut factory = SchemaFactory::new(&registry).use_object_references(true);
        let schema = factory.schema("App\\Order").unwrap();
        let document = render_with_definitions(&mut factory, &schema).unwrap();

        assert_eq!(
            document["properties"]["first"],
            json!({ "$ref": "#/$defs/App.A.Item", "x-php-class": "App\\A\\Item" })
        );
        assert_eq!(document["properties"]["second"]["$ref"], "#/$defs/App.B.Item");
        assert_eq!(document["properties"]["more"]["items"]["$ref"], "#/$defs/App.A.Item");

        let defs = document["$defs"].as_object().unwrap();
        let keys: Vec<&str> = defs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["App.A.Item", "App.B.Item"]);
        assert_eq!(defs["App.A.Item"]["x-title"], "Item");
        assert_eq!(defs["App.B.Item"]["properties"]["code"]["type"], "integer");
    }

    #[test]
    fn definitions_resolve_for_validation() {
        let registry = order_registry();
        let mut factory = SchemaFactory::new(&registry).use_object_references(true);
        let schema = factory.schema("App\\Order").unwrap();
        let document = render_with_definitions(&mut factory, &schema).unwrap();

        let validator = jsonschema::validator_for(&document).unwrap();
        assert!(validator.is_valid(&json!({
            "first": { "sku": "A-1" },
            "second": { "code": 7 },
            "more": [{ "sku": "A-2" }]
        })));
        assert!(!validator.is_valid(&json!({
            "first": { "sku": 1 },
            "second": { "code": 7 },
            "more": []
        })));
    }

    #[test]
    fn definitions_follow_references_inside_definitions() {
        let registry = ClassRegistry::new()
            .with(ClassDef::class("App\\A").property(PropertyDef::public("b", Some("App\\B"))))
            .with(ClassDef::class("App\\B").property(PropertyDef::public("c", Some("App\\C"))))
            .with(ClassDef::class("App\\C").property(PropertyDef::public("name", Some("string"))));
        let mut factory = SchemaFactory::new(&registry).use_object_references(true);
        let schema = factory.schema("App\\A").unwrap();
        let document = render_with_definitions(&mut factory, &schema).unwrap();

        assert_eq!(document["properties"]["b"]["$ref"], "#/$defs/App.B");
        let defs = document["$defs"].as_object().unwrap();
        let keys: Vec<&str> = defs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["App.B", "App.C"]);
        assert_eq!(defs["App.B"]["properties"]["c"]["$ref"], "#/$defs/App.C");
        assert_eq!(defs["App.C"]["properties"]["name"]["type"], "string");

        let validator = jsonschema::validator_for(&document).unwrap();
        assert!(validator.is_valid(&json!({ "b": { "c": { "name": "x" } } })));
        assert!(!validator.is_valid(&json!({ "b": { "c": { "name": 3 } } })));
    }

    #[test]
    fn no_references_means_no_definitions() {
        let registry = catalog_registry();
        let mut factory = SchemaFactory::new(&registry).use_object_references(true);
        let schema = factory.schema("App\\Owner").unwrap();
        let document = render_with_definitions(&mut factory, &schema).unwrap();
        assert!(document.get("$defs").is_none());
    }
}

mod documents {
    use super::*;

    #[test]
    fn nested_untagged_objects_become_shapes() {
        let document = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "description": "Postal address",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"]
                }
            }
        });
        let schema: Schema = JsonSchemaParser::new().parse(&document).unwrap().into();
        assert!(matches!(schema.property("address"), Some(Schema::ArrayShape(_))));

        let registry = ClassRegistry::new();
        let factory = SchemaFactory::new(&registry);
        assert_eq!(
            factory.to_json_schema(&schema)["properties"]["address"],
            json!({
                "type": "object",
                "x-title": "address",
                "description": "Postal address",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            })
        );
    }

    #[test]
    fn property_key_and_title_are_independent() {
        let document = json!({
            "type": "object",
            "x-php-class": "App\\Invoice",
            "properties": {
                "billed_to": {
                    "type": "object",
                    "x-title": "Customer",
                    "x-php-class": "App\\Customer",
                    "properties": {}
                }
            }
        });
        let schema = JsonSchemaParser::new().parse(&document).unwrap();
        let billed_to = schema.property("billed_to").unwrap();
        assert_eq!(billed_to.name(), "Customer");
        assert_eq!(billed_to.class_name(), Some("App\\Customer"));

        let registry = ClassRegistry::new();
        let factory = SchemaFactory::new(&registry);
        let rendered = factory.to_json_schema(&schema.into());
        assert_eq!(rendered["properties"]["billed_to"]["x-title"], "Customer");
    }

    #[test]
    fn rendered_documents_survive_a_parse() {
        let registry = catalog_registry();
        let mut factory = SchemaFactory::new(&registry);
        let built = factory.schema("App\\Catalog").unwrap();
        let rendered = factory.to_json_schema(&built);

        let parsed = factory.parser().parse(&rendered).unwrap();
        assert_eq!(factory.to_json_schema(&parsed.into()), rendered);
    }

    #[test]
    fn from_json_schema_fills_defaults() {
        let registry = ClassRegistry::new();
        let factory = SchemaFactory::new(&registry);
        let schema = factory
            .from_json_schema(&json!({ "type": "object" }), None, None)
            .unwrap();
        assert_eq!(schema.name(), "extract_object");
        assert_eq!(schema.description(), "Extract data from chat content");

        let named = factory
            .from_json_schema(&json!({ "type": "object", "title": "Doc" }), None, Some("Given"))
            .unwrap();
        assert_eq!(named.name(), "Doc");
        assert_eq!(named.description(), "Given");
    }
}

mod tool_calls {
    use super::*;

    #[test]
    fn envelope_wraps_rendered_class() {
        let registry = catalog_registry();
        let mut factory = SchemaFactory::new(&registry);
        let schema = factory.schema("App\\Owner").unwrap();
        let call = tool_call("extract_owner", "Extract the owner", factory.to_json_schema(&schema));

        assert_eq!(
            call,
            json!([{
                "type": "function",
                "function": {
                    "name": "extract_owner",
                    "description": "Extract the owner",
                    "parameters": {
                        "type": "object",
                        "x-title": "Owner",
                        "properties": {
                            "email": { "type": "string" },
                            "active": { "type": "boolean" }
                        },
                        "required": ["email", "active"],
                        "x-php-class": "App\\Owner",
                        "additionalProperties": false
                    }
                }
            }])
        );
    }
}
