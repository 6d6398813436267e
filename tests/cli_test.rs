//! CLI integration tests for class-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const USER_REGISTRY: &str = r#"{
    "classes": [
        {
            "name": "App\\User",
            "attributes": [{ "description": "A registered user" }],
            "properties": [
                { "name": "name", "type": "string" },
                { "name": "boss", "type": "?App\\User" }
            ]
        }
    ]
}"#;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("class-schema"))
}

// Helper to create a temp input file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod render_command {
    use super::*;

    #[test]
    fn basic_render() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\User"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""x-php-class":"App\\User""#))
            .stdout(predicate::str::contains(r#""required":["name"]"#))
            .stdout(predicate::str::contains(r#""description":"A registered user""#))
            .stderr(predicate::str::is_empty());
    }

    #[test]
    fn render_scalar_expression() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", r#"{"classes": []}"#);

        cmd()
            .args(["render", registry.to_str().unwrap(), "?int"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"type":"integer","description":"Correctly extracted value"}"#,
            ));
    }

    #[test]
    fn render_with_refs() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\User", "--refs"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r##""$ref":"#/$defs/App.User""##))
            .stdout(predicate::str::contains(r#""$defs":{"App.User":"#));
    }

    #[test]
    fn render_as_tool_call() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args([
                "render",
                registry.to_str().unwrap(),
                "App\\User",
                "--tool",
                "extract_user",
                "--tool-description",
                "Extract the user",
            ])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(r#"[{"type":"function""#))
            .stdout(predicate::str::contains(r#""name":"extract_user""#))
            .stdout(predicate::str::contains(r#""description":"Extract the user""#));
    }

    #[test]
    fn render_with_pretty() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\User", "--pretty"])
            .assert()
            .success()
            // Pretty output has newlines and indentation
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn render_with_output_file() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);
        let output = dir.path().join("output.json");

        cmd()
            .args([
                "render",
                registry.to_str().unwrap(),
                "App\\User",
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        let document: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(document["x-title"], "User");
    }

    #[test]
    fn debug_logging_goes_to_stderr() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .env("CLASS_SCHEMA_LOG", "debug")
            .args(["render", registry.to_str().unwrap(), "App\\User"])
            .assert()
            .success()
            .stderr(predicate::str::contains("built schema"));
    }

    #[test]
    fn tool_description_requires_tool() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args([
                "render",
                registry.to_str().unwrap(),
                "App\\User",
                "--tool-description",
                "orphan",
            ])
            .assert()
            .failure();
    }
}

mod roundtrip_command {
    use super::*;

    #[test]
    fn roundtrip_normalizes_document() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "type": "object",
                "title": "User",
                "x-php-class": "App\\User",
                "properties": {
                    "name": { "type": ["string", "null"] },
                    "joined": { "type": "string", "x-php-class": "DateTime" }
                },
                "required": ["name"]
            }"#,
        );

        cmd()
            .args(["roundtrip", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""x-title":"User""#))
            .stdout(predicate::str::contains(r#""name":{"type":"string"}"#))
            .stdout(predicate::str::contains(
                r#""joined":{"type":"string","x-title":"joined","x-php-class":"DateTime"}"#,
            ))
            .stdout(predicate::str::contains(r#""additionalProperties":false"#));
    }

    #[test]
    fn roundtrip_rejects_non_object_root() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{"type": "array"}"#);

        cmd()
            .args(["roundtrip", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("root JSON Schema must be an object"));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn exit_code_file_not_found() {
        cmd()
            .args(["render", "/nonexistent/registry.json", "App\\User"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn exit_code_invalid_registry() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", r#"{"classes": [{"kind": "enum"}]}"#);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\User"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid class registry"));
    }

    #[test]
    fn exit_code_invalid_json() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", "not json");

        cmd()
            .args(["roundtrip", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn exit_code_unknown_class() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\Missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("object type must have a class name"));
    }

    #[test]
    fn exit_code_unsupported_union() {
        let dir = TempDir::new().unwrap();
        let registry = write_temp_file(&dir, "registry.json", USER_REGISTRY);

        cmd()
            .args(["render", registry.to_str().unwrap(), "App\\User|string"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("union types"));
    }
}
