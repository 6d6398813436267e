//! Document and class registry loading.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::registry::ClassRegistry;

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a JSON Schema document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    debug!(path = %path.display(), "loaded document");
    load_document_str(&content)
}

/// Load a JSON Schema document from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a class registry manifest from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` / `LoadError::ReadError` for IO failures,
/// `LoadError::InvalidRegistry` if the manifest doesn't match the registry format.
pub fn load_registry(path: &Path) -> Result<ClassRegistry, LoadError> {
    let content = read_file(path)?;
    let registry = load_registry_str(&content)?;
    debug!(
        path = %path.display(),
        classes = registry.class_names().count(),
        "loaded class registry"
    );
    Ok(registry)
}

/// Load a class registry manifest from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidRegistry` if the string isn't a valid manifest.
pub fn load_registry_str(content: &str) -> Result<ClassRegistry, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidRegistry { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document["type"], "object");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_document(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_str_invalid() {
        let result = load_document_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_registry_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"classes": [{{"name": "App\\User", "properties": [{{"name": "id", "type": "int"}}]}}]}}"#
        )
        .unwrap();

        let registry = load_registry(file.path()).unwrap();
        assert!(registry.has_class("App\\User"));
        assert!(registry.has_class("DateTime"));
    }

    #[test]
    fn load_registry_rejects_bad_manifest() {
        let result = load_registry_str(r#"{"classes": [{"kind": "class"}]}"#);
        assert!(matches!(result, Err(LoadError::InvalidRegistry { .. })));

        let result = load_registry_str("42");
        assert!(matches!(result, Err(LoadError::InvalidRegistry { .. })));
    }
}
