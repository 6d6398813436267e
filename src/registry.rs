//! Class metadata source.
//!
//! Class, property and function metadata is declared explicitly, either in code
//! or in a JSON manifest, and served through the [`ClassSource`] trait.
//!
//! # Manifest format
//!
//! ```json
//! {
//!   "classes": [
//!     {
//!       "name": "App\\Models\\User",
//!       "attributes": [{ "description": "A registered user" }],
//!       "properties": [
//!         { "name": "id", "type": "int" },
//!         { "name": "email", "type": "?string", "visibility": "private" }
//!       ],
//!       "methods": [
//!         { "name": "setEmail", "params": [{ "name": "email", "type": "string" }], "returns": "void" }
//!       ]
//!     },
//!     { "name": "App\\Models\\Role", "kind": "enum", "backing": "string",
//!       "cases": [{ "name": "Admin", "value": "admin" }] }
//!   ]
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{normalize_class_name, EnumValue, ScalarKind, DATE_TIME_CLASSES};

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Kind of a declared class-like type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
}

/// Structured description annotation attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotation {
    Description(String),
    Instructions(String),
}

/// A single enum case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumCaseDef {
    pub name: String,
    /// Backing value; absent for pure enums.
    #[serde(default)]
    pub value: Option<EnumValue>,
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    /// Declared type expression; absent for untyped parameters.
    #[serde(default, rename = "type")]
    pub type_expr: Option<String>,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub attributes: Vec<Annotation>,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, type_expr: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.map(String::from),
            ..Self::default()
        }
    }

    /// Give the parameter a default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.has_default = true;
        self.default = Some(default);
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.attributes.push(Annotation::Description(text.into()));
        self
    }

    pub fn has_default_value(&self) -> bool {
        self.has_default || self.default.is_some()
    }
}

/// A free function, method or constructor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Declared return type expression; absent when unspecified.
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Annotation>,
    #[serde(default)]
    pub doc_comment: Option<String>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, type_expr: impl Into<String>) -> Self {
        self.returns = Some(type_expr.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.attributes.push(Annotation::Description(text.into()));
        self
    }

    pub fn doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn find_param(&self, name: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    /// Native (signature) type expression.
    #[serde(default, rename = "type")]
    pub native_type: Option<String>,
    /// Annotation (`@var`) type expression; takes precedence over the native type.
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub attributes: Vec<Annotation>,
    #[serde(default)]
    pub doc_comment: Option<String>,
}

impl PropertyDef {
    /// Public property with an optional native type.
    pub fn public(name: impl Into<String>, native_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.map(String::from),
            ..Self::default()
        }
    }

    /// Private property with an optional native type.
    pub fn private(name: impl Into<String>, native_type: Option<&str>) -> Self {
        Self {
            visibility: Visibility::Private,
            ..Self::public(name, native_type)
        }
    }

    pub fn doc_type(mut self, type_expr: impl Into<String>) -> Self {
        self.doc_type = Some(type_expr.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn class_level(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.attributes.push(Annotation::Description(text.into()));
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.attributes.push(Annotation::Instructions(text.into()));
        self
    }

    pub fn doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }
}

/// A declared class, interface or enum.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub attributes: Vec<Annotation>,
    #[serde(default)]
    pub doc_comment: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub constructor: Option<FunctionDef>,
    #[serde(default)]
    pub methods: Vec<FunctionDef>,
    #[serde(default)]
    pub cases: Vec<EnumCaseDef>,
    /// Backing scalar kind of a backed enum.
    #[serde(default)]
    pub backing: Option<ScalarKind>,
}

impl ClassDef {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Pure (unbacked) enum with the given case names.
    pub fn pure_enum(name: impl Into<String>, cases: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Enum,
            cases: cases
                .iter()
                .map(|case| EnumCaseDef {
                    name: case.to_string(),
                    value: None,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Backed enum with `(case, value)` pairs.
    pub fn backed_enum(
        name: impl Into<String>,
        backing: ScalarKind,
        cases: Vec<(&str, EnumValue)>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Enum,
            backing: Some(backing),
            cases: cases
                .into_iter()
                .map(|(case, value)| EnumCaseDef {
                    name: case.to_string(),
                    value: Some(value),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn constructor(mut self, constructor: FunctionDef) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn method(mut self, method: FunctionDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.attributes.push(Annotation::Description(text.into()));
        self
    }

    pub fn doc_comment(mut self, doc: impl Into<String>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    /// Method lookup; method names are case-insensitive.
    pub fn find_method(&self, name: &str) -> Option<&FunctionDef> {
        self.methods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

/// Source of class and function metadata.
pub trait ClassSource {
    /// Look up a class, interface or enum by (optionally `\`-prefixed) name.
    fn class(&self, name: &str) -> Option<&ClassDef>;

    /// Look up a free function by name.
    fn function(&self, name: &str) -> Option<&FunctionDef>;

    fn has_class(&self, name: &str) -> bool {
        self.class(name).is_some()
    }
}

/// Manifest shape accepted by [`ClassRegistry`] deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryManifest {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

/// In-memory [`ClassSource`].
///
/// `DateTime` and `DateTimeImmutable` are always registered.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassDef>,
    functions: IndexMap<String, FunctionDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            classes: IndexMap::new(),
            functions: IndexMap::new(),
        };
        for class in DATE_TIME_CLASSES {
            registry.register(ClassDef::class(*class));
        }
        registry
    }

    pub fn from_manifest(manifest: RegistryManifest) -> Self {
        let mut registry = Self::new();
        for class in manifest.classes {
            registry.register(class);
        }
        for function in manifest.functions {
            registry.register_function(function);
        }
        registry
    }

    /// Register (or replace) a class under its normalized name.
    pub fn register(&mut self, mut class: ClassDef) {
        let name = normalize_class_name(&class.name).to_string();
        class.name = name.clone();
        self.classes.insert(name, class);
    }

    pub fn register_function(&mut self, function: FunctionDef) {
        let name = normalize_class_name(&function.name).to_string();
        self.functions.insert(name, function);
    }

    /// Builder-style registration.
    pub fn with(mut self, class: ClassDef) -> Self {
        self.register(class);
        self
    }

    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.register_function(function);
        self
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassSource for ClassRegistry {
    fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(normalize_class_name(name))
    }

    fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(normalize_class_name(name))
    }
}

impl<'de> Deserialize<'de> for ClassRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        RegistryManifest::deserialize(deserializer).map(ClassRegistry::from_manifest)
    }
}
