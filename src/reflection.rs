//! Class, property and function metadata views over a [`ClassSource`].
//!
//! These views answer the questions the schema builder asks: which properties
//! can receive a value from outside, which are required, and what their
//! declared types and descriptions are.

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptions;
use crate::error::{ReflectionError, SchemaError, TypeResolutionError};
use crate::registry::{Annotation, ClassDef, ClassSource, FunctionDef, ParamDef, PropertyDef, Visibility};
use crate::type_resolver::{expression_allows_null, TypeExpr, TypeResolver};
use crate::types::{normalize_class_name, short_class_name, EnumValue, ScalarKind, TypeDescriptor};

/// Property predicate used by [`ClassInfo::filtered_properties`].
pub type PropertyFilter<'f, 'a> = &'f dyn Fn(&PropertyInfo<'a>) -> bool;

/// Metadata view of a single class.
pub struct ClassInfo<'a> {
    def: &'a ClassDef,
    properties: IndexMap<String, PropertyInfo<'a>>,
}

impl<'a> ClassInfo<'a> {
    /// Look up `class` in the source.
    ///
    /// # Errors
    ///
    /// Returns `ReflectionError::ClassNotFound` if the class is not registered.
    pub fn new(source: &'a dyn ClassSource, class: &str) -> Result<Self, ReflectionError> {
        let def = source
            .class(class)
            .ok_or_else(|| ReflectionError::ClassNotFound {
                class: normalize_class_name(class).to_string(),
            })?;

        let properties = def
            .properties
            .iter()
            .filter(|p| !p.is_static)
            .map(|p| (p.name.clone(), PropertyInfo::new(source, def, p)))
            .collect();

        Ok(Self { def, properties })
    }

    /// Fully-qualified class name.
    pub fn class(&self) -> &'a str {
        &self.def.name
    }

    pub fn short_name(&self) -> &'a str {
        short_class_name(&self.def.name)
    }

    pub fn definition(&self) -> &'a ClassDef {
        self.def
    }

    /// Instance property names in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyInfo<'a>> {
        self.properties.values()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// # Errors
    ///
    /// Returns `ReflectionError::PropertyNotFound` for unknown or static properties.
    pub fn property(&self, name: &str) -> Result<&PropertyInfo<'a>, ReflectionError> {
        self.properties
            .get(name)
            .ok_or_else(|| ReflectionError::PropertyNotFound {
                property: name.to_string(),
                class: self.def.name.clone(),
            })
    }

    pub fn property_type(&self, name: &str) -> Result<TypeDescriptor, SchemaError> {
        Ok(self.property(name)?.type_descriptor()?)
    }

    pub fn property_description(&self, name: &str) -> Result<String, ReflectionError> {
        Ok(self.property(name)?.description())
    }

    /// False for unknown properties.
    pub fn is_public(&self, name: &str) -> bool {
        self.properties.get(name).is_some_and(PropertyInfo::is_public)
    }

    pub fn is_nullable(&self, name: &str) -> Result<bool, SchemaError> {
        Ok(self.property(name)?.is_nullable()?)
    }

    pub fn is_read_only(&self, name: &str) -> Result<bool, ReflectionError> {
        Ok(self.property(name)?.is_read_only())
    }

    pub fn description(&self) -> String {
        descriptions::for_class(self.def)
    }

    /// Names of required properties, in declaration order.
    pub fn required_properties(&self) -> Result<Vec<String>, TypeResolutionError> {
        let mut required = Vec::new();
        for property in self.properties.values() {
            if property.is_required()? {
                required.push(property.name().to_string());
            }
        }
        Ok(required)
    }

    pub fn is_enum(&self) -> bool {
        self.def.is_enum()
    }

    pub fn is_backed(&self) -> bool {
        self.is_enum() && self.def.backing.is_some()
    }

    /// Backing scalar kind of a backed enum.
    pub fn backing_kind(&self) -> Option<ScalarKind> {
        if self.is_enum() {
            self.def.backing
        } else {
            None
        }
    }

    /// Backing values of a backed enum; empty for pure enums and classes.
    pub fn enum_values(&self) -> Vec<EnumValue> {
        if !self.is_backed() {
            return Vec::new();
        }
        self.def.cases.iter().filter_map(|case| case.value.clone()).collect()
    }

    pub fn implements_interface(&self, interface: &str) -> bool {
        let interface = normalize_class_name(interface);
        self.def
            .interfaces
            .iter()
            .any(|i| normalize_class_name(i) == interface)
    }

    /// Properties matching every filter.
    pub fn filtered_properties(&self, filters: &[PropertyFilter<'_, 'a>]) -> Vec<&PropertyInfo<'a>> {
        self.properties
            .values()
            .filter(|p| filters.iter().all(|f| f(p)))
            .collect()
    }

    pub fn filtered_property_names(&self, filters: &[PropertyFilter<'_, 'a>]) -> Vec<&str> {
        self.filtered_properties(filters)
            .into_iter()
            .map(PropertyInfo::name)
            .collect()
    }

    pub fn constructor(&self) -> Option<FunctionInfo<'a>> {
        self.def
            .constructor
            .as_ref()
            .map(|ctor| FunctionInfo::for_method(self.def, ctor))
    }

    /// Method lookup (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `ReflectionError::MethodNotFound` if no such method is declared.
    pub fn method(&self, name: &str) -> Result<FunctionInfo<'a>, ReflectionError> {
        self.def
            .find_method(name)
            .map(|m| FunctionInfo::for_method(self.def, m))
            .ok_or_else(|| ReflectionError::MethodNotFound {
                method: name.to_string(),
                class: self.def.name.clone(),
            })
    }
}

/// Metadata view of one property of a class.
#[derive(Clone, Copy)]
pub struct PropertyInfo<'a> {
    resolver: TypeResolver<'a>,
    class: &'a ClassDef,
    def: &'a PropertyDef,
}

impl<'a> PropertyInfo<'a> {
    fn new(source: &'a dyn ClassSource, class: &'a ClassDef, def: &'a PropertyDef) -> Self {
        Self {
            resolver: TypeResolver::new(source),
            class,
            def,
        }
    }

    /// Look up a property by class and name.
    pub fn from_name(
        source: &'a dyn ClassSource,
        class: &str,
        property: &str,
    ) -> Result<Self, ReflectionError> {
        let class_def = source
            .class(class)
            .ok_or_else(|| ReflectionError::ClassNotFound {
                class: normalize_class_name(class).to_string(),
            })?;
        let def = class_def
            .properties
            .iter()
            .find(|p| p.name == property)
            .ok_or_else(|| ReflectionError::PropertyNotFound {
                property: property.to_string(),
                class: class_def.name.clone(),
            })?;
        Ok(Self::new(source, class_def, def))
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    /// Declaring class name.
    pub fn class(&self) -> &'a str {
        &self.class.name
    }

    pub fn definition(&self) -> &'a PropertyDef {
        self.def
    }

    /// Effective type expression: annotation type, then native type, then `mixed`.
    pub fn type_expression(&self) -> &'a str {
        self.def
            .doc_type
            .as_deref()
            .or(self.def.native_type.as_deref())
            .unwrap_or("mixed")
    }

    pub fn type_descriptor(&self) -> Result<TypeDescriptor, TypeResolutionError> {
        self.resolver.resolve_expression(self.type_expression())
    }

    pub fn description(&self) -> String {
        descriptions::for_property(self.def)
    }

    pub fn attributes(&self) -> &'a [Annotation] {
        &self.def.attributes
    }

    /// Nullable if either the native signature or the effective type admits null.
    pub fn is_nullable(&self) -> Result<bool, TypeResolutionError> {
        if let Some(native) = self.def.native_type.as_deref() {
            if TypeExpr::parse(native)?.allows_null() {
                return Ok(true);
            }
        }
        Ok(TypeExpr::parse(self.type_expression())?.allows_null())
    }

    pub fn is_public(&self) -> bool {
        self.def.visibility == Visibility::Public
    }

    pub fn is_read_only(&self) -> bool {
        self.def.readonly
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    /// Whether a value can be supplied from outside: public, constructor
    /// parameter, or conventional setter.
    pub fn is_deserializable(&self) -> bool {
        self.is_public() || self.constructor_parameter().is_some() || self.setter_parameter().is_some()
    }

    /// Required-ness; the first applicable channel decides.
    pub fn is_required(&self) -> Result<bool, TypeResolutionError> {
        if let Some(param) = self.constructor_parameter() {
            if expression_allows_null(param.type_expr.as_deref())? {
                return Ok(false);
            }
            return Ok(!param.has_default_value());
        }

        if self.is_public() {
            return Ok(!self.is_nullable()?);
        }

        let Some(param) = self.setter_parameter() else {
            return Ok(false);
        };

        if self.is_nullable()? || expression_allows_null(param.type_expr.as_deref())? {
            return Ok(false);
        }
        Ok(!param.has_default_value())
    }

    fn constructor_parameter(&self) -> Option<&'a ParamDef> {
        self.class.constructor.as_ref()?.find_param(&self.def.name)
    }

    fn setter_parameter(&self) -> Option<&'a ParamDef> {
        self.setter_method()?.params.first()
    }

    /// `set<Name>`: public, exactly one parameter, returns `void` or nothing.
    fn setter_method(&self) -> Option<&'a FunctionDef> {
        let method = self.class.find_method(&setter_name(&self.def.name))?;
        if method.visibility != Visibility::Public || method.params.len() != 1 {
            return None;
        }
        match method.returns.as_deref().map(str::trim) {
            None => Some(method),
            Some(ret) if ret.eq_ignore_ascii_case("void") => Some(method),
            Some(_) => None,
        }
    }
}

fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// Metadata view of a free function or method.
#[derive(Clone, Copy)]
pub struct FunctionInfo<'a> {
    def: &'a FunctionDef,
    class: Option<&'a ClassDef>,
}

impl<'a> FunctionInfo<'a> {
    /// # Errors
    ///
    /// Returns `ReflectionError::FunctionNotFound` for unknown functions.
    pub fn from_function_name(source: &'a dyn ClassSource, name: &str) -> Result<Self, ReflectionError> {
        source
            .function(name)
            .map(|def| Self { def, class: None })
            .ok_or_else(|| ReflectionError::FunctionNotFound {
                function: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `ReflectionError::ClassNotFound` or `ReflectionError::MethodNotFound`.
    pub fn from_method_name(
        source: &'a dyn ClassSource,
        class: &str,
        method: &str,
    ) -> Result<Self, ReflectionError> {
        ClassInfo::new(source, class)?.method(method)
    }

    fn for_method(class: &'a ClassDef, def: &'a FunctionDef) -> Self {
        Self {
            def,
            class: Some(class),
        }
    }

    pub fn name(&self) -> &'a str {
        &self.def.name
    }

    /// Name without namespace.
    pub fn short_name(&self) -> &'a str {
        short_class_name(&self.def.name)
    }

    pub fn is_class_method(&self) -> bool {
        self.class.is_some()
    }

    pub fn definition(&self) -> &'a FunctionDef {
        self.def
    }

    pub fn parameters(&self) -> &'a [ParamDef] {
        &self.def.params
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.def.find_param(name).is_some()
    }

    /// Untyped parameters admit null.
    pub fn is_nullable(&self, name: &str) -> Result<bool, SchemaError> {
        let param = self.parameter(name)?;
        Ok(expression_allows_null(param.type_expr.as_deref())?)
    }

    /// Optional when it has a default or is variadic.
    pub fn is_optional(&self, name: &str) -> Result<bool, ReflectionError> {
        let param = self.parameter(name)?;
        Ok(param.has_default_value() || param.variadic)
    }

    pub fn is_variadic(&self, name: &str) -> Result<bool, ReflectionError> {
        Ok(self.parameter(name)?.variadic)
    }

    pub fn has_default_value(&self, name: &str) -> Result<bool, ReflectionError> {
        Ok(self.parameter(name)?.has_default_value())
    }

    /// Declared default; `Value::Null` when the default is absent or null.
    pub fn default_value(&self, name: &str) -> Result<Value, ReflectionError> {
        Ok(self.parameter(name)?.default.clone().unwrap_or(Value::Null))
    }

    pub fn description(&self) -> String {
        descriptions::for_function(self.def)
    }

    pub fn parameter_description(&self, name: &str) -> Result<String, ReflectionError> {
        let param = self.parameter(name)?;
        Ok(descriptions::for_parameter(self.def, param))
    }

    fn parameter(&self, name: &str) -> Result<&'a ParamDef, ReflectionError> {
        self.def
            .find_param(name)
            .ok_or_else(|| ReflectionError::ParameterNotFound {
                parameter: name.to_string(),
                function: self.def.name.clone(),
            })
    }
}
