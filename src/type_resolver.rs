//! Type resolution - turns type expressions, descriptors and runtime values into
//! normalized `TypeDescriptor`s.
//!
//! # Union policy
//!
//! | Non-null branches | Result |
//! |-------------------|--------|
//! | none | `mixed` |
//! | one | that branch |
//! | exactly `int` and `float` | `float` |
//! | any other all-scalar set | `mixed` |
//! | any non-scalar branch | `TypeResolutionError::UnsupportedUnion` |

use tracing::trace;

use crate::error::TypeResolutionError;
use crate::registry::ClassSource;
use crate::types::{normalize_class_name, RuntimeValue, ScalarKind, TypeDescriptor};

/// Input accepted by [`TypeResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// A type expression such as `?App\User`, `int[]` or `int|float`.
    Expression(String),
    /// An already structured descriptor, normalized again.
    Descriptor(TypeDescriptor),
    /// A runtime value whose type is inferred.
    Value(RuntimeValue),
}

impl From<&str> for TypeSpec {
    fn from(value: &str) -> Self {
        TypeSpec::Expression(value.to_string())
    }
}

impl From<String> for TypeSpec {
    fn from(value: String) -> Self {
        TypeSpec::Expression(value)
    }
}

impl From<TypeDescriptor> for TypeSpec {
    fn from(value: TypeDescriptor) -> Self {
        TypeSpec::Descriptor(value)
    }
}

impl From<RuntimeValue> for TypeSpec {
    fn from(value: RuntimeValue) -> Self {
        TypeSpec::Value(value)
    }
}

/// Parsed, not yet normalized type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(String),
    Nullable(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    /// `array`-like container; `None` item means untyped.
    List(Option<Box<TypeExpr>>),
}

impl TypeExpr {
    /// Parse a type expression.
    ///
    /// # Errors
    ///
    /// Returns `TypeResolutionError::EmptySpecification` for blank input and
    /// `TypeResolutionError::InvalidSyntax` for malformed expressions.
    pub fn parse(source: &str) -> Result<Self, TypeResolutionError> {
        if source.trim().is_empty() {
            return Err(TypeResolutionError::EmptySpecification);
        }
        let tokens = tokenize(source)?;
        let mut parser = ExprParser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_union()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.syntax_error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// Whether a value of this type may be null.
    pub fn allows_null(&self) -> bool {
        match self {
            TypeExpr::Nullable(_) => true,
            TypeExpr::Union(branches) => branches.iter().any(TypeExpr::allows_null),
            TypeExpr::Named(name) => {
                let name = name.to_ascii_lowercase();
                name == "null" || name == "mixed"
            }
            TypeExpr::Intersection(_) | TypeExpr::List(_) => false,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, TypeExpr::Named(name) if name.eq_ignore_ascii_case("null"))
    }
}

/// Whether the type expression admits null. Untyped (`None`) admits null.
pub fn expression_allows_null(type_expr: Option<&str>) -> Result<bool, TypeResolutionError> {
    match type_expr {
        None => Ok(true),
        Some(expr) => Ok(TypeExpr::parse(expr)?.allows_null()),
    }
}

/// Resolves type specifications against a class source.
#[derive(Clone, Copy)]
pub struct TypeResolver<'a> {
    classes: &'a dyn ClassSource,
}

impl<'a> TypeResolver<'a> {
    pub fn new(classes: &'a dyn ClassSource) -> Self {
        Self { classes }
    }

    /// Resolve any type specification into a normalized descriptor.
    ///
    /// # Errors
    ///
    /// Returns `TypeResolutionError` for empty specifications, object or enum
    /// types without a resolvable class, and unsupported unions.
    pub fn resolve(&self, spec: impl Into<TypeSpec>) -> Result<TypeDescriptor, TypeResolutionError> {
        match spec.into() {
            TypeSpec::Expression(expr) => self.resolve_expression(&expr),
            TypeSpec::Descriptor(descriptor) => self.normalize(descriptor),
            TypeSpec::Value(value) => self.resolve_value(&value),
        }
    }

    /// Resolve a type expression string.
    pub fn resolve_expression(&self, source: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        let expr = TypeExpr::parse(source)?;
        let resolved = self.normalize_expr(&expr, source)?;
        trace!(source, resolved = %resolved, "resolved type expression");
        Ok(resolved)
    }

    /// Normalize an already structured descriptor.
    pub fn normalize(&self, descriptor: TypeDescriptor) -> Result<TypeDescriptor, TypeResolutionError> {
        match descriptor {
            TypeDescriptor::Object(class) | TypeDescriptor::Enum(class) => self.class_type(&class),
            TypeDescriptor::Collection(item) => Ok(TypeDescriptor::collection(self.normalize(*item)?)),
            TypeDescriptor::Union(branches) => {
                let source = TypeDescriptor::Union(branches.clone()).to_string();
                let normalized = branches
                    .into_iter()
                    .map(|branch| self.normalize(branch))
                    .collect::<Result<Vec<_>, _>>()?;
                narrow_union(normalized, &source)
            }
            other => Ok(other),
        }
    }

    /// Infer a descriptor from a runtime value.
    ///
    /// Unsupported values resolve to `mixed` rather than failing.
    pub fn resolve_value(&self, value: &RuntimeValue) -> Result<TypeDescriptor, TypeResolutionError> {
        match value {
            RuntimeValue::Null | RuntimeValue::Opaque => Ok(TypeDescriptor::Mixed),
            RuntimeValue::Bool(_) => Ok(TypeDescriptor::Scalar(ScalarKind::Bool)),
            RuntimeValue::Int(_) => Ok(TypeDescriptor::Scalar(ScalarKind::Int)),
            RuntimeValue::Float(_) => Ok(TypeDescriptor::Scalar(ScalarKind::Float)),
            RuntimeValue::Str(_) => Ok(TypeDescriptor::Scalar(ScalarKind::String)),
            RuntimeValue::Instance { class } => self.class_type(class),
            RuntimeValue::List(items) => self.resolve_items(items.iter()),
            RuntimeValue::Map(entries) => self.resolve_items(entries.values()),
        }
    }

    fn resolve_items<'v>(
        &self,
        items: impl Iterator<Item = &'v RuntimeValue>,
    ) -> Result<TypeDescriptor, TypeResolutionError> {
        let mut shared: Option<TypeDescriptor> = None;
        for item in items {
            let item_type = match item {
                RuntimeValue::Null => continue,
                RuntimeValue::Bool(_)
                | RuntimeValue::Int(_)
                | RuntimeValue::Float(_)
                | RuntimeValue::Str(_)
                | RuntimeValue::Instance { .. } => self.resolve_value(item)?,
                // nested containers and opaque values have no item kind
                _ => return Ok(TypeDescriptor::Array),
            };
            match &shared {
                None => shared = Some(item_type),
                Some(existing) if *existing == item_type => {}
                Some(_) => return Ok(TypeDescriptor::Array),
            }
        }

        Ok(match shared {
            Some(item) => TypeDescriptor::collection(item),
            None => TypeDescriptor::Array,
        })
    }

    fn normalize_expr(&self, expr: &TypeExpr, source: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        match expr {
            TypeExpr::Nullable(inner) => self.normalize_expr(inner, source),
            TypeExpr::Named(name) => self.named_type(name, source),
            TypeExpr::List(None) => Ok(TypeDescriptor::Array),
            TypeExpr::List(Some(item)) => Ok(TypeDescriptor::collection(
                self.normalize_expr(item, source)?,
            )),
            TypeExpr::Union(branches) => {
                let mut non_null = Vec::new();
                collect_non_null(branches, &mut non_null);
                match non_null.len() {
                    0 => Ok(TypeDescriptor::Mixed),
                    1 => self.normalize_expr(non_null[0], source),
                    _ => {
                        let resolved = non_null
                            .into_iter()
                            .map(|branch| self.normalize_expr(branch, source))
                            .collect::<Result<Vec<_>, _>>()?;
                        narrow_union(resolved, source)
                    }
                }
            }
            TypeExpr::Intersection(_) => Err(TypeResolutionError::UnsupportedType {
                source_type: source.to_string(),
            }),
        }
    }

    fn named_type(&self, name: &str, source: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        if let Some(kind) = ScalarKind::from_keyword(name) {
            return Ok(TypeDescriptor::Scalar(kind));
        }

        match name.to_ascii_lowercase().as_str() {
            "mixed" | "null" => Ok(TypeDescriptor::Mixed),
            "array" | "list" | "iterable" | "non-empty-array" | "non-empty-list" => {
                Ok(TypeDescriptor::Array)
            }
            "object" => Err(TypeResolutionError::MissingObjectClass {
                source_type: source.to_string(),
            }),
            "enum" => Err(TypeResolutionError::MissingEnumClass {
                source_type: source.to_string(),
            }),
            "void" | "never" | "callable" | "resource" | "self" | "static" | "parent" => {
                Err(TypeResolutionError::UnsupportedType {
                    source_type: source.to_string(),
                })
            }
            _ => self.class_type(name).map_err(|_| TypeResolutionError::MissingObjectClass {
                source_type: source.to_string(),
            }),
        }
    }

    /// Object or enum descriptor for a registered class.
    fn class_type(&self, class: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        match self.classes.class(class) {
            Some(def) if def.is_enum() => TypeDescriptor::enumeration(&def.name),
            Some(def) => TypeDescriptor::object(&def.name),
            None => Err(TypeResolutionError::MissingObjectClass {
                source_type: normalize_class_name(class).to_string(),
            }),
        }
    }
}

/// Flatten nested unions and nullable wrappers, dropping `null` branches.
fn collect_non_null<'e>(branches: &'e [TypeExpr], out: &mut Vec<&'e TypeExpr>) {
    for branch in branches {
        match branch {
            TypeExpr::Union(inner) => collect_non_null(inner, out),
            TypeExpr::Nullable(inner) => collect_non_null(std::slice::from_ref(inner.as_ref()), out),
            b if b.is_null() => {}
            b => out.push(b),
        }
    }
}

fn narrow_union(
    branches: Vec<TypeDescriptor>,
    source: &str,
) -> Result<TypeDescriptor, TypeResolutionError> {
    let mut distinct: Vec<TypeDescriptor> = Vec::new();
    for branch in branches {
        if !distinct.contains(&branch) {
            distinct.push(branch);
        }
    }

    if distinct.len() == 1 {
        return Ok(distinct.remove(0));
    }

    if !distinct.iter().all(TypeDescriptor::is_scalar) {
        return Err(TypeResolutionError::UnsupportedUnion {
            source_type: source.to_string(),
        });
    }

    let numeric = distinct.len() == 2
        && distinct.contains(&TypeDescriptor::Scalar(ScalarKind::Int))
        && distinct.contains(&TypeDescriptor::Scalar(ScalarKind::Float));

    Ok(if numeric {
        TypeDescriptor::Scalar(ScalarKind::Float)
    } else {
        TypeDescriptor::Mixed
    })
}

// --- Expression tokenizer and parser ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Question,
    Pipe,
    Amp,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Comma,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, TypeResolutionError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '?' => Token::Question,
            '|' => Token::Pipe,
            '&' => Token::Amp,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '<' => Token::Lt,
            '>' => Token::Gt,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_alphanumeric() || c == '_' || c == '\\' || c == '-' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '\\' || c == '-' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
                continue;
            }
            other => {
                return Err(TypeResolutionError::InvalidSyntax {
                    source_type: source.to_string(),
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        chars.next();
        tokens.push(token);
    }

    Ok(tokens)
}

struct ExprParser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), TypeResolutionError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.syntax_error(&format!("expected {}", what)))
        }
    }

    fn syntax_error(&self, message: &str) -> TypeResolutionError {
        TypeResolutionError::InvalidSyntax {
            source_type: self.source.to_string(),
            message: message.to_string(),
        }
    }

    fn parse_union(&mut self) -> Result<TypeExpr, TypeResolutionError> {
        let mut branches = vec![self.parse_intersection()?];
        while self.eat(&Token::Pipe) {
            branches.push(self.parse_intersection()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            TypeExpr::Union(branches)
        })
    }

    fn parse_intersection(&mut self) -> Result<TypeExpr, TypeResolutionError> {
        let mut parts = vec![self.parse_postfix()?];
        while self.eat(&Token::Amp) {
            parts.push(self.parse_postfix()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            TypeExpr::Intersection(parts)
        })
    }

    fn parse_postfix(&mut self) -> Result<TypeExpr, TypeResolutionError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&Token::LBracket) {
            self.expect(&Token::RBracket, "']'")?;
            expr = TypeExpr::List(Some(Box::new(expr)));
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<TypeExpr, TypeResolutionError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Question) => {
                self.pos += 1;
                Ok(TypeExpr::Nullable(Box::new(self.parse_postfix()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_union()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if !self.eat(&Token::Lt) {
                    return Ok(TypeExpr::Named(name));
                }
                let mut args = vec![self.parse_union()?];
                while self.eat(&Token::Comma) {
                    args.push(self.parse_union()?);
                }
                self.expect(&Token::Gt, "'>'")?;
                match name.to_ascii_lowercase().as_str() {
                    "array" | "list" | "iterable" | "non-empty-array" | "non-empty-list" => {
                        // value type is the last generic argument
                        Ok(TypeExpr::List(args.pop().map(Box::new)))
                    }
                    _ => Err(self.syntax_error(&format!("unsupported generic type '{}'", name))),
                }
            }
            Some(other) => Err(self.syntax_error(&format!("unexpected token {:?}", other))),
            None => Err(self.syntax_error("unexpected end of input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClassDef, ClassRegistry};
    use crate::types::EnumValue;

    fn registry() -> ClassRegistry {
        ClassRegistry::new()
            .with(ClassDef::class("App\\User"))
            .with(ClassDef::class("App\\Team"))
            .with(ClassDef::backed_enum(
                "App\\Role",
                ScalarKind::String,
                vec![("Admin", EnumValue::from("admin"))],
            ))
    }

    fn resolve(expr: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        let registry = registry();
        TypeResolver::new(&registry).resolve(expr)
    }

    #[test]
    fn scalars_and_keywords() {
        assert_eq!(resolve("int").unwrap(), TypeDescriptor::Scalar(ScalarKind::Int));
        assert_eq!(resolve("double").unwrap(), TypeDescriptor::Scalar(ScalarKind::Float));
        assert_eq!(resolve("true").unwrap(), TypeDescriptor::Scalar(ScalarKind::Bool));
        assert_eq!(resolve("mixed").unwrap(), TypeDescriptor::Mixed);
        assert_eq!(resolve("array").unwrap(), TypeDescriptor::Array);
    }

    #[test]
    fn empty_specification_errors() {
        assert_eq!(resolve("  "), Err(TypeResolutionError::EmptySpecification));
    }

    #[test]
    fn numeric_union_widens_to_float() {
        assert_eq!(resolve("int|float").unwrap(), TypeDescriptor::Scalar(ScalarKind::Float));
        assert_eq!(resolve("float|int|null").unwrap(), TypeDescriptor::Scalar(ScalarKind::Float));
    }

    #[test]
    fn other_scalar_unions_widen_to_mixed() {
        assert_eq!(resolve("int|string").unwrap(), TypeDescriptor::Mixed);
        assert_eq!(resolve("int|float|string").unwrap(), TypeDescriptor::Mixed);
    }

    #[test]
    fn boolean_literal_union_is_bool() {
        assert_eq!(resolve("true|false").unwrap(), TypeDescriptor::Scalar(ScalarKind::Bool));
    }

    #[test]
    fn object_unions_are_rejected() {
        assert!(matches!(
            resolve("App\\User|App\\Team"),
            Err(TypeResolutionError::UnsupportedUnion { .. })
        ));
        assert!(matches!(
            resolve("App\\User|int"),
            Err(TypeResolutionError::UnsupportedUnion { .. })
        ));
    }

    #[test]
    fn nullable_forms_match_bare_type() {
        let bare = resolve("App\\User").unwrap();
        assert_eq!(resolve("?App\\User").unwrap(), bare);
        assert_eq!(resolve("App\\User|null").unwrap(), bare);
        assert_eq!(resolve("null|\\App\\User").unwrap(), bare);
    }

    #[test]
    fn enum_classes_resolve_to_enum() {
        assert_eq!(resolve("App\\Role").unwrap(), TypeDescriptor::Enum("App\\Role".into()));
    }

    #[test]
    fn unknown_class_is_an_error() {
        assert!(matches!(
            resolve("App\\Missing"),
            Err(TypeResolutionError::MissingObjectClass { .. })
        ));
        assert!(matches!(
            resolve("object"),
            Err(TypeResolutionError::MissingObjectClass { .. })
        ));
        assert!(matches!(
            resolve("enum"),
            Err(TypeResolutionError::MissingEnumClass { .. })
        ));
    }

    #[test]
    fn collections_and_arrays() {
        let ints = TypeDescriptor::collection(TypeDescriptor::Scalar(ScalarKind::Int));
        assert_eq!(resolve("int[]").unwrap(), ints);
        assert_eq!(resolve("?int[]").unwrap(), ints);
        assert_eq!(resolve("array<int>").unwrap(), ints);
        assert_eq!(resolve("array<string, int>").unwrap(), ints);
        assert_eq!(resolve("list<int>|null").unwrap(), ints);
        assert_eq!(resolve("mixed[]").unwrap(), TypeDescriptor::Array);
        assert_eq!(resolve("array<mixed>").unwrap(), TypeDescriptor::Array);
        assert_eq!(
            resolve("App\\User[]").unwrap(),
            TypeDescriptor::collection(TypeDescriptor::Object("App\\User".into()))
        );
    }

    #[test]
    fn intersections_and_pseudo_types_are_unsupported() {
        assert!(matches!(
            resolve("App\\User&App\\Team"),
            Err(TypeResolutionError::UnsupportedType { .. })
        ));
        assert!(matches!(
            resolve("void"),
            Err(TypeResolutionError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            resolve("int[|"),
            Err(TypeResolutionError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            resolve("Foo<int>"),
            Err(TypeResolutionError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn allows_null() {
        assert!(TypeExpr::parse("?int").unwrap().allows_null());
        assert!(TypeExpr::parse("int|null").unwrap().allows_null());
        assert!(TypeExpr::parse("mixed").unwrap().allows_null());
        assert!(!TypeExpr::parse("int").unwrap().allows_null());
        assert!(!TypeExpr::parse("int[]").unwrap().allows_null());
        assert!(expression_allows_null(None).unwrap());
    }

    #[test]
    fn descriptor_normalization() {
        let registry = registry();
        let resolver = TypeResolver::new(&registry);
        let union = TypeDescriptor::Union(vec![
            TypeDescriptor::Scalar(ScalarKind::Int),
            TypeDescriptor::Scalar(ScalarKind::Float),
        ]);
        assert_eq!(resolver.resolve(union).unwrap(), TypeDescriptor::Scalar(ScalarKind::Float));

        // object descriptors are re-bound to their registered kind
        assert_eq!(
            resolver.resolve(TypeDescriptor::Object("\\App\\Role".into())).unwrap(),
            TypeDescriptor::Enum("App\\Role".into())
        );
        assert!(resolver.resolve(TypeDescriptor::Object("App\\Nope".into())).is_err());
    }

    #[test]
    fn runtime_values() {
        let registry = registry();
        let resolver = TypeResolver::new(&registry);

        assert_eq!(
            resolver.resolve(RuntimeValue::from(42)).unwrap(),
            TypeDescriptor::Scalar(ScalarKind::Int)
        );
        assert_eq!(resolver.resolve(RuntimeValue::Null).unwrap(), TypeDescriptor::Mixed);
        assert_eq!(resolver.resolve(RuntimeValue::Opaque).unwrap(), TypeDescriptor::Mixed);
        assert_eq!(
            resolver.resolve(RuntimeValue::instance("App\\Role")).unwrap(),
            TypeDescriptor::Enum("App\\Role".into())
        );
        assert_eq!(
            resolver.resolve(RuntimeValue::List(vec![])).unwrap(),
            TypeDescriptor::Array
        );
        assert_eq!(
            resolver
                .resolve(RuntimeValue::List(vec![RuntimeValue::Null, 1.into(), 2.into()]))
                .unwrap(),
            TypeDescriptor::collection(TypeDescriptor::Scalar(ScalarKind::Int))
        );
        assert_eq!(
            resolver
                .resolve(RuntimeValue::List(vec![RuntimeValue::Null, RuntimeValue::Null]))
                .unwrap(),
            TypeDescriptor::Array
        );
        assert_eq!(
            resolver
                .resolve(RuntimeValue::List(vec![1.into(), "a".into()]))
                .unwrap(),
            TypeDescriptor::Array
        );
        assert_eq!(
            resolver
                .resolve(RuntimeValue::List(vec![RuntimeValue::Opaque, RuntimeValue::Opaque]))
                .unwrap(),
            TypeDescriptor::Array
        );
        assert_eq!(
            resolver
                .resolve(RuntimeValue::List(vec![
                    RuntimeValue::instance("App\\User"),
                    RuntimeValue::instance("App\\User"),
                ]))
                .unwrap(),
            TypeDescriptor::collection(TypeDescriptor::Object("App\\User".into()))
        );
    }
}
