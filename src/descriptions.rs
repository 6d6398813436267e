//! Description text aggregation from annotations and doc comments.
//!
//! Every `for_*` function collects, in order: `Description` annotations,
//! `Instructions` annotations, then the relevant doc comment text. Blank
//! entries are skipped, repeated entries collapse, and the rest is joined
//! with newlines.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::{Annotation, ClassDef, FunctionDef, ParamDef, PropertyDef};

static COMMENT_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*/\*\*|\*/\s*$").expect("static regex"));

static LINE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\*\s?").expect("static regex"));

/// Strip comment framing and `@tag` lines, keeping only free-text lines.
///
/// ```
/// use class_schema::descriptions::descriptions_only;
///
/// let doc = "/**\n * The user's email.\n * @var string\n */";
/// assert_eq!(descriptions_only(doc), "The user's email.");
/// ```
pub fn descriptions_only(doc: &str) -> String {
    if doc.is_empty() {
        return String::new();
    }

    let unframed = COMMENT_FRAME.replace_all(doc, "");
    let mut lines = Vec::new();
    for line in unframed.lines() {
        let line = LINE_PREFIX.replace(line, "");
        let line = line.trim();
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        lines.push(line.to_string());
    }

    lines.join("\n").trim().to_string()
}

/// Text following `@param <type> $name` in a doc comment, or empty.
pub fn parameter_description(name: &str, doc: &str) -> String {
    if doc.is_empty() || name.is_empty() {
        return String::new();
    }

    let pattern = format!(r"@param\s+\S+\s+\$?{}\b[ \t]*(.*)", regex::escape(name));
    let Ok(re) = Regex::new(&pattern) else {
        return String::new();
    };

    re.captures(doc)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Join description fragments: trims, drops blanks and repeats, newline-separated.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for part in parts {
        let part = part.as_ref().trim();
        if part.is_empty() || seen.iter().any(|s| s == part) {
            continue;
        }
        seen.push(part.to_string());
    }
    seen.join("\n")
}

fn annotation_texts(annotations: &[Annotation]) -> impl Iterator<Item = &str> {
    let descriptions = annotations.iter().filter_map(|a| match a {
        Annotation::Description(text) => Some(text.as_str()),
        Annotation::Instructions(_) => None,
    });
    let instructions = annotations.iter().filter_map(|a| match a {
        Annotation::Instructions(text) => Some(text.as_str()),
        Annotation::Description(_) => None,
    });
    descriptions.chain(instructions)
}

fn describe(annotations: &[Annotation], doc: Option<&str>) -> String {
    let doc = doc.map(descriptions_only).unwrap_or_default();
    join(annotation_texts(annotations).map(str::to_string).chain([doc]))
}

pub fn for_class(class: &ClassDef) -> String {
    describe(&class.attributes, class.doc_comment.as_deref())
}

pub fn for_property(property: &PropertyDef) -> String {
    describe(&property.attributes, property.doc_comment.as_deref())
}

/// Description of a free function or method.
pub fn for_function(function: &FunctionDef) -> String {
    describe(&function.attributes, function.doc_comment.as_deref())
}

/// Description of a parameter: its own annotations, then the matching
/// `@param` line of the declaring function's doc comment.
pub fn for_parameter(function: &FunctionDef, param: &ParamDef) -> String {
    let from_doc = function
        .doc_comment
        .as_deref()
        .map(|doc| parameter_description(&param.name, doc))
        .unwrap_or_default();
    join(annotation_texts(&param.attributes).map(str::to_string).chain([from_doc]))
}
