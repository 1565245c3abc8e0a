use serde_json::{Map, Number, Value};

use super::element::Element;
use super::error::ParseError;
use crate::catalog::numeric::format_number;

const DEFAULT_ROOT: &str = "svarx";

/// Convert a JSON rule document into the element tree the XML dialect
/// produces.
///
/// Scalar members become attributes, object members become child
/// elements, and array members repeat the child element once per item.
/// A top-level object with a single object member is that element;
/// anything else is wrapped in an `svarx` root.
///
/// # Errors
///
/// Returns [`ParseError`] if the top-level value is not an object.
pub fn json_to_element(value: &Value) -> Result<Element, ParseError> {
    let Value::Object(members) = value else {
        return Err(ParseError::new(format!(
            "JSON rule document must be an object, found {}",
            kind_name(value)
        )));
    };

    if members.len() == 1 {
        if let Some((name, Value::Object(inner))) = members.iter().next() {
            return Ok(object_element(name, inner));
        }
    }
    Ok(object_element(DEFAULT_ROOT, members))
}

fn object_element(name: &str, members: &Map<String, Value>) -> Element {
    let mut element = Element::new(name);
    for (key, value) in members {
        push_member(&mut element, key, value);
    }
    element
}

fn push_member(element: &mut Element, key: &str, value: &Value) {
    match value {
        Value::String(s) => element.set_attr(key, s.as_str()),
        Value::Number(n) => element.set_attr(key, number_text(n)),
        Value::Bool(b) => element.set_attr(key, b.to_string()),
        Value::Null => element.children.push(Element::new(key)),
        Value::Object(inner) => element.children.push(object_element(key, inner)),
        Value::Array(items) if items.is_empty() => element.children.push(Element::new(key)),
        Value::Array(items) => {
            for item in items {
                push_item(element, key, item);
            }
        }
    }
}

fn push_item(element: &mut Element, key: &str, item: &Value) {
    match item {
        Value::Object(inner) => element.children.push(object_element(key, inner)),
        Value::Array(nested) => {
            for inner in nested {
                push_item(element, key, inner);
            }
        }
        _ => element.children.push(Element::new(key)),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        format_number(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
