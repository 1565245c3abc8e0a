mod element;
mod error;
mod grammar;
mod json;

pub use element::Element;
pub use error::ParseError;
pub use json::json_to_element;

/// Parse XML markup into a generic [`Element`] tree.
///
/// Only the subset rule documents use is accepted: elements, attributes,
/// comments, processing instructions, a doctype, and ignored text or CDATA.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed, including trailing
/// content after the root element.
pub fn parse_xml(input: &str) -> Result<Element, ParseError> {
    use winnow::Parser;
    grammar::document
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
