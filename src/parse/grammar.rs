use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_till, take_until, take_while};

use super::element::Element;
use super::error::EntityError;

// -- Whitespace & markup that carries no rules ------------------------------

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., is_space).void().parse_next(input)
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., is_space).void().parse_next(input)
}

fn comment(input: &mut &str) -> ModalResult<()> {
    ("<!--", cut_err((take_until(0.., "-->"), "-->")))
        .void()
        .context(StrContext::Expected(StrContextValue::Description(
            "end of comment",
        )))
        .parse_next(input)
}

fn processing_instruction(input: &mut &str) -> ModalResult<()> {
    ("<?", cut_err((take_until(0.., "?>"), "?>")))
        .void()
        .parse_next(input)
}

fn cdata(input: &mut &str) -> ModalResult<()> {
    ("<![CDATA[", cut_err((take_until(0.., "]]>"), "]]>")))
        .void()
        .parse_next(input)
}

fn doctype(input: &mut &str) -> ModalResult<()> {
    ("<!DOCTYPE", cut_err((take_till(0.., '>'), '>')))
        .void()
        .parse_next(input)
}

fn misc(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(0.., alt((ws1, comment, processing_instruction))).parse_next(input)?;
    Ok(())
}

fn text(input: &mut &str) -> ModalResult<()> {
    take_till(1.., '<').void().parse_next(input)
}

// -- Names & attributes -----------------------------------------------------

fn xml_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_alphabetic() || c == '_' || c == ':'),
        take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
        }),
    )
        .take()
        .parse_next(input)
}

fn attr_value(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .try_map(decode_entities)
    .context(StrContext::Expected(StrContextValue::Description(
        "quoted attribute value",
    )))
    .parse_next(input)
}

fn attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let name = xml_name.parse_next(input)?;
    ws.parse_next(input)?;
    '='.parse_next(input)?;
    ws.parse_next(input)?;
    let value = cut_err(attr_value).parse_next(input)?;
    Ok((name.to_owned(), value))
}

// -- Elements ---------------------------------------------------------------

fn element(input: &mut &str) -> ModalResult<Element> {
    '<'.parse_next(input)?;
    let name = xml_name.parse_next(input)?;

    let pairs: Vec<(String, String)> = repeat(0.., preceded(ws1, attribute)).parse_next(input)?;
    ws.parse_next(input)?;

    let mut element = Element::new(name);
    for (key, value) in pairs {
        element.set_attr(&key, value);
    }

    if opt("/>").parse_next(input)?.is_some() {
        return Ok(element);
    }

    cut_err('>')
        .context(StrContext::Expected(StrContextValue::Description(
            "'>' or '/>'",
        )))
        .parse_next(input)?;

    element.children = content(input)?;

    cut_err(("</", literal(name), ws, '>'))
        .context(StrContext::Expected(StrContextValue::Description(
            "matching closing tag",
        )))
        .parse_next(input)?;

    Ok(element)
}

fn content(input: &mut &str) -> ModalResult<Vec<Element>> {
    let items: Vec<Option<Element>> = repeat(
        0..,
        alt((
            element.map(Some),
            comment.value(None),
            cdata.value(None),
            processing_instruction.value(None),
            text.value(None),
        )),
    )
    .parse_next(input)?;
    Ok(items.into_iter().flatten().collect())
}

// -- Entities ---------------------------------------------------------------

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn decode_entities(raw: &str) -> Result<String, EntityError> {
    if !raw.contains('&') {
        return Ok(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| EntityError(after.chars().take(8).collect()))?;
        let name = &after[..end];
        out.push(resolve_entity(name).ok_or_else(|| EntityError(name.to_owned()))?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// -- Top-level parser -------------------------------------------------------

pub fn document(input: &mut &str) -> ModalResult<Element> {
    misc.parse_next(input)?;
    opt(doctype).parse_next(input)?;
    misc.parse_next(input)?;
    let root = cut_err(element)
        .context(StrContext::Expected(StrContextValue::Description(
            "root element",
        )))
        .parse_next(input)?;
    misc.parse_next(input)?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use crate::parse::parse_xml;

    use super::*;

    #[test]
    fn parse_self_closing_root() {
        let root = parse_xml("<validate/>").unwrap();
        assert_eq!(root.name, "validate");
        assert!(root.attributes.is_empty());
        assert!(root.children.is_empty());
    }

    #[test]
    fn parse_attributes_both_quote_styles() {
        let root = parse_xml(r#"<rule type="range" min='18' max = "65" />"#).unwrap();
        assert_eq!(root.get_attr("type"), Some("range"));
        assert_eq!(root.get_attr("min"), Some("18"));
        assert_eq!(root.get_attr("max"), Some("65"));
    }

    #[test]
    fn parse_nested_children_in_order() {
        let root = parse_xml(
            r#"<validate logic="or">
                 <rule type="required" for="a"/>
                 <block><rule type="required" for="b"/></block>
               </validate>"#,
        )
        .unwrap();
        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["rule", "block"]);
        assert_eq!(root.children[1].children[0].get_attr("for"), Some("b"));
    }

    #[test]
    fn parse_skips_prolog_comments_and_text() {
        let root = parse_xml(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <!DOCTYPE svarx>\n\
             <!-- header -->\n\
             <svarx>some text<!-- inner --><validate/><![CDATA[<rule/>]]></svarx>\n\
             <!-- trailer -->",
        )
        .unwrap();
        assert_eq!(root.name, "svarx");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "validate");
    }

    #[test]
    fn parse_entities_in_attributes() {
        let root = parse_xml(r#"<rule match="^a&amp;b&lt;c&#62;&#x41;&quot;&apos;$"/>"#).unwrap();
        assert_eq!(root.get_attr("match"), Some("^a&b<c>A\"'$"));
    }

    #[test]
    fn unknown_entity_is_error() {
        assert!(parse_xml(r#"<rule match="&nbsp;"/>"#).is_err());
    }

    #[test]
    fn mismatched_closing_tag_is_error() {
        assert!(parse_xml("<validate><block></validate></block>").is_err());
    }

    #[test]
    fn unterminated_element_is_error() {
        assert!(parse_xml("<validate><rule/>").is_err());
    }

    #[test]
    fn trailing_garbage_is_error() {
        assert!(parse_xml("<validate/><validate/>").is_err());
    }

    #[test]
    fn names_with_dashes_and_colons() {
        let root = parse_xml(r#"<x:svarx data-v="1"/>"#).unwrap();
        assert_eq!(root.name, "x:svarx");
        assert_eq!(root.get_attr("data-v"), Some("1"));
    }

    #[test]
    fn decode_entities_passthrough() {
        assert_eq!(decode_entities("plain").unwrap(), "plain");
        assert!(decode_entities("a & b").is_err());
    }
}
