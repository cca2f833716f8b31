//! Structural XML validation for request bodies.

use crate::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Checks that `text` is a well-formed XML document.
///
/// Blank input is accepted. Otherwise there must be exactly one root element,
/// every element must be closed with a matching end tag, attribute values must
/// be quoted and unique per element, and no character data may appear outside
/// the root.
pub fn validate(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = true;

    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_attributes(&e, &reader)?;
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                check_attributes(&e, &reader)?;
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| parse_error(&reader, "unexpected end tag"))?;
            }
            Ok(Event::Text(t)) if depth == 0 => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(parse_error(&reader, "text outside the root element"));
                }
            }
            Ok(Event::CData(_)) if depth == 0 => {
                return Err(parse_error(&reader, "CDATA outside the root element"));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::XmlParse(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }

        if roots > 1 {
            return Err(parse_error(&reader, "more than one root element"));
        }
    }

    if depth != 0 {
        return Err(Error::XmlParse("unclosed element at end of input".to_string()));
    }
    if roots == 0 {
        return Err(Error::XmlParse("no root element".to_string()));
    }
    Ok(())
}

/// Attribute values must be quoted and names unique within an element.
fn check_attributes(element: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<()> {
    for attribute in element.attributes() {
        attribute.map_err(|e| parse_error(reader, &e.to_string()))?;
    }
    Ok(())
}

fn parse_error(reader: &Reader<&[u8]>, reason: &str) -> Error {
    Error::XmlParse(format!("{} at position {}", reason, reader.buffer_position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_documents() {
        assert!(validate("<a/>").is_ok());
        assert!(validate("<?xml version=\"1.0\"?>\n<a x=\"1\"><b>text</b><c/></a>\n").is_ok());
        assert!(validate("   ").is_ok());
        assert!(validate("<a x='1' y=\"2\"><b z=\"3\"/></a>").is_ok());
    }

    #[test]
    fn test_malformed_documents() {
        for bad in [
            "<a><",
            "<a>",
            "<a></b>",
            "</a>",
            "<a/><b/>",
            "plain text",
            "<a/>tail",
            "<a x=1/>",
            "<a b=\"1\" b=\"2\"/>",
            "<a x></a>",
            "<a><b y='1' y='2'></b></a>",
        ] {
            assert!(
                matches!(validate(bad), Err(Error::XmlParse(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }
}
