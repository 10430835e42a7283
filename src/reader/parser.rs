//! Fragment Parser
//!
//! Tokenizes complete markup with quick-xml into owned [`XmlEvent`]s.
//! quick-xml only sees one fragment at a time, so the document-level
//! well-formedness rules live in [`WellFormedness`], which persists across
//! fragments:
//! - start and end tags match
//! - exactly one root element
//! - only whitespace, comments and PIs outside the root
//! - the XML declaration comes first, DOCTYPE at most once and before the root
//! - element, attribute and PI target names are XML names
//! - `]]>` never appears in character data
//!
//! General entities declared in the DOCTYPE's internal subset are kept here
//! too and resolve references in text and attribute values.

use memchr::memmem;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;

use super::events::XmlEvent;
use crate::core::dtd::EntityTable;
use crate::core::scanner::is_valid_name;
use crate::error::{DocumentError, Result};

/// Document structure state carried between fragments
#[derive(Debug, Default)]
pub struct WellFormedness {
    open: Vec<String>,
    seen_any: bool,
    seen_doctype: bool,
    seen_root: bool,
    entities: EntityTable,
}

impl WellFormedness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Entities usable in references so far
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// Validate the next event against the document structure seen so far.
    pub fn check(&mut self, event: &XmlEvent) -> std::result::Result<(), String> {
        let first = !self.seen_any;
        self.seen_any = true;

        match event {
            XmlEvent::Declaration { .. } => {
                if !first {
                    return Err("XML declaration must come first".to_string());
                }
            }
            XmlEvent::DocType(content) => {
                if self.seen_doctype {
                    return Err("Multiple DOCTYPE declarations not allowed".to_string());
                }
                if self.seen_root {
                    return Err("DOCTYPE must come before root element".to_string());
                }
                self.seen_doctype = true;
                self.entities = EntityTable::from_doctype(content)?;
            }
            XmlEvent::StartElement { name, .. } | XmlEvent::EmptyElement { name, .. } => {
                if self.open.is_empty() {
                    if self.seen_root {
                        return Err("Document has multiple root elements".to_string());
                    }
                    self.seen_root = true;
                }
                if matches!(event, XmlEvent::StartElement { .. }) {
                    self.open.push(name.clone());
                }
            }
            XmlEvent::EndElement { name } => match self.open.pop() {
                Some(start) if start == *name => {}
                Some(start) => {
                    return Err(format!("Tag mismatch: <{}> closed with </{}>", start, name));
                }
                None => {
                    return Err(format!(
                        "Unexpected end tag: </{}> without matching start tag",
                        name
                    ));
                }
            },
            XmlEvent::Text(text) => {
                if self.open.is_empty() && !is_xml_whitespace(text) {
                    return Err("Text content not allowed at document level".to_string());
                }
            }
            XmlEvent::CData(_) => {
                if self.open.is_empty() {
                    return Err("CDATA section not allowed at document level".to_string());
                }
            }
            XmlEvent::Comment(_)
            | XmlEvent::ProcessingInstruction { .. }
            | XmlEvent::EndDocument => {}
        }
        Ok(())
    }

    /// Checks that only hold once the whole document has been seen.
    pub fn finish(&self) -> std::result::Result<(), String> {
        if let Some(unclosed) = self.open.first() {
            return Err(format!("Unclosed tag: <{}>", unclosed));
        }
        if !self.seen_root {
            return Err("Document has no root element".to_string());
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}

/// Parse a complete, self-contained document.
///
/// Events go to `sink` in document order, ending with `EndDocument`.
pub fn parse_document<F>(input: &[u8], sink: &mut F) -> Result<()>
where
    F: FnMut(XmlEvent),
{
    let mut checks = WellFormedness::new();
    parse_fragment(input, 0, &mut checks, sink)?;
    checks
        .finish()
        .map_err(|msg| DocumentError::malformed_at(msg, input.len() as u64))?;
    sink(XmlEvent::EndDocument);
    Ok(())
}

/// Parse one fragment of complete markup.
///
/// `base` is the absolute offset of `input` within the document, used for
/// error positions. Structure checks accumulate in `checks`.
pub fn parse_fragment<F>(
    input: &[u8],
    base: u64,
    checks: &mut WellFormedness,
    sink: &mut F,
) -> Result<()>
where
    F: FnMut(XmlEvent),
{
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_comments = true;
    // End-tag matching spans fragments and is done by `checks`
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    loop {
        let event_start = base + reader.buffer_position() as u64;
        let event = match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(event) => convert_event(event, &checks.entities)
                .map_err(|err| with_position(err, event_start))?,
            Err(e) => {
                return Err(DocumentError::malformed_at(
                    e.to_string(),
                    base + reader.error_position() as u64,
                ));
            }
        };

        if let Some(event) = event {
            checks
                .check(&event)
                .map_err(|msg| DocumentError::malformed_at(msg, event_start))?;
            sink(event);
        }
    }
}

fn with_position(err: DocumentError, position: u64) -> DocumentError {
    match err {
        DocumentError::MalformedContent {
            message,
            position: None,
        } => DocumentError::malformed_at(message, position),
        other => other,
    }
}

fn convert_event(event: Event<'_>, entities: &EntityTable) -> Result<Option<XmlEvent>> {
    let converted = match event {
        Event::Start(e) => {
            let (name, attributes) = element_parts(&e, entities)?;
            XmlEvent::StartElement { name, attributes }
        }
        Event::Empty(e) => {
            let (name, attributes) = element_parts(&e, entities)?;
            XmlEvent::EmptyElement { name, attributes }
        }
        Event::End(e) => XmlEvent::EndElement {
            name: utf8(e.name().as_ref())?.to_string(),
        },
        Event::Text(e) => {
            if memmem::find(&e, b"]]>").is_some() {
                return Err(DocumentError::malformed("']]>' not allowed in character data"));
            }
            let text = e.unescape_with(|name| entities.resolve(name))?;
            if text.is_empty() {
                return Ok(None);
            }
            XmlEvent::Text(text.into_owned())
        }
        Event::CData(e) => XmlEvent::CData(utf8(&e)?.to_string()),
        Event::Comment(e) => XmlEvent::Comment(utf8(&e)?.to_string()),
        Event::Decl(e) => declaration(&e)?,
        Event::PI(e) => {
            let target = utf8(e.target())?;
            if !is_valid_name(target) {
                return Err(DocumentError::malformed(format!(
                    "invalid processing instruction target '{}'",
                    target
                )));
            }
            XmlEvent::ProcessingInstruction {
                target: target.to_string(),
                data: utf8(e.content())?.trim_start().to_string(),
            }
        }
        Event::DocType(e) => XmlEvent::DocType(utf8(&e)?.trim().to_string()),
        Event::Eof => return Ok(None),
    };
    Ok(Some(converted))
}

fn element_parts(
    e: &BytesStart<'_>,
    entities: &EntityTable,
) -> Result<(String, Vec<(String, String)>)> {
    let name = utf8(e.name().as_ref())?.to_string();
    if !is_valid_name(&name) {
        return Err(DocumentError::malformed(format!(
            "invalid element name '{}'",
            name
        )));
    }

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        if !is_valid_name(&key) {
            return Err(DocumentError::malformed(format!(
                "invalid attribute name '{}' on <{}>",
                key, name
            )));
        }
        let value = attr
            .unescape_value_with(|entity| entities.resolve(entity))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok((name, attributes))
}

fn declaration(e: &BytesDecl<'_>) -> Result<XmlEvent> {
    let version = utf8(&e.version()?)?.to_string();
    let encoding = match e.encoding() {
        Some(enc) => Some(utf8(&enc?)?.to_string()),
        None => None,
    };
    let standalone = match e.standalone() {
        Some(value) => match utf8(&value?)? {
            "yes" => Some(true),
            "no" => Some(false),
            other => {
                return Err(DocumentError::malformed(format!(
                    "invalid standalone value '{}'",
                    other
                )));
            }
        },
        None => None,
    };
    Ok(XmlEvent::Declaration {
        version,
        encoding,
        standalone,
    })
}

#[inline]
fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| DocumentError::malformed(format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Result<Vec<XmlEvent>> {
        let mut out = Vec::new();
        parse_document(input.as_bytes(), &mut |e| out.push(e))?;
        Ok(out)
    }

    #[test]
    fn test_simple_document() {
        let out = events("<root a=\"1\">hi &amp; bye<b/></root>").unwrap();
        assert_eq!(
            out,
            vec![
                XmlEvent::StartElement {
                    name: "root".to_string(),
                    attributes: vec![("a".to_string(), "1".to_string())],
                },
                XmlEvent::Text("hi & bye".to_string()),
                XmlEvent::EmptyElement {
                    name: "b".to_string(),
                    attributes: vec![],
                },
                XmlEvent::EndElement {
                    name: "root".to_string()
                },
                XmlEvent::EndDocument,
            ]
        );
    }

    #[test]
    fn test_prolog() {
        let out = events("<?xml version=\"1.0\" standalone=\"yes\"?><!DOCTYPE r><?pi some data?><r/>")
            .unwrap();
        assert_eq!(
            out[0],
            XmlEvent::Declaration {
                version: "1.0".to_string(),
                encoding: None,
                standalone: Some(true),
            }
        );
        assert_eq!(out[1], XmlEvent::DocType("r".to_string()));
        assert_eq!(
            out[2],
            XmlEvent::ProcessingInstruction {
                target: "pi".to_string(),
                data: "some data".to_string(),
            }
        );
    }

    #[test]
    fn test_tag_mismatch() {
        let err = events("<a><b></a>").unwrap_err();
        match err {
            DocumentError::MalformedContent { message, position } => {
                assert!(message.contains("Tag mismatch"), "{message}");
                assert_eq!(position, Some(6));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_structure_errors() {
        assert!(events("<a/><b/>").unwrap_err().is_malformed());
        assert!(events("text<a/>").unwrap_err().is_malformed());
        assert!(events("<a>").unwrap_err().is_malformed());
        assert!(events("").unwrap_err().is_malformed());
        assert!(events("   ").unwrap_err().is_malformed());
        assert!(events("<a/><?xml version=\"1.0\"?>").unwrap_err().is_malformed());
        assert!(events("</a>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_duplicate_attribute() {
        assert!(events("<a x=\"1\" x=\"2\"/>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_unknown_entity() {
        assert!(events("<a>&bogus;</a>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_fragments_share_checks() {
        let mut checks = WellFormedness::new();
        let mut out = Vec::new();
        parse_fragment(b"<a><b>", 0, &mut checks, &mut |e| out.push(e)).unwrap();
        assert_eq!(checks.depth(), 2);
        parse_fragment(b"</b></a>", 6, &mut checks, &mut |e| out.push(e)).unwrap();
        assert_eq!(checks.depth(), 0);
        assert!(checks.finish().is_ok());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_internal_subset_entities() {
        let out = events("<!DOCTYPE r [<!ENTITY e \"v\"><!ENTITY who 'e=&e;'>]><r k=\"&who;\">&e;&amp;</r>")
            .unwrap();
        assert_eq!(
            out[1],
            XmlEvent::StartElement {
                name: "r".to_string(),
                attributes: vec![("k".to_string(), "e=v".to_string())],
            }
        );
        assert_eq!(out[2], XmlEvent::Text("v&".to_string()));
    }

    #[test]
    fn test_undeclared_entity_with_doctype() {
        assert!(events("<!DOCTYPE r [<!ENTITY e \"v\">]><r>&f;</r>")
            .unwrap_err()
            .is_malformed());
        assert!(events("<!DOCTYPE r [<!ENTITY a \"&a;\">]><r/>")
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_invalid_names() {
        assert!(events("<1bad/>").unwrap_err().is_malformed());
        assert!(events("<r -x=\"1\"/>").unwrap_err().is_malformed());
        assert!(events("<r><.a></.a></r>").unwrap_err().is_malformed());
        assert!(events("<r><?9pi data?></r>").unwrap_err().is_malformed());
        assert!(events("<_ok:name x.y=\"1\"/>").is_ok());
    }

    #[test]
    fn test_cdata_end_in_text() {
        assert!(events("<r>a]]>b</r>").unwrap_err().is_malformed());
        assert!(events("<r>a]]&gt;b</r>").is_ok());
        assert!(events("<r><![CDATA[a]]b]]></r>").is_ok());
    }

    #[test]
    fn test_whitespace_around_root() {
        let out = events("\n<a/>\n").unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], XmlEvent::Text("\n".to_string()));
    }
}
