//! XML Event Types
//!
//! Owned pull-parser events. These are produced by the chunked parser while a
//! document is materialized, and replayed from the arena tree by the
//! streaming content reader.

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// XML declaration: <?xml version="1.0"?>
    Declaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration content (everything between `<!DOCTYPE` and `>`)
    DocType(String),
    /// Start of an element: <name attrs...>
    StartElement {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// Empty element: <name attrs.../>
    EmptyElement {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// End of an element: </name>
    EndElement { name: String },
    /// Text content between tags, entities already decoded
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content
    Comment(String),
    /// Processing instruction: <?target data?>
    ProcessingInstruction { target: String, data: String },
    /// End of document
    EndDocument,
}

impl XmlEvent {
    /// Check if this is a start element event
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement { .. } | XmlEvent::EmptyElement { .. })
    }

    /// Check if this is an end element event
    pub fn is_end_element(&self) -> bool {
        matches!(self, XmlEvent::EndElement { .. })
    }

    /// Element name for start, empty and end events
    pub fn element_name(&self) -> Option<&str> {
        match self {
            XmlEvent::StartElement { name, .. }
            | XmlEvent::EmptyElement { name, .. }
            | XmlEvent::EndElement { name } => Some(name),
            _ => None,
        }
    }

    /// Get text content if applicable
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text(t) | XmlEvent::CData(t) => Some(t),
            _ => None,
        }
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("div"), (None, "div"));
        assert_eq!(split_name("svg:rect"), (Some("svg"), "rect"));
    }

    #[test]
    fn test_event_helpers() {
        let start = XmlEvent::EmptyElement {
            name: "item".to_string(),
            attributes: vec![],
        };
        assert!(start.is_start_element());
        assert_eq!(start.element_name(), Some("item"));

        let text = XmlEvent::CData("x < y".to_string());
        assert_eq!(text.as_text(), Some("x < y"));
        assert!(!text.is_end_element());
    }
}
