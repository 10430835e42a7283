//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//! Node ids are assigned in document order, which the streaming reader
//! relies on to replay a tree as events.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node always occupies slot 0.
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// DOCTYPE declaration (document level only)
    DocumentType,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for document root)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// String id of the qualified name (elements) or target (PIs)
    pub name_id: u32,
    /// String id of the character data (text, CDATA, comments, PI data, DOCTYPE)
    pub value_id: u32,
    /// String id of the resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u32,
    /// Depth in document tree
    pub depth: u16,
}

impl XmlNode {
    /// Create a node of `kind` under `parent`
    pub fn new(kind: NodeKind, parent: Option<NodeId>, depth: u16) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            value_id: 0,
            namespace_id: 0,
            attr_start: 0,
            attr_count: 0,
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        XmlNode::new(NodeKind::Document, None, 0)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: NodeId, depth: u16) -> Self {
        let mut node = XmlNode::new(NodeKind::Element, Some(parent), depth);
        node.name_id = name_id;
        node
    }

    /// Create a character data node (text, CDATA, comment or DOCTYPE)
    pub fn character_data(kind: NodeKind, value_id: u32, parent: NodeId, depth: u16) -> Self {
        let mut node = XmlNode::new(kind, Some(parent), depth);
        node.value_id = value_id;
        node
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: u32, parent: NodeId, depth: u16) -> Self {
        let mut node = XmlNode::new(NodeKind::ProcessingInstruction, Some(parent), depth);
        node.name_id = target_id;
        node.value_id = data_id;
        node
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this is a text or CDATA node
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// Index into string pool for attribute name
    pub name_id: u32,
    /// Index into string pool for attribute value
    pub value_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32) -> Self {
        XmlAttribute { name_id, value_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert_eq!(doc.depth, 0);
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, DOCUMENT_NODE, 1);
        assert!(elem.is_element());
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert!(!elem.has_children());
    }

    #[test]
    fn test_character_data() {
        let text = XmlNode::character_data(NodeKind::CData, 4, 1, 2);
        assert!(text.is_text());
        assert_eq!(text.value_id, 4);
        assert_eq!(text.name_id, 0);
    }
}
