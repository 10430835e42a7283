//! XML Tree - Arena-based document representation
//!
//! A parsed document lives in three arenas: nodes, attributes and interned
//! strings. Node ids are handed out in document order.
//!
//! [`TreeBuilder`] grows a tree one event at a time, so a lazily fetched
//! document can be built chunk by chunk into the same arena that later
//! becomes its materialized form.

use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use crate::core::encoding::{convert_to_utf8, utf8_bom_len};
use crate::error::Result;
use crate::reader::events::{split_name, XmlEvent};
use crate::reader::parser::{is_xml_whitespace, parse_document};

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Contents of the `<?xml ...?>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    strings: StringPool,
    root_element: Option<NodeId>,
    declaration: Option<XmlDeclaration>,
}

impl XmlTree {
    /// A tree holding only the document node
    pub fn new() -> Self {
        XmlTree {
            nodes: vec![XmlNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
            declaration: None,
        }
    }

    /// Parse a complete document. UTF-16 input (with BOM) is transcoded first.
    pub fn parse(input: Vec<u8>) -> Result<Self> {
        let input = convert_to_utf8(input)?;
        Self::parse_utf8(&input)
    }

    /// Parse a document that is already UTF-8 text
    pub fn parse_str(input: &str) -> Result<Self> {
        let bytes = input.as_bytes();
        Self::parse_utf8(&bytes[utf8_bom_len(bytes)..])
    }

    fn parse_utf8(input: &[u8]) -> Result<Self> {
        let mut builder = TreeBuilder::new();
        parse_document(input, &mut |event| builder.push(event))?;
        Ok(builder.finish())
    }

    /// True if the tree has no root element
    pub fn is_empty(&self) -> bool {
        self.root_element.is_none()
    }

    /// Get the document node (index 0)
    pub fn document_node(&self) -> &XmlNode {
        &self.nodes[DOCUMENT_NODE as usize]
    }

    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Qualified name of an element, or target of a processing instruction
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings.get(node.name_id),
            _ => None,
        }
    }

    /// Element name without its prefix
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).map(|name| split_name(name).1)
    }

    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).and_then(|name| split_name(name).0)
    }

    /// Resolved namespace URI of an element, if it is in one
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.namespace_id == 0 {
            return None;
        }
        self.strings.get(node.namespace_id)
    }

    /// Character data of a text, CDATA, comment, DOCTYPE or PI node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => self.strings.get(node.value_id),
        }
    }

    /// Concatenated text of all descendant text and CDATA nodes
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.get_node(id) {
            if node.is_text() {
                out.push_str(self.strings.get(node.value_id).unwrap_or(""));
                return out;
            }
        }
        for desc in self.descendants(id) {
            if let Some(node) = self.get_node(desc) {
                if node.is_text() {
                    out.push_str(self.strings.get(node.value_id).unwrap_or(""));
                }
            }
        }
        out
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                self.attributes.get(start..end).unwrap_or(&[])
            }
            None => &[],
        }
    }

    /// Get attribute value by qualified name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| self.strings.get(attr.name_id) == Some(name))
            .and_then(|attr| self.strings.get(attr.value_id))
    }

    /// All attribute names and values of an element, in document order
    pub fn attribute_pairs(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.attributes(id)
            .iter()
            .filter_map(|attr| {
                let name = self.strings.get(attr.name_id)?;
                let value = self.strings.get(attr.value_id)?;
                Some((name, value))
            })
            .collect()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { tree: self, next: first }
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { tree: self, stack }
    }

    /// Append `node` to the arena as the last child of its parent.
    fn append(&mut self, node: XmlNode) -> NodeId {
        let parent = node.parent.unwrap_or(DOCUMENT_NODE);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.link_child(parent, id);
        id
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over child nodes
pub struct ChildIter<'t> {
    tree: &'t XmlTree,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'t> {
    tree: &'t XmlTree,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        if let Some(node) = self.tree.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.tree.get_node(id).and_then(|n| n.prev_sibling);
            }
        }

        Some(current)
    }
}

// =============================================================================
// Incremental construction
// =============================================================================

/// Builds an [`XmlTree`] from a stream of well-formed events.
///
/// Events are expected to have passed the parser's structure checks; the
/// builder does not validate nesting itself. Whitespace outside the root
/// element is dropped and adjacent text runs are merged into one node.
#[derive(Debug)]
pub struct TreeBuilder {
    tree: XmlTree,
    /// Open elements, document node at the bottom
    stack: Vec<NodeId>,
    /// Prefix bindings declared on each open element: (prefix id, uri id)
    ns_scopes: Vec<Vec<(u32, u32)>>,
    /// Effective default namespace for each open element
    default_ns: Vec<Option<u32>>,
    /// Text run not yet turned into a node
    text: String,
    complete: bool,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            tree: XmlTree::new(),
            stack: vec![DOCUMENT_NODE],
            ns_scopes: vec![Vec::new()],
            default_ns: vec![None],
            text: String::new(),
            complete: false,
        }
    }

    /// Add one event to the tree
    pub fn push(&mut self, event: XmlEvent) {
        if let XmlEvent::Text(text) = &event {
            self.add_text(text);
            return;
        }
        self.flush_text();

        match event {
            XmlEvent::Declaration {
                version,
                encoding,
                standalone,
            } => {
                self.tree.declaration = Some(XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                });
            }
            XmlEvent::DocType(content) => self.add_character_data(NodeKind::DocumentType, &content),
            XmlEvent::StartElement { name, attributes } => self.open_element(&name, &attributes, false),
            XmlEvent::EmptyElement { name, attributes } => self.open_element(&name, &attributes, true),
            XmlEvent::EndElement { .. } => self.close_element(),
            XmlEvent::Text(_) => {}
            XmlEvent::CData(text) => self.add_character_data(NodeKind::CData, &text),
            XmlEvent::Comment(text) => self.add_character_data(NodeKind::Comment, &text),
            XmlEvent::ProcessingInstruction { target, data } => {
                let parent = self.current();
                let depth = self.depth();
                let target_id = self.tree.strings.intern(&target);
                let data_id = self.tree.strings.intern(&data);
                self.tree
                    .append(XmlNode::processing_instruction(target_id, data_id, parent, depth));
            }
            XmlEvent::EndDocument => self.complete = true,
        }
    }

    /// The tree built so far
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Elements whose end tag has not been seen yet, outermost first
    pub fn open_elements(&self) -> &[NodeId] {
        &self.stack[1..]
    }

    /// True if `id` is an element still waiting for its end tag
    pub fn is_open(&self, id: NodeId) -> bool {
        self.open_elements().contains(&id)
    }

    /// True once `EndDocument` has been pushed
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn finish(mut self) -> XmlTree {
        self.flush_text();
        self.tree
    }

    #[inline]
    fn current(&self) -> NodeId {
        *self.stack.last().unwrap_or(&DOCUMENT_NODE)
    }

    #[inline]
    fn depth(&self) -> u16 {
        self.stack.len().min(u16::MAX as usize) as u16
    }

    fn open_element(&mut self, name: &str, attributes: &[(String, String)], is_empty: bool) {
        let parent = self.current();
        let depth = self.depth();
        let strings = &mut self.tree.strings;

        let name_id = strings.intern(name);
        let mut node = XmlNode::element(name_id, parent, depth);

        let mut scope_ns: Vec<(u32, u32)> = Vec::new();
        let mut scope_default: Option<u32> = None;

        let attr_start = self.tree.attributes.len() as u32;
        for (key, value) in attributes {
            let value_id = strings.intern(value);
            if key == "xmlns" {
                scope_default = Some(value_id);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope_ns.push((strings.intern(prefix), value_id));
            }
            let key_id = strings.intern(key);
            self.tree.attributes.push(XmlAttribute::new(key_id, value_id));
        }
        node.attr_start = attr_start;
        node.attr_count = attributes.len() as u32;

        let inherited_default = self.default_ns.last().copied().flatten();
        let effective_default = scope_default.or(inherited_default);

        node.namespace_id = match split_name(name).0 {
            Some("xml") => strings.intern(XML_NAMESPACE),
            Some(prefix) => {
                let prefix_id = strings.intern(prefix);
                std::iter::once(&scope_ns)
                    .chain(self.ns_scopes.iter().rev())
                    .flat_map(|scope| scope.iter())
                    .find(|(p, _)| *p == prefix_id)
                    .map(|&(_, uri)| uri)
                    .unwrap_or(0)
            }
            // xmlns="" undeclares the default, which interns to id 0
            None => effective_default.unwrap_or(0),
        };

        let id = self.tree.append(node);
        if parent == DOCUMENT_NODE && self.tree.root_element.is_none() {
            self.tree.root_element = Some(id);
        }

        if !is_empty {
            self.stack.push(id);
            self.ns_scopes.push(scope_ns);
            self.default_ns.push(effective_default);
        }
    }

    fn close_element(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
            self.ns_scopes.pop();
            self.default_ns.pop();
        }
    }

    fn add_text(&mut self, text: &str) {
        if self.current() == DOCUMENT_NODE && is_xml_whitespace(text) {
            return;
        }
        self.text.push_str(text);
    }

    /// Intern the buffered text run once, as a single node
    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        self.add_character_data(NodeKind::Text, &text);
    }

    fn add_character_data(&mut self, kind: NodeKind, text: &str) {
        let parent = self.current();
        let depth = self.depth();
        let value_id = self.tree.strings.intern(text);
        self.tree
            .append(XmlNode::character_data(kind, value_id, parent, depth));
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let tree = XmlTree::parse_str("<root><child/></root>").unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.node_name(root), Some("root"));

        let children: Vec<_> = tree.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.node_name(children[0]), Some("child"));
    }

    #[test]
    fn test_attributes() {
        let tree = XmlTree::parse_str(r#"<root id="1" class="a &amp; b"/>"#).unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.get_attribute(root, "id"), Some("1"));
        assert_eq!(tree.get_attribute(root, "class"), Some("a & b"));
        assert_eq!(tree.get_attribute(root, "missing"), None);
        assert_eq!(tree.attribute_pairs(root), vec![("id", "1"), ("class", "a & b")]);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let tree = XmlTree::parse_str("<a><b><c/></b><d/></a>").unwrap();
        let root = tree.root_element_id().unwrap();
        let names: Vec<_> = tree
            .descendants(root)
            .filter_map(|id| tree.node_name(id))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);

        let ids: Vec<_> = tree.descendants(root).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_string_value() {
        let tree = XmlTree::parse_str("<a>one<b>two</b><![CDATA[<three>]]></a>").unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.string_value(root), "onetwo<three>");
    }

    #[test]
    fn test_namespaces() {
        let tree = XmlTree::parse_str(
            r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:x><y/></p:x><z xmlns=""/></r>"#,
        )
        .unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.namespace_uri(root), Some("urn:d"));

        let x = tree.children(root).next().unwrap();
        assert_eq!(tree.node_prefix(x), Some("p"));
        assert_eq!(tree.node_local_name(x), Some("x"));
        assert_eq!(tree.namespace_uri(x), Some("urn:p"));

        let y = tree.children(x).next().unwrap();
        assert_eq!(tree.namespace_uri(y), Some("urn:d"));

        let z = tree.children(root).nth(1).unwrap();
        assert_eq!(tree.namespace_uri(z), None);
    }

    #[test]
    fn test_prefix_declared_on_same_element() {
        let tree = XmlTree::parse_str(r#"<p:r xmlns:p="urn:p"/>"#).unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.namespace_uri(root), Some("urn:p"));
    }

    #[test]
    fn test_prolog_nodes() {
        let tree =
            XmlTree::parse_str("<?xml version=\"1.0\"?>\n<!DOCTYPE r>\n<!-- c -->\n<r/>\n<?done?>")
                .unwrap();
        assert_eq!(tree.declaration().map(|d| d.version.as_str()), Some("1.0"));

        let kinds: Vec<_> = tree
            .children(DOCUMENT_NODE)
            .filter_map(|id| tree.get_node(id).map(|n| n.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::DocumentType,
                NodeKind::Comment,
                NodeKind::Element,
                NodeKind::ProcessingInstruction,
            ]
        );
    }

    #[test]
    fn test_incremental_build() {
        let mut builder = TreeBuilder::new();
        builder.push(XmlEvent::StartElement {
            name: "a".to_string(),
            attributes: vec![],
        });
        builder.push(XmlEvent::Text("x".to_string()));
        builder.push(XmlEvent::Text("y".to_string()));
        assert_eq!(builder.open_elements(), &[1]);
        assert!(builder.is_open(1));

        builder.push(XmlEvent::EndElement { name: "a".to_string() });
        builder.push(XmlEvent::EndDocument);
        assert!(builder.is_complete());
        assert!(builder.open_elements().is_empty());

        let tree = builder.finish();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.node_value(2), Some("xy"));
    }

    #[test]
    fn test_text_run_interned_once() {
        let mut builder = TreeBuilder::new();
        builder.push(XmlEvent::StartElement {
            name: "a".to_string(),
            attributes: vec![],
        });
        for piece in ["one", "two", "three"] {
            builder.push(XmlEvent::Text(piece.to_string()));
        }
        builder.push(XmlEvent::EmptyElement {
            name: "b".to_string(),
            attributes: vec![],
        });
        builder.push(XmlEvent::Text("tail".to_string()));

        let tree = builder.finish();
        let values: Vec<_> = tree.children(1).filter_map(|id| tree.node_value(id)).collect();
        assert_eq!(values, vec!["onetwothree", "tail"]);
        // "", "a", "onetwothree", "b", "tail"
        assert_eq!(tree.strings().len(), 5);
        assert_eq!(tree.strings().bytes_used(), "aonetwothreebtail".len());
    }

    #[test]
    fn test_utf16_input() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>é</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let tree = XmlTree::parse(bytes).unwrap();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.string_value(root), "é");
    }

    #[test]
    fn test_malformed() {
        assert!(XmlTree::parse_str("<a><b></a>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_empty_tree() {
        let tree = XmlTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.children(DOCUMENT_NODE).count(), 0);
    }
}
