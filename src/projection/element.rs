//! Owned element tree
//!
//! A plain, self-contained tree of owned strings for callers that want to
//! hand a document to code that knows nothing about the arena. Building one
//! requires the complete document.

use crate::document::DocumentHandle;
use crate::dom::{NodeId, NodeKind, XmlTree, DOCUMENT_NODE};
use crate::error::{DocumentError, Result};
use crate::reader::events::split_name;

/// An attribute as written in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Child node of an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

/// Element with its attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, including any prefix
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Convert the root element of `tree`.
    ///
    /// Fails with `MalformedContent` if the document has no root element.
    pub fn from_tree(tree: &XmlTree) -> Result<Element> {
        let root = tree
            .root_element_id()
            .ok_or_else(|| DocumentError::malformed("document has no root element"))?;
        Self::from_node(tree, root)
            .ok_or_else(|| DocumentError::malformed("document has no root element"))
    }

    /// Convert the subtree rooted at element `id`
    pub fn from_node(tree: &XmlTree, id: NodeId) -> Option<Element> {
        if id == DOCUMENT_NODE || !tree.get_node(id)?.is_element() {
            return None;
        }

        // Open elements being filled, innermost last
        let mut frames: Vec<(NodeId, Element)> = vec![(id, Self::shallow(tree, id))];

        for desc in tree.descendants(id) {
            let node = match tree.get_node(desc) {
                Some(n) => n,
                None => continue,
            };
            while frames.len() > 1 && Some(frames[frames.len() - 1].0) != node.parent {
                Self::close_frame(&mut frames);
            }

            let value = || tree.node_value(desc).unwrap_or("").to_string();
            let child = match node.kind {
                NodeKind::Element => {
                    frames.push((desc, Self::shallow(tree, desc)));
                    continue;
                }
                NodeKind::Text => Node::Text(value()),
                NodeKind::CData => Node::CData(value()),
                NodeKind::Comment => Node::Comment(value()),
                NodeKind::ProcessingInstruction => Node::ProcessingInstruction {
                    target: tree.node_name(desc).unwrap_or("").to_string(),
                    data: value(),
                },
                NodeKind::Document | NodeKind::DocumentType => continue,
            };
            if let Some((_, parent)) = frames.last_mut() {
                parent.children.push(child);
            }
        }

        while frames.len() > 1 {
            Self::close_frame(&mut frames);
        }
        frames.pop().map(|(_, element)| element)
    }

    fn shallow(tree: &XmlTree, id: NodeId) -> Element {
        Element {
            name: tree.node_name(id).unwrap_or("").to_string(),
            namespace: tree.namespace_uri(id).map(str::to_string),
            attributes: tree
                .attribute_pairs(id)
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            children: Vec::new(),
        }
    }

    fn close_frame(frames: &mut Vec<(NodeId, Element)>) {
        if let Some((_, done)) = frames.pop() {
            if let Some((_, parent)) = frames.last_mut() {
                parent.children.push(Node::Element(done));
            }
        }
    }

    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text and CDATA of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(e) => stack.extend(e.children.iter().rev()),
                _ => {}
            }
        }
        out
    }
}

impl TryFrom<&XmlTree> for Element {
    type Error = DocumentError;

    fn try_from(tree: &XmlTree) -> Result<Self> {
        Element::from_tree(tree)
    }
}

impl TryFrom<&DocumentHandle> for Element {
    type Error = DocumentError;

    /// Materializes the document and converts its root element
    fn try_from(handle: &DocumentHandle) -> Result<Self> {
        let tree = handle.content_as_tree()?;
        Element::from_tree(&tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(input: &str) -> Element {
        Element::from_tree(&XmlTree::parse_str(input).unwrap()).unwrap()
    }

    #[test]
    fn test_nested_structure() {
        let mut b = Element::new("b");
        b.attributes.push(Attribute {
            name: "k".to_string(),
            value: "v".to_string(),
        });
        let mut expected = Element::new("a");
        expected.children.push(Node::Element(b));
        expected.children.push(Node::Text("tail".to_string()));

        assert_eq!(convert("<a><b k=\"v\"/>tail</a>"), expected);
    }

    #[test]
    fn test_deep_siblings() {
        let root = convert("<r><x><y><z/></y></x><w>t</w><!--c--><?p d?></r>");
        let names: Vec<_> = root.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["x", "w"]);
        assert_eq!(root.children.len(), 4);
        assert_eq!(root.text(), "t");

        let x = root.child_elements().next().unwrap();
        let y = x.child_elements().next().unwrap();
        assert_eq!(y.child_elements().next().map(|z| z.name.as_str()), Some("z"));
        assert_eq!(
            root.children[3],
            Node::ProcessingInstruction {
                target: "p".to_string(),
                data: "d".to_string()
            }
        );
    }

    #[test]
    fn test_namespaces() {
        let root = convert(r#"<s:doc xmlns:s="urn:s" id="1"><s:part/></s:doc>"#);
        assert_eq!(root.prefix(), Some("s"));
        assert_eq!(root.local_name(), "doc");
        assert_eq!(root.namespace.as_deref(), Some("urn:s"));
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(
            root.child_elements().next().and_then(|e| e.namespace.as_deref()),
            Some("urn:s")
        );
    }

    #[test]
    fn test_empty_document_fails() {
        let err = Element::try_from(&XmlTree::new()).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_from_non_element() {
        let tree = XmlTree::parse_str("<a>t</a>").unwrap();
        assert_eq!(Element::from_node(&tree, 2), None);
        assert_eq!(Element::from_node(&tree, DOCUMENT_NODE), None);
    }
}
