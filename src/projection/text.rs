//! Text Projection
//!
//! Serializes an arena tree back to XML text. The walk is iterative with an
//! explicit stack so deeply nested documents cannot overflow the call stack.

use std::io::{self, BufRead, Cursor, Read};

use crate::dom::{NodeId, NodeKind, XmlTree, DOCUMENT_NODE};

/// Serialize a whole document, including its prolog.
///
/// The declaration is written without an `encoding` pseudo-attribute since
/// the output is always UTF-8. Document-level nodes are separated by a
/// newline.
pub fn serialize_tree(tree: &XmlTree) -> String {
    let mut buf = String::with_capacity(1024);

    if let Some(decl) = tree.declaration() {
        buf.push_str("<?xml version=\"");
        buf.push_str(&decl.version);
        buf.push('"');
        if let Some(standalone) = decl.standalone {
            buf.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        buf.push_str("?>\n");
    }

    for (i, child) in tree.children(DOCUMENT_NODE).enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        write_node(tree, child, &mut buf);
    }
    buf
}

/// Serialize one node and its subtree
pub fn serialize_node(tree: &XmlTree, node_id: NodeId) -> String {
    if node_id == DOCUMENT_NODE {
        return serialize_tree(tree);
    }
    let mut buf = String::with_capacity(256);
    write_node(tree, node_id, &mut buf);
    buf
}

fn write_node(tree: &XmlTree, node_id: NodeId, buf: &mut String) {
    enum StackEntry {
        Enter(NodeId),
        Close(NodeId),
    }

    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(node_id));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close(id) => {
                if let Some(name) = tree.node_name(id) {
                    buf.push_str("</");
                    buf.push_str(name);
                    buf.push('>');
                }
            }
            StackEntry::Enter(current_id) => {
                let node = match tree.get_node(current_id) {
                    Some(n) => n,
                    None => continue,
                };
                let value = tree.node_value(current_id).unwrap_or("");

                match node.kind {
                    NodeKind::Element => {
                        buf.push('<');
                        buf.push_str(tree.node_name(current_id).unwrap_or(""));

                        for (name, value) in tree.attribute_pairs(current_id) {
                            buf.push(' ');
                            buf.push_str(name);
                            buf.push_str("=\"");
                            escape_attribute(value, buf);
                            buf.push('"');
                        }

                        if node.first_child.is_none() {
                            buf.push_str("/>");
                        } else {
                            buf.push('>');
                            stack.push(StackEntry::Close(current_id));

                            let mut child_id = node.last_child;
                            while let Some(cid) = child_id {
                                stack.push(StackEntry::Enter(cid));
                                child_id = tree.get_node(cid).and_then(|n| n.prev_sibling);
                            }
                        }
                    }
                    NodeKind::Text => escape_text(value, buf),
                    NodeKind::CData => {
                        buf.push_str("<![CDATA[");
                        buf.push_str(value);
                        buf.push_str("]]>");
                    }
                    NodeKind::Comment => {
                        buf.push_str("<!--");
                        buf.push_str(value);
                        buf.push_str("-->");
                    }
                    NodeKind::ProcessingInstruction => {
                        buf.push_str("<?");
                        buf.push_str(tree.node_name(current_id).unwrap_or(""));
                        if !value.is_empty() {
                            buf.push(' ');
                            buf.push_str(value);
                        }
                        buf.push_str("?>");
                    }
                    NodeKind::DocumentType => {
                        buf.push_str("<!DOCTYPE ");
                        buf.push_str(value);
                        buf.push('>');
                    }
                    NodeKind::Document => {
                        let mut child_id = node.last_child;
                        while let Some(cid) = child_id {
                            stack.push(StackEntry::Enter(cid));
                            child_id = tree.get_node(cid).and_then(|n| n.prev_sibling);
                        }
                    }
                }
            }
        }
    }
}

/// Escape character data
#[inline]
pub fn escape_text(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '\r' => buf.push_str("&#13;"),
            _ => buf.push(c),
        }
    }
}

/// Escape an attribute value for a double-quoted attribute.
///
/// Whitespace control characters are written as character references so
/// attribute-value normalization does not change them on reparse.
#[inline]
pub fn escape_attribute(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '"' => buf.push_str("&quot;"),
            '\t' => buf.push_str("&#9;"),
            '\n' => buf.push_str("&#10;"),
            '\r' => buf.push_str("&#13;"),
            _ => buf.push(c),
        }
    }
}

/// Byte stream over serialized document text
#[derive(Debug, Clone)]
pub struct TextReader {
    inner: Cursor<Vec<u8>>,
}

impl TextReader {
    pub fn new(text: String) -> Self {
        TextReader {
            inner: Cursor::new(text.into_bytes()),
        }
    }

    /// Total length of the text in bytes
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }
}

impl Read for TextReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for TextReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        serialize_tree(&XmlTree::parse_str(input).unwrap())
    }

    #[test]
    fn test_roundtrip_simple() {
        assert_eq!(roundtrip("<a><b/></a>"), "<a><b/></a>");
        assert_eq!(roundtrip("<a x=\"1\">t</a>"), "<a x=\"1\">t</a>");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(
            roundtrip("<a v=\"&quot;&lt;&amp;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</a>"),
            "<a v=\"&quot;&lt;&amp;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</a>"
        );
        assert_eq!(roundtrip("<a v=\"x&#10;y\"/>"), "<a v=\"x&#10;y\"/>");
    }

    #[test]
    fn test_prolog() {
        assert_eq!(
            roundtrip("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE a>\n<a/>\n<!--end-->"),
            "<?xml version=\"1.0\"?>\n<!DOCTYPE a>\n<a/>\n<!--end-->"
        );
    }

    #[test]
    fn test_cdata_comment_pi() {
        assert_eq!(
            roundtrip("<a><![CDATA[<x>]]><!-- c --><?go now?><?stop?></a>"),
            "<a><![CDATA[<x>]]><!-- c --><?go now?><?stop?></a>"
        );
    }

    #[test]
    fn test_serialize_node() {
        let tree = XmlTree::parse_str("<a><b k=\"v\">x</b><c/></a>").unwrap();
        let root = tree.root_element_id().unwrap();
        let b = tree.children(root).next().unwrap();
        assert_eq!(serialize_node(&tree, b), "<b k=\"v\">x</b>");
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 10_000;
        let input = format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth));
        let tree = XmlTree::parse_str(&input).unwrap();
        let out = serialize_tree(&tree);
        assert_eq!(out.len(), 4 + (depth - 1) * 7);
        assert!(out.ends_with("<d/></d>"));
    }

    #[test]
    fn test_text_reader() {
        let mut reader = TextReader::new("<a/>".to_string());
        assert_eq!(reader.len(), 4);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "<a/>");
    }
}
