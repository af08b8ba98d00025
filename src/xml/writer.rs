//! Serialization back to XML text

use quick_xml::escape::{escape, partial_escape};

use super::document::Document;
use super::node::{Node, NodeId, NodeKind};

const INDENT: &str = "  ";

impl Document {
    /// Serialize the whole document
    ///
    /// With `formatted`, element-only content is indented and each top-level
    /// node ends with a newline. Mixed content is always written inline.
    pub fn to_xml_string(&self, formatted: bool) -> String {
        let mut out = String::new();
        for child in self.child_ids(Self::DOCUMENT_NODE) {
            self.write_tree(child, &mut out, formatted.then_some(0));
            if formatted {
                out.push('\n');
            }
        }
        out
    }

    /// Serialize a single node and its subtree
    ///
    /// Attributes serialize as `name="value"`.
    pub fn node_to_string(&self, node: Node, formatted: bool) -> String {
        let mut out = String::new();
        match node {
            Node::Attribute(id) => {
                let attr = self.attr(id);
                out.push_str(attr.name.as_str());
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }
            Node::Element(id) | Node::Text(id) | Node::CData(id) => {
                self.write_tree(id, &mut out, formatted.then_some(0));
            }
        }
        out
    }

    fn write_tree(&self, id: NodeId, out: &mut String, depth: Option<usize>) {
        let mut pending = vec![Emit::Node(id, depth)];

        while let Some(item) = pending.pop() {
            let (id, depth) = match item {
                Emit::Node(id, depth) => (id, depth),
                Emit::Indent(level) => {
                    out.push('\n');
                    push_indent(out, level);
                    continue;
                }
                Emit::Close(id) => {
                    out.push_str("</");
                    out.push_str(self.data(id).name.as_str());
                    out.push('>');
                    continue;
                }
            };

            let data = self.data(id);
            match data.kind {
                NodeKind::Document => {
                    let children: Vec<NodeId> = self.child_ids(id).collect();
                    pending.extend(children.into_iter().rev().map(|c| Emit::Node(c, depth)));
                }
                NodeKind::Text => out.push_str(&partial_escape(data.value.as_str())),
                NodeKind::CData => {
                    out.push_str("<![CDATA[");
                    out.push_str(&data.value);
                    out.push_str("]]>");
                }
                NodeKind::Element => {
                    out.push('<');
                    out.push_str(data.name.as_str());
                    for &attr in &data.attributes {
                        let attr = self.attr(attr);
                        out.push(' ');
                        out.push_str(attr.name.as_str());
                        out.push_str("=\"");
                        out.push_str(&escape(attr.value.as_str()));
                        out.push('"');
                    }

                    if data.first_child.is_none() {
                        out.push_str("/>");
                        continue;
                    }
                    out.push('>');

                    let block = depth.filter(|_| {
                        self.child_ids(id)
                            .all(|child| self.data(child).kind == NodeKind::Element)
                    });

                    pending.push(Emit::Close(id));
                    if let Some(level) = block {
                        pending.push(Emit::Indent(level));
                    }
                    let children: Vec<NodeId> = self.child_ids(id).collect();
                    for child in children.into_iter().rev() {
                        pending.push(Emit::Node(child, block.map(|level| level + 1)));
                        if let Some(level) = block {
                            pending.push(Emit::Indent(level + 1));
                        }
                    }
                }
            }
        }
    }
}

/// Work item of the serializer
enum Emit {
    /// Write a node at an indentation level (`None` means inline)
    Node(NodeId, Option<usize>),
    /// Newline plus indentation
    Indent(usize),
    /// Closing tag of an element
    Close(NodeId),
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_roundtrip() {
        let xml = r#"<r a="1 &quot;q&quot;"><x>a &amp; b</x><y/><![CDATA[<z>]]></r>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.to_xml_string(false), xml);
    }

    #[test]
    fn test_formatted_output() {
        let doc = Document::parse("<r><a><b>t</b></a><c/></r>").unwrap();
        assert_eq!(
            doc.to_xml_string(true),
            "<r>\n  <a>\n    <b>t</b>\n  </a>\n  <c/>\n</r>\n"
        );
        let reparsed = Document::parse(&doc.to_xml_string(true)).unwrap();
        assert_eq!(reparsed.to_xml_string(false), "<r><a><b>t</b></a><c/></r>");
    }

    #[test]
    fn test_mixed_content_inline() {
        let doc = Document::parse("<r>text<b>bold</b>more</r>").unwrap();
        assert_eq!(doc.to_xml_string(true), "<r>text<b>bold</b>more</r>\n");
    }

    #[test]
    fn test_node_to_string() {
        let doc = Document::parse(r#"<r><item id="7">v</item></r>"#).unwrap();
        let root = doc.root().unwrap();
        let item = doc.children(root, "item")[0];
        assert_eq!(doc.node_to_string(item, false), r#"<item id="7">v</item>"#);

        let attr = doc.first_attribute(item.element().unwrap()).unwrap();
        assert_eq!(doc.node_to_string(Node::Attribute(attr), false), r#"id="7""#);
    }

    #[test]
    fn test_deep_nesting_serializes() {
        let xml = format!("{}{}", "<a>".repeat(100_000), "</a>".repeat(100_000));
        let doc = Document::parse(&xml).unwrap();
        let expected = format!("{}<a/>{}", "<a>".repeat(99_999), "</a>".repeat(99_999));
        assert_eq!(doc.to_xml_string(false), expected);

        let doc = Document::parse("<a><b><c>t</c></b><d/></a>").unwrap();
        assert_eq!(
            doc.to_xml_string(true),
            "<a>\n  <b>\n    <c>t</c>\n  </b>\n  <d/>\n</a>\n"
        );
    }
}
