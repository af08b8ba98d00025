//! XML text to arena conversion on top of `quick-xml`
//!
//! Whitespace-only text between tags is dropped; comments, declarations,
//! processing instructions and doctypes are skipped. Non-blank text outside
//! the root element is an error.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

use super::document::Document;
use super::node::{NodeId, NodeKind, QualifiedName};

pub(crate) fn parse(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    reader.check_end_names(true);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![Document::DOCUMENT_NODE];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| syntax_error(&reader, e))?;
        let parent = *stack.last().unwrap_or(&Document::DOCUMENT_NODE);

        match event {
            Event::Start(start) => {
                let id = open_element(&mut doc, parent, &start)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                open_element(&mut doc, parent, &start)?;
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(Error::Parse(format!(
                        "unexpected closing tag at position {}",
                        reader.buffer_position()
                    )));
                }
                stack.pop();
            }
            Event::Text(text) => {
                if text.iter().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n')) {
                    continue;
                }
                if parent == Document::DOCUMENT_NODE {
                    return Err(Error::Parse(format!(
                        "text outside the root element at position {}",
                        reader.buffer_position()
                    )));
                }
                let value = text.unescape().map_err(|e| syntax_error(&reader, e))?;
                append_data(&mut doc, parent, NodeKind::Text, value.into_owned());
            }
            Event::CData(cdata) => {
                let value = match cdata.into_inner() {
                    Cow::Borrowed(bytes) => utf8(bytes)?.to_string(),
                    Cow::Owned(bytes) => String::from_utf8(bytes)
                        .map_err(|_| Error::Parse("CDATA section is not valid utf-8".to_string()))?,
                };
                append_data(&mut doc, parent, NodeKind::CData, value);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if stack.len() > 1 {
        let open = stack
            .last()
            .map(|&id| doc.data(id).name.as_str().to_string())
            .unwrap_or_default();
        return Err(Error::Parse(format!("unclosed element <{open}>")));
    }

    if doc.root().is_none() {
        return Err(Error::Parse("document has no root element".to_string()));
    }

    Ok(doc)
}

fn open_element(doc: &mut Document, parent: NodeId, start: &BytesStart<'_>) -> Result<NodeId> {
    let name = utf8(start.name().as_ref())?.to_string();
    let id = doc.alloc(NodeKind::Element, QualifiedName::new(name), String::new());

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Parse(format!("invalid attribute: {e}")))?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(format!("invalid attribute value: {e}")))?;
        doc.push_attribute(id, QualifiedName::new(key), value.into_owned());
    }

    doc.link(parent, id, false);
    Ok(id)
}

fn append_data(doc: &mut Document, parent: NodeId, kind: NodeKind, value: String) {
    let id = doc.alloc(kind, QualifiedName::default(), value);
    doc.link(parent, id, false);
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::Parse("name is not valid utf-8".to_string()))
}

fn syntax_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> Error {
    Error::Parse(format!("{err} at position {}", reader.buffer_position()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Node;

    #[test]
    fn test_parse_basic() {
        let doc =
            parse(r#"<?xml version="1.0"?><!-- c --><a x="1 &amp; 2"><b>t&lt;</b></a>"#).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.attribute_value(root, "x"), Some("1 & 2"));
        let b = doc.children(root, "b")[0];
        assert_eq!(doc.content(b), "t<");
    }

    #[test]
    fn test_whitespace_runs_dropped() {
        let doc = parse("<a>\n  <b> padded </b>\n</a>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.children(root, "").len(), 1);
        let b = doc.children(root, "b")[0];
        assert_eq!(doc.content(b), " padded ");
    }

    #[test]
    fn test_cdata_kept() {
        let doc = parse("<a><![CDATA[<raw>]]></a>").unwrap();
        let root = doc.root().unwrap();
        let child = doc.first_child(root).unwrap();
        assert!(matches!(child, Node::CData(_)));
        assert_eq!(doc.content(Node::Element(root)), "<raw>");
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [
            "",
            "   ",
            "<a>",
            "<a></b>",
            "</a>",
            "<a><b></a>",
            "text",
            "<a/>trailing",
            "<a x=\"1\" x=\"2\"/>",
            "<a>&bogus;</a>",
        ] {
            assert!(
                matches!(parse(input), Err(Error::Parse(_))),
                "expected parse error for {input:?}"
            );
        }
    }
}
