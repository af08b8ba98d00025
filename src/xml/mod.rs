//! Minimal XML document model
//!
//! An arena-backed DOM with a restricted XPath matcher, used to build request
//! documents and to pick values out of server replies.

mod document;
mod node;
mod parser;
mod path;
mod writer;
mod xpath;

pub use document::Document;
pub use node::{AttrId, Node, NodeId};
pub use path::build_path;

/// Escape text for use as element content (`&`, `<`, `>`)
pub fn escape_text(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::partial_escape(text)
}

/// Escape text for use inside an attribute value or as a fully escaped value
pub fn escape_value(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}
