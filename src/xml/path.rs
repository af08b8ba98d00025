//! Path-based XML construction

use crate::error::{Error, Result};

use super::document::Document;
use super::node::{AttrId, NodeId};

/// Wrap `value` in one element per non-empty segment of `path`
///
/// `build_path("a/b", "v")` gives `<a><b>v</b></a>`. Leading, trailing and
/// repeated slashes are ignored; an empty path returns `value` unchanged.
/// `value` is inserted verbatim.
pub fn build_path(path: &str, value: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let tags: usize = segments.iter().map(|s| 2 * s.len() + 5).sum();
    let mut out = String::with_capacity(value.len() + tags);

    for segment in &segments {
        out.push('<');
        out.push_str(segment);
        out.push('>');
    }
    out.push_str(value);
    for segment in segments.iter().rev() {
        out.push_str("</");
        out.push_str(segment);
        out.push('>');
    }
    out
}

impl Document {
    /// Add an element named `tag` under the first element matching `path`
    pub fn create_node(&mut self, path: &str, tag: &str) -> Result<NodeId> {
        let parent = self.require_element(path)?;
        self.add_child(parent, tag, None)
    }

    /// Add an element named `tag` holding `text` under the first match of `path`
    pub fn create_node_text(&mut self, path: &str, tag: &str, text: &str) -> Result<NodeId> {
        let node = self.create_node(path, tag)?;
        self.add_child_text(node, text)?;
        Ok(node)
    }

    /// Set an attribute on every element matching `path`
    ///
    /// Returns the attributes that were set.
    pub fn create_attribute(&mut self, path: &str, name: &str, value: &str) -> Result<Vec<AttrId>> {
        let targets: Vec<NodeId> = self
            .find_fast(path, true)
            .into_iter()
            .filter_map(|node| node.element())
            .collect();
        targets
            .into_iter()
            .map(|id| self.set_attribute(id, name, value, None))
            .collect()
    }

    fn require_element(&self, path: &str) -> Result<NodeId> {
        self.find_first(path)
            .and_then(|node| node.element())
            .ok_or_else(|| Error::Usage(format!("no element matches path '{path}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_path() {
        assert_eq!(build_path("a/b", "v"), "<a><b>v</b></a>");
        assert_eq!(build_path("/a//b/", "v"), "<a><b>v</b></a>");
        assert_eq!(build_path("", "v"), "v");
        assert_eq!(build_path("///", "v"), "v");
        assert_eq!(build_path("x", "<y/>"), "<x><y/></x>");
    }

    #[test]
    fn test_create_helpers() {
        let mut doc = Document::parse("<r><a/><a/></r>").unwrap();
        doc.create_node_text("r", "b", "text").unwrap();
        let set = doc.create_attribute("r/a", "k", "v").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            doc.to_xml_string(false),
            r#"<r><a k="v"/><a k="v"/><b>text</b></r>"#
        );
        assert!(matches!(doc.create_node("r/missing", "x"), Err(Error::Usage(_))));
    }
}
