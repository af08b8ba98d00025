//! Restricted XPath matcher
//!
//! Supported syntax, one `/`-separated segment at a time:
//!
//! - `tag`, `ns:tag`: exact qualified match; without a colon the node must
//!   have no namespace prefix
//! - `*`: any element or text node, any prefix
//! - `ab*`: elements whose local name starts with `ab`, any prefix
//! - `tag[n]`: the n-th (1-based) sibling matching the name at that level
//! - `tag@attr`, `tag/@attr`, `tag/@ns:attr`: attribute of the matched element
//!
//! Results come back in document order. With `multiple == false` the scan
//! stops at the first hit.

use std::ops::ControlFlow;

use super::document::Document;
use super::node::{Node, NodeId, NodeKind};

/// One parsed path segment
#[derive(Debug, PartialEq, Eq)]
struct Step<'p> {
    prefix: Option<&'p str>,
    name: &'p str,
    wildcard: bool,
    attribute: bool,
    position: Option<usize>,
    rest: &'p str,
}

impl<'p> Step<'p> {
    fn parse(path: &'p str) -> Self {
        let bytes = path.as_bytes();
        let mut prefix = None;
        let mut name_start = 0;
        let mut name_end = None;
        let mut bracket = None;
        let mut position = None;
        let mut wildcard = false;
        let mut attribute = false;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'/' => break,
                b'*' => {
                    wildcard = true;
                    name_end.get_or_insert(i);
                    while i < bytes.len() && bytes[i] != b'/' {
                        i += 1;
                    }
                    break;
                }
                b'@' => {
                    attribute = true;
                    break;
                }
                b'[' if bracket.is_none() => {
                    bracket = Some(i);
                    name_end.get_or_insert(i);
                }
                b']' => {
                    if let Some(open) = bracket {
                        position = Some(leading_number(&path[open + 1..i]));
                    }
                }
                b':' if prefix.is_none() && name_end.is_none() => {
                    prefix = Some(&path[..i]);
                    name_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }

        let name_end = name_end.unwrap_or(i).max(name_start);
        Self {
            prefix,
            name: &path[name_start..name_end],
            wildcard,
            attribute,
            position,
            rest: &path[i..],
        }
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let data = doc.data(id);
        let candidate = match data.kind {
            NodeKind::Element => true,
            NodeKind::Text => self.wildcard && self.name.is_empty(),
            NodeKind::CData | NodeKind::Document => false,
        };
        if !candidate {
            return false;
        }

        let local = data.name.local();
        let name_ok = if self.wildcard || (self.attribute && self.name.is_empty()) {
            local.starts_with(self.name)
        } else {
            local == self.name
        };
        if !name_ok {
            return false;
        }

        match (self.prefix, data.name.prefix()) {
            (None, None) => true,
            (None, Some(_)) => self.wildcard,
            (Some(wanted), actual) => actual == Some(wanted),
        }
    }
}

/// `atoi`-style parse of the leading digits; no digits gives 0
fn leading_number(text: &str) -> usize {
    text.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0usize, |acc, b| {
            acc.saturating_mul(10).saturating_add(usize::from(b - b'0'))
        })
}

impl Document {
    /// Find nodes matching a restricted XPath expression
    ///
    /// A leading `/` is ignored and an empty path yields the root element.
    pub fn find_fast(&self, path: &str, multiple: bool) -> Vec<Node> {
        let mut found = Vec::new();
        self.find_with(path, multiple, |node| found.push(node));
        found
    }

    /// First node matching `path`
    pub fn find_first(&self, path: &str) -> Option<Node> {
        self.find_fast(path, false).into_iter().next()
    }

    /// Content of the first node matching `path`
    pub fn find_content(&self, path: &str) -> Option<&str> {
        self.find_first(path).map(|node| self.content(node))
    }

    /// Visit every node matching `path` in document order
    ///
    /// With `multiple == false` at most one node is visited.
    pub fn find_with<F>(&self, path: &str, multiple: bool, mut visit: F)
    where
        F: FnMut(Node),
    {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            if let Some(root) = self.root() {
                visit(Node::Element(root));
            }
            return;
        }
        let first = self.data(Self::DOCUMENT_NODE).first_child;
        let _ = self.walk(first, path, multiple, &mut visit);
    }

    fn walk(
        &self,
        first: Option<NodeId>,
        path: &str,
        multiple: bool,
        visit: &mut dyn FnMut(Node),
    ) -> ControlFlow<()> {
        let step = Step::parse(path);
        let rest = step.rest.trim_start_matches('/');
        let mut matched = 0usize;
        let mut cursor = first;

        while let Some(id) = cursor {
            cursor = self.data(id).next_sibling;
            if !step.matches(self, id) {
                continue;
            }
            matched += 1;
            if step.position.is_some_and(|wanted| wanted != matched) {
                continue;
            }

            if let Some(attr_name) = rest.strip_prefix('@') {
                if let Some(attr) = self.attribute_by_qname(id, attr_name) {
                    visit(Node::Attribute(attr));
                    if !multiple {
                        return ControlFlow::Break(());
                    }
                }
            } else if !rest.is_empty() {
                self.walk(self.data(id).first_child, rest, multiple, visit)?;
            } else {
                visit(self.node(id));
                if !multiple {
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = concat!(
        r#"<cps:reply xmlns:cps="www.clusterpoint.com">"#,
        r#"<cps:content><results>"#,
        r#"<document><id>1</id><title lang="en">First</title></document>"#,
        r#"<document><id>2</id><title>Second</title></document>"#,
        r#"</results></cps:content></cps:reply>"#,
    );

    fn contents(doc: &Document, nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|&n| doc.content(n).to_string()).collect()
    }

    #[test]
    fn test_step_parse() {
        let step = Step::parse("ns:tag[2]/rest");
        assert_eq!(step.prefix, Some("ns"));
        assert_eq!(step.name, "tag");
        assert_eq!(step.position, Some(2));
        assert_eq!(step.rest, "/rest");

        let step = Step::parse("doc*x/y");
        assert!(step.wildcard);
        assert_eq!(step.name, "doc");
        assert_eq!(step.rest, "/y");

        let step = Step::parse("title@lang");
        assert!(step.attribute);
        assert_eq!(step.name, "title");
        assert_eq!(step.rest, "@lang");

        assert_eq!(Step::parse("a[x]").position, Some(0));
    }

    #[test]
    fn test_multiple_documents() {
        let doc = Document::parse(REPLY).unwrap();
        let ids = doc.find_fast("cps:reply/cps:content/results/document/id", true);
        assert_eq!(contents(&doc, &ids), vec!["1", "2"]);

        let first = doc.find_fast("cps:reply/cps:content/results/document/id", false);
        assert_eq!(contents(&doc, &first), vec!["1"]);
    }

    #[test]
    fn test_position_predicate() {
        let doc = Document::parse(REPLY).unwrap();
        let second = doc.find_fast("cps:reply/cps:content/results/document[2]/id", true);
        assert_eq!(contents(&doc, &second), vec!["2"]);
        assert!(doc
            .find_fast("cps:reply/cps:content/results/document[3]/id", true)
            .is_empty());
        assert!(doc
            .find_fast("cps:reply/cps:content/results/document[x]/id", true)
            .is_empty());
    }

    #[test]
    fn test_wildcards() {
        let doc = Document::parse(REPLY).unwrap();
        let titles = doc.find_fast("*/*/results/*/title", true);
        assert_eq!(contents(&doc, &titles), vec!["First", "Second"]);

        let prefixed = doc.find_fast("cps:reply/cps:content/res*/doc*/id", true);
        assert_eq!(prefixed.len(), 2);

        let texts = doc.find_fast("cps:reply/cps:content/results/document/id/*", true);
        assert_eq!(contents(&doc, &texts), vec!["1", "2"]);
        assert!(matches!(texts[0], Node::Text(_)));
    }

    #[test]
    fn test_attribute_selection() {
        let doc = Document::parse(REPLY).unwrap();
        let langs = doc.find_fast("cps:reply/cps:content/results/document/title/@lang", true);
        assert_eq!(contents(&doc, &langs), vec!["en"]);
        assert!(matches!(langs[0], Node::Attribute(_)));

        let inline = doc.find_fast("cps:reply/cps:content/results/document/title@lang", true);
        assert_eq!(contents(&doc, &inline), vec!["en"]);

        let ns = doc.find_fast("cps:reply/@xmlns:cps", false);
        assert_eq!(contents(&doc, &ns), vec!["www.clusterpoint.com"]);
    }

    #[test]
    fn test_namespace_rules() {
        let doc = Document::parse(r#"<a:root><a:item>1</a:item><item>2</item></a:root>"#).unwrap();
        assert_eq!(contents(&doc, &doc.find_fast("a:root/a:item", true)), vec!["1"]);
        assert_eq!(contents(&doc, &doc.find_fast("a:root/item", true)), vec!["2"]);
        assert_eq!(contents(&doc, &doc.find_fast("a:root/*", true)), vec!["1", "2"]);
        assert!(doc.find_fast("root", true).is_empty());
    }

    #[test]
    fn test_root_shortcuts() {
        let doc = Document::parse(REPLY).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.find_fast("", false), vec![Node::Element(root)]);
        assert_eq!(doc.find_fast("/", true), vec![Node::Element(root)]);
        assert_eq!(doc.find_fast("/cps:reply", true), vec![Node::Element(root)]);
        assert_eq!(doc.find_fast("cps:reply/", true), vec![Node::Element(root)]);
    }

    #[test]
    fn test_find_content() {
        let doc = Document::parse(REPLY).unwrap();
        assert_eq!(
            doc.find_content("cps:reply/cps:content/results/document/title"),
            Some("First")
        );
        assert_eq!(doc.find_content("cps:reply/missing"), None);
    }

    #[test]
    fn test_visitor_sees_document_order() {
        let doc = Document::parse("<r><a><b>1</b></a><b>2</b><a><b>3</b></a></r>").unwrap();
        let mut seen = Vec::new();
        doc.find_with("r/a/b", true, |node| seen.push(doc.content(node).to_string()));
        assert_eq!(seen, vec!["1", "3"]);
    }

    #[test]
    fn test_visitor_single_stops_at_first() {
        let doc = Document::parse("<r><a><b>1</b></a><a><b>2</b></a></r>").unwrap();
        let mut seen = Vec::new();
        doc.find_with("r/a/b", false, |node| seen.push(doc.content(node).to_string()));
        assert_eq!(seen, vec!["1"]);

        let doc = Document::parse(r#"<r><a k="1"/><a k="2"/></r>"#).unwrap();
        let mut attrs = 0;
        doc.find_with("r/a/@k", false, |_| attrs += 1);
        assert_eq!(attrs, 1);
    }
}
