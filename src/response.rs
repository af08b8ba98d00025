//! Reply parsing
//!
//! A [`Response`] wraps the parsed reply document and pulls typed values out
//! of it with [`Document::find_fast`]. Error entries are collected once at
//! parse time.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::warn;

use crate::config::id_path_below_root;
use crate::error::{Error, Result, ServerError};
use crate::xml::{Document, Node, NodeId};

/// Severity levels that mark a reply as failed
pub const FAILURE_LEVELS: &[&str] = &["REJECTED", "FAILED", "ERROR", "FATAL"];

/// One `cps:error` entry of a reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyError {
    /// Error code
    pub code: String,
    /// Short text
    pub text: String,
    /// Detailed message
    pub message: String,
    /// Severity level
    pub level: String,
    /// Component that raised the error
    pub source: String,
    /// Affected documents
    pub document_ids: Vec<String>,
}

impl ReplyError {
    /// Whether the severity makes the whole reply a failure
    pub fn is_failure(&self) -> bool {
        FAILURE_LEVELS.contains(&self.level.as_str())
    }
}

/// Term of a facet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetTerm {
    /// Term text
    pub name: String,
    /// Number of hits, when the server reports it
    pub hits: Option<u64>,
}

/// Facet with its terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    /// Facet path
    pub path: String,
    /// Terms in reply order
    pub terms: Vec<FacetTerm>,
}

/// Aggregation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Aggregation expression
    pub query: String,
    /// One map per result row, tag name to value
    pub data: Vec<BTreeMap<String, String>>,
}

/// Suggested spelling for a query word
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeWord {
    /// Suggested word
    pub content: String,
    /// Occurrences in the storage
    pub count: u64,
    /// Relevance
    pub h: f64,
    /// Edit distance factor
    pub idif: f64,
    /// Occurrence ratio
    pub cr: f64,
}

/// Alternatives for one query word
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    /// Original word
    pub to: String,
    /// Occurrences of the original word
    pub count: u64,
    /// Suggestions
    pub words: Vec<AlternativeWord>,
}

/// Parsed server reply
#[derive(Debug, Clone)]
pub struct Response {
    doc: Document,
    document_root_xpath: String,
    id_path: String,
    errors: Vec<ReplyError>,
}

impl Response {
    /// Parse reply XML
    ///
    /// The xpaths locate documents inside results, as configured on the
    /// connection (`document` and `document/id` by default). An id xpath that
    /// is not below the root xpath is a usage error.
    pub fn parse(xml: &str, document_root_xpath: &str, document_id_xpath: &str) -> Result<Self> {
        let id_path = id_path_below_root(document_root_xpath, document_id_xpath)?;
        let doc = Document::parse(xml).map_err(|e| match e {
            Error::Parse(msg) => Error::Parse(format!("invalid response: {msg}")),
            other => other,
        })?;
        let errors = collect_errors(&doc);
        Ok(Self {
            doc,
            document_root_xpath: document_root_xpath.trim_matches('/').to_string(),
            id_path: id_path.to_string(),
            errors,
        })
    }

    /// Underlying reply document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Command the reply answers
    pub fn command(&self) -> &str {
        self.doc.find_content("cps:reply/cps:command").unwrap_or("")
    }

    /// Storage that handled the request
    pub fn storage(&self) -> &str {
        self.doc.find_content("cps:reply/cps:storage").unwrap_or("")
    }

    /// Server-side processing time
    pub fn seconds(&self) -> f64 {
        self.doc
            .find_content("cps:reply/cps:seconds")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0.0)
    }

    /// Error entries of the reply
    pub fn errors(&self) -> &[ReplyError] {
        &self.errors
    }

    /// Whether any error entry has a failing severity
    pub fn has_failed(&self) -> bool {
        self.errors.iter().any(ReplyError::is_failure)
    }

    /// Turn a failed reply into [`Error::Server`]
    ///
    /// Non-failing error entries are logged and the response is returned.
    pub fn into_result(self) -> Result<Self> {
        if let Some(first) = self.errors.iter().find(|e| e.is_failure()) {
            return Err(Error::Server(ServerError {
                code: first.code.clone(),
                message: first.message.clone(),
                level: first.level.clone(),
                document_ids: first.document_ids.clone(),
                entries: self.errors.clone(),
            }));
        }
        for error in &self.errors {
            warn!(code = %error.code, level = %error.level, "{}", error.message);
        }
        Ok(self)
    }

    /// Text of `cps:reply/cps:content/<key>`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.doc.find_content(&format!("cps:reply/cps:content/{key}"))
    }

    /// Parsed value of `cps:reply/cps:content/<key>`
    pub fn param_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.param(key).and_then(|s| s.trim().parse().ok())
    }

    /// Total number of matching documents
    pub fn hits(&self) -> u64 {
        self.param_as("hits").unwrap_or(0)
    }

    /// Number of documents found by a lookup or search
    pub fn found(&self) -> u64 {
        self.param_as("found").unwrap_or(0)
    }

    /// Offset of the first returned document
    pub fn from(&self) -> u64 {
        self.param_as("from").unwrap_or(0)
    }

    /// Offset after the last returned document
    pub fn to(&self) -> u64 {
        self.param_as("to").unwrap_or(0)
    }

    fn result_nodes(&self) -> Vec<Node> {
        let root = &self.document_root_xpath;
        self.doc
            .find_fast(&format!("cps:reply/cps:content/results/{root}"), true)
    }

    /// Returned documents serialized as XML strings
    pub fn documents(&self, formatted: bool) -> Vec<String> {
        self.result_nodes()
            .into_iter()
            .map(|node| self.doc.node_to_string(node, formatted))
            .collect()
    }

    /// Returned documents as independent documents
    pub fn documents_xml(&self) -> Vec<Document> {
        self.result_nodes()
            .into_iter()
            .filter_map(Node::element)
            .map(|id| Document::from_subtree(&self.doc, id))
            .collect()
    }

    /// Returned documents keyed by their id
    ///
    /// Documents without an id are left out.
    pub fn documents_by_id(&self) -> BTreeMap<String, Document> {
        // each extracted document is rooted at the last step of the root xpath
        let leaf = self.document_root_xpath.rsplit('/').next().unwrap_or_default();
        let id_xpath = format!("{leaf}/{}", self.id_path);

        self.documents_xml()
            .into_iter()
            .filter_map(|doc| {
                let id = doc.find_content(&id_xpath)?.to_string();
                Some((id, doc))
            })
            .collect()
    }

    /// Ids of documents touched by insert/update/replace/delete
    pub fn modified_ids(&self) -> Vec<String> {
        let (root, id_path) = (&self.document_root_xpath, &self.id_path);
        self.contents(&format!("cps:reply/cps:content/{root}/{id_path}"))
    }

    /// Facets of a search or list-facets reply, keyed by path
    pub fn facets(&self) -> BTreeMap<String, Facet> {
        let mut facets = BTreeMap::new();
        for node in self.element_ids("cps:reply/cps:content/facet") {
            let path = self.doc.attribute_value(node, "path").unwrap_or("").to_string();
            let terms = self
                .doc
                .children(node, "term")
                .into_iter()
                .map(|term| FacetTerm {
                    name: self.doc.content(term).to_string(),
                    hits: term
                        .element()
                        .and_then(|id| self.doc.attribute_value(id, "hits"))
                        .and_then(|h| h.trim().parse().ok()),
                })
                .collect();
            facets.insert(path.clone(), Facet { path, terms });
        }
        facets
    }

    /// Aggregation results keyed by expression
    pub fn aggregates(&self) -> BTreeMap<String, Aggregate> {
        let mut aggregates = BTreeMap::new();
        for node in self.element_ids("cps:reply/cps:content/aggregate") {
            let Some(query) = self.doc.children(node, "query").first().copied() else {
                continue;
            };
            let data: Vec<BTreeMap<String, String>> = self
                .doc
                .children(node, "data")
                .into_iter()
                .filter_map(Node::element)
                .map(|row| {
                    self.doc
                        .children(row, "")
                        .into_iter()
                        .filter(|field| field.is_element())
                        .map(|field| {
                            (
                                self.doc.name(field).to_string(),
                                self.doc.content(field).to_string(),
                            )
                        })
                        .collect()
                })
                .collect();
            if data.is_empty() {
                continue;
            }
            let query = self.doc.content(query).to_string();
            aggregates.insert(query.clone(), Aggregate { query, data });
        }
        aggregates
    }

    /// Word counts of a list-words reply: pattern, then word to count
    pub fn words(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        let mut words: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for node in self.element_ids("cps:reply/cps:content/list") {
            let to = self.doc.attribute_value(node, "to").unwrap_or("").to_string();
            let entry = words.entry(to).or_default();
            for word in self.doc.children(node, "").into_iter().filter_map(Node::element) {
                let count = self
                    .doc
                    .attribute_value(word, "count")
                    .and_then(|c| c.trim().parse().ok())
                    .unwrap_or(0);
                entry.insert(self.doc.content(Node::Element(word)).to_string(), count);
            }
        }
        words
    }

    /// Tag paths of a list-paths reply
    pub fn paths(&self) -> Vec<String> {
        self.contents("cps:reply/cps:content/paths/path")
    }

    /// Spelling alternatives keyed by original word
    pub fn alternatives(&self) -> BTreeMap<String, Alternative> {
        let mut out = BTreeMap::new();
        for node in self.element_ids("cps:reply/cps:content/alternatives_list/alternatives") {
            let mut alternative = Alternative {
                to: String::new(),
                count: 0,
                words: Vec::new(),
            };
            for child in self.doc.children(node, "").into_iter().filter_map(Node::element) {
                let child_node = Node::Element(child);
                let value = self.doc.content(child_node);
                match self.doc.name(child_node) {
                    "to" => alternative.to = value.to_string(),
                    "count" => alternative.count = value.trim().parse().unwrap_or(0),
                    "word" => alternative.words.push(AlternativeWord {
                        content: value.to_string(),
                        count: self.attribute_or_default(child, "count"),
                        h: self.attribute_or_default(child, "h"),
                        idif: self.attribute_or_default(child, "idif"),
                        cr: self.attribute_or_default(child, "cr"),
                    }),
                    _ => {}
                }
            }
            out.insert(alternative.to.clone(), alternative);
        }
        out
    }

    /// Reply serialized back to XML
    pub fn to_xml_string(&self, formatted: bool) -> String {
        self.doc.to_xml_string(formatted)
    }

    fn attribute_or_default<T: FromStr + Default>(&self, id: NodeId, name: &str) -> T {
        self.doc
            .attribute_value(id, name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    fn contents(&self, path: &str) -> Vec<String> {
        self.doc
            .find_fast(path, true)
            .into_iter()
            .map(|node| self.doc.content(node).to_string())
            .collect()
    }

    fn element_ids(&self, path: &str) -> Vec<NodeId> {
        self.doc
            .find_fast(path, true)
            .into_iter()
            .filter_map(Node::element)
            .collect()
    }
}

fn collect_errors(doc: &Document) -> Vec<ReplyError> {
    doc.find_fast("cps:reply/cps:error", true)
        .into_iter()
        .filter_map(Node::element)
        .map(|error| {
            let mut entry = ReplyError::default();
            for child in doc.children(error, "") {
                let value = doc.content(child).to_string();
                match doc.name(child) {
                    "code" => entry.code = value,
                    "text" => entry.text = value,
                    "message" => entry.message = value,
                    "level" => entry.level = value,
                    "source" => entry.source = value,
                    "document_id" => entry.document_ids.push(value),
                    _ => {}
                }
            }
            entry
        })
        .collect()
}
