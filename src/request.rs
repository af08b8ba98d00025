//! Request model and XML rendering
//!
//! A [`Request`] holds the command name, parameters and documents. Rendering
//! needs the connection's document root/id paths and envelope parameters,
//! passed in through [`RenderContext`].

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::xml::{build_path, escape_value, Document};
use crate::CPS_NAMESPACE;

/// Parameters emitted as escaped text under `cps:content` (sorted)
pub const TEXT_PARAMS: &[&str] = &[
    "added_external_id",
    "added_id",
    "aggregate",
    "case_sensitive",
    "cr",
    "deleted_external_id",
    "deleted_id",
    "description",
    "docs",
    "exact-match",
    "facet",
    "facet_size",
    "fail_if_exists",
    "file",
    "finalize",
    "for",
    "force",
    "from",
    "full",
    "group",
    "group_size",
    "h",
    "id",
    "idif",
    "iterator_id",
    "len",
    "message",
    "offset",
    "path",
    "persistent",
    "position",
    "quota",
    "rate2_ordering",
    "rate_from",
    "rate_to",
    "relevance",
    "return_doc",
    "return_internal",
    "sequence_check",
    "stem-lang",
    "step_size",
    "text",
    "transaction_id",
    "type",
];

/// Parameters holding literal XML fragments (sorted)
pub const RAW_PARAMS: &[&str] = &["list", "ordering", "query", "shapes"];

/// Characters `query_term` escapes with a backslash
pub const QUERY_SPECIAL_CHARS: &str = "@$\"=<>(){}!+";

/// Which registry a parameter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Escaped text value
    Text,
    /// Literal XML fragment
    Raw,
}

impl ParamKind {
    /// Look up the registry for `name`
    pub fn of(name: &str) -> Option<Self> {
        if TEXT_PARAMS.binary_search(&name).is_ok() {
            Some(ParamKind::Text)
        } else if RAW_PARAMS.binary_search(&name).is_ok() {
            Some(ParamKind::Raw)
        } else {
            None
        }
    }
}

/// Connection settings a request needs when rendered
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Root element path of stored documents, e.g. `document`
    pub document_root_xpath: &'a str,
    /// Id element path, e.g. `document/id`
    pub document_id_xpath: &'a str,
    /// Envelope parameters, emitted as `cps:<name>` elements
    pub envelope: &'a BTreeMap<String, Vec<String>>,
    /// Active transaction
    pub transaction_id: Option<i64>,
}

/// A command with its parameters and documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    request_id: Option<String>,
    label: Option<String>,
    request_type: String,
    text_params: BTreeMap<String, Vec<String>>,
    raw_params: BTreeMap<String, Vec<String>>,
    documents_with_id: BTreeMap<String, String>,
    documents: Vec<String>,
}

impl Request {
    /// Create a request for `command` with request type `auto`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            request_id: None,
            label: None,
            request_type: "auto".to_string(),
            text_params: BTreeMap::new(),
            raw_params: BTreeMap::new(),
            documents_with_id: BTreeMap::new(),
            documents: Vec::new(),
        }
    }

    /// Command name
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Request id used in server logs
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Set the request id
    pub fn set_request_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.request_id = Some(id.into()).filter(|id: &String| !id.is_empty());
        self
    }

    /// Cluster nodeset label
    pub fn cluster_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Set the cluster nodeset label
    pub fn set_cluster_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into()).filter(|label: &String| !label.is_empty());
        self
    }

    /// Processing type: `auto`, `single` or `cluster`
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    /// Set the processing type
    pub fn set_request_type(&mut self, request_type: impl Into<String>) -> &mut Self {
        self.request_type = request_type.into();
        self
    }

    /// Set a registered parameter
    ///
    /// Values are appended unless `replace` is set. Unknown names are a
    /// usage error.
    pub fn set_param<I, S>(&mut self, name: &str, values: I, replace: bool) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let kind = ParamKind::of(name)
            .ok_or_else(|| Error::Usage(format!("invalid parameter name '{name}'")))?;
        self.push_param(kind, name, values, replace);
        Ok(self)
    }

    pub(crate) fn push_param<I, S>(&mut self, kind: ParamKind, name: &str, values: I, replace: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = match kind {
            ParamKind::Text => &mut self.text_params,
            ParamKind::Raw => &mut self.raw_params,
        };
        let slot = registry.entry(name.to_string()).or_default();
        if replace {
            slot.clear();
        }
        slot.extend(values.into_iter().map(Into::into));
    }

    /// Values of a parameter
    pub fn param(&self, name: &str) -> Option<&[String]> {
        self.text_params
            .get(name)
            .or_else(|| self.raw_params.get(name))
            .map(Vec::as_slice)
    }

    /// Add a document whose id is already inside it, or assigned by the server
    pub fn set_document(&mut self, document: impl Into<String>) -> &mut Self {
        self.documents.push(document.into());
        self
    }

    /// Add a document body stored under `id`
    pub fn set_document_with_id(
        &mut self,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> &mut Self {
        self.documents_with_id.insert(id.into(), body.into());
        self
    }

    /// Add several documents without explicit ids
    pub fn set_documents<I, S>(&mut self, documents: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents.extend(documents.into_iter().map(Into::into));
        self
    }

    /// Add several documents keyed by id
    pub fn set_documents_with_ids<I, K, V>(&mut self, documents: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (id, body) in documents {
            self.documents_with_id.insert(id.into(), body.into());
        }
        self
    }

    /// Envelope parameters this request contributes
    ///
    /// `command`, and when set `requestid`, `type` and `label`.
    pub fn envelope_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("command", self.command.clone())];
        if let Some(id) = &self.request_id {
            params.push(("requestid", id.clone()));
        }
        if !self.request_type.is_empty() {
            params.push(("type", self.request_type.clone()));
        }
        if let Some(label) = &self.label {
            params.push(("label", label.clone()));
        }
        params
    }

    /// Render the request XML as a string
    pub fn render_xml(&self, ctx: &RenderContext<'_>) -> String {
        let mut xml = format!(r#"<cps:request xmlns:cps="{CPS_NAMESPACE}">"#);

        for (name, values) in ctx.envelope {
            for value in values {
                xml.push_str(&format!(
                    "<cps:{name}>{}</cps:{name}>",
                    escape_value(&clean_envelope_value(value))
                ));
            }
        }

        xml.push_str("<cps:content>");
        if let Some(id) = ctx.transaction_id {
            xml.push_str(&format!("<transaction_id>{id}</transaction_id>"));
        }
        for (name, values) in &self.text_params {
            for value in values {
                xml.push_str(&format!("<{name}>{}</{name}>", escape_value(value)));
            }
        }
        for (name, values) in &self.raw_params {
            for value in values {
                xml.push_str(&format!("<{name}>{value}</{name}>"));
            }
        }
        for document in self.document_fragments(ctx) {
            xml.push_str(&document);
        }
        xml.push_str("</cps:content></cps:request>");
        xml
    }

    /// Render the request through the DOM
    ///
    /// Raw parameters and documents are parsed before being attached, so
    /// malformed fragments fail here instead of on the server.
    pub fn render_document(&self, ctx: &RenderContext<'_>) -> Result<Document> {
        let mut doc = Document::new();
        let root = doc.create_root_node("request", CPS_NAMESPACE, Some("cps"));

        for (name, values) in ctx.envelope {
            for value in values {
                let node = doc.add_child(root, name, Some("cps"))?;
                doc.add_child_text(node, &clean_envelope_value(value))?;
            }
        }

        let content = doc.add_child(root, "content", Some("cps"))?;
        if let Some(id) = ctx.transaction_id {
            let node = doc.add_child(content, "transaction_id", None)?;
            doc.add_child_text(node, &id.to_string())?;
        }
        for (name, values) in &self.text_params {
            for value in values {
                let node = doc.add_child(content, name, None)?;
                doc.add_child_text(node, value)?;
            }
        }
        for (name, values) in &self.raw_params {
            for value in values {
                import_fragment(&mut doc, content, &format!("<{name}>{value}</{name}>"))?;
            }
        }
        for document in self.document_fragments(ctx) {
            import_fragment(&mut doc, content, &document)?;
        }
        Ok(doc)
    }

    fn document_fragments(&self, ctx: &RenderContext<'_>) -> Vec<String> {
        let root = ctx.document_root_xpath;
        let id_tag = ctx
            .document_id_xpath
            .strip_prefix(root)
            .unwrap_or(ctx.document_id_xpath);

        let with_id = self.documents_with_id.iter().map(|(id, body)| {
            let inner = format!("{}{body}", build_path(id_tag, &escape_value(id)));
            build_path(root, &inner)
        });

        let open_tag = format!("<{root}>");
        let open_with_attrs = format!("<{root} ");
        let auto = self.documents.iter().map(move |document| {
            if document.contains(&open_tag) || document.contains(&open_with_attrs) {
                document.clone()
            } else {
                build_path(root, document)
            }
        });

        with_id.chain(auto).collect()
    }
}

fn import_fragment(doc: &mut Document, parent: crate::xml::NodeId, xml: &str) -> Result<()> {
    let fragment = Document::parse(xml)?;
    if let Some(root) = fragment.root() {
        doc.import_node(parent, &fragment, fragment.node(root), true, false)?;
    }
    Ok(())
}

/// Replace control characters other than tab, newline and carriage return
pub fn clean_envelope_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => c,
            c if (c as u32) < 0x20 => ' ',
            c => c,
        })
        .collect()
}

/// `text` escaped and wrapped in the elements of `xpath`
pub fn term(text: &str, xpath: &str) -> String {
    build_path(xpath, &escape_value(text))
}

/// `text` wrapped in the elements of `xpath` without escaping
pub fn raw_term(text: &str, xpath: &str) -> String {
    build_path(xpath, text)
}

/// Query term with search operators backslash-escaped
///
/// Characters in `allowed` are left as operators.
pub fn query_term(text: &str, xpath: &str, allowed: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if QUERY_SPECIAL_CHARS.contains(c) && !allowed.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    term(&escaped, xpath)
}

/// Concatenated terms for `(xpath, value)` pairs
pub fn simple_document<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .map(|(xpath, value)| term(value, xpath))
        .collect()
}
