//! Constructors and typed setters for the server commands

use crate::request::{query_term, term, ParamKind, Request};

impl Request {
    /// Full-text/XML search
    pub fn search(query: &str) -> Self {
        let mut request = Self::new("search");
        request.push_param(ParamKind::Raw, "query", [query], false);
        request
    }

    /// Retrieve documents by id
    pub fn retrieve<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_ids("retrieve", ids)
    }

    /// Fetch selected tags of documents by id
    pub fn lookup<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_ids("lookup", ids)
    }

    /// Insert documents keyed by id
    pub fn insert<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::modify("insert", documents)
    }

    /// Update (merge) documents keyed by id
    pub fn update<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::modify("update", documents)
    }

    /// Replace documents keyed by id
    pub fn replace<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::modify("replace", documents)
    }

    /// Replace only the given tags of documents keyed by id
    pub fn partial_replace<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::modify("partial-replace", documents)
    }

    /// Delete documents by id
    pub fn delete<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_ids("delete", ids)
    }

    /// Delete every document matching `query`
    pub fn search_delete(query: &str) -> Self {
        let mut request = Self::new("search-delete");
        request.push_param(ParamKind::Raw, "query", [query], false);
        request
    }

    /// List the most recently inserted documents
    pub fn list_last(offset: u32, docs: u32) -> Self {
        Self::paged("list-last", offset, docs)
    }

    /// List the earliest inserted documents
    pub fn list_first(offset: u32, docs: u32) -> Self {
        Self::paged("list-first", offset, docs)
    }

    /// Retrieve the most recently inserted documents
    pub fn retrieve_last(offset: u32, docs: u32) -> Self {
        Self::paged("retrieve-last", offset, docs)
    }

    /// Retrieve the earliest inserted documents
    pub fn retrieve_first(offset: u32, docs: u32) -> Self {
        Self::paged("retrieve-first", offset, docs)
    }

    /// Count words matching wildcard patterns
    pub fn list_words<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new("list-words");
        request.push_param(ParamKind::Raw, "query", queries, false);
        request
    }

    /// List all tag paths in the storage
    pub fn list_paths() -> Self {
        Self::new("list-paths")
    }

    /// List facet terms for the given paths
    pub fn list_facets<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new("list-facets");
        request.push_param(ParamKind::Text, "path", paths, false);
        request
    }

    /// Storage status
    pub fn status() -> Self {
        Self::new("status")
    }

    /// Spelling alternatives for the words of `query`
    pub fn alternatives(query: &str) -> Self {
        let mut request = Self::new("alternatives");
        request.push_param(ParamKind::Raw, "query", [query], false);
        request
    }

    /// Documents similar to the stored document `id`
    pub fn similar_document(id: &str, len: u32, quota: u32) -> Self {
        let mut request = Self::similar(len, quota);
        request.push_param(ParamKind::Text, "id", [id], true);
        request
    }

    /// Documents similar to a piece of text
    pub fn similar_text(text: &str, len: u32, quota: u32) -> Self {
        let mut request = Self::similar(len, quota);
        request.push_param(ParamKind::Text, "text", [text], true);
        request
    }

    /// Revision history of a document
    pub fn show_history(id: impl Into<String>, return_docs: bool) -> Self {
        let mut request = Self::with_ids("show-history", [id]);
        if return_docs {
            request.push_param(ParamKind::Text, "return_doc", ["yes"], true);
        }
        request
    }

    /// Start a transaction
    pub fn begin_transaction() -> Self {
        Self::new("begin-transaction")
    }

    /// Commit the active transaction
    pub fn commit_transaction() -> Self {
        Self::new("commit-transaction")
    }

    /// Roll back the active transaction
    pub fn rollback_transaction() -> Self {
        Self::new("rollback-transaction")
    }

    /// Add another raw query
    pub fn set_query(&mut self, query: &str) -> &mut Self {
        self.push_param(ParamKind::Raw, "query", [query], false);
        self
    }

    /// Number of documents to return
    pub fn set_docs(&mut self, docs: u32) -> &mut Self {
        self.push_param(ParamKind::Text, "docs", [docs.to_string()], true);
        self
    }

    /// Number of results to skip
    pub fn set_offset(&mut self, offset: u32) -> &mut Self {
        self.push_param(ParamKind::Text, "offset", [offset.to_string()], true);
        self
    }

    /// Which tags to return: `(xpath, yes|no|snippet|highlight)` pairs
    pub fn set_list<'a, I>(&mut self, list: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fragment: String = list
            .into_iter()
            .map(|(xpath, option)| term(option, xpath))
            .collect();
        self.push_param(ParamKind::Raw, "list", [fragment], true);
        self
    }

    /// Sort order built with the [`ordering`](crate::ordering) helpers
    pub fn set_ordering<I, S>(&mut self, orderings: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: String = orderings
            .into_iter()
            .map(|o| o.as_ref().to_string())
            .collect();
        self.push_param(ParamKind::Raw, "ordering", [joined], true);
        self
    }

    /// Facet paths to compute
    pub fn set_facets<I, S>(&mut self, facets: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_param(ParamKind::Text, "facet", facets, false);
        self
    }

    /// Maximum number of terms per facet
    pub fn set_facet_size(&mut self, size: u32) -> &mut Self {
        self.push_param(ParamKind::Text, "facet_size", [size.to_string()], true);
        self
    }

    /// Aggregation expressions
    pub fn set_aggregates<I, S>(&mut self, aggregates: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_param(ParamKind::Text, "aggregate", aggregates, false);
        self
    }

    /// Stemming language
    pub fn set_stem_lang(&mut self, lang: &str) -> &mut Self {
        self.push_param(ParamKind::Text, "stem-lang", [lang], true);
        self
    }

    /// Exact match mode: `text`, `binary` or `all`
    pub fn set_exact_match(&mut self, mode: &str) -> &mut Self {
        self.push_param(ParamKind::Text, "exact-match", [mode], true);
        self
    }

    /// Group results by `tag`, keeping at most `count` per group
    pub fn set_group(&mut self, tag: &str, count: u32) -> &mut Self {
        self.push_param(ParamKind::Text, "group", [tag], true);
        self.push_param(ParamKind::Text, "group_size", [count.to_string()], true);
        self
    }

    /// Alternatives: minimum ratio of occurrences (default 2.0)
    pub fn set_cr(&mut self, cr: f64) -> &mut Self {
        self.push_param(ParamKind::Text, "cr", [cr.to_string()], true);
        self
    }

    /// Alternatives: maximum edit distance factor (default 3.0)
    pub fn set_idif(&mut self, idif: f64) -> &mut Self {
        self.push_param(ParamKind::Text, "idif", [idif.to_string()], true);
        self
    }

    /// Alternatives: relevance threshold (default 2.5)
    pub fn set_h(&mut self, h: f64) -> &mut Self {
        self.push_param(ParamKind::Text, "h", [h.to_string()], true);
        self
    }

    fn with_ids<I, S>(command: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new(command);
        request.set_documents_with_ids(ids.into_iter().map(|id| (id, String::new())));
        request
    }

    fn modify<I, K, V>(command: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::new(command);
        request.set_documents_with_ids(documents);
        request
    }

    fn paged(command: &str, offset: u32, docs: u32) -> Self {
        let mut request = Self::new(command);
        request.set_offset(offset).set_docs(docs);
        request
    }

    fn similar(len: u32, quota: u32) -> Self {
        let mut request = Self::new("similar");
        request.push_param(ParamKind::Text, "len", [len.to_string()], true);
        request.push_param(ParamKind::Text, "quota", [quota.to_string()], true);
        request
    }
}

/// Query matching `text` at `xpath`, with search operators escaped
pub fn query(text: &str, xpath: &str) -> String {
    query_term(text, xpath, "")
}
