//! Matching policy axes

use serde::{Deserialize, Serialize};

/// How request URLs are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMatch {
    /// Full normalized URL must be identical
    #[default]
    Exact,
    /// Compare everything except the query string
    IgnoreQuery,
    /// Query parameters compared as a multiset of decoded pairs
    UnorderedQuery,
}

/// How request headers are compared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatch {
    /// Headers never affect matching
    #[default]
    Ignore,
    /// Listed headers (case-insensitive names) must carry identical values
    Subset(Vec<String>),
}

/// How request bodies are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMatch {
    /// Byte-exact comparison
    #[default]
    Exact,
    /// Bodies never affect matching
    Ignore,
}

/// Whether requests must arrive in recorded order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    /// Only the next unconsumed interaction is eligible
    #[default]
    Sequential,
    /// Earliest unconsumed matching interaction wins
    AnyOrder,
}

/// Matching policy; the method is always compared exactly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// URL comparison
    pub url: UrlMatch,
    /// Header comparison
    pub headers: HeaderMatch,
    /// Body comparison
    pub body: BodyMatch,
    /// Selection order
    pub order: OrderMode,
}

impl MatchPolicy {
    /// Set URL comparison
    #[must_use]
    pub fn with_url(mut self, url: UrlMatch) -> Self {
        self.url = url;
        self
    }

    /// Require the listed headers to match
    #[must_use]
    pub fn match_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = HeaderMatch::Subset(names.into_iter().map(Into::into).collect());
        self
    }

    /// Ignore request bodies
    #[must_use]
    pub fn ignore_body(mut self) -> Self {
        self.body = BodyMatch::Ignore;
        self
    }

    /// Allow requests in any order
    #[must_use]
    pub fn any_order(mut self) -> Self {
        self.order = OrderMode::AnyOrder;
        self
    }
}
