//! Request/response model captured into cassettes
//!
//! Every type here is a plain value. Bodies are kept as raw bytes and header
//! values keep their multiplicity and order, so binary payloads and repeated
//! headers survive a record/replay cycle unchanged.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, HOST};
use hyper::{StatusCode, Uri, Version};
use serde::{Deserialize, Serialize};

use crate::{Result, RewindError};

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// PATCH
    Patch,
    /// Any other valid method token
    Extension(String),
}

impl Method {
    /// Method token as sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Extension(token) => token,
        }
    }

    fn standard(token: &str) -> Option<Self> {
        let method = match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "PATCH" => Self::Patch,
            _ => return None,
        };
        Some(method)
    }
}

impl FromStr for Method {
    type Err = RewindError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(method) = Self::standard(s) {
            return Ok(method);
        }

        // Reuse hyper's token validation for extension methods
        hyper::Method::from_bytes(s.as_bytes())
            .map_err(|_| RewindError::InvalidMessage(format!("Invalid HTTP method '{s}'")))?;
        Ok(Self::Extension(s.to_string()))
    }
}

impl TryFrom<String> for Method {
    type Error = RewindError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl From<&hyper::Method> for Method {
    fn from(method: &hyper::Method) -> Self {
        let token = method.as_str();
        Self::standard(token).unwrap_or_else(|| Self::Extension(token.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header multimap with case-insensitive names
///
/// Persisted as a flat list of `[name, value]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any values already present for `name`
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// All values for `name`, in insertion order
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// Check whether `name` is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace every value of each listed header with `placeholder`
    pub fn redact(&mut self, names: &[String], placeholder: &str) {
        for (name, values) in &mut self.entries {
            if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                for value in values.iter_mut() {
                    placeholder.clone_into(value);
                }
            }
        }
    }

    /// Iterate `(name, value)` pairs, repeated headers yielded once per value
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values.iter().map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct header names
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no headers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn from_http(map: &hyper::HeaderMap) -> Self {
        // HeaderMap::iter yields every value of a repeated name in order
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in self.iter() {
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                RewindError::InvalidMessage(format!("Invalid header name '{name}': {e}"))
            })?;
            HeaderValue::from_str(value).map_err(|e| {
                RewindError::InvalidMessage(format!("Invalid value for header '{name}': {e}"))
            })?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl From<Vec<(String, String)>> for Headers {
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Headers> for Vec<(String, String)> {
    fn from(headers: Headers) -> Self {
        headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

/// Message body, stored byte-exact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredBody", into = "StoredBody")]
pub struct Body(Bytes);

impl Body {
    /// Empty body
    #[must_use]
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Cheap clone of the underlying buffer
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// Body length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the body is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

/// On-disk body representation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBody {
    encoding: BodyEncoding,
    data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BodyEncoding {
    Utf8,
    Base64,
}

impl From<Body> for StoredBody {
    fn from(body: Body) -> Self {
        match std::str::from_utf8(&body.0) {
            Ok(text) if is_plain_text(text) => Self {
                encoding: BodyEncoding::Utf8,
                data: text.to_string(),
            },
            _ => Self {
                encoding: BodyEncoding::Base64,
                data: STANDARD.encode(&body.0),
            },
        }
    }
}

impl TryFrom<StoredBody> for Body {
    type Error = String;

    fn try_from(stored: StoredBody) -> std::result::Result<Self, String> {
        match stored.encoding {
            BodyEncoding::Utf8 => Ok(Self(Bytes::from(stored.data.into_bytes()))),
            BodyEncoding::Base64 => STANDARD
                .decode(stored.data.as_bytes())
                .map(|bytes| Self(Bytes::from(bytes)))
                .map_err(|e| format!("invalid base64 body: {e}")),
        }
    }
}

/// Text that survives a YAML scalar round trip unchanged
fn is_plain_text(text: &str) -> bool {
    // YAML parsers fold `\r` and the Unicode separators into `\n`
    text.chars().all(|c| match c {
        '\n' | '\t' => true,
        '\u{2028}' | '\u{2029}' | '\u{feff}' => false,
        c => !c.is_control(),
    })
}

/// Recorded HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Normalized absolute URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Body,
}

impl Request {
    /// Create a request with no headers and an empty body
    ///
    /// # Errors
    ///
    /// Returns error if `url` is not an absolute URL
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let uri = url
            .parse::<Uri>()
            .map_err(|e| RewindError::InvalidMessage(format!("Invalid URL '{url}': {e}")))?;

        Ok(Self {
            method,
            url: normalize_url(&uri, None)?,
            headers: Headers::new(),
            body: Body::empty(),
        })
    }

    /// Add a header value
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Capture an outgoing hyper request
    ///
    /// Origin-form URIs are resolved against the `Host` header.
    ///
    /// # Errors
    ///
    /// Returns error if no absolute URL can be determined
    pub fn from_http(request: &hyper::Request<Bytes>) -> Result<Self> {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok());

        Ok(Self {
            method: Method::from(request.method()),
            url: normalize_url(request.uri(), host)?,
            headers: Headers::from_http(request.headers()),
            body: Body::from(request.body().clone()),
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.headers.validate()
    }
}

/// Recorded HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Body,
    /// Protocol version of the live response; HTTP/1.1 when absent
    #[serde(default, skip_serializing_if = "Option::is_none", with = "http_version")]
    pub version: Option<Version>,
    /// Time the live exchange took; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Response {
    /// Create a response with no headers
    #[must_use]
    pub fn new(status: u16, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
            version: None,
            duration_ms: None,
        }
    }

    /// Add a header value
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Capture a live hyper response
    #[must_use]
    pub fn from_http(response: &hyper::Response<Bytes>) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: Headers::from_http(response.headers()),
            body: Body::from(response.body().clone()),
            version: Some(response.version()),
            duration_ms: None,
        }
    }

    /// Rebuild a hyper response carrying the recorded status, headers and body
    ///
    /// # Errors
    ///
    /// Returns error if the status or a header is not valid HTTP
    pub fn to_http(&self) -> Result<hyper::Response<Bytes>> {
        let mut builder = hyper::Response::builder()
            .status(self.status_code()?)
            .version(self.version.unwrap_or(Version::HTTP_11));
        for (name, value) in self.headers.iter() {
            builder = builder.header(name, value);
        }

        builder
            .body(self.body.to_bytes())
            .map_err(|e| RewindError::InvalidMessage(format!("Failed to build response: {e}")))
    }

    fn status_code(&self) -> Result<StatusCode> {
        StatusCode::from_u16(self.status).map_err(|_| {
            RewindError::InvalidMessage(format!("Invalid status code {}", self.status))
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.status_code()?;
        self.headers.validate()
    }
}

/// Serde adapter storing a protocol version as `HTTP/1.1`, `HTTP/2.0`, ...
mod http_version {
    use hyper::Version;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAMES: [(Version, &str); 5] = [
        (Version::HTTP_09, "HTTP/0.9"),
        (Version::HTTP_10, "HTTP/1.0"),
        (Version::HTTP_11, "HTTP/1.1"),
        (Version::HTTP_2, "HTTP/2.0"),
        (Version::HTTP_3, "HTTP/3.0"),
    ];

    pub(super) fn name(version: Version) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, name)| *name)
    }

    pub(super) fn serialize<S: Serializer>(
        version: &Option<Version>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match version.and_then(name) {
            Some(name) => serializer.serialize_some(name),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Version>, D::Error> {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(&text))
            .map(|(version, _)| Some(*version))
            .ok_or_else(|| D::Error::custom(format!("unknown HTTP version '{text}'")))
    }
}

/// One recorded request paired with its response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Position in the cassette, assigned when the interaction is appended
    pub order_index: u64,
    /// Captured request
    pub request: Request,
    /// Captured response
    pub response: Response,
}

/// Build the canonical form of an absolute URL
///
/// Scheme and host are lowercased, default ports dropped, the path is at least
/// `/` and the query string is kept verbatim.
fn normalize_url(uri: &Uri, host_header: Option<&str>) -> Result<String> {
    let scheme = uri.scheme_str().unwrap_or("http").to_ascii_lowercase();

    let (host, port) = match uri.authority() {
        Some(authority) => (authority.host().to_string(), authority.port_u16()),
        None => {
            let header = host_header.ok_or_else(|| {
                RewindError::InvalidMessage(format!("Request URI '{uri}' has no host"))
            })?;
            let authority = header.parse::<hyper::http::uri::Authority>().map_err(|e| {
                RewindError::InvalidMessage(format!("Invalid Host header '{header}': {e}"))
            })?;
            (authority.host().to_string(), authority.port_u16())
        }
    };

    let mut url = format!("{scheme}://{}", host.to_ascii_lowercase());

    let default_port = match scheme.as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if let Some(port) = port.filter(|p| Some(*p) != default_port) {
        url.push_str(&format!(":{port}"));
    }

    let path = uri.path();
    if path.is_empty() || !path.starts_with('/') {
        url.push('/');
    }
    url.push_str(path);

    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }

    Ok(url)
}
