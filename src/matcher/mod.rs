//! Request matching against recorded interactions

mod cursor;
mod policy;

pub use cursor::MatchCursor;
pub use policy::{BodyMatch, HeaderMatch, MatchPolicy, OrderMode, UrlMatch};

use tracing::trace;

use crate::fingerprint::short_fingerprint;
use crate::interaction::{Interaction, Request};
use crate::RewindError;

/// Decides which recorded interaction answers an incoming request
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    policy: MatchPolicy,
    redacted: Vec<String>,
}

impl Matcher {
    /// Create a matcher for `policy`
    #[must_use]
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            redacted: Vec::new(),
        }
    }

    /// Skip header comparison for names whose recorded values are redacted
    #[must_use]
    pub fn with_redacted(mut self, names: &[String]) -> Self {
        self.redacted = names.to_vec();
        self
    }

    /// Active policy
    #[must_use]
    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Check whether `incoming` satisfies the policy against `recorded`
    #[must_use]
    pub fn matches(&self, recorded: &Request, incoming: &Request) -> bool {
        recorded.method == incoming.method
            && self.url_matches(&recorded.url, &incoming.url)
            && self.headers_match(recorded, incoming)
            && self.body_matches(recorded, incoming)
    }

    /// Select and consume the interaction that answers `incoming`
    ///
    /// Returns the position of the selected interaction, or `None` when no
    /// interaction is eligible. Sequential order only ever considers the next
    /// unconsumed interaction; any-order takes the earliest unconsumed match.
    pub fn select(
        &self,
        interactions: &[Interaction],
        cursor: &mut MatchCursor,
        incoming: &Request,
    ) -> Option<usize> {
        let selected = match self.policy.order {
            OrderMode::Sequential => cursor
                .next_unconsumed()
                .filter(|&i| self.matches(&interactions[i].request, incoming)),
            OrderMode::AnyOrder => cursor
                .unconsumed()
                .find(|&i| self.matches(&interactions[i].request, incoming)),
        };

        if let Some(index) = selected {
            cursor.consume(index);
        }

        trace!(
            "Selection for {} {}: {:?}",
            incoming.method,
            incoming.url,
            selected
        );

        selected
    }

    fn url_matches(&self, recorded: &str, incoming: &str) -> bool {
        match self.policy.url {
            UrlMatch::Exact => recorded == incoming,
            UrlMatch::IgnoreQuery => split_url(recorded).0 == split_url(incoming).0,
            UrlMatch::UnorderedQuery => {
                let (recorded_base, recorded_query) = split_url(recorded);
                let (incoming_base, incoming_query) = split_url(incoming);
                if recorded_base != incoming_base {
                    return false;
                }

                let mut recorded_pairs = recorded_query.map(query_pairs).unwrap_or_default();
                let mut incoming_pairs = incoming_query.map(query_pairs).unwrap_or_default();
                recorded_pairs.sort();
                incoming_pairs.sort();
                recorded_pairs == incoming_pairs
            }
        }
    }

    fn headers_match(&self, recorded: &Request, incoming: &Request) -> bool {
        match &self.policy.headers {
            HeaderMatch::Ignore => true,
            HeaderMatch::Subset(names) => names
                .iter()
                .filter(|name| !self.redacted.iter().any(|r| r.eq_ignore_ascii_case(name)))
                .all(|name| recorded.headers.get(name) == incoming.headers.get(name)),
        }
    }

    fn body_matches(&self, recorded: &Request, incoming: &Request) -> bool {
        match self.policy.body {
            BodyMatch::Exact => recorded.body == incoming.body,
            BodyMatch::Ignore => true,
        }
    }
}

/// Build the error returned when nothing answers `request`
#[must_use]
pub fn no_match(request: &Request) -> RewindError {
    RewindError::NoMatchingInteraction {
        method: request.method.to_string(),
        url: request.url.clone(),
        fingerprint: short_fingerprint(request),
    }
}

/// Split a URL into the part before `?` and the query string
#[must_use]
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    }
}

/// Decode a query string into key/value pairs, in order of appearance
#[must_use]
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
