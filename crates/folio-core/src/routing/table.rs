//! The subdomain dispatch table.
//!
//! Each row names a subdomain, a method, a path pattern and the handler that
//! serves it. Rows are evaluated top to bottom; the first match wins.

use serde::Serialize;

/// A subdomain served by the pre-router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdomain {
    Wiki,
    Git,
    Donation,
    Store,
}

impl Subdomain {
    pub const ALL: [Subdomain; 4] = [
        Subdomain::Wiki,
        Subdomain::Git,
        Subdomain::Donation,
        Subdomain::Store,
    ];

    /// Leading host label, and path prefix in path-prefix mode.
    pub fn label(&self) -> &'static str {
        match self {
            Subdomain::Wiki => "wiki",
            Subdomain::Git => "git",
            Subdomain::Donation => "donation",
            Subdomain::Store => "store",
        }
    }
}

impl std::fmt::Display for Subdomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Request method filter for a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    /// Map an HTTP method name; `HEAD` is served by `GET` rows.
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "GET" | "HEAD" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            _ => None,
        }
    }
}

/// Path shape of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// The whole path equals this literal.
    Exact(&'static str),
    /// The literal prefix followed by exactly one all-digit segment.
    IntSegment { prefix: &'static str },
}

impl PathPattern {
    /// Match a normalised path. `Some(None)` is a literal hit, `Some(Some(id))`
    /// a parameterised one.
    pub fn matches(&self, path: &str) -> Option<Option<i64>> {
        match self {
            PathPattern::Exact(literal) => (path == *literal).then_some(None),
            PathPattern::IntSegment { prefix } => {
                let segment = path.strip_prefix(prefix)?;
                parse_id_segment(segment).map(Some)
            }
        }
    }
}

/// Parse a numeric path segment. Only ASCII digits are accepted, so signs,
/// whitespace, empty strings and nested segments are all misses.
pub fn parse_id_segment(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse::<i64>().ok()
}

/// Handlers reachable through the pre-router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandlerId {
    WikiIndex,
    WikiSearch,
    WikiArticle,
    WikiCategory,
    GitIndex,
    GitSearch,
    GitProject,
    GitCategory,
    DonationIndex,
    DonationProject,
    DonationDonateForm,
    DonationDonate,
    DonationSuccess,
    DonationHighlights,
    DonationThanksgiving,
    DonationWhyDonate,
    DonationSubscribe,
    DonationApiProjects,
    DonationApiProject,
    DonationApiDonations,
    DonationApiDonate,
    StoreIndex,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    pub subdomain: Subdomain,
    pub verb: Verb,
    pub pattern: PathPattern,
    pub handler: HandlerId,
}

const fn get(subdomain: Subdomain, pattern: PathPattern, handler: HandlerId) -> RouteEntry {
    RouteEntry {
        subdomain,
        verb: Verb::Get,
        pattern,
        handler,
    }
}

const fn post(subdomain: Subdomain, pattern: PathPattern, handler: HandlerId) -> RouteEntry {
    RouteEntry {
        subdomain,
        verb: Verb::Post,
        pattern,
        handler,
    }
}

use HandlerId as H;
use PathPattern::{Exact, IntSegment};
use Subdomain::{Donation, Git, Store, Wiki};

pub static ROUTE_TABLE: &[RouteEntry] = &[
    get(Wiki, Exact("/"), H::WikiIndex),
    get(Wiki, Exact("/search"), H::WikiSearch),
    get(Wiki, IntSegment { prefix: "/article/" }, H::WikiArticle),
    get(Wiki, IntSegment { prefix: "/category/" }, H::WikiCategory),
    get(Git, Exact("/"), H::GitIndex),
    get(Git, Exact("/search"), H::GitSearch),
    get(Git, IntSegment { prefix: "/project/" }, H::GitProject),
    get(Git, IntSegment { prefix: "/category/" }, H::GitCategory),
    get(Donation, Exact("/"), H::DonationIndex),
    get(Donation, IntSegment { prefix: "/project/" }, H::DonationProject),
    get(Donation, IntSegment { prefix: "/donate/" }, H::DonationDonateForm),
    post(Donation, IntSegment { prefix: "/donate/" }, H::DonationDonate),
    get(Donation, IntSegment { prefix: "/success/" }, H::DonationSuccess),
    get(Donation, Exact("/highlights"), H::DonationHighlights),
    get(Donation, Exact("/thanksgiving"), H::DonationThanksgiving),
    get(Donation, IntSegment { prefix: "/why-donate/" }, H::DonationWhyDonate),
    post(Donation, Exact("/subscribe"), H::DonationSubscribe),
    get(Donation, Exact("/api/projects"), H::DonationApiProjects),
    get(Donation, IntSegment { prefix: "/api/project/" }, H::DonationApiProject),
    get(Donation, IntSegment { prefix: "/api/donations/" }, H::DonationApiDonations),
    post(Donation, Exact("/api/donate"), H::DonationApiDonate),
    get(Store, Exact("/"), H::StoreIndex),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_segment() {
        assert_eq!(parse_id_segment("7"), Some(7));
        assert_eq!(parse_id_segment("0042"), Some(42));
        assert_eq!(parse_id_segment("abc"), None);
        assert_eq!(parse_id_segment("-1"), None);
        assert_eq!(parse_id_segment("+1"), None);
        assert_eq!(parse_id_segment("7x"), None);
        assert_eq!(parse_id_segment(""), None);
        assert_eq!(parse_id_segment("7/edit"), None);
        assert_eq!(parse_id_segment("99999999999999999999"), None);
    }

    #[test]
    fn test_pattern_matches() {
        let detail = IntSegment { prefix: "/project/" };
        assert_eq!(detail.matches("/project/7"), Some(Some(7)));
        assert_eq!(detail.matches("/project/"), None);
        assert_eq!(detail.matches("/projects/7"), None);
        assert_eq!(Exact("/search").matches("/search"), Some(None));
        assert_eq!(Exact("/search").matches("/search/x"), None);
    }

    #[test]
    fn test_every_subdomain_has_a_root_row() {
        for subdomain in Subdomain::ALL {
            assert!(
                ROUTE_TABLE.iter().any(|r| r.subdomain == subdomain
                    && r.verb == Verb::Get
                    && r.pattern == Exact("/")),
                "{subdomain} has no index route"
            );
        }
    }

    #[test]
    fn test_verb_from_method() {
        assert_eq!(Verb::from_method("HEAD"), Some(Verb::Get));
        assert_eq!(Verb::from_method("POST"), Some(Verb::Post));
        assert_eq!(Verb::from_method("DELETE"), None);
    }
}
