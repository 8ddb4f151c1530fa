//! Table interpreter that resolves a request to a subdomain handler.

use super::table::{HandlerId, RouteEntry, Subdomain, Verb, ROUTE_TABLE};
use serde::Serialize;
use tracing::debug;

/// How the subdomain is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Leading `Host` label (`wiki.example.com`).
    Host,
    /// Leading path segment (`/wiki/...`), used when no server name is set.
    PathPrefix,
}

/// A resolved subdomain route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub subdomain: Subdomain,
    pub handler: HandlerId,
    /// Numeric identifier embedded in the path, if the pattern has one.
    pub id: Option<i64>,
}

/// Pre-router that runs ahead of normal path routing.
#[derive(Debug, Clone)]
pub struct SubdomainRouter {
    mode: RoutingMode,
    table: &'static [RouteEntry],
}

impl SubdomainRouter {
    pub fn new(mode: RoutingMode) -> Self {
        Self {
            mode,
            table: ROUTE_TABLE,
        }
    }

    /// Router over a custom table.
    pub fn with_table(mode: RoutingMode, table: &'static [RouteEntry]) -> Self {
        Self { mode, table }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Resolve a request. `None` means "not a subdomain route": the caller
    /// continues with its default routing.
    pub fn resolve(&self, method: &str, host: &str, path: &str) -> Option<RouteMatch> {
        let verb = Verb::from_method(method)?;
        let (subdomain, inner_path) = match self.mode {
            RoutingMode::Host => (subdomain_from_host(host)?, path),
            RoutingMode::PathPrefix => subdomain_from_path(path)?,
        };
        let inner_path = normalize_path(inner_path);

        let found = self
            .table
            .iter()
            .filter(|row| row.subdomain == subdomain && row.verb == verb)
            .find_map(|row| {
                row.pattern.matches(inner_path).map(|id| RouteMatch {
                    subdomain,
                    handler: row.handler,
                    id,
                })
            });

        if found.is_none() {
            debug!(
                "No {} route for {} {}; falling through",
                subdomain, method, inner_path
            );
        }
        found
    }
}

/// Recognise a subdomain from the leading label of a `Host` header value.
pub fn subdomain_from_host(host: &str) -> Option<Subdomain> {
    let host = strip_port(host.trim()).to_ascii_lowercase();
    Subdomain::ALL.into_iter().find(|s| {
        host.strip_prefix(s.label())
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|rest| !rest.is_empty())
            .unwrap_or(false)
    })
}

/// Recognise a subdomain from a `/label` or `/label/...` path and return the
/// remaining path.
pub fn subdomain_from_path(path: &str) -> Option<(Subdomain, &str)> {
    let rest = path.strip_prefix('/')?;
    Subdomain::ALL.into_iter().find_map(|s| {
        let tail = rest.strip_prefix(s.label())?;
        if tail.is_empty() {
            Some((s, "/"))
        } else if tail.starts_with('/') {
            Some((s, tail))
        } else {
            None
        }
    })
}

fn strip_port(host: &str) -> &str {
    // IPv6 literals never carry a subdomain, leave them alone.
    if host.starts_with('[') {
        return host;
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Drop the query string and one trailing slash (except on the root).
fn normalize_path(path: &str) -> &str {
    let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
    if path.is_empty() {
        return "/";
    }
    if path.len() > 1 {
        if let Some(trimmed) = path.strip_suffix('/') {
            return trimmed;
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::PathPattern;

    fn host_router() -> SubdomainRouter {
        SubdomainRouter::new(RoutingMode::Host)
    }

    #[test]
    fn test_git_project_detail_by_host() {
        let m = host_router()
            .resolve("GET", "git.example.com", "/project/7")
            .unwrap();
        assert_eq!(m.subdomain, Subdomain::Git);
        assert_eq!(m.handler, HandlerId::GitProject);
        assert_eq!(m.id, Some(7));
    }

    #[test]
    fn test_non_numeric_segment_falls_through() {
        let router = host_router();
        assert_eq!(router.resolve("GET", "git.example.com", "/project/abc"), None);
        assert_eq!(router.resolve("GET", "git.example.com", "/project/-3"), None);
        assert_eq!(router.resolve("GET", "git.example.com", "/project/"), None);
        assert_eq!(router.resolve("GET", "git.example.com", "/project/1/2"), None);
    }

    #[test]
    fn test_documented_table_by_host() {
        let router = host_router();
        let cases = [
            ("GET", "wiki.example.com", "/", HandlerId::WikiIndex, None),
            ("GET", "wiki.example.com", "/search", HandlerId::WikiSearch, None),
            ("GET", "wiki.example.com", "/article/42", HandlerId::WikiArticle, Some(42)),
            ("GET", "wiki.example.com", "/category/3", HandlerId::WikiCategory, Some(3)),
            ("GET", "git.example.com", "/", HandlerId::GitIndex, None),
            ("GET", "git.example.com", "/search", HandlerId::GitSearch, None),
            ("GET", "git.example.com", "/category/2", HandlerId::GitCategory, Some(2)),
            ("GET", "donation.example.com", "/", HandlerId::DonationIndex, None),
            ("GET", "donation.example.com", "/project/5", HandlerId::DonationProject, Some(5)),
            ("GET", "donation.example.com", "/donate/5", HandlerId::DonationDonateForm, Some(5)),
            ("POST", "donation.example.com", "/donate/5", HandlerId::DonationDonate, Some(5)),
            ("GET", "donation.example.com", "/success/9", HandlerId::DonationSuccess, Some(9)),
            ("POST", "donation.example.com", "/subscribe", HandlerId::DonationSubscribe, None),
            ("GET", "donation.example.com", "/api/projects", HandlerId::DonationApiProjects, None),
            ("GET", "donation.example.com", "/api/project/1", HandlerId::DonationApiProject, Some(1)),
            ("GET", "donation.example.com", "/api/donations/1", HandlerId::DonationApiDonations, Some(1)),
            ("POST", "donation.example.com", "/api/donate", HandlerId::DonationApiDonate, None),
            ("GET", "donation.example.com", "/highlights", HandlerId::DonationHighlights, None),
            ("GET", "donation.example.com", "/thanksgiving", HandlerId::DonationThanksgiving, None),
            ("GET", "donation.example.com", "/why-donate/3", HandlerId::DonationWhyDonate, Some(3)),
            ("GET", "store.example.com", "/", HandlerId::StoreIndex, None),
        ];
        for (method, host, path, handler, id) in cases {
            let m = router
                .resolve(method, host, path)
                .unwrap_or_else(|| panic!("{method} {host}{path} should resolve"));
            assert_eq!(m.handler, handler, "{method} {host}{path}");
            assert_eq!(m.id, id, "{method} {host}{path}");
        }
    }

    #[test]
    fn test_misses_fall_through() {
        let router = host_router();
        // Unknown host label
        assert_eq!(router.resolve("GET", "blog.example.com", "/"), None);
        // Main site
        assert_eq!(router.resolve("GET", "example.com", "/"), None);
        assert_eq!(router.resolve("GET", "www.example.com", "/project/7"), None);
        // Label must be the whole leading label
        assert_eq!(router.resolve("GET", "wikipedia.example.com", "/"), None);
        assert_eq!(router.resolve("GET", "wiki", "/"), None);
        // Unknown path on a known subdomain
        assert_eq!(router.resolve("GET", "wiki.example.com", "/admin"), None);
        // Wrong method
        assert_eq!(router.resolve("GET", "donation.example.com", "/api/donate"), None);
        assert_eq!(router.resolve("POST", "donation.example.com", "/highlights"), None);
        assert_eq!(router.resolve("DELETE", "git.example.com", "/"), None);
    }

    #[test]
    fn test_host_normalisation() {
        let router = host_router();
        let m = router.resolve("GET", "Git.Example.com:8080", "/project/7/").unwrap();
        assert_eq!(m.handler, HandlerId::GitProject);
        assert_eq!(m.id, Some(7));
        assert!(router.resolve("HEAD", "git.localhost:5000", "/").is_some());
        assert!(router.resolve("GET", "git.example.com", "/search?q=rust").is_some());
    }

    #[test]
    fn test_path_prefix_mode() {
        let router = SubdomainRouter::new(RoutingMode::PathPrefix);
        let m = router.resolve("GET", "localhost:5000", "/git/project/7").unwrap();
        assert_eq!(m.handler, HandlerId::GitProject);
        assert_eq!(m.id, Some(7));

        assert_eq!(
            router.resolve("GET", "localhost", "/wiki").unwrap().handler,
            HandlerId::WikiIndex
        );
        assert_eq!(
            router.resolve("GET", "localhost", "/store/").unwrap().handler,
            HandlerId::StoreIndex
        );
        assert_eq!(router.resolve("GET", "localhost", "/git/project/abc"), None);
        assert_eq!(router.resolve("GET", "localhost", "/gitlab"), None);
        assert_eq!(router.resolve("GET", "localhost", "/api/projects"), None);
        // Host labels are ignored in path-prefix mode
        assert_eq!(router.resolve("GET", "git.example.com", "/project/7"), None);
    }

    #[test]
    fn test_subdomain_from_path() {
        assert_eq!(subdomain_from_path("/donation/api/projects"), Some((Subdomain::Donation, "/api/projects")));
        assert_eq!(subdomain_from_path("/"), None);
        assert_eq!(subdomain_from_path("wiki"), None);
    }

    #[test]
    fn test_first_matching_row_wins() {
        static TABLE: &[RouteEntry] = &[
            RouteEntry {
                subdomain: Subdomain::Git,
                verb: Verb::Get,
                pattern: PathPattern::Exact("/"),
                handler: HandlerId::GitIndex,
            },
            RouteEntry {
                subdomain: Subdomain::Git,
                verb: Verb::Get,
                pattern: PathPattern::Exact("/"),
                handler: HandlerId::GitSearch,
            },
        ];
        let router = SubdomainRouter::with_table(RoutingMode::Host, TABLE);
        assert_eq!(
            router.resolve("GET", "git.example.com", "/").unwrap().handler,
            HandlerId::GitIndex
        );
    }
}
