//! Subdomain pre-routing.
//!
//! The site serves four sections (wiki, git, donation, store) either on their
//! own subdomains or under path prefixes. Rather than relying on the HTTP
//! framework's host routing, requests are matched against a declarative table
//! before normal path routing runs:
//!
//! - [`ROUTE_TABLE`]: ordered `(subdomain, verb, pattern, handler)` rows
//! - [`SubdomainRouter::resolve`]: one pass over the table, no side effects
//!
//! A miss (unknown host, unknown path, non-numeric id) is not an error; the
//! request simply continues to the default routes.

mod router;
mod table;

pub use router::{
    subdomain_from_host, subdomain_from_path, RouteMatch, RoutingMode, SubdomainRouter,
};
pub use table::{
    parse_id_segment, HandlerId, PathPattern, RouteEntry, Subdomain, Verb, ROUTE_TABLE,
};
