//! Sitemap and robots.txt generation.

use crate::models::{Project, WikiArticle};
use crate::routing::Subdomain;
use chrono::{DateTime, Utc};

/// Where the site lives, used to build absolute URLs.
#[derive(Debug, Clone)]
pub struct SiteUrls {
    /// Main site root without trailing slash, e.g. `https://example.com`.
    pub base: String,
    /// Set when subdomains are served by host (`wiki.example.com`).
    pub server_name: Option<String>,
}

impl SiteUrls {
    pub fn new(base: &str, server_name: Option<&str>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            server_name: server_name.map(str::to_string),
        }
    }

    /// Absolute URL of a path on the main site.
    pub fn main(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Absolute URL of a path on a subdomain.
    pub fn subdomain(&self, subdomain: Subdomain, path: &str) -> String {
        match &self.server_name {
            Some(server) => {
                let scheme = if self.base.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                format!("{}://{}.{}{}", scheme, subdomain.label(), server, path)
            }
            None => {
                let path = if path == "/" { "" } else { path };
                format!("{}/{}{}", self.base, subdomain.label(), path)
            }
        }
    }

    /// One-click unsubscribe link for a newsletter email.
    pub fn unsubscribe_url(&self, email: &str, token: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("email", email)
            .append_pair("token", token)
            .finish();
        self.main(&format!("/newsletter/unsubscribe?{}", query))
    }
}

struct UrlEntry {
    loc: String,
    lastmod: Option<DateTime<Utc>>,
    changefreq: &'static str,
    priority: &'static str,
}

/// XML sitemap for main pages, subdomain roots, projects and wiki articles.
pub fn sitemap(urls: &SiteUrls, projects: &[Project], articles: &[WikiArticle]) -> String {
    let mut entries = vec![
        UrlEntry {
            loc: urls.main("/"),
            lastmod: None,
            changefreq: "weekly",
            priority: "1.0",
        },
    ];

    for subdomain in Subdomain::ALL {
        if subdomain == Subdomain::Store {
            continue;
        }
        entries.push(UrlEntry {
            loc: urls.subdomain(subdomain, "/"),
            lastmod: None,
            changefreq: "weekly",
            priority: "0.8",
        });
    }

    entries.extend(projects.iter().map(|p| UrlEntry {
        loc: urls.subdomain(Subdomain::Git, &format!("/project/{}", p.id)),
        lastmod: Some(p.updated_at),
        changefreq: "monthly",
        priority: if p.is_featured { "0.7" } else { "0.6" },
    }));

    entries.extend(articles.iter().map(|a| UrlEntry {
        loc: urls.subdomain(Subdomain::Wiki, &format!("/article/{}", a.id)),
        lastmod: Some(a.updated_at),
        changefreq: "monthly",
        priority: "0.5",
    }));

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.format("%Y-%m-%d")
            ));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", entry.changefreq));
        xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(urls: &SiteUrls) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}\n",
        urls.main("/sitemap.xml")
    )
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_urls() {
        let hosted = SiteUrls::new("https://example.com/", Some("example.com"));
        assert_eq!(
            hosted.subdomain(Subdomain::Git, "/project/7"),
            "https://git.example.com/project/7"
        );

        let prefixed = SiteUrls::new("http://localhost:5000", None);
        assert_eq!(prefixed.subdomain(Subdomain::Wiki, "/"), "http://localhost:5000/wiki");
        assert_eq!(
            prefixed.subdomain(Subdomain::Git, "/project/7"),
            "http://localhost:5000/git/project/7"
        );
    }

    #[test]
    fn test_sitemap_lists_roots_and_escapes() {
        let urls = SiteUrls::new("https://example.com?a=1&b=2", None);
        let xml = sitemap(&urls, &[], &[]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("&amp;b=2"));
        assert_eq!(xml.matches("<url>").count(), 4);
        assert!(!xml.contains("/store"));
    }

    #[test]
    fn test_unsubscribe_url_is_encoded() {
        let urls = SiteUrls::new("https://example.com", None);
        assert_eq!(
            urls.unsubscribe_url("a+b@example.com", "abc"),
            "https://example.com/newsletter/unsubscribe?email=a%2Bb%40example.com&token=abc"
        );
    }

    #[test]
    fn test_robots_points_at_sitemap() {
        let urls = SiteUrls::new("https://example.com", None);
        assert!(robots_txt(&urls).contains("Sitemap: https://example.com/sitemap.xml"));
    }
}
