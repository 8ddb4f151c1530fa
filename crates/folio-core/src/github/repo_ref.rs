//! Parsing of GitHub repository references.

use crate::error::{FolioError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("name regex must compile"));

/// An `(owner, repo)` pair on github.com.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let repo = repo.into();
        if !is_valid_name(&owner) || !is_valid_name(&repo) {
            return Err(FolioError::InvalidRepoUrl {
                url: format!("{}/{}", owner, repo),
            });
        }
        Ok(Self { owner, repo })
    }

    /// Parse a repository reference.
    ///
    /// Accepts `https://github.com/owner/repo` (with `http`, `www.`, a
    /// trailing `/`, a `.git` suffix or extra path segments such as
    /// `/tree/main`), `github.com/owner/repo`, the SSH form
    /// `git@github.com:owner/repo.git` and the bare `owner/repo` shorthand.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let invalid = || FolioError::InvalidRepoUrl {
            url: input.to_string(),
        };

        let path = if let Some(rest) = raw.strip_prefix("git@github.com:") {
            rest.to_string()
        } else if raw.contains("://") {
            let url = url::Url::parse(raw).map_err(|_| invalid())?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid());
            }
            let host = url.host_str().unwrap_or("").to_ascii_lowercase();
            if host != "github.com" && host != "www.github.com" {
                return Err(invalid());
            }
            url.path().to_string()
        } else if let Some(rest) = strip_host_prefix(raw) {
            rest.to_string()
        } else if raw.matches('/').count() == 1 {
            raw.to_string()
        } else {
            return Err(invalid());
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let repo = segments.next().ok_or_else(invalid)?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        Self::new(owner, repo).map_err(|_| invalid())
    }

    /// Cache key component, `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

fn strip_host_prefix(raw: &str) -> Option<&str> {
    let lower = raw.to_ascii_lowercase();
    ["www.github.com/", "github.com/"]
        .into_iter()
        .find(|prefix| lower.starts_with(prefix))
        .map(|prefix| &raw[prefix.len()..])
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && NAME_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> (String, String) {
        let r = RepoRef::parse(input).unwrap_or_else(|e| panic!("{input}: {e}"));
        (r.owner, r.repo)
    }

    #[test]
    fn test_accepted_forms() {
        let expected = ("acme".to_string(), "widget".to_string());
        for input in [
            "https://github.com/acme/widget",
            "http://github.com/acme/widget",
            "https://www.github.com/acme/widget",
            "https://github.com/acme/widget/",
            "https://github.com/acme/widget.git",
            "https://github.com/acme/widget/tree/main/src",
            "https://github.com/acme/widget?tab=readme",
            "  github.com/acme/widget  ",
            "git@github.com:acme/widget.git",
            "acme/widget",
        ] {
            assert_eq!(parsed(input), expected, "{input}");
        }
    }

    #[test]
    fn test_names_with_punctuation() {
        assert_eq!(
            parsed("https://github.com/lusan-sapkota/my_site.v2"),
            ("lusan-sapkota".to_string(), "my_site.v2".to_string())
        );
    }

    #[test]
    fn test_rejected_forms() {
        for input in [
            "",
            "https://gitlab.com/acme/widget",
            "https://github.com/acme",
            "https://github.com/",
            "ftp://github.com/acme/widget",
            "https://github.com/acme/wid get",
            "https://github.com/acme/..",
            "not a url",
            "a/b/c",
        ] {
            let err = RepoRef::parse(input).unwrap_err();
            assert!(
                matches!(err, FolioError::InvalidRepoUrl { .. }),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_display_and_urls() {
        let r = RepoRef::new("acme", "widget").unwrap();
        assert_eq!(r.to_string(), "acme/widget");
        assert_eq!(r.full_name(), "acme/widget");
        assert_eq!(r.html_url(), "https://github.com/acme/widget");
    }
}
