//! Portfolio projects and their categories.

use crate::error::{FolioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Completed,
    InProgress,
    Maintenance,
    Planned,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Completed => "completed",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Maintenance => "maintenance",
            ProjectStatus::Planned => "planned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Some(ProjectStatus::Completed),
            "in-progress" | "in_progress" => Some(ProjectStatus::InProgress),
            "maintenance" => Some(ProjectStatus::Maintenance),
            "planned" => Some(ProjectStatus::Planned),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A portfolio/code project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub commercial_url: Option<String>,
    /// Comma-delimited technology names.
    pub technologies: String,
    pub category_id: Option<i64>,
    pub stars: i64,
    pub forks: i64,
    /// When the GitHub metrics were last refreshed; `None` if never.
    pub last_synced: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub is_opensource: bool,
    pub show_on_homepage: bool,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Technologies as a trimmed list, empty entries dropped.
    pub fn technology_list(&self) -> Vec<String> {
        split_list(&self.technologies)
    }

    /// Whether the project points at an external repository at all.
    pub fn has_repo_url(&self) -> bool {
        self.github_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A named project grouping with display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub commercial_url: Option<String>,
    pub technologies: String,
    pub category_id: Option<i64>,
    pub stars: i64,
    pub forks: i64,
    pub is_featured: bool,
    pub is_opensource: bool,
    pub show_on_homepage: bool,
    pub status: ProjectStatus,
}

impl NewProject {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if self.stars < 0 || self.forks < 0 {
            return Err(FolioError::validation(
                "stars",
                "star and fork counts cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Partial update of a project; `None` leaves the field unchanged.
///
/// Nullable columns use `Option<Option<_>>` so a client can clear them with an
/// explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub github_url: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub live_url: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub commercial_url: Option<Option<String>>,
    pub technologies: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    pub is_featured: Option<bool>,
    pub is_opensource: Option<bool>,
    pub show_on_homepage: Option<bool>,
    pub status: Option<ProjectStatus>,
}

impl ProjectUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }

    /// Apply the update to a loaded project.
    pub fn apply(self, project: &mut Project) {
        if let Some(v) = self.title {
            project.title = v.trim().to_string();
        }
        if let Some(v) = self.description {
            project.description = v;
        }
        if let Some(v) = self.image_url {
            project.image_url = v;
        }
        if let Some(v) = self.github_url {
            project.github_url = v;
        }
        if let Some(v) = self.live_url {
            project.live_url = v;
        }
        if let Some(v) = self.commercial_url {
            project.commercial_url = v;
        }
        if let Some(v) = self.technologies {
            project.technologies = v;
        }
        if let Some(v) = self.category_id {
            project.category_id = v;
        }
        if let Some(v) = self.is_featured {
            project.is_featured = v;
        }
        if let Some(v) = self.is_opensource {
            project.is_opensource = v;
        }
        if let Some(v) = self.show_on_homepage {
            project.show_on_homepage = v;
        }
        if let Some(v) = self.status {
            project.status = v;
        }
    }
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FolioError::validation("name", "category name is required"));
        }
        if name.chars().count() > 100 {
            return Err(FolioError::validation("name", "category name is too long"));
        }
        if let Some(color) = &self.color {
            let hex = color.strip_prefix('#').unwrap_or("");
            if !(hex.len() == 6 || hex.len() == 3) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(FolioError::validation("color", "color must be a hex value like #f39c12"));
            }
        }
        Ok(())
    }
}

/// Filters for project listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectFilter {
    pub category: Option<i64>,
    pub featured: Option<bool>,
    #[serde(rename = "q")]
    pub query: Option<String>,
}

fn validate_title(title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(FolioError::validation("title", "title is required"));
    }
    if title.chars().count() > 100 {
        return Err(FolioError::validation("title", "title must be at most 100 characters"));
    }
    Ok(())
}

/// Split a comma-delimited column into trimmed, non-empty parts.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// Distinguishes a missing field (outer None) from an explicit null (Some(None)).
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(ProjectStatus::parse("in-progress"), Some(ProjectStatus::InProgress));
        assert_eq!(ProjectStatus::parse("Completed"), Some(ProjectStatus::Completed));
        assert_eq!(ProjectStatus::parse("abandoned"), None);
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("Python, Flask ,, Redis,"),
            vec!["Python", "Flask", "Redis"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_update_distinguishes_null_from_missing() {
        let update: ProjectUpdate =
            serde_json::from_str(r#"{"github_url": null, "is_featured": true}"#).unwrap();
        assert_eq!(update.github_url, Some(None));
        assert_eq!(update.live_url, None);
        assert_eq!(update.is_featured, Some(true));
    }

    #[test]
    fn test_new_project_validation() {
        let mut project = NewProject {
            title: "  ".into(),
            ..Default::default()
        };
        assert!(project.validate().is_err());
        project.title = "Widget".into();
        assert!(project.validate().is_ok());
        project.stars = -1;
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_category_color_validation() {
        let mut category = NewCategory {
            name: "Web".into(),
            color: Some("#f39c12".into()),
            ..Default::default()
        };
        assert!(category.validate().is_ok());
        category.color = Some("orange".into());
        assert!(category.validate().is_err());
    }
}
