//! Contact form submissions, newsletter subscribers and per-page SEO metadata.

use super::{format_time, parse_time, Database};
use crate::error::Result;
use crate::models::{
    ContactForm, ContactSubmission, NewsletterSubscriber, SeoSettings, SeoUpdate, SubscribeForm,
    SubscribeOutcome,
};
use crate::validation::{normalize_email, validate_page_name};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<ContactSubmission> {
    let created_at: String = row.get(5)?;
    Ok(ContactSubmission {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        created_at: parse_time(&created_at),
    })
}

fn row_to_subscriber(row: &Row<'_>) -> rusqlite::Result<NewsletterSubscriber> {
    let created_at: String = row.get(5)?;
    Ok(NewsletterSubscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        interests: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_time(&created_at),
    })
}

/// Page whose SEO entry stands in for pages without their own.
const DEFAULT_SEO_PAGE: &str = "home";

const SEO_COLUMNS: &str = "page_name, title, meta_description, meta_keywords, og_image, updated_at";

fn row_to_seo(row: &Row<'_>) -> rusqlite::Result<SeoSettings> {
    let updated_at: String = row.get(5)?;
    Ok(SeoSettings {
        page_name: row.get(0)?,
        title: row.get(1)?,
        meta_description: row.get(2)?,
        meta_keywords: row.get(3)?,
        og_image: row.get(4)?,
        updated_at: parse_time(&updated_at),
    })
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Database {
    pub fn create_contact(&self, form: &ContactForm) -> Result<ContactSubmission> {
        form.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contact_submissions (name, email, subject, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                form.name.trim(),
                normalize_email(&form.email),
                trimmed(&form.subject),
                form.message.trim(),
                format_time(Utc::now()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Stored contact submission {}", id);
        Ok(conn.query_row(
            "SELECT id, name, email, subject, message, created_at
             FROM contact_submissions WHERE id = ?1",
            params![id],
            row_to_contact,
        )?)
    }

    /// Contact submissions, newest first.
    pub fn list_contacts(&self, limit: usize) -> Result<Vec<ContactSubmission>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, subject, message, created_at
             FROM contact_submissions ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_contact)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Subscribe an email, reactivating a previous subscription if present.
    pub fn subscribe(
        &self,
        form: &SubscribeForm,
    ) -> Result<(NewsletterSubscriber, SubscribeOutcome)> {
        form.validate()?;
        let email = normalize_email(&form.email);

        let (id, outcome) = self.transaction(|tx| {
            let existing: Option<(i64, bool)> = tx
                .query_row(
                    "SELECT id, is_active FROM newsletter_subscribers WHERE email = ?1",
                    params![email],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                Some((id, true)) => Ok((id, SubscribeOutcome::AlreadySubscribed)),
                Some((id, false)) => {
                    tx.execute(
                        "UPDATE newsletter_subscribers
                         SET is_active = 1,
                             name = COALESCE(?1, name),
                             interests = COALESCE(?2, interests)
                         WHERE id = ?3",
                        params![trimmed(&form.name), trimmed(&form.interests), id],
                    )?;
                    Ok((id, SubscribeOutcome::Reactivated))
                }
                None => {
                    tx.execute(
                        "INSERT INTO newsletter_subscribers (email, name, interests, is_active, created_at)
                         VALUES (?1, ?2, ?3, 1, ?4)",
                        params![
                            email,
                            trimmed(&form.name),
                            trimmed(&form.interests),
                            format_time(Utc::now())
                        ],
                    )?;
                    Ok((tx.last_insert_rowid(), SubscribeOutcome::Created))
                }
            }
        })?;

        let conn = self.lock()?;
        let subscriber = conn.query_row(
            "SELECT id, email, name, interests, is_active, created_at
             FROM newsletter_subscribers WHERE id = ?1",
            params![id],
            row_to_subscriber,
        )?;
        info!("Newsletter subscribe for {}: {:?}", subscriber.email, outcome);
        Ok((subscriber, outcome))
    }

    /// Deactivate a subscription. Returns whether an active one existed.
    pub fn unsubscribe(&self, email: &str) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE newsletter_subscribers SET is_active = 0 WHERE email = ?1 AND is_active = 1",
            params![normalize_email(email)],
        )?;
        Ok(updated > 0)
    }

    pub fn active_subscribers(&self) -> Result<Vec<NewsletterSubscriber>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, name, interests, is_active, created_at
             FROM newsletter_subscribers WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], row_to_subscriber)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_seo(&self, page: &str) -> Result<Option<SeoSettings>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM seo_settings WHERE page_name = ?1", SEO_COLUMNS),
                params![page],
                row_to_seo,
            )
            .optional()?)
    }

    /// SEO entry for `page`, or the homepage entry when the page has none.
    pub fn page_seo(&self, page: &str) -> Result<Option<SeoSettings>> {
        match self.get_seo(page)? {
            Some(seo) => Ok(Some(seo)),
            None if page != DEFAULT_SEO_PAGE => self.get_seo(DEFAULT_SEO_PAGE),
            None => Ok(None),
        }
    }

    pub fn list_seo(&self) -> Result<Vec<SeoSettings>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM seo_settings ORDER BY page_name",
            SEO_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_seo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Create or replace the SEO entry for `page`.
    pub fn upsert_seo(&self, page: &str, update: &SeoUpdate) -> Result<SeoSettings> {
        validate_page_name(page)?;
        update.validate()?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO seo_settings ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(page_name) DO UPDATE SET
                     title = excluded.title,
                     meta_description = excluded.meta_description,
                     meta_keywords = excluded.meta_keywords,
                     og_image = excluded.og_image,
                     updated_at = excluded.updated_at",
                SEO_COLUMNS
            ),
            params![
                page,
                update.title.trim(),
                trimmed(&update.meta_description),
                trimmed(&update.meta_keywords),
                trimmed(&update.og_image),
                format_time(Utc::now()),
            ],
        )?;
        info!("SEO settings saved for page '{}'", page);
        Ok(conn.query_row(
            &format!("SELECT {} FROM seo_settings WHERE page_name = ?1", SEO_COLUMNS),
            params![page],
            row_to_seo,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe_form(email: &str) -> SubscribeForm {
        SubscribeForm {
            email: email.into(),
            name: Some("Ada".into()),
            interests: None,
        }
    }

    #[test]
    fn test_subscribe_reactivate_cycle() {
        let db = Database::open_in_memory().unwrap();

        let (sub, outcome) = db.subscribe(&subscribe_form("Ada@Example.com")).unwrap();
        assert_eq!(outcome, SubscribeOutcome::Created);
        assert_eq!(sub.email, "ada@example.com");

        let (_, outcome) = db.subscribe(&subscribe_form("ada@example.com ")).unwrap();
        assert_eq!(outcome, SubscribeOutcome::AlreadySubscribed);

        assert!(db.unsubscribe("ADA@example.com").unwrap());
        assert!(!db.unsubscribe("ada@example.com").unwrap());
        assert!(db.active_subscribers().unwrap().is_empty());

        let (sub, outcome) = db.subscribe(&subscribe_form("ada@example.com")).unwrap();
        assert_eq!(outcome, SubscribeOutcome::Reactivated);
        assert!(sub.is_active);
        assert_eq!(db.active_subscribers().unwrap().len(), 1);
    }

    #[test]
    fn test_contact_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let form = ContactForm {
            name: " Ada ".into(),
            email: "ada@example.com".into(),
            subject: Some("   ".into()),
            message: "I would like to discuss a project.".into(),
        };
        let stored = db.create_contact(&form).unwrap();
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.subject, None);
        assert_eq!(db.list_contacts(10).unwrap(), vec![stored]);

        let invalid = ContactForm {
            message: "short".into(),
            ..form
        };
        assert!(db.create_contact(&invalid).is_err());
    }

    #[test]
    fn test_seo_upsert_and_fallback() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.page_seo("git").unwrap(), None);

        let home = SeoUpdate {
            title: "Folio | Portfolio".into(),
            meta_description: Some("Projects and writing".into()),
            ..Default::default()
        };
        db.upsert_seo("home", &home).unwrap();
        assert_eq!(db.page_seo("git").unwrap().unwrap().page_name, "home");

        let git = SeoUpdate {
            title: "Open source".into(),
            meta_keywords: Some("  ".into()),
            ..Default::default()
        };
        let stored = db.upsert_seo("git", &git).unwrap();
        assert_eq!(stored.meta_keywords, None);
        assert_eq!(db.page_seo("git").unwrap().unwrap().title, "Open source");

        let renamed = SeoUpdate {
            title: "Open source projects".into(),
            ..git
        };
        db.upsert_seo("git", &renamed).unwrap();
        let all = db.list_seo().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Open source projects");

        assert!(db.upsert_seo("Bad Page", &renamed).is_err());
        assert!(db.upsert_seo("wiki", &SeoUpdate::default()).is_err());
    }
}
