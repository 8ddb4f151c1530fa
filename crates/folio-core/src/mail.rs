//! Outbound notification mail.
//!
//! Delivery is behind the [`Mailer`] trait. [`LogMailer`] writes messages to
//! the log instead of sending them, which is what development and tests use.

use crate::error::Result;
use crate::models::{ContactSubmission, Donation, NewsletterSubscriber};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Mailer that only logs.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        info!(
            to = %email.to,
            from = %email.from,
            subject = %email.subject,
            "Mail (not delivered): {} bytes",
            email.body.len()
        );
        Ok(())
    }
}

/// Send and swallow failures; mail never fails the request that caused it.
pub async fn send_quietly(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        warn!("Failed to send mail to {}: {}", to, e);
    }
}

pub fn contact_notification(sender: &str, admin: &str, contact: &ContactSubmission) -> Email {
    let subject = contact
        .subject
        .as_deref()
        .map(|s| format!("New contact message: {}", s))
        .unwrap_or_else(|| format!("New contact message from {}", contact.name));
    Email {
        from: sender.to_string(),
        to: admin.to_string(),
        subject,
        body: format!(
            "From: {} <{}>\nReceived: {}\n\n{}",
            contact.name,
            contact.email,
            contact.created_at.format("%Y-%m-%d %H:%M UTC"),
            contact.message
        ),
        reply_to: Some(contact.email.clone()),
    }
}

pub fn newsletter_welcome(
    sender: &str,
    subscriber: &NewsletterSubscriber,
    unsubscribe_url: &str,
) -> Email {
    let greeting = subscriber.name.as_deref().unwrap_or("there");
    Email {
        from: sender.to_string(),
        to: subscriber.email.clone(),
        subject: "Welcome to the newsletter".to_string(),
        body: format!(
            "Hi {},\n\nThanks for subscribing. You will hear about new projects and articles.\n\n\
             To unsubscribe at any time: {}\n",
            greeting, unsubscribe_url
        ),
        reply_to: None,
    }
}

pub fn donation_thanks(sender: &str, donation: &Donation, project_title: &str) -> Email {
    Email {
        from: sender.to_string(),
        to: donation.donor_email.clone(),
        subject: format!("Thank you for supporting {}", project_title),
        body: format!(
            "Hi {},\n\nThank you for your donation of {:.2} {} to {}.\n\
             Your reference is {}. It will show as completed once the payment is confirmed.\n",
            donation.donor_name,
            donation.amount,
            donation.currency.as_str(),
            project_title,
            donation.reference
        ),
        reply_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<Email>>);

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, email: Email) -> Result<()> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Mailer for Broken {
        async fn send(&self, _email: Email) -> Result<()> {
            Err(crate::FolioError::Other("smtp down".into()))
        }
    }

    fn contact() -> ContactSubmission {
        ContactSubmission {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            subject: Some("Hiring".into()),
            message: "Are you available next month?".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_contact_notification_goes_to_admin() {
        let outbox = Outbox::default();
        let email = contact_notification("noreply@example.com", "me@example.com", &contact());
        send_quietly(&outbox, email).await;

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "me@example.com");
        assert_eq!(sent[0].subject, "New contact message: Hiring");
        assert_eq!(sent[0].reply_to.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_send_failures_are_swallowed() {
        let email = contact_notification("a@example.com", "b@example.com", &contact());
        send_quietly(&Broken, email.clone()).await;
        assert!(LogMailer.send(email).await.is_ok());
    }
}
