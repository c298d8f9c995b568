//! Contact form and newsletter signups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Storefront;
use crate::notify::Notice;
use crate::store::{paths, to_document};
use crate::{Result, ShopError};

/// Outbound email. The shop works without one; messages are then only stored.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address format."))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Message must be 1 to 200 characters"))]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSignup {
    pub email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub subscribed_at: DateTime<Utc>,
}

impl Storefront {
    /// Emails the message when a mailer is configured, then records it with
    /// status `new`. A failed send stores nothing.
    pub async fn submit_contact(&self, form: ContactForm) -> Result<Notice> {
        form.validate()?;
        let message = ContactMessage {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            message: form.message,
            timestamp: Utc::now(),
            status: "new".to_string(),
        };
        let notice = match &self.mailer {
            Some(mailer) => {
                mailer.send(&message).await.map_err(|e| {
                    tracing::error!(error = %e, "contact email failed");
                    ShopError::Mail(e.to_string())
                })?;
                Notice::success("Thank you for your message! We will get back to you soon.")
            }
            None => {
                tracing::warn!("no mailer configured, contact message only stored");
                Notice::info("Message saved! Email notification is not configured yet.")
            }
        };
        self.store().push(paths::CONTACTS, to_document(paths::CONTACTS, &message)?).await?;
        Ok(notice)
    }

    pub async fn subscribe_newsletter(&self, email: &str) -> Result<Notice> {
        let email = email.trim();
        if !validator::validate_email(email) { return Err(ShopError::Validation("Invalid email address format.".into())); }
        let signup = NewsletterSignup { email: email.to_string(), subscribed_at: Utc::now() };
        self.store().push(paths::NEWSLETTER, to_document(paths::NEWSLETTER, &signup)?).await?;
        Ok(Notice::success("Thank you for subscribing to our newsletter!"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::notify::Level;
    use crate::store::DocumentStore;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<ContactMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &ContactMessage) -> anyhow::Result<()> {
            if self.fail { anyhow::bail!("smtp refused"); }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn form() -> ContactForm {
        ContactForm { name: "Ayesha".into(), email: "ayesha@gmail.com".into(), phone: None, message: "Do you deliver to Lahore?".into() }
    }

    async fn stored_contacts(shop: &Storefront) -> Vec<ContactMessage> {
        let snapshot = shop.store().read(paths::CONTACTS).await.unwrap();
        snapshot.value.and_then(|v| v.as_object().cloned()).unwrap_or_default().into_iter().map(|(_, v)| serde_json::from_value(v).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_contact_without_mailer_is_stored() {
        let (_store, shop) = shop();
        let notice = shop.submit_contact(form()).await.unwrap();
        assert_eq!(notice.level, Level::Info);
        let stored = stored_contacts(&shop).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, "new");
    }

    #[tokio::test]
    async fn test_contact_with_mailer() {
        let (_store, shop) = shop();
        let mailer = Arc::new(RecordingMailer::default());
        let shop = shop.with_mailer(mailer.clone());
        assert_eq!(shop.submit_contact(form()).await.unwrap().level, Level::Success);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let failing = shop.clone().with_mailer(Arc::new(RecordingMailer { fail: true, ..Default::default() }));
        assert!(matches!(failing.submit_contact(form()).await, Err(ShopError::Mail(_))));
        assert_eq!(stored_contacts(&shop).await.len(), 1);
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let (_store, shop) = shop();
        let long = ContactForm { message: "x".repeat(201), ..form() };
        assert!(matches!(shop.submit_contact(long).await, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_newsletter() {
        let (store, shop) = shop();
        shop.subscribe_newsletter(" reader@gmail.com ").await.unwrap();
        assert!(shop.subscribe_newsletter("not-an-email").await.is_err());
        let all = store.read(paths::NEWSLETTER).await.unwrap().value.unwrap();
        let entry = all.as_object().unwrap().values().next().unwrap();
        assert_eq!(entry["email"], "reader@gmail.com");
        assert!(entry["subscribedAt"].is_i64());
    }
}
