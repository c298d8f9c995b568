//! Customer profiles under `users/{uid}`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use super::Storefront;
use crate::auth::SignupForm;
use crate::store::{paths, to_document};
use crate::{Preferences, Result, Role, ShopError, User};

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Opt-ins to change; unset fields keep their stored value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotional_emails: Option<bool>,
}

impl Storefront {
    pub async fn profile(&self, uid: &str) -> Result<User> {
        let mut user: User = self.store().read(&paths::user(uid)).await?.val()?.ok_or(ShopError::NotSignedIn)?;
        user.uid = uid.to_string();
        Ok(user)
    }

    /// Called after every sign-in: stamps `lastLogin` on an existing profile
    /// or creates a customer profile for a first-time user.
    pub async fn ensure_profile(&self, uid: &str, email: &str, name: Option<&str>) -> Result<User> {
        let now = Utc::now();
        match self.profile(uid).await {
            Ok(mut user) => {
                let mut fields = Map::new();
                fields.insert("lastLogin".into(), json!(now.timestamp_millis()));
                self.store().update(&paths::user(uid), fields).await?;
                user.last_login = Some(now);
                Ok(user)
            }
            Err(ShopError::NotSignedIn) => {
                let user = User {
                    uid: uid.to_string(),
                    email: email.to_string(),
                    name: name.map(str::to_string).unwrap_or_default(),
                    role: Role::Customer,
                    created_at: Some(now),
                    last_login: Some(now),
                    ..Default::default()
                };
                let path = paths::user(uid);
                self.store().set(&path, to_document(&path, &user)?).await?;
                tracing::info!(uid, "profile created");
                Ok(user)
            }
            Err(e) => Err(e),
        }
    }

    /// Stores the profile for an account the auth service has just created.
    pub async fn register(&self, uid: &str, form: SignupForm) -> Result<User> {
        form.check()?;
        let user = form.into_profile(uid);
        let path = paths::user(uid);
        self.store().set(&path, to_document(&path, &user)?).await?;
        tracing::info!(uid, "account registered");
        Ok(user)
    }

    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        self.profile(uid).await?;
        let mut fields = Map::new();
        if let Some(name) = update.name { fields.insert("name".into(), json!(name.trim())); }
        if let Some(phone) = update.phone { fields.insert("phone".into(), json!(phone.trim())); }
        if let Some(address) = update.address { fields.insert("address".into(), json!(address.trim())); }
        if !fields.is_empty() { self.store().update(&paths::user(uid), fields).await?; }
        self.profile(uid).await
    }

    pub async fn preferences(&self, uid: &str) -> Result<Preferences> { Ok(self.profile(uid).await?.preferences) }

    /// Merges the patch into `users/{uid}/preferences`.
    pub async fn update_preferences(&self, uid: &str, patch: PreferencesPatch) -> Result<Preferences> {
        self.profile(uid).await?;
        let path = paths::preferences(uid);
        let fields = match to_document(&path, &patch)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        if !fields.is_empty() {
            self.store().update(&path, fields).await?;
            tracing::info!(uid, "preferences updated");
        }
        self.preferences(uid).await
    }
}
