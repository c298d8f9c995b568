//! Sign-in support. Credential checks belong to the backend's auth service;
//! this module maps its error codes to messages and guards the admin console.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Result, Role, ShopError, User};

/// Address kept for the shop owner; customers may not register with it.
pub const RESERVED_ADMIN_EMAIL: &str = "admin@gmail.com";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthFlow {
    Login,
    AdminLogin,
    Signup,
    PasswordReset,
    PasswordChange,
    Verification,
}

impl AuthFlow {
    fn fallback(&self) -> &'static str {
        match self {
            Self::Login => "Login failed. Please try again.",
            Self::AdminLogin => "Admin login failed. Please try again.",
            Self::Signup => "Signup failed. Please try again.",
            Self::PasswordReset => "Failed to send reset email.",
            Self::PasswordChange => "Failed to update password",
            Self::Verification => "Failed to send verification email",
        }
    }
}

/// Display message for an auth error code raised during `flow`.
pub fn auth_error_message(flow: AuthFlow, code: &str) -> &'static str {
    use AuthFlow::*;
    match (flow, code) {
        (Login | PasswordReset, "auth/user-not-found") => "No account found with this email address.",
        (AdminLogin, "auth/user-not-found") => "No admin account found with this email address.",
        (Login | AdminLogin, "auth/wrong-password") => "Incorrect password. Please try again.",
        (Login | AdminLogin | Signup | PasswordReset, "auth/invalid-email") => "Invalid email address format.",
        (Login, "auth/user-disabled") => "This account has been disabled.",
        (AdminLogin, "auth/user-disabled") => "This admin account has been disabled.",
        (Login | AdminLogin, "auth/too-many-requests") => "Too many failed attempts. Please try again later.",
        (AdminLogin, "auth/network-request-failed") => "Network error. Please check your connection.",
        (Signup, "auth/email-already-in-use") => "An account with this email already exists.",
        (Signup, "auth/weak-password") => "Password is too weak. Please use a stronger password.",
        (PasswordChange, "auth/wrong-password") => "Current password is incorrect",
        (PasswordChange, "auth/weak-password") => "New password is too weak",
        (PasswordChange, "auth/requires-recent-login") => "Please logout and login again to change password",
        (Verification, "auth/too-many-requests") => "Too many requests. Please try again later.",
        (flow, _) => flow.fallback(),
    }
}

pub fn is_reserved_email(email: &str) -> bool { email.trim().eq_ignore_ascii_case(RESERVED_ADMIN_EMAIL) }

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address format."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub address: String,
}

impl SignupForm {
    /// Checks run before the account is created with the auth service.
    pub fn check(&self) -> Result<()> {
        if self.password != self.confirm_password {
            return Err(ShopError::Validation("Passwords do not match!".into()));
        }
        if is_reserved_email(&self.email) {
            return Err(ShopError::Validation("Admin email cannot be used for user accounts".into()));
        }
        self.validate()?;
        Ok(())
    }

    /// Profile written under `users/{uid}` once the account exists.
    pub fn into_profile(self, uid: &str) -> User {
        let now = chrono::Utc::now();
        User {
            uid: uid.to_string(),
            email: self.email.trim().to_string(),
            name: self.name.trim().to_string(),
            phone: Some(self.phone.trim().to_string()).filter(|p| !p.is_empty()),
            address: Some(self.address.trim().to_string()).filter(|a| !a.is_empty()),
            role: Role::Customer,
            created_at: Some(now),
            last_login: Some(now),
            ..Default::default()
        }
    }
}

pub fn require_signed_in(user: Option<&User>) -> Result<&User> { user.ok_or(ShopError::NotSignedIn) }

pub fn require_admin(user: Option<&User>) -> Result<&User> {
    let user = require_signed_in(user)?;
    if !user.is_admin() { return Err(ShopError::AccessDenied); }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SignupForm {
        SignupForm {
            name: "Ayesha Khan".into(),
            email: "ayesha@gmail.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            phone: " 03001234567 ".into(),
            address: String::new(),
        }
    }

    #[test]
    fn test_messages_per_flow() {
        assert_eq!(auth_error_message(AuthFlow::Login, "auth/user-not-found"), "No account found with this email address.");
        assert_eq!(auth_error_message(AuthFlow::AdminLogin, "auth/user-not-found"), "No admin account found with this email address.");
        assert_eq!(auth_error_message(AuthFlow::PasswordChange, "auth/wrong-password"), "Current password is incorrect");
        assert_eq!(auth_error_message(AuthFlow::Signup, "auth/wrong-password"), "Signup failed. Please try again.");
        assert_eq!(auth_error_message(AuthFlow::Login, "auth/network-request-failed"), "Login failed. Please try again.");
    }

    #[test]
    fn test_signup_checks() {
        assert!(form().check().is_ok());
        let mismatch = SignupForm { confirm_password: "other".into(), ..form() };
        assert_eq!(mismatch.check().unwrap_err().to_string(), "Passwords do not match!");
        let reserved = SignupForm { email: " Admin@Gmail.com".into(), ..form() };
        assert!(matches!(reserved.check(), Err(ShopError::Validation(m)) if m.contains("Admin email")));
        let short = SignupForm { password: "abc".into(), confirm_password: "abc".into(), ..form() };
        assert_eq!(short.check().unwrap_err().to_string(), "Password must be at least 6 characters");
    }

    #[test]
    fn test_profile_from_signup() {
        let user = form().into_profile("uid-1");
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.phone.as_deref(), Some("03001234567"));
        assert!(user.address.is_none());
        assert!(user.cart.is_empty());
    }

    #[test]
    fn test_admin_guard() {
        let customer = User { uid: "u".into(), ..Default::default() };
        let admin = User { role: Role::Admin, ..customer.clone() };
        assert!(matches!(require_admin(None), Err(ShopError::NotSignedIn)));
        assert!(matches!(require_admin(Some(&customer)), Err(ShopError::AccessDenied)));
        assert!(require_admin(Some(&admin)).is_ok());
    }
}
