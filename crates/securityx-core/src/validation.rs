//! Form validation for sign-up, dashboard settings, and the contact form.
//!
//! Validation never touches the backend. A form with any error must not
//! reach the network, so callers check [`FieldErrors::is_empty`] first.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Largest avatar accepted at sign-up.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[allow(clippy::expect_used)]
static SIGN_UP_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern, cannot fail.
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("sign-up email pattern")
});

#[allow(clippy::expect_used)]
static LOOSE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("settings email pattern"));

/// Field name → message. Field names match the form's input names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_owned(), message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add `other`'s failures; its messages win on the same field.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Turn an empty set into `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

// ── Sign-up ──────────────────────────────────────────────────────────

/// Fields of the sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub agree_to_terms: bool,
}

impl SignUpForm {
    /// Validate every field; all failures are reported at once.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.name.chars().count() < 2 {
            errors.insert("name", "Name must be at least 2 characters");
        }
        if !SIGN_UP_EMAIL.is_match(&self.email) {
            errors.insert("email", "Please enter a valid email address");
        }
        if self.password.chars().count() < 8 {
            errors.insert("password", "Password must be at least 8 characters");
        }
        if self.password != self.confirm_password {
            errors.insert("confirmPassword", "Passwords do not match");
        }
        if !self.agree_to_terms {
            errors.insert("terms", "You must agree to the terms and conditions");
        }

        errors
    }
}

/// Check a decoded avatar's size.
///
/// # Errors
///
/// Returns the `avatar` field error when the file exceeds 5 MiB.
pub fn validate_avatar_size(len: usize) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if len > MAX_AVATAR_BYTES {
        errors.insert("avatar", "File size must be less than 5MB");
    }
    errors.into_result()
}

// ── Settings ─────────────────────────────────────────────────────────

/// Fields of the dashboard settings panel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsForm {
    pub email: String,
    pub company: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl SettingsForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.email.is_empty() {
            errors.insert("email", "Email is required");
        } else if !LOOSE_EMAIL.is_match(&self.email) {
            errors.insert("email", "Please enter a valid email address");
        }

        if !self.new_password.is_empty() {
            if self.new_password.chars().count() < 8 {
                errors.insert("newPassword", "Password must be at least 8 characters");
            }
            if self.confirm_password != self.new_password {
                errors.insert("confirmPassword", "Passwords do not match");
            }
        }

        errors
    }
}

// ── Contact ──────────────────────────────────────────────────────────

/// Fields of the landing page contact form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }
        if !SIGN_UP_EMAIL.is_match(self.email.trim()) {
            errors.insert("email", "Please enter a valid email address");
        }
        if self.message.trim().is_empty() {
            errors.insert("message", "Message is required");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_sign_up() -> SignUpForm {
        SignUpForm {
            name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            password: "Engine#1843".to_owned(),
            confirm_password: "Engine#1843".to_owned(),
            agree_to_terms: true,
        }
    }

    #[test]
    fn valid_sign_up_passes() {
        assert!(valid_sign_up().validate().is_empty());
    }

    #[test]
    fn mismatched_confirmation_is_reported() {
        let form = SignUpForm {
            confirm_password: "Engine#1844".to_owned(),
            ..valid_sign_up()
        };
        let errors = form.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn all_failures_reported_together() {
        let errors = SignUpForm::default().validate();
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
        assert_eq!(errors.get("password"), Some("Password must be at least 8 characters"));
        assert_eq!(
            errors.get("terms"),
            Some("You must agree to the terms and conditions")
        );
        // empty password equals empty confirmation
        assert_eq!(errors.get("confirmPassword"), None);
    }

    #[test]
    fn sign_up_email_shape() {
        let email_ok = |e: &str| {
            SignUpForm {
                email: e.to_owned(),
                ..valid_sign_up()
            }
            .validate()
            .is_empty()
        };
        assert!(email_ok("a@b.co"));
        assert!(!email_ok("a@b"));
        assert!(!email_ok("a b@c.de"));
        assert!(!email_ok("@c.de"));
        assert!(!email_ok("a@@c.de"));
    }

    #[test]
    fn avatar_limit_is_inclusive() {
        assert!(validate_avatar_size(MAX_AVATAR_BYTES).is_ok());
        let err = validate_avatar_size(MAX_AVATAR_BYTES + 1).err();
        assert_eq!(
            err.as_ref().and_then(|e| e.get("avatar")),
            Some("File size must be less than 5MB")
        );
    }

    #[test]
    fn settings_rules() {
        let mut form = SettingsForm::default();
        assert_eq!(form.validate().get("email"), Some("Email is required"));

        form.email = "not-an-email".to_owned();
        assert_eq!(
            form.validate().get("email"),
            Some("Please enter a valid email address")
        );

        form.email = "ops@corp.io".to_owned();
        assert!(form.validate().is_empty());

        form.new_password = "short".to_owned();
        form.confirm_password = "other".to_owned();
        let errors = form.validate();
        assert!(errors.get("newPassword").is_some());
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn contact_requires_everything() {
        let errors = ContactForm::default().validate();
        assert_eq!(errors.len(), 3);
        let ok = ContactForm {
            name: "Grace".to_owned(),
            email: "grace@navy.mil".to_owned(),
            message: "Hello".to_owned(),
        };
        assert!(ok.validate().into_result().is_ok());
    }
}
