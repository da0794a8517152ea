//! User-visible notifications

use serde::{Deserialize, Serialize};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Destructive,
}

/// Toast-style message emitted by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    /// A user record was created
    pub fn registration_successful() -> Self {
        Self::success(
            "Registration successful!",
            "Log in with your new security code.",
        )
    }

    /// No record matches the entered security code
    pub fn invalid_security_code() -> Self {
        Self::destructive(
            "Invalid security code.",
            "There is no user with this security code.",
        )
    }

    /// Registration hit the uniqueness constraint on the security code
    pub fn security_code_taken() -> Self {
        Self::destructive(
            "Security Code Already Taken.",
            "This security code is already in use. Please choose a different one.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_value(Notification::invalid_security_code()).unwrap();
        assert_eq!(json["severity"], "destructive");
        assert_eq!(json["title"], "Invalid security code.");

        let json = serde_json::to_value(Notification::registration_successful()).unwrap();
        assert_eq!(json["severity"], "success");
    }
}
