//! Form input validation
//!
//! Checks applied to login and registration input before the session
//! manager is called. Messages are shown to the user verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

/// Exactly four ASCII digits
static SECURITY_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

pub const LOGIN_CODE_MESSAGE: &str = "Please enter a 4-digit security code.";
pub const USERNAME_REQUIRED_MESSAGE: &str = "Username is required.";
pub const SECURITY_CODE_FORMAT_MESSAGE: &str = "Security code must be a 4-digit number.";
pub const CODES_DO_NOT_MATCH_MESSAGE: &str = "Security codes do not match.";

/// Validation failure carrying the user-facing message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

pub fn is_security_code(code: &str) -> bool {
    SECURITY_CODE_RE.is_match(code)
}

/// Validate a code entered on the login dial pad
pub fn validate_login_code(code: &str) -> Result<(), ValidationError> {
    if is_security_code(code) {
        Ok(())
    } else {
        Err(ValidationError(LOGIN_CODE_MESSAGE))
    }
}

/// Validate the registration form. Checks run in display order and the
/// first failure wins.
pub fn validate_registration(
    username: &str,
    code: &str,
    re_entered_code: &str,
) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError(USERNAME_REQUIRED_MESSAGE));
    }
    if !is_security_code(code) {
        return Err(ValidationError(SECURITY_CODE_FORMAT_MESSAGE));
    }
    if code != re_entered_code {
        return Err(ValidationError(CODES_DO_NOT_MATCH_MESSAGE));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_login_code() {
        assert!(validate_login_code("4821").is_ok());
        assert!(validate_login_code("0000").is_ok());
        assert_eq!(
            validate_login_code("482").unwrap_err().to_string(),
            "Please enter a 4-digit security code."
        );
        assert!(validate_login_code("48210").is_err());
        assert!(validate_login_code("48a1").is_err());
        assert!(validate_login_code(" 4821").is_err());
        assert!(validate_login_code("").is_err());
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        assert!(!is_security_code("٤٨٢١"));
        assert!(!is_security_code("４８２１"));
    }

    #[test]
    fn test_registration_checks_in_order() {
        assert_eq!(
            validate_registration("   ", "12", "34"),
            Err(ValidationError(USERNAME_REQUIRED_MESSAGE))
        );
        assert_eq!(
            validate_registration("alice", "12", "12"),
            Err(ValidationError(SECURITY_CODE_FORMAT_MESSAGE))
        );
        assert_eq!(
            validate_registration("alice", "1234", "4321"),
            Err(ValidationError(CODES_DO_NOT_MATCH_MESSAGE))
        );
        assert_eq!(validate_registration(" alice ", "1234", "1234"), Ok(()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn property_four_digit_codes_accepted(code in 0u32..10_000) {
            let code = format!("{:04}", code);
            prop_assert!(validate_login_code(&code).is_ok());
            prop_assert!(validate_registration("user", &code, &code).is_ok());
        }

        #[test]
        fn property_other_lengths_rejected(code in "[0-9]{0,3}|[0-9]{5,8}") {
            prop_assert!(validate_login_code(&code).is_err());
        }
    }
}
