//! Identifier normalization and validation.
//!
//! Built once at startup and shared (`Arc<Validator>`) by login and
//! registration, so patterns are compiled a single time without globals.

use regex::Regex;

use crate::config::{ConfigError, SessionConfig};
use crate::{AuthError, AuthResult};

/// Local part: letters, digits, `.`, `_`, `+`. Domain: dot-separated labels,
/// alphabetic TLD of two or more letters. Applied to the lowercased form.
const EMAIL_PATTERN: &str = r"^[a-z0-9._+]+@[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}$";

/// Digits allowed in a full international number.
const MAX_PHONE_DIGITS: usize = 15;

/// Digits required after the country code.
const MIN_SUBSCRIBER_DIGITS: usize = 6;

/// A login identifier after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

/// Normalizes and validates emails and phone numbers.
#[derive(Debug, Clone)]
pub struct Validator {
    email: Regex,
    country_code: String,
}

impl Validator {
    /// Create a validator that prefixes local phone numbers with `country_code`.
    pub fn new(country_code: impl Into<String>) -> Result<Self, ConfigError> {
        let country_code = country_code.into();
        if country_code.is_empty() || !country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue(format!(
                "country code must be digits, got '{country_code}'"
            )));
        }

        let email = Regex::new(EMAIL_PATTERN)
            .map_err(|e| ConfigError::InvalidValue(format!("email pattern: {e}")))?;

        Ok(Self {
            email,
            country_code,
        })
    }

    /// Create a validator from session configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Self::new(config.default_country_code.clone())
    }

    /// Trim and lowercase an email.
    pub fn format_email(&self, email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Returns `true` if `email` (already formatted) is acceptable.
    pub fn is_valid_email(&self, email: &str) -> bool {
        self.email.is_match(email)
    }

    /// Format and validate an email.
    pub fn normalize_email(&self, email: &str) -> AuthResult<String> {
        let email = self.format_email(email);
        if self.is_valid_email(&email) {
            Ok(email)
        } else {
            Err(AuthError::invalid_input("invalid email address"))
        }
    }

    /// Normalize a phone number to `+<country code><digits>`.
    ///
    /// Spaces, dashes, dots and parentheses are ignored. A number starting with
    /// `+` is taken as international; otherwise leading zeros are dropped and
    /// the default country code is prepended.
    pub fn normalize_phone(&self, phone: &str) -> AuthResult<String> {
        let compact: String = phone
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        let (international, digits) = match compact.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, compact.as_str()),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::invalid_input("invalid phone number"));
        }

        let full = if international {
            digits.to_string()
        } else {
            let subscriber = digits.trim_start_matches('0');
            if subscriber.len() < MIN_SUBSCRIBER_DIGITS {
                return Err(AuthError::invalid_input("invalid phone number"));
            }
            format!("{}{subscriber}", self.country_code)
        };

        if full.starts_with('0')
            || full.len() <= MIN_SUBSCRIBER_DIGITS
            || full.len() > MAX_PHONE_DIGITS
        {
            return Err(AuthError::invalid_input("invalid phone number"));
        }

        Ok(format!("+{full}"))
    }

    /// Classify and normalize a login identifier.
    ///
    /// Anything containing `@` is treated as an email, everything else as a
    /// phone number.
    pub fn parse_identifier(&self, identifier: &str) -> AuthResult<Identifier> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::invalid_input("identifier is required"));
        }

        if identifier.contains('@') {
            self.normalize_email(identifier).map(Identifier::Email)
        } else {
            self.normalize_phone(identifier).map(Identifier::Phone)
        }
    }
}
