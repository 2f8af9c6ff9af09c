use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::envelope::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Field-shape validation; uniqueness is checked against the store
    /// separately.
    pub fn validate(&self) -> Result<(), ApiError> {
        // bounds are in characters, not bytes
        let username_chars = self.username.chars().count();
        if username_chars < 5 || username_chars > 20 {
            return Err(ApiError::validation(
                "Username must be between 5 and 20 characters",
            ));
        }
        if self.email.is_empty() || self.email.chars().count() > 50 || !is_valid_email(&self.email)
        {
            return Err(ApiError::validation(
                "Provided email is not an email address",
            ));
        }
        if self.password.len() < 8 {
            return Err(ApiError::validation(
                "Password must be at least 8 characters",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned from login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
