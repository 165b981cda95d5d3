//! Password validation and hashing.
//!
//! `ValidatedPassword` wraps a string and ensures it is a strong password.
//! `PasswordHash` converts a `ValidatedPassword` into a salted and hashed
//! password.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};
use serde::{Deserialize, Serialize};
use zxcvbn::{Score, feedback::Feedback, zxcvbn};

use crate::AuthError;

/// A password that has been validated, but not yet hashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// # Errors
    /// This function will return an error if the password is considered too
    /// weak. The error message explains why and suggests how to make it
    /// stronger.
    pub fn new(raw_password_string: &str) -> Result<Self, AuthError> {
        let password_analysis = zxcvbn(raw_password_string, &[]);

        match password_analysis.score() {
            Score::Three | Score::Four => Ok(Self(raw_password_string.to_string())),
            _ => Err(AuthError::TooWeak(
                password_analysis
                    .feedback()
                    .unwrap_or(&Feedback::default())
                    .to_string(),
            )),
        }
    }

    /// Create a new `ValidatedPassword` without any validation.
    ///
    /// The caller should ensure that `raw_password_string` is a valid and
    /// secure password.
    pub fn new_unchecked(raw_password_string: &str) -> Self {
        Self(raw_password_string.to_string())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified
    /// `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed
    /// to verify a password. Pass in [PasswordHash::DEFAULT_COST] to use the
    /// recommended cost; tests use a lower cost to stay fast.
    ///
    /// # Errors
    /// This function will return an error if the password could not be
    /// hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, AuthError> {
        match hash(&password.0, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(AuthError::HashingError(e.to_string())),
        }
    }

    /// Create a new `PasswordHash` from an already-hashed string, e.g. a
    /// database row.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Validate and hash a raw password string in one step.
    ///
    /// # Errors
    /// This function will return an error if the password is too weak or
    /// could not be hashed.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, AuthError> {
        let validated_password = ValidatedPassword::new(raw_password)?;
        PasswordHash::new(validated_password, cost)
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


#[cfg(test)]
mod password_hash_tests {
    use super::{PasswordHash, ValidatedPassword};

    const TEST_COST: u32 = 4;

    #[test]
    fn verify_accepts_the_original_password() {
        let raw_password = "averysecretpassword";
        let hash = PasswordHash::new(ValidatedPassword::new_unchecked(raw_password), TEST_COST)
            .expect("could not hash password");

        assert!(hash.verify(raw_password).unwrap());
    }

    #[test]
    fn verify_rejects_a_different_password() {
        let hash = PasswordHash::new(
            ValidatedPassword::new_unchecked("averysecretpassword"),
            TEST_COST,
        )
        .expect("could not hash password");

        assert!(!hash.verify("anotherpassword").unwrap());
    }

    #[test]
    fn hash_is_not_the_raw_password() {
        let raw_password = "averysecretpassword";
        let hash = PasswordHash::new(ValidatedPassword::new_unchecked(raw_password), TEST_COST)
            .expect("could not hash password");

        assert_ne!(hash.to_string(), raw_password);
    }
}
