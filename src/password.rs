//! Password hashing for user accounts.
//!
//! Passwords are stored as salted bcrypt hashes and only ever compared via
//! [PasswordHash::verify]. The hash never appears in API responses.

use std::fmt::Display;

use bcrypt::{hash, verify};

use crate::Error;

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `raw_password` with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed
    /// to verify a password. Pass in [PasswordHash::DEFAULT_COST] to use the
    /// recommended cost.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(raw_password: &str, cost: u32) -> Result<Self, Error> {
        match hash(raw_password, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(error) => Err(Error::HashingError(error.to_string())),
        }
    }

    /// Create a `PasswordHash` from a hash string stored in the database.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid bcrypt
    /// hash. This function has `_unchecked` in the name but is not `unsafe`,
    /// because an invalid hash will cause verification to fail but will not
    /// affect memory safety.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored password.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored hash could not be
    /// parsed by the hashing library.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
