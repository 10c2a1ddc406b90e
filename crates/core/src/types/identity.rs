//! User identity token.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`UserIdentity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The input string is empty.
    #[error("user identity cannot be empty")]
    Empty,
}

/// The opaque token selecting whose recommendations and profile are shown.
///
/// A `UserIdentity` always holds a non-empty token. Places where the operator
/// may have cleared the identity hold an `Option<UserIdentity>` instead, so a
/// dependent fetch can never be issued for an empty identity.
///
/// ## Examples
///
/// ```
/// use recommender_core::UserIdentity;
///
/// assert!(UserIdentity::parse("user_001").is_ok());
/// assert!(UserIdentity::parse("").is_err());
///
/// let random = UserIdentity::random();
/// assert!(random.as_str().starts_with("user_"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Identity a fresh session starts with.
    pub const DEFAULT: &'static str = "user_001";

    /// Exclusive upper bound of the numeric suffix of a random identity.
    pub const RANDOM_RANGE: u32 = 10_000;

    /// Parse a `UserIdentity` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Empty`] if the input is empty.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        if s.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(s.to_owned()))
    }

    /// Generate a random identity of the form `user_<n>`, `n` in `0..10000`.
    #[must_use]
    pub fn random() -> Self {
        let n = rand::rng().random_range(0..Self::RANDOM_RANGE);
        Self(format!("user_{n}"))
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(value))
    }
}

impl From<UserIdentity> for String {
    fn from(identity: UserIdentity) -> Self {
        identity.0
    }
}

impl std::str::FromStr for UserIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
