//! Product and collection handles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Handle`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The input string is empty.
    #[error("handle cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("handle must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that cannot appear in a URL slug.
    #[error("handle contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A stable slug identifying a product or collection.
///
/// Handles are the cache key for catalog records and the value of the
/// `?product=` query parameter, so they must survive a round trip through a
/// URL unchanged.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - No whitespace
/// - None of `/ ? # & " < >`
///
/// ## Examples
///
/// ```
/// use heedless_core::Handle;
///
/// assert!(Handle::parse("blue-mug").is_ok());
/// assert!(Handle::parse("frontpage").is_ok());
///
/// assert!(Handle::parse("").is_err());
/// assert!(Handle::parse("blue mug").is_err());
/// assert!(Handle::parse("a/b").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Maximum length of a handle (Shopify limit).
    pub const MAX_LENGTH: usize = 255;

    const FORBIDDEN: &'static [char] = &['/', '?', '#', '&', '"', '<', '>'];

    /// Parse a `Handle` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 255 characters, or
    /// contains whitespace or a URL-reserved character.
    pub fn parse(s: &str) -> Result<Self, HandleError> {
        if s.is_empty() {
            return Err(HandleError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(HandleError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| c.is_whitespace() || Self::FORBIDDEN.contains(c))
        {
            return Err(HandleError::InvalidCharacter(c));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Handle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Handle {
    type Error = HandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
