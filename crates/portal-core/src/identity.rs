//! Identities a database transaction can act as.
//!
//! A [`UserId`] is the only value that is ever interpolated into SQL text by
//! the data layer, so its constructor accepts exactly the canonical textual
//! UUID form and nothing else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub const USER_ID_LEN: usize = 36;

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid user id format")]
    Malformed,
}

/// Returns true when `value` is `8-4-4-4-12` hex digits (either case) and
/// nothing else. Braced, URN and simple forms are rejected even though
/// `Uuid::parse_str` would accept them.
#[must_use]
pub fn is_canonical_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == USER_ID_LEN
        && bytes.iter().enumerate().all(|(idx, byte)| {
            if HYPHEN_POSITIONS.contains(&idx) {
                *byte == b'-'
            } else {
                byte.is_ascii_hexdigit()
            }
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    pub fn parse(value: &str) -> Result<Self, IdentityError> {
        if !is_canonical_uuid(value) {
            return Err(IdentityError::Malformed);
        }
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| IdentityError::Malformed)
    }

    #[must_use]
    pub const fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for UserId {
    type Err = IdentityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.to_string()
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// Who a transaction runs as. `Admin` carries intent only; deciding whether
/// the caller may use it happens before the data layer is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActingIdentity {
    User(UserId),
    Admin,
}

impl ActingIdentity {
    pub fn user(value: &str) -> Result<Self, IdentityError> {
        UserId::parse(value).map(Self::User)
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Admin => None,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Admin => "admin",
        }
    }
}

impl From<UserId> for ActingIdentity {
    fn from(value: UserId) -> Self {
        Self::User(value)
    }
}
