//! Session token handling
//!
//! Tokens are opaque here; the hosting site's auth provider issues them. The
//! core only needs to know whether one is present and which user owns it.

use crate::error::PrepCoachError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserToken(String);

impl UserToken {
    /// `None` for empty or whitespace-only tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Parse an `Authorization: Bearer <token>` header value.
    pub fn from_bearer(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Self::new(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable owner id for the user behind this token.
    pub fn owner_id(&self) -> Uuid {
        stable_uuid_from_string(&self.0)
    }
}

// Never print the raw token
impl fmt::Debug for UserToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserToken(owner={})", self.owner_id())
    }
}

/// Reject a collaborator call before it is made when nobody is signed in.
pub fn require_token(token: Option<&UserToken>) -> Result<&UserToken> {
    token.ok_or(PrepCoachError::Unauthenticated)
}

fn stable_uuid_from_string(input: &str) -> Uuid {
    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}
