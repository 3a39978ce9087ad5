//! Identifier Validation - UUIDv4 Only
//!
//! Artifacts are addressed by canonical hyphenated UUIDv4 strings.
//! Anything else is rejected before it gets near the filesystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::StoreError;

const HYPHENS: [usize; 4] = [8, 13, 18, 23];
const VERSION_POS: usize = 14;
const VARIANT_POS: usize = 19;

/// Check `s` against the canonical UUIDv4 grammar (8-4-4-4-12 hex,
/// version nibble `4`, variant nibble in `{8,9,a,b}`, any case).
pub fn validate(s: &str) -> Result<(), &'static str> {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return Err("Invalid UUID format: expected 36 characters");
    }

    for (i, b) in bytes.iter().enumerate() {
        if HYPHENS.contains(&i) {
            if *b != b'-' {
                return Err("Invalid UUID format: misplaced group separator");
            }
        } else if !b.is_ascii_hexdigit() {
            return Err("Invalid UUID format: non-hexadecimal character");
        }
    }

    if bytes[VERSION_POS] != b'4' {
        return Err("Invalid UUID format: not a version 4 UUID");
    }

    if !matches!(bytes[VARIANT_POS].to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b') {
        return Err("Invalid UUID format: unsupported variant");
    }

    Ok(())
}

/// A validated, lower-cased artifact identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        validate(s).map_err(|reason| StoreError::InvalidIdentifier {
            value: s.to_string(),
            reason,
        })?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Fresh random identifier for a newly captured photo.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}
