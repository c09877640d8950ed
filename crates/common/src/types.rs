use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when constructing an identifier from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The input is not a hyphenated UUID v4.
    #[error("Invalid identifier: {raw:?} is not a UUID v4")]
    InvalidUuid { raw: String },

    /// The input is empty once surrounding whitespace is trimmed.
    #[error("Invalid identifier: value must not be empty")]
    Empty,
}

/// Unique identifier backed by a UUID v4.
///
/// Used for workflows and anything else that needs global uniqueness.
/// Parsing only accepts the hyphenated 8-4-4-4-12 form with the version
/// nibble set to `4`; the stored value always prints in lower case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generates a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its textual form.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let invalid = || IdentifierError::InvalidUuid {
            raw: raw.to_string(),
        };

        if !has_uuid_v4_shape(raw) {
            return Err(invalid());
        }

        let uuid = Uuid::parse_str(raw).map_err(|_| invalid())?;
        Ok(Self(uuid))
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Wraps a UUID read back from storage.
    ///
    /// Storage only ever holds values produced by [`Identifier::generate`] or
    /// [`Identifier::parse`], so the version is not re-checked here.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Checks the 8-4-4-4-12 hex grammar, the version nibble and the RFC 4122
/// variant nibble.
fn has_uuid_v4_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 36 {
        return false;
    }

    for (idx, byte) in bytes.iter().enumerate() {
        let ok = match idx {
            8 | 13 | 18 | 23 => *byte == b'-',
            14 => *byte == b'4',
            19 => matches!(byte.to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b'),
            _ => byte.is_ascii_hexdigit(),
        };
        if !ok {
            return false;
        }
    }

    true
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl From<Identifier> for Uuid {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Human-readable identifier such as a node slug (`"n1"`, `"http-request"`).
///
/// Any non-empty string is accepted; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReadableIdentifier(String);

impl ReadableIdentifier {
    /// Parses a readable identifier, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generates a fresh slug from a random UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReadableIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReadableIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ReadableIdentifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for ReadableIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ReadableIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_creates_unique_ids() {
        let id1 = Identifier::generate();
        let id2 = Identifier::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn parse_roundtrips_display() {
        for _ in 0..32 {
            let id = Identifier::generate();
            let parsed = Identifier::parse(&id.to_string()).unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for raw in [
            "not-a-uuid",
            "",
            "6f1c2a4e-8b1d-4c3a-9e2f-1a2b3c4d5e6",
            "6f1c2a4e8b1d4c3a9e2f1a2b3c4d5e6f",
            "{6f1c2a4e-8b1d-4c3a-9e2f-1a2b3c4d5e6f}",
            "6f1c2a4e-8b1d-4c3a-9e2f-1a2b3c4d5e6g",
            "6f1c2a4e_8b1d_4c3a_9e2f_1a2b3c4d5e6f",
        ] {
            assert!(
                matches!(
                    Identifier::parse(raw),
                    Err(IdentifierError::InvalidUuid { .. })
                ),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_other_uuid_versions() {
        // v1 and v7 shapes
        assert!(Identifier::parse("6f1c2a4e-8b1d-1c3a-9e2f-1a2b3c4d5e6f").is_err());
        assert!(Identifier::parse("6f1c2a4e-8b1d-7c3a-9e2f-1a2b3c4d5e6f").is_err());
        // wrong variant nibble
        assert!(Identifier::parse("6f1c2a4e-8b1d-4c3a-0e2f-1a2b3c4d5e6f").is_err());
    }

    #[test]
    fn parse_canonicalises_to_lower_case() {
        let id = Identifier::parse("6F1C2A4E-8B1D-4C3A-9E2F-1A2B3C4D5E6F").unwrap();
        assert_eq!(id.to_string(), "6f1c2a4e-8b1d-4c3a-9e2f-1a2b3c4d5e6f");
        assert_eq!(
            id,
            Identifier::parse("6f1c2a4e-8b1d-4c3a-9e2f-1a2b3c4d5e6f").unwrap()
        );
    }

    #[test]
    fn identifier_serialization_roundtrip() {
        let id = Identifier::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let deserialized: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn identifier_deserialization_validates() {
        let result: Result<Identifier, _> = serde_json::from_str("\"not-a-uuid\"");
        assert!(result.is_err());
    }

    #[test]
    fn readable_identifier_trims_and_rejects_empty() {
        let id = ReadableIdentifier::parse("  n1 ").unwrap();
        assert_eq!(id.as_str(), "n1");
        assert_eq!(id, ReadableIdentifier::parse("n1").unwrap());

        assert_eq!(ReadableIdentifier::parse(""), Err(IdentifierError::Empty));
        assert_eq!(ReadableIdentifier::parse(" \t\n"), Err(IdentifierError::Empty));
    }

    #[test]
    fn readable_identifier_accepts_arbitrary_slugs() {
        for raw in ["httpRequest-1", "Send Email", "節点", "not-a-uuid"] {
            let id: ReadableIdentifier = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn readable_identifier_generate_is_unique() {
        assert_ne!(ReadableIdentifier::generate(), ReadableIdentifier::generate());
    }

    #[test]
    fn readable_identifier_deserialization_trims() {
        let id: ReadableIdentifier = serde_json::from_str("\" n2 \"").unwrap();
        assert_eq!(id.as_str(), "n2");
        assert!(serde_json::from_str::<ReadableIdentifier>("\"  \"").is_err());
    }
}
