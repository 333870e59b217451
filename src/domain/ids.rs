//! Opaque identifiers for documents and embedded sub-documents.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses user-supplied text, rejecting blanks and non-UUID input.
            pub fn parse(raw: &str) -> Result<Self, DomainError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::validation($label, "must not be empty"));
                }
                Uuid::parse_str(trimmed).map(Self).map_err(|_| {
                    DomainError::validation($label, format!("`{trimmed}` is not a valid id"))
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.hyphenated().fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

document_id!(
    /// Identifier of a post document.
    PostId,
    "post id"
);
document_id!(
    /// Identifier of a comment embedded in a post.
    CommentId,
    "comment id"
);
document_id!(
    /// Identifier of a user document.
    UserId,
    "user id"
);
document_id!(
    /// Identifier of a pet embedded in a user.
    PetId,
    "pet id"
);
document_id!(MedicationId, "medication id");
document_id!(AppointmentId, "appointment id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_padded_uuid() {
        let id = PostId::new();
        let parsed = PostId::parse(&format!("  {id} ")).expect("valid id");
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_blank_and_garbage() {
        assert_eq!(
            CommentId::parse("   "),
            Err(DomainError::validation("comment id", "must not be empty"))
        );
        let err = UserId::parse("not-a-uuid").unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "user id", .. }));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PetId::new();
        let json = serde_json::to_value(id).expect("serialize");
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
