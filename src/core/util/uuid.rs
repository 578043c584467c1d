//! Vertex identity: UUID generation and validation.
//!
//! Vertex keys are only meaningful inside one triangulation; the UUID is the
//! identity that survives serialization. Deserialized UUIDs are checked here
//! before any structure is rebuilt from them.

use thiserror::Error;
use uuid::Uuid;

use crate::core::collections::FastHashSet;

/// Errors that can occur during UUID validation.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::core::util::UuidValidationError;
///
/// let err = UuidValidationError::NilUuid;
/// assert!(err.to_string().contains("nil"));
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UuidValidationError {
    /// The UUID is nil (all zeros), which is not allowed.
    #[error("UUID is nil (all zeros) which is not allowed")]
    NilUuid,
    /// The UUID is not version 4.
    #[error("UUID is not version 4: expected version 4, found version {found}")]
    InvalidVersion {
        /// The version number that was found.
        found: usize,
    },
    /// Two vertices carry the same UUID.
    #[error("UUID {uuid} is used by more than one vertex")]
    Duplicate {
        /// The repeated UUID.
        uuid: Uuid,
    },
}

/// Validates that a UUID is not nil and is version 4.
///
/// # Errors
///
/// Returns [`UuidValidationError::NilUuid`] for the nil UUID and
/// [`UuidValidationError::InvalidVersion`] for any version other than 4.
pub const fn validate_uuid(uuid: &Uuid) -> Result<(), UuidValidationError> {
    if uuid.is_nil() {
        return Err(UuidValidationError::NilUuid);
    }
    let version = uuid.get_version_num();
    if version != 4 {
        return Err(UuidValidationError::InvalidVersion { found: version });
    }
    Ok(())
}

/// Validates every UUID of a sequence and checks that none repeats.
///
/// # Errors
///
/// Returns the first [`UuidValidationError`] encountered.
pub fn validate_unique_uuids<'a, I>(uuids: I) -> Result<(), UuidValidationError>
where
    I: IntoIterator<Item = &'a Uuid>,
{
    let mut seen = FastHashSet::default();
    for uuid in uuids {
        validate_uuid(uuid)?;
        if !seen.insert(*uuid) {
            return Err(UuidValidationError::Duplicate { uuid: *uuid });
        }
    }
    Ok(())
}

/// Generate a fresh random (version 4) UUID.
#[must_use]
pub fn make_uuid() -> Uuid {
    Uuid::new_v4()
}
