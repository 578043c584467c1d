//! General helper utilities.

pub mod hilbert;
pub mod uuid;

pub use self::uuid::{UuidValidationError, make_uuid, validate_unique_uuids, validate_uuid};
