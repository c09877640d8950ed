//! Shared value objects for the workflow platform.

mod types;

pub use types::{Identifier, IdentifierError, ReadableIdentifier};
