//! Shared types for the fleet dashboard client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
