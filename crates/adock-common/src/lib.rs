//! adock-common: shared error taxonomy and HTTP client used across the ADock crates.

pub mod error;
pub mod sandbox;

pub use error::{DockError, InputRole, Result};
