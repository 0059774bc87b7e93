//! Common utilities and types shared across depwatch crates.

pub mod error;
pub mod normalize;

pub use error::{Error, Result};
pub use normalize::normalize_name;
