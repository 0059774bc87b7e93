//! Shared data model for the depwatch audit pipeline.

pub mod dependency;
pub mod outcome;
pub mod project;
pub mod version;

pub use dependency::{ConstraintOp, Dependency, LATEST_SENTINEL};
pub use outcome::CheckOutcome;
pub use project::{derive_project_name, Project, NAME_IGNORE_DIRS};
pub use version::{Specifier, Version};
