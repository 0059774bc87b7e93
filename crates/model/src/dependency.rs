//! Dependency records shared by the manifest parsers and the checker.

use std::fmt;
use std::str::FromStr;

use depwatch_common::{Error, Result};

use crate::version::{Specifier, Version};

/// Placeholder version recorded when a manifest names a library without
/// pinning it. Never parsed as a version; the checker reports the latest
/// release against it directly.
pub const LATEST_SENTINEL: &str = "latest";

/// Comparison operator of a version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl ConstraintOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Lt => "<",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Le => "<=",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "==" => Ok(ConstraintOp::Eq),
            "!=" => Ok(ConstraintOp::Ne),
            ">" => Ok(ConstraintOp::Gt),
            "<" => Ok(ConstraintOp::Lt),
            ">=" => Ok(ConstraintOp::Ge),
            "<=" => Ok(ConstraintOp::Le),
            other => Err(Error::InvalidConstraint(other.to_string())),
        }
    }
}

/// One declared or installed dependency: a library name, a constraint
/// operator and the version text exactly as it appeared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub library: String,
    pub op: ConstraintOp,
    pub version: String,
}

impl Dependency {
    pub fn new(library: impl Into<String>, op: ConstraintOp, version: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            op,
            version: version.into(),
        }
    }

    /// A dependency named without any version pin.
    pub fn unpinned(library: impl Into<String>) -> Self {
        Self::new(library, ConstraintOp::Eq, LATEST_SENTINEL)
    }

    pub fn is_unpinned(&self) -> bool {
        self.version == LATEST_SENTINEL
    }

    /// The constraint as a matchable specifier. Fails when the version
    /// text does not parse, including the unpinned sentinel.
    pub fn specifier(&self) -> Result<Specifier> {
        let version = Version::parse(&self.version)?;
        Ok(Specifier::new(self.op, version))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.library, self.op, self.version)
    }
}
