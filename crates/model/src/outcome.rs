//! Per-dependency outcome of a registry check.

use std::fmt;

use crate::version::Version;

/// What the checker concluded for one dependency. The display form is
/// written verbatim into audit reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The pinned constraint still admits the latest published version.
    UpToDate,
    /// The latest published version falls outside the constraint.
    Outdated { pinned: String, latest: Version },
    /// This dependency could not be checked; the text says why.
    Failed(String),
}

impl CheckOutcome {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, CheckOutcome::UpToDate)
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::UpToDate => f.write_str("OK"),
            CheckOutcome::Outdated { pinned, latest } => {
                write!(f, "Has: {pinned} Latest: {latest}")
            }
            CheckOutcome::Failed(reason) => f.write_str(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(CheckOutcome::UpToDate.to_string(), "OK");
        let outdated = CheckOutcome::Outdated {
            pinned: "1.2".to_string(),
            latest: Version::parse("2.0.1").unwrap(),
        };
        assert_eq!(outdated.to_string(), "Has: 1.2 Latest: 2.0.1");
        let failed = CheckOutcome::Failed("Package not found on registry: flask".to_string());
        assert_eq!(failed.to_string(), "Package not found on registry: flask");
        assert!(!failed.is_up_to_date());
    }
}
