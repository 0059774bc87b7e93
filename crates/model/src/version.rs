//! Version parsing and ordering for the Python packaging scheme.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use depwatch_common::{Error, Result};

use crate::dependency::ConstraintOp;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<epoch>\d+)!)?",
        r"(?P<release>\d+(?:\.\d+)*)",
        r"(?:[._-]?(?P<pre_l>a|b|c|rc|alpha|beta|pre|preview)[._-]?(?P<pre_n>\d*))?",
        r"(?:[._-]?(?:post|rev|r)[._-]?(?P<post_n>\d*)|-(?P<post_i>\d+))?",
        r"(?:[._-]?dev[._-]?(?P<dev_n>\d*))?",
        r"(?:\+[a-z0-9]+(?:[._-][a-z0-9]+)*)?$",
    ))
    .expect("version pattern must compile")
});

/// Pre-release stage, ordered alpha < beta < release candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreStage {
    Alpha,
    Beta,
    Candidate,
}

impl PreStage {
    fn from_label(label: &str) -> Self {
        match label {
            "a" | "alpha" => PreStage::Alpha,
            "b" | "beta" => PreStage::Beta,
            // "c", "pre" and "preview" all normalize to "rc".
            _ => PreStage::Candidate,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PreStage::Alpha => "a",
            PreStage::Beta => "b",
            PreStage::Candidate => "rc",
        }
    }
}

/// Ranks an optional pre/post/dev segment within one release number.
/// Bottom sorts before every tagged value, Top after all of them, so
/// 1.0.dev1 < 1.0a1 < 1.0 < 1.0.post1.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentKey {
    Bottom,
    Value(u8, u64),
    Top,
}

/// A version in the Python packaging scheme: optional epoch, dotted
/// release digits of any length, optional pre/post/dev segments. A
/// trailing local label is accepted but not retained.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreStage, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl Version {
    /// Parse a version string. Case-insensitive, tolerates a leading
    /// `v` and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self> {
        let lowered = input.trim().to_ascii_lowercase();
        let text = lowered.strip_prefix('v').unwrap_or(&lowered);
        let caps = VERSION_PATTERN
            .captures(text)
            .ok_or_else(|| Error::InvalidVersion(input.to_string()))?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(m.as_str(), input)?,
            None => 0,
        };
        let release = caps["release"]
            .split('.')
            .map(|part| parse_number(part, input))
            .collect::<Result<Vec<u64>>>()?;
        let pre = match caps.name("pre_l") {
            Some(label) => {
                let number = optional_number(&caps, "pre_n", input)?;
                Some((PreStage::from_label(label.as_str()), number))
            }
            None => None,
        };
        let post = if let Some(m) = caps.name("post_i") {
            // The bare "-N" spelling of a post release.
            Some(parse_number(m.as_str(), input)?)
        } else if caps.name("post_n").is_some() {
            Some(optional_number(&caps, "post_n", input)?)
        } else {
            None
        };
        let dev = match caps.name("dev_n") {
            Some(_) => Some(optional_number(&caps, "dev_n", input)?),
            None => None,
        };

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
        })
    }

    /// True for development and pre-release versions. Constraint
    /// matching skips these candidates unless the pin itself is one.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Compare only epoch and release digits, padding the shorter
    /// release with zeroes.
    fn same_release(&self, other: &Self) -> bool {
        self.epoch == other.epoch && cmp_release(&self.release, &other.release) == Ordering::Equal
    }

    fn pre_key(&self) -> SegmentKey {
        match self.pre {
            Some((stage, n)) => SegmentKey::Value(stage as u8, n),
            // A dev release without pre or post tags sorts before
            // every pre-release of the same number.
            None if self.dev.is_some() && self.post.is_none() => SegmentKey::Bottom,
            None => SegmentKey::Top,
        }
    }

    fn post_key(&self) -> SegmentKey {
        match self.post {
            Some(n) => SegmentKey::Value(0, n),
            None => SegmentKey::Bottom,
        }
    }

    fn dev_key(&self) -> SegmentKey {
        match self.dev {
            Some(n) => SegmentKey::Value(0, n),
            None => SegmentKey::Top,
        }
    }
}

fn parse_number(text: &str, original: &str) -> Result<u64> {
    text.parse::<u64>()
        .map_err(|_| Error::InvalidVersion(original.to_string()))
}

fn optional_number(caps: &regex::Captures<'_>, group: &str, original: &str) -> Result<u64> {
    match caps.name(group).map(|m| m.as_str()) {
        Some("") | None => Ok(0),
        Some(text) => parse_number(text, original),
    }
}

fn cmp_release(left: &[u64], right: &[u64]) -> Ordering {
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post_key().cmp(&other.post_key()))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality must agree with the ordering, so 2.0 == 2.0.0 despite the
// differing release lengths. Derived PartialEq would get this wrong.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release = self
            .release
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&release)?;
        if let Some((stage, n)) = self.pre {
            write!(f, "{}{}", stage.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        Ok(())
    }
}

/// A constraint operator applied to a parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    op: ConstraintOp,
    version: Version,
}

impl Specifier {
    pub fn new(op: ConstraintOp, version: Version) -> Self {
        Self { op, version }
    }

    /// Whether a candidate version satisfies this constraint.
    ///
    /// Pre-release candidates are rejected outright unless the pinned
    /// version is itself a pre-release, matching how pip treats
    /// published pre-releases by default.
    pub fn matches(&self, candidate: &Version) -> bool {
        if candidate.is_prerelease() && !self.version.is_prerelease() {
            return false;
        }
        match self.op {
            ConstraintOp::Eq => candidate == &self.version,
            ConstraintOp::Ne => candidate != &self.version,
            ConstraintOp::Gt => {
                if candidate <= &self.version {
                    return false;
                }
                // A post release does not satisfy > on its own base
                // version: >1.0 excludes 1.0.post1.
                !(self.version.post.is_none()
                    && candidate.is_postrelease()
                    && candidate.same_release(&self.version))
            }
            ConstraintOp::Lt => candidate < &self.version,
            ConstraintOp::Ge => candidate >= &self.version,
            ConstraintOp::Le => candidate <= &self.version,
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_parse_plain_release() {
        let version = v("2.31.0");
        assert!(!version.is_prerelease());
        assert_eq!(version.to_string(), "2.31.0");
    }

    #[test]
    fn test_parse_tolerates_prefix_and_case() {
        assert_eq!(v(" V1.2.3 "), v("1.2.3"));
        assert_eq!(v("1.0RC1"), v("1.0rc1"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("latest").is_err());
        assert!(Version::parse("not-a-version").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.2.x").is_err());
    }

    #[test]
    fn test_short_and_long_releases_compare_equal() {
        assert_eq!(v("2.0"), v("2.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert!(v("2.0") < v("2.0.1"));
    }

    #[test]
    fn test_release_digits_compare_numerically() {
        assert!(v("1.9") < v("1.10"));
        assert!(v("0.9.9") < v("1.0"));
    }

    #[test]
    fn test_epoch_dominates() {
        assert!(v("1!1.0") > v("2.0"));
    }

    #[test]
    fn test_pre_release_ordering() {
        assert!(v("1.0.dev1") < v("1.0a1"));
        assert!(v("1.0a1") < v("1.0b1"));
        assert!(v("1.0b2") < v("1.0rc1"));
        assert!(v("1.0rc1") < v("1.0"));
        assert!(v("1.0") < v("1.0.post1"));
        assert!(v("1.0.post1") < v("1.1"));
    }

    #[test]
    fn test_pre_release_spellings_normalize() {
        assert_eq!(v("1.0alpha2"), v("1.0a2"));
        assert_eq!(v("1.0.preview.1"), v("1.0rc1"));
        assert_eq!(v("1.0c1"), v("1.0rc1"));
        assert_eq!(v("1.0-1"), v("1.0.post1"));
    }

    #[test]
    fn test_implicit_segment_numbers() {
        assert_eq!(v("1.0rc"), v("1.0rc0"));
        assert_eq!(v("1.0.post"), v("1.0.post0"));
        assert_eq!(v("1.0.dev"), v("1.0.dev0"));
    }

    #[test]
    fn test_local_label_ignored() {
        assert_eq!(v("1.0+ubuntu.1"), v("1.0"));
    }

    #[test]
    fn test_specifier_ge() {
        let spec = Specifier::new(ConstraintOp::Ge, v("1.0"));
        assert!(spec.matches(&v("1.0")));
        assert!(spec.matches(&v("1.5")));
        assert!(!spec.matches(&v("0.9")));
    }

    #[test]
    fn test_specifier_eq_pads_release() {
        let spec = Specifier::new(ConstraintOp::Eq, v("2.0"));
        assert!(spec.matches(&v("2.0.0")));
        assert!(!spec.matches(&v("2.0.1")));
    }

    #[test]
    fn test_specifier_excludes_pre_releases() {
        let spec = Specifier::new(ConstraintOp::Ge, v("1.0"));
        assert!(!spec.matches(&v("2.0a1")));
        assert!(!spec.matches(&v("2.0.dev3")));
    }

    #[test]
    fn test_specifier_allows_pre_release_when_pinned_to_one() {
        let spec = Specifier::new(ConstraintOp::Ge, v("2.0b1"));
        assert!(spec.matches(&v("2.0rc1")));
        assert!(spec.matches(&v("2.0")));
    }

    #[test]
    fn test_exclusive_gt_rejects_post_of_same_release() {
        let spec = Specifier::new(ConstraintOp::Gt, v("1.0"));
        assert!(!spec.matches(&v("1.0.post1")));
        assert!(spec.matches(&v("1.0.1")));
    }
}
