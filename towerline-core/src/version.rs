//! Version handling for Ansible Tower / AWX release strings
//!
//! Tower reports its release as a three-segment string (for example
//! `3.3.0`) on the ping endpoint. The segments decide which
//! authentication header scheme the server accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing a version string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The string did not have exactly three dot-separated segments
    #[error("version string `{0}` must be in the format X.Y.Z")]
    Format(String),
    /// A segment was present but not numeric
    #[error("the {segment} (`{value}`) could not be parsed as a number")]
    Segment {
        segment: &'static str,
        value: String,
    },
}

/// A parsed Tower or AWX release version
///
/// Ordering derives lexicographically over (major, minor, point), so `>=`
/// and [`TowerVersion::is_at_least`] give the conventional comparison.
/// [`TowerVersion::is_greater_or_equal`] is the historical comparison used
/// when deciding the authentication header scheme; see its docs for how it
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerVersion {
    pub major: u32,
    pub minor: u32,
    pub point: u32,
}

impl TowerVersion {
    /// Create a version from its three segments
    pub const fn new(major: u32, minor: u32, point: u32) -> Self {
        Self {
            major,
            minor,
            point,
        }
    }

    /// Historical at-or-above check used for the authentication header gate
    ///
    /// A smaller major on `other` passes, and a smaller minor on `other`
    /// passes without requiring equal majors. That second rule means
    /// `3.9.0` reports itself at-or-above `4.2.0`. Installations have been
    /// gated on this ordering for years, so it is kept as the default;
    /// callers that want the strict ordering use [`TowerVersion::is_at_least`].
    ///
    /// # Example
    /// ```
    /// use towerline_core::TowerVersion;
    ///
    /// let mine: TowerVersion = "3.3.1".parse()?;
    /// let gate: TowerVersion = "3.3.0".parse()?;
    /// assert!(mine.is_greater_or_equal(&gate));
    /// # Ok::<(), towerline_core::VersionError>(())
    /// ```
    pub fn is_greater_or_equal(&self, other: &TowerVersion) -> bool {
        if other.major < self.major {
            return true;
        }
        if other.minor < self.minor {
            return true;
        }
        other.major == self.major && other.minor == self.minor && other.point <= self.point
    }

    /// Strict lexicographic at-or-above check
    pub fn is_at_least(&self, other: &TowerVersion) -> bool {
        self >= other
    }
}

impl FromStr for TowerVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::Format(s.to_string()));
        }
        Ok(Self {
            major: parse_segment("major version", parts[0])?,
            minor: parse_segment("minor version", parts[1])?,
            point: parse_segment("point release", parts[2])?,
        })
    }
}

impl fmt::Display for TowerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.point)
    }
}

fn parse_segment(segment: &'static str, value: &str) -> Result<u32, VersionError> {
    value.parse().map_err(|_| VersionError::Segment {
        segment,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> TowerVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let version = v("3.8.2");
        assert_eq!(version.major, 3);
        assert_eq!(version.minor, 8);
        assert_eq!(version.point, 2);
        assert_eq!(version, TowerVersion::new(3, 8, 2));
    }

    #[test]
    fn test_parse_wrong_segment_count() {
        for bad in ["3.3", "3.3.0.1", "3", ""] {
            let err = bad.parse::<TowerVersion>().unwrap_err();
            assert!(
                err.to_string().contains("format X.Y.Z"),
                "unexpected message for {bad:?}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_bad_major() {
        let err = "a.3.0".parse::<TowerVersion>().unwrap_err();
        assert!(err.to_string().contains("major version"));
        assert!(err.to_string().contains("`a`"));
    }

    #[test]
    fn test_parse_bad_minor() {
        let err = "3.b.0".parse::<TowerVersion>().unwrap_err();
        assert!(err.to_string().contains("minor version"));
    }

    #[test]
    fn test_parse_bad_point() {
        let err = "3.3.c".parse::<TowerVersion>().unwrap_err();
        assert!(err.to_string().contains("point release"));
    }

    #[test]
    fn test_greater_or_equal_matrix() {
        let cases = [
            ("3.3.0", "2.3.0", true),
            ("3.3.0", "3.2.0", true),
            ("3.3.0", "3.3.0", true),
            ("3.3.1", "3.3.0", true),
            ("2.3.1", "3.3.0", false),
            ("3.2.1", "3.3.0", false),
            ("3.3.0", "3.3.1", false),
        ];
        for (mine, other, expected) in cases {
            assert_eq!(
                v(mine).is_greater_or_equal(&v(other)),
                expected,
                "{mine} is_greater_or_equal {other}"
            );
        }
    }

    #[test]
    fn test_greater_or_equal_minor_rule_ignores_major() {
        // The minor rule fires before majors are compared for equality.
        assert!(v("3.9.0").is_greater_or_equal(&v("4.2.0")));
        assert!(v("4.2.0").is_greater_or_equal(&v("3.9.0")));
    }

    #[test]
    fn test_is_at_least_strict() {
        assert!(!v("3.9.0").is_at_least(&v("4.2.0")));
        assert!(v("4.2.0").is_at_least(&v("3.9.0")));
        assert!(v("3.3.0").is_at_least(&v("3.3.0")));
        assert!(v("3.3.1").is_at_least(&v("3.3.0")));
        assert!(!v("3.3.0").is_at_least(&v("3.3.1")));
    }

    #[test]
    fn test_display_round_trips() {
        assert_eq!(v("10.0.3").to_string(), "10.0.3");
    }
}
