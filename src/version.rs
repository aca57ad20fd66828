use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Dotted numeric version with up to four parts: major.minor.patch.build.
/// Missing parts compare as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    parts: [u32; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse version number: {0}")]
pub struct VersionParseError(pub String);

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self { parts: [major, minor, patch, build] }
    }

    pub fn major(&self) -> u32 {
        self.parts[0]
    }

    pub fn minor(&self) -> u32 {
        self.parts[1]
    }

    pub fn patch(&self) -> u32 {
        self.parts[2]
    }

    pub fn build(&self) -> u32 {
        self.parts[3]
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim().trim_matches('"');
        if trimmed.is_empty() {
            return Err(VersionParseError(text.to_string()));
        }

        let mut parts = [0u32; 4];
        for (index, part) in trimmed.split('.').enumerate() {
            if index >= parts.len() || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionParseError(text.to_string()));
            }
            parts[index] = part.parse().map_err(|_| VersionParseError(text.to_string()))?;
        }

        Ok(Self { parts })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.parts[0], self.parts[1], self.parts[2], self.parts[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        text.parse().unwrap()
    }

    #[test]
    fn missing_parts_are_zero() {
        assert_eq!(v("3.6"), Version::new(3, 6, 0, 0));
        assert_eq!(v("3.6.0"), v("3.6.0.0"));
    }

    #[test]
    fn compares_numerically_not_lexically() {
        assert!(v("3.10.0") > v("3.9.9"));
        assert!(v("3.6.0.5") >= v("3.6.0"));
        assert!(v("3.6.0.5") < v("3.6.0.6"));
        assert!(v("3.6.0.5") < v("3.7.0"));
        assert!(v("3.6.0.5") > v("2.7.2"));
    }

    #[test]
    fn accepts_quoted_versions() {
        assert_eq!(v("\"3.6.0\""), Version::new(3, 6, 0, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("abc".parse::<Version>().is_err());
        assert!("3..1".parse::<Version>().is_err());
        assert!("1.2.3.4.5".parse::<Version>().is_err());
        assert!("3.6a".parse::<Version>().is_err());
    }

    #[test]
    fn parse_error_names_the_text() {
        let err = "3.x".parse::<Version>().unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse version number: 3.x");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn display_has_four_parts() {
        assert_eq!(v("3.6").to_string(), "3.6.0.0");
    }
}
