use crate::error::{ReleaseError, Result};
use semver::{Prerelease, Version};
use std::fmt;
use std::str::FromStr;

/// How a release increments the manifest version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpType {
    Major,
    Minor,
    Patch,
    Prerelease,
}

impl BumpType {
    pub const ALL: [BumpType; 4] = [
        BumpType::Major,
        BumpType::Minor,
        BumpType::Patch,
        BumpType::Prerelease,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BumpType::Major => "major",
            BumpType::Minor => "minor",
            BumpType::Patch => "patch",
            BumpType::Prerelease => "prerelease",
        }
    }

    /// Error returned for a missing or unrecognised bump type
    pub fn invalid() -> ReleaseError {
        let names: Vec<&str> = BumpType::ALL.iter().map(|b| b.name()).collect();
        ReleaseError::BumpType(format!(
            "You must specify a release type as one of ({}), e.g. \"--type minor\"",
            names.join(", ")
        ))
    }
}

impl FromStr for BumpType {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        BumpType::ALL
            .iter()
            .copied()
            .find(|b| b.name() == s)
            .ok_or_else(BumpType::invalid)
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a manifest version string (e.g. "1.2.3" or "2.0.0-beta.1")
pub fn parse_version(raw: &str) -> Result<Version> {
    Version::parse(raw.trim())
        .map_err(|e| ReleaseError::version(format!("Invalid version '{}': {}", raw, e)))
}

/// Bump a version the way `npm version <type>` does.
///
/// - **Major**: `1.2.3 -> 2.0.0`, but `2.0.0-1 -> 2.0.0`
/// - **Minor**: `1.2.3 -> 1.3.0`, but `1.3.0-1 -> 1.3.0`
/// - **Patch**: `1.2.3 -> 1.2.4`, but `1.2.4-1 -> 1.2.4`
/// - **Prerelease**: `1.2.3 -> 1.2.4-0`, `1.2.4-beta.1 -> 1.2.4-beta.2`,
///   `1.2.4-beta -> 1.2.4-beta.0`
///
/// Build metadata is always dropped.
pub fn bump(current: &Version, bump_type: BumpType) -> Result<Version> {
    let mut next = Version::new(current.major, current.minor, current.patch);
    let has_pre = !current.pre.is_empty();

    match bump_type {
        BumpType::Major => {
            if current.minor != 0 || current.patch != 0 || !has_pre {
                next.major += 1;
            }
            next.minor = 0;
            next.patch = 0;
        }
        BumpType::Minor => {
            if current.patch != 0 || !has_pre {
                next.minor += 1;
            }
            next.patch = 0;
        }
        BumpType::Patch => {
            if !has_pre {
                next.patch += 1;
            }
        }
        BumpType::Prerelease => {
            if has_pre {
                next.pre = increment_prerelease(&current.pre)?;
            } else {
                next.patch += 1;
                next.pre = Prerelease::new("0").map_err(|e| ReleaseError::version(e.to_string()))?;
            }
        }
    }

    Ok(next)
}

fn increment_prerelease(pre: &Prerelease) -> Result<Prerelease> {
    let mut parts: Vec<String> = pre.as_str().split('.').map(str::to_string).collect();

    let last_numeric = parts
        .iter()
        .rposition(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    match last_numeric {
        Some(idx) => {
            let n: u64 = parts[idx]
                .parse()
                .map_err(|_| ReleaseError::version(format!("Pre-release counter overflow: {}", pre)))?;
            let next = n.checked_add(1).ok_or_else(|| {
                ReleaseError::version(format!("Pre-release counter overflow: {}", pre))
            })?;
            parts[idx] = next.to_string();
        }
        None => parts.push("0".to_string()),
    }

    Prerelease::new(&parts.join(".")).map_err(|e| ReleaseError::version(e.to_string()))
}
