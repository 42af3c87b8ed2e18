//! Release versions and tag filtering.
//!
//! Release tags have the form `<repo>-<major>.<minor>.<patch>`. Only the
//! highest patch of each `major.minor` release line is published.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// A semantic version, ordered by `(major, minor, patch)`.
///
/// A pre-release sorts before the plain version with the same triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    pre_release: String,
}

impl Version {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: String::new(),
        }
    }

    /// Parse `X.Y.Z` with an optional `-pre` suffix. Build metadata is dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = semver::Version::parse(input.trim()).map_err(|e| Error::InvalidVersion {
            input: input.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre_release: parsed.pre.as_str().to_owned(),
        })
    }

    /// Version of a release tag such as `josman-1.2.3`.
    pub fn from_tag(repo_name: &str, tag: &str) -> Result<Self> {
        let raw = tag
            .strip_prefix(repo_name)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(|| Error::InvalidVersion {
                input: tag.to_owned(),
                reason: format!("release tags must look like '{repo_name}-X.Y.Z'"),
            })?;
        Self::parse(raw)
    }

    /// Version of a maintenance branch named `branch-X.Y`, with patch 0.
    pub fn from_branch_name(branch: &str) -> Result<Self> {
        let raw = branch
            .strip_prefix("branch-")
            .ok_or_else(|| Error::InvalidVersion {
                input: branch.to_owned(),
                reason: "branch name does not start with 'branch-'".to_owned(),
            })?;
        Self::parse(&format!("{raw}.0"))
    }

    /// Snapshot version for a project version: the pre-release part is dropped.
    pub fn snapshot(project_version: &str) -> Result<Self> {
        Ok(Self::parse(project_version)?.without_pre_release())
    }

    #[must_use]
    pub fn without_pre_release(&self) -> Self {
        Self {
            pre_release: String::new(),
            ..self.clone()
        }
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn pre_release(&self) -> &str {
        &self.pre_release
    }

    /// `major.minor`, the name of the version's output directory.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn same_release_line(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// `<repo>-X.Y.Z`.
    pub fn release_tag(&self, repo_name: &str) -> String {
        format!("{repo_name}-{self}")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre_release.is_empty() {
            write!(f, "-{}", self.pre_release)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| {
                match (self.pre_release.is_empty(), other.pre_release.is_empty()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => self.pre_release.cmp(&other.pre_release),
                }
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A release tag together with its parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
    pub version: Version,
}

/// Release tags of `repo_name`, one per release line (highest patch wins),
/// sorted ascending. Tags of other repos or with unparsable versions are
/// skipped.
pub fn version_tags<S: AsRef<str>>(repo_name: &str, tags: &[S]) -> Vec<ReleaseTag> {
    let mut lines: BTreeMap<(u64, u64), ReleaseTag> = BTreeMap::new();
    for tag in tags {
        let name = tag.as_ref();
        let Ok(version) = Version::from_tag(repo_name, name) else {
            tracing::debug!(tag = name, "Skipping non-release tag");
            continue;
        };
        let key = (version.major, version.minor);
        let replace = lines
            .get(&key)
            .is_none_or(|current| version.patch > current.version.patch);
        if replace {
            lines.insert(
                key,
                ReleaseTag {
                    name: name.to_owned(),
                    version,
                },
            );
        }
    }
    lines.into_values().collect()
}

/// [`version_tags`] minus the ignored versions.
pub fn version_tags_to_process<S: AsRef<str>>(
    repo_name: &str,
    tags: &[S],
    ignored: &[Version],
) -> Vec<ReleaseTag> {
    version_tags(repo_name, tags)
        .into_iter()
        .filter(|tag| !ignored.contains(&tag.version))
        .collect()
}
