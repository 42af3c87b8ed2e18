//! Build modes and the feature presets they imply.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::ConfigError;

/// Build mode selecting a preset of site generation toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local work: snapshot only, lenient.
    #[default]
    Dev,
    /// Continuous integration: like `dev`, with javadoc.
    Ci,
    /// Full preview of a release site.
    Staging,
    /// Published site: past releases only, strict.
    Release,
}

/// Generation toggles implied by a [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePreset {
    pub snapshot: bool,
    pub releases: bool,
    pub fail_on_error: bool,
    pub javadoc: bool,
}

impl Mode {
    #[must_use]
    pub fn preset(self) -> ModePreset {
        match self {
            Self::Dev => ModePreset {
                snapshot: true,
                releases: false,
                fail_on_error: false,
                javadoc: false,
            },
            Self::Ci => ModePreset {
                snapshot: true,
                releases: false,
                fail_on_error: false,
                javadoc: true,
            },
            Self::Staging => ModePreset {
                snapshot: true,
                releases: true,
                fail_on_error: true,
                javadoc: true,
            },
            Self::Release => ModePreset {
                snapshot: false,
                releases: true,
                fail_on_error: true,
                javadoc: true,
            },
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Ci => "ci",
            Self::Staging => "staging",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "ci" => Ok(Self::Ci),
            "staging" => Ok(Self::Staging),
            "release" => Ok(Self::Release),
            other => Err(ConfigError::Validation(format!(
                "unknown mode '{other}', expected one of: dev, ci, staging, release"
            ))),
        }
    }
}
