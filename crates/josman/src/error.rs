//! CLI error types.

use josman_config::ConfigError;
use josman_vcs::VcsError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Site(#[from] josman_site::Error),

    #[error("{0}")]
    Vcs(#[from] VcsError),
}
