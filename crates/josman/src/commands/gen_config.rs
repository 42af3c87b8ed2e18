//! `josman gen-config` command implementation.

use console::Term;
use josman_config::CONFIG_TEMPLATE;

use crate::error::CliError;

/// Print the stock configuration to stdout.
pub(crate) fn execute() -> Result<(), CliError> {
    Term::stdout().write_str(CONFIG_TEMPLATE)?;
    Ok(())
}
