//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_reporter;
pub use validate::run_validate;

use std::path::Path;

use contracts::ReporterConfig;

use crate::error::{CliError, Result};

/// Load and validate configuration, failing early on a missing file
pub(crate) fn load_config(path: &Path) -> Result<ReporterConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
