//! Command implementations for the mtrack CLI.

mod filter;
mod init;
mod inspect;

pub use filter::{cmd_filter, FilterCommand};
pub use init::cmd_init;
pub use inspect::cmd_inspect;

use std::path::Path;

use mtrack_core::config::{load_config, load_config_file, TrackConfig};

use crate::types::Overrides;

/// Load the config file and apply flags on top.
///
/// An explicit path must load; otherwise the usual search locations are tried
/// and built-in defaults fill in when none of them exists.
pub(crate) fn resolve_config(
    config_path: Option<&Path>,
    overrides: &Overrides,
) -> Result<TrackConfig, String> {
    let mut config = match config_path {
        Some(path) => {
            let config = load_config_file(path).map_err(|e| e.to_string())?;
            log::info!("using config {}", path.display());
            config
        }
        None => {
            let handle = load_config(None);
            for warning in &handle.warnings {
                log::debug!("config: {}", warning);
            }
            handle.config
        }
    };

    overrides.apply(&mut config)?;
    Ok(config)
}
