//! Configuration types and path resolution for threadmap.
//!
//! Settings live as TOML at the platform's XDG config path
//! (e.g. `~/.config/threadmap/config.toml` on Linux), optionally overridden
//! by a `threadmap.toml` found between the working directory and the git root.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;
use tracing::debug;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            debug!("merging project config");
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }
}
