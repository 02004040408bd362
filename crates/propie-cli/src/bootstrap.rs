use anyhow::Context;
use propie_config::PropieConfig;

use crate::cli::GlobalFlags;

/// Load and validate configuration. `--config` replaces the user and
/// project files; environment variables apply either way.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<PropieConfig> {
    let config = match &flags.config {
        Some(path) => PropieConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PropieConfig::load_with_dotenv().context("failed to load configuration")?,
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}
