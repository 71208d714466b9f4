//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use sfvoice_config::{SynthConfig, find_config};
use sfvoice_synth::EngineSettings;

/// Resolve engine settings from an explicit file, a discovered file, or
/// the defaults, in that order.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<EngineSettings> {
    let config = match explicit.map(Path::to_path_buf).or_else(find_config) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            SynthConfig::load(&path)?
        }
        None => SynthConfig::default(),
    };
    Ok(config.to_settings()?)
}
