//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/sfvoice/config.toml`
//! - macOS: `~/Library/Application Support/sfvoice/config.toml`
//! - Windows: `%APPDATA%\sfvoice\config.toml`
//!
//! ```rust,no_run
//! use sfvoice_config::paths;
//!
//! if let Some(path) = paths::find_config() {
//!     println!("Using config at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FileOp};

/// Application name used for directory paths.
const APP_NAME: &str = "sfvoice";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the working directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the path of the user configuration file.
pub fn user_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Locate a configuration file.
///
/// Searches `./sfvoice.toml` first, then the user configuration file.
pub fn find_config() -> Option<PathBuf> {
    find_config_in(Path::new("."), &user_config_dir())
}

/// Search `local_dir/sfvoice.toml` then `user_dir/config.toml`.
pub fn find_config_in(local_dir: &Path, user_dir: &Path) -> Option<PathBuf> {
    let local = local_dir.join(format!("{APP_NAME}.toml"));
    if local.is_file() {
        return Some(local);
    }
    let user = user_dir.join(CONFIG_FILE);
    user.is_file().then_some(user)
}

/// Create the user configuration directory if it does not exist.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::io(FileOp::CreateDir, &dir, e))?;
    }
    Ok(dir)
}
