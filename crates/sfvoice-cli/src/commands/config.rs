//! Engine configuration file management.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use sfvoice_config::{SynthConfig, paths};

use super::common::load_settings;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration
    Init {
        /// Destination (defaults to the user config file)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file to read instead of the discovered one
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the user configuration file path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Init { path, force } => {
            let path = match path {
                Some(p) => p,
                None => paths::ensure_user_config_dir()?.join(paths::CONFIG_FILE),
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            SynthConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Show { config } => {
            let settings = load_settings(config.as_deref())?;
            print!("{}", SynthConfig::from(&settings).to_toml()?);
        }
        ConfigCommand::Path => {
            println!("{}", paths::user_config_path().display());
        }
    }
    Ok(())
}
