use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::PresetArg;
use crate::session::SessionConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Parameter preset to start from
    #[arg(long, value_enum, default_value = "streaming")]
    pub preset: PresetArg,

    /// Turn on the adaptive controller in the written config
    #[arg(long)]
    pub adaptive: bool,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full session config as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let mut config = SessionConfig::from_preset(args.preset.into());
    config.adaptive.enabled = args.adaptive;
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
