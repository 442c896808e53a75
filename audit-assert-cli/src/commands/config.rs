use crate::config::ConfigLoader;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(explicit: Option<&Path>, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(explicit),
        ConfigCommands::Path => show_paths(explicit),
    }
}

fn show_config(explicit: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths(explicit: Option<&Path>) -> Result<()> {
    println!("User config:     {:?}", ConfigLoader::user_config_path());
    println!("Explicit config: {:?}", explicit);
    Ok(())
}
