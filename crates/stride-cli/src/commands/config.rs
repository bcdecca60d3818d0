//! Config command implementation.

use anyhow::{Context as _, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

use super::Context;

pub fn cmd_config(ctx: &Context, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", ctx.config_path.display());
        }
        ConfigAction::Show => {
            let content =
                toml::to_string_pretty(&ctx.config).context("Failed to serialize config")?;
            print!("{}", content);
        }
        ConfigAction::Init { force } => {
            if ctx.config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    ctx.config_path.display()
                );
            }
            Config::default().save_to(&ctx.config_path)?;
            if !ctx.quiet {
                println!("Wrote {}", ctx.config_path.display());
            }
        }
    }
    Ok(())
}
