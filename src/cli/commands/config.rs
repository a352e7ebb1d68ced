//! Configuration display command.

use crate::config::{self, Config};

use super::Context;

const MASK: &str = "********";

/// Show where the config lives and what is in effect
pub fn cmd_config(ctx: &Context, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config::save(&ctx.config)?;
        println!("✓ Wrote {}", path.display());
    } else {
        match config::config_path() {
            Some(path) if path.exists() => println!("Config file: {}", path.display()),
            Some(path) => println!("Config file: {} (not created; using defaults)", path.display()),
            None => println!("Config file: no config directory on this platform"),
        }
    }
    println!("Database:    {}", ctx.db_path.display());
    println!();
    print!("{}", toml::to_string_pretty(&masked(&ctx.config))?);
    Ok(())
}

/// Copy of the config with credentials hidden.
fn masked(config: &Config) -> Config {
    let mut shown = config.clone();
    let hide = |value: &mut Option<String>| {
        if value.is_some() {
            *value = Some(MASK.to_string());
        }
    };
    hide(&mut shown.credentials.lookup_api_key);
    hide(&mut shown.credentials.playlist_source_token);
    shown
}
