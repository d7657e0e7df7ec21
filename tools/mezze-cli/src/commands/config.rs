//! Configuration management commands.

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{CliConfig, CONFIG_FILE_NAMES};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
    }
}

/// Copy of `config` safe to print.
fn redacted(config: &CliConfig) -> CliConfig {
    let mut config = config.clone();
    if let Some(key) = config.site.identity.anon_key.as_mut() {
        *key = mask(key);
    }
    config
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if visible.len() == secret.len() {
        return "***".to_string();
    }
    format!("{}***", visible)
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = redacted(&ctx.config);

    if ctx.output.is_json() {
        ctx.output.json(&config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        if ctx.output.is_json() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            ctx.output.info("Keeping existing config");
            return Ok(());
        }
    }

    CliConfig::default().save(&config_path.to_string_lossy())?;
    ctx.output
        .success(&format!("Wrote {}", config_path.display()));
    ctx.output
        .info("Credentials are read from the environment; see `mezze env-check`.");
    Ok(())
}
