use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;

use conclave_server::{ConclaveServer, ServerConfig};

use crate::cli::*;

/// Effective configuration: the file when given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

pub async fn run_command(command: Command, config: ServerConfig) -> anyhow::Result<()> {
    match command {
        Command::Serve(args) => cmd_serve(args, config).await,
        Command::Config(args) => cmd_config(args, config),
    }
}

async fn cmd_serve(args: ServeArgs, mut config: ServerConfig) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    config.validate()?;
    println!(
        "{} Conclave server on {}",
        "✓".green().bold(),
        config.bind_addr.to_string().bold()
    );
    println!("  Transaction attempts: {}", config.transaction_attempts.to_string().cyan());
    println!("  Announcement TTL: {}s", config.announcement_ttl_secs.to_string().cyan());
    println!(
        "  Task attempts: {} ({}ms apart)",
        config.task_max_attempts.to_string().cyan(),
        config.task_retry_delay_ms
    );
    ConclaveServer::new(config).serve().await?;
    Ok(())
}

fn cmd_config(args: ConfigArgs, config: ServerConfig) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Check => {
            config.validate()?;
            println!("{} Configuration is valid.", "✓".green().bold());
            Ok(())
        }
        ConfigAction::Init { path, force } => {
            write_default_config(&path, force)?;
            println!("{} Wrote {}", "✓".green().bold(), path.display().to_string().bold());
            Ok(())
        }
    }
}

fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let body = ServerConfig::default().to_toml()?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
