//! Config command handlers

use anyhow::{Context, Result};

use rentready_core::Config;

use crate::output::{Output, OutputFormat};

fn or_unset<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&config),
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  storage:              {}", config.storage);
            println!("  remote_url:           {}", or_unset(config.remote_url.as_deref()));
            println!("  sync_enabled:         {}", config.sync_enabled);
            println!("  probe_interval_secs:  {}", config.probe_interval_secs);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  log_file:             {}",
                or_unset(config.log_file.as_ref().map(|p| p.display()))
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let path = Config::config_file_path();
    let mut config = Config::load_from_path(&path).context("Failed to load configuration")?;

    config.set(&key, &value)?;
    config
        .save_to_path(&path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}
