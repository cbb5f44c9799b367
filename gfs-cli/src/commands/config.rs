use std::fs;

use anyhow::{Context, Result, bail};
use shared::config::client::ClientConfig;

/// Writes a default configuration file (`gfs.yaml` or `gfs.json`) to the
/// current directory.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str) -> Result<()> {
    let config = ClientConfig::with_defaults();
    let (file_name, serialized) = match format {
        "yaml" => ("gfs.yaml", serde_yml::to_string(&config)?),
        "json" => ("gfs.json", serde_json::to_string_pretty(&config)?),
        other => bail!("unsupported format '{other}'; use 'yaml' or 'json'"),
    };

    fs::write(file_name, serialized)
        .with_context(|| format!("failed to write configuration file {file_name}"))?;
    println!("Configuration file '{file_name}' generated successfully.");
    Ok(())
}
