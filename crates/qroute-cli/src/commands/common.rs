//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use qroute_compile::{DeviceSpec, MappingConfig};
use qroute_ir::Program;

/// Load a program from a JSON file.
pub fn load_program(path: &str) -> Result<Program> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    Program::from_json(&source).map_err(|e| anyhow::anyhow!("Parse error in {path}: {e}"))
}

/// Load the mapping configuration, letting `device` override the file's
/// device.
pub fn load_config(config: Option<&str>, device: Option<&str>) -> Result<MappingConfig> {
    let mut config = match config {
        Some(path) => MappingConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration: {path}"))?,
        None => MappingConfig::default(),
    };
    if let Some(device) = device {
        config.device = device.to_string();
        config.validate()?;
    }
    Ok(config)
}

/// Parse a device specification string.
pub fn parse_device(spec: &str) -> Result<DeviceSpec> {
    Ok(spec.parse::<DeviceSpec>()?)
}
