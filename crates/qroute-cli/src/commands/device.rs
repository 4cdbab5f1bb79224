//! Device command implementation.

use anyhow::{Context, Result};
use console::style;

use super::common::parse_device;

/// Execute the device command.
pub fn execute(device: &str, qubits: Option<u32>) -> Result<()> {
    let spec = parse_device(device)?;
    let num_qubits = qubits.unwrap_or(0) as usize;
    let device = spec
        .build(num_qubits)
        .with_context(|| format!("Failed to build device '{spec}' (pass --qubits to size it)"))?;

    println!(
        "{} Device {}",
        style("→").cyan().bold(),
        style(&spec).yellow()
    );
    println!(
        "  Connectivity: {}",
        if device.is_connected() {
            style("connected").green()
        } else {
            style("disconnected").red()
        }
    );
    println!();
    print!("{device}");

    Ok(())
}
