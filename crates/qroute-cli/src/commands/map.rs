//! Map command implementation.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::fs;

use qroute_compile::{PassManagerBuilder, RoutingStats};
use qroute_ir::Program;
use tracing::debug;

use super::common::{load_config, load_program};

/// JSON document written by the map command.
#[derive(Debug, Serialize)]
pub struct MapOutput {
    /// The mapped program over physical qubit indices.
    pub program: Program,
    /// Physical qubit of each program qubit at the end of the program.
    pub mapping_v2p: Vec<u32>,
    /// Number of swaps inserted by routing.
    pub swaps: usize,
}

/// Execute the map command.
pub fn execute(
    input: &str,
    output: Option<&str>,
    device: Option<&str>,
    config: Option<&str>,
) -> Result<()> {
    let config = load_config(config, device)?;
    let program = load_program(input)?;

    // With no output file the JSON goes to stdout; keep the summary off it.
    let report = |line: String| {
        if output.is_some() {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    };

    report(format!(
        "{} Mapping {} onto {}",
        style("→").cyan().bold(),
        style(input).green(),
        style(&config.device).yellow()
    ));
    report(format!(
        "  Loaded: {} qubits, {} instructions",
        program.num_qubits,
        program.instructions.len()
    ));

    let mut kernel = program.into_kernel()?;
    debug!("Lowered kernel:\n{}", kernel);

    let (pm, mut props) = PassManagerBuilder::new().with_config(&config)?.build();
    pm.run(&mut kernel, &mut props)?;

    let swaps = props.get::<RoutingStats>().map_or(0, |s| s.swaps);
    let mapping_v2p = props
        .mapping
        .as_ref()
        .map(|m| m.to_u32_vec())
        .unwrap_or_default();
    let physical = kernel.to_physical_program()?;

    report(format!("{} Mapping complete", style("✓").green().bold()));
    report(format!(
        "  Result: {} instructions, {} swaps, {} device qubits",
        physical.instructions.len(),
        swaps,
        props.device.as_ref().map_or(0, |d| d.num_qubits())
    ));
    report(format!("  Map (virtual → physical): {mapping_v2p:?}"));

    let document = MapOutput {
        program: physical,
        mapping_v2p,
        swaps,
    };
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write file: {path}"))?;
            println!("  Output: {}", style(path).green());
        }
        None => println!("{json}"),
    }

    Ok(())
}
