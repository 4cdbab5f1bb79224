//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - SABRE qubit mapping and routing",
        style("qroute").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qroute-ir       Wire-form circuit IR and JSON programs");
    println!("  qroute-compile  Devices, placement and the SABRE router");
    println!("  qroute-cli      Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
