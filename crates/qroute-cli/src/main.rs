//! qroute Command-Line Interface
//!
//! Maps JSON programs onto restricted-connectivity devices with the SABRE
//! router.
//!
//! ```text
//! qroute map -i bell.json -d "ring(5)" -o bell.mapped.json
//! qroute device -d "grid(3, 4)"
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{device, map, version};

/// qroute - SABRE qubit mapping and routing
#[derive(Parser)]
#[command(name = "qroute")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a JSON program onto a device
    Map {
        /// Input program (JSON)
        #[arg(short, long)]
        input: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Device, e.g. path, ring(8), star(5, 0), grid(3, 4), file(dev.txt)
        #[arg(short, long)]
        device: Option<String>,

        /// Mapping configuration (YAML)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Build a device and print its connectivity
    Device {
        /// Device specification
        #[arg(short, long)]
        device: String,

        /// Number of program qubits, used when the device has no dimensions
        #[arg(short = 'n', long)]
        qubits: Option<u32>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Map {
            input,
            output,
            device,
            config,
        } => map::execute(&input, output.as_deref(), device.as_deref(), config.as_deref()),

        Commands::Device { device: spec, qubits } => device::execute(&spec, qubits),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
