//! CLI for RWBA: random walk bias analysis of binary entropy streams.

mod commands;

use clap::{Parser, Subcommand};

use rwba_core::{AimMode, DEFAULT_TRIAL_COUNT};

use commands::{SourceArgs, parse_bias_delta, parse_mode};

#[derive(Parser)]
#[command(name = "rwba")]
#[command(about = "rwba: is this bit stream leaning one way?")]
#[command(version = rwba_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bias-analysis session and report the chi-squared verdict
    Analyze {
        /// Entropy source
        #[arg(long, default_value = "simulated", value_parser = ["simulated", "uploaded", "file", "qrng"])]
        source: String,

        /// Number of trials (each 21·n² bits)
        #[arg(long, default_value_t = DEFAULT_TRIAL_COUNT)]
        trials: usize,

        /// Aim mode: no-aim (two-tailed), aim-high, aim-low
        #[arg(long, default_value = "no-aim", value_parser = parse_mode)]
        mode: AimMode,

        /// Skew of the simulated source; negative favors ones
        #[arg(long, default_value = "0.0", value_parser = parse_bias_delta, allow_hyphen_values = true)]
        bias_delta: f64,

        /// Seed for the simulated source
        #[arg(long)]
        seed: Option<u64>,

        /// Bitstring for --source uploaded
        #[arg(long)]
        bits: Option<String>,

        /// Text file holding the bitstring for --source uploaded
        #[arg(long)]
        bits_file: Option<String>,

        /// Binary file for --source file
        #[arg(long)]
        file: Option<String>,

        /// Path to the MeterFeeder library for --source qrng
        #[arg(long)]
        library: Option<String>,

        /// Generator serial for --source qrng
        #[arg(long)]
        serial: Option<String>,

        /// Walk boundary half-width n
        #[arg(long, default_value_t = 31)]
        boundary: usize,

        /// Worker threads (default: available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Write the session record as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Mean, bias and lag-1 agreement of a bit stream
    Diagnose {
        /// Entropy source
        #[arg(long, default_value = "simulated", value_parser = ["simulated", "uploaded", "file", "qrng"])]
        source: String,

        /// Bits to draw from simulated or qrng sources
        #[arg(long, default_value_t = 1_000_000)]
        length: usize,

        /// Skew of the simulated source; negative favors ones
        #[arg(long, default_value = "0.0", value_parser = parse_bias_delta, allow_hyphen_values = true)]
        bias_delta: f64,

        /// Seed for the simulated source
        #[arg(long)]
        seed: Option<u64>,

        /// Bitstring for --source uploaded
        #[arg(long)]
        bits: Option<String>,

        /// Text file holding the bitstring for --source uploaded
        #[arg(long)]
        bits_file: Option<String>,

        /// Binary file for --source file
        #[arg(long)]
        file: Option<String>,

        /// Path to the MeterFeeder library for --source qrng
        #[arg(long)]
        library: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Report QRNG hardware availability
    Status {
        /// Path to the MeterFeeder library
        #[arg(long)]
        library: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Serve the analysis API over HTTP
    Server {
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Path to the MeterFeeder library for qrng sessions
        #[arg(long)]
        library: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            source,
            trials,
            mode,
            bias_delta,
            seed,
            bits,
            bits_file,
            file,
            library,
            serial,
            boundary,
            workers,
            output,
        } => commands::analyze::run(commands::analyze::AnalyzeCommandConfig {
            source: SourceArgs {
                source: &source,
                bias_delta,
                seed,
                bits: bits.as_deref(),
                bits_file: bits_file.as_deref(),
                file: file.as_deref(),
                library: library.as_deref(),
                serial: serial.as_deref(),
            },
            trials,
            mode,
            boundary,
            workers,
            output_path: output.as_deref(),
        }),
        Commands::Diagnose {
            source,
            length,
            bias_delta,
            seed,
            bits,
            bits_file,
            file,
            library,
            json,
        } => commands::diagnose::run(
            &SourceArgs {
                source: &source,
                bias_delta,
                seed,
                bits: bits.as_deref(),
                bits_file: bits_file.as_deref(),
                file: file.as_deref(),
                library: library.as_deref(),
                serial: None,
            },
            length,
            json,
        ),
        Commands::Status { library, json } => {
            commands::status::run(&commands::library_path(library.as_deref()), json)
        }
        Commands::Server {
            host,
            port,
            library,
        } => commands::server::run(&host, port, commands::library_path(library.as_deref())),
    }
}
