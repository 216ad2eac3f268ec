//! CLI entry point.

use clap::error::ErrorKind;
use clap::Parser;

use adaptive_cube::app::{self, AppConfig};
use adaptive_cube::oracle::{CommandOracle, FuzzyOracle, QualityOracle};

/// Adaptive-quality rotating-cube demo.
#[derive(Parser, Debug)]
#[command(name = "adaptive-cube")]
#[command(about = "Renders a rotating cube and adapts render quality to telemetry")]
struct Cli {
    /// Enable diagnostic (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Run an external oracle process instead of the built-in fuzzy rule
    /// table. The process receives one line of five readings on stdin per
    /// frame and must answer with a tier index in {0, 1, 2}.
    #[arg(long, value_name = "COMMAND")]
    oracle: Option<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" })
            }),
        )
        .init();

    // The oracle is constructed before any rendering context exists and
    // dropped only after app::run has released every GPU resource, so a
    // subprocess oracle's lifetime brackets the rendering session.
    let oracle: Box<dyn QualityOracle> = match &cli.oracle {
        Some(command) => match CommandOracle::spawn(command) {
            Ok(oracle) => Box::new(oracle),
            Err(err) => {
                eprintln!("{}", err.diagnostic_block());
                std::process::exit(1);
            }
        },
        None => Box::new(FuzzyOracle::new()),
    };

    let config = AppConfig {
        verbose: cli.verbose,
    };
    if let Err(err) = app::run(config, oracle) {
        eprintln!("{}", err.diagnostic_block());
        std::process::exit(1);
    }
}
