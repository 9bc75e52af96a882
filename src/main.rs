use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use xorshare::cli::{run_transform, show_plan, show_summary};
use xorshare::config::{OutputFormat, TransformOptions};
use xorshare::logging::{init_logging, LogFormat, LoggingConfig};
use xorshare::pipeline::DEFAULT_BLOCK_SIZE;

/// Version info from build.rs
const VERSION: &str = env!("XORSHARE_VERSION");
const BUILD: &str = env!("XORSHARE_BUILD");
const PROFILE: &str = env!("XORSHARE_PROFILE");
const GIT_HASH: &str = env!("XORSHARE_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} {} build {} ({})", PROFILE, VERSION, BUILD, GIT_HASH))
}

#[derive(Parser)]
#[command(name = "xorshare")]
#[command(
    about = "Split directory trees into XOR one-time-pad shares, or combine shares back",
    long_about = "Every file under the input roots is XOR-combined (shorter copies read as \
                  zero-padded) and written to the output roots. With several outputs, all \
                  but the last receive random pads and the last receives the remainder; \
                  all outputs are needed to recover the data."
)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Add an input directory or file
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    inputs: Vec<PathBuf>,

    /// Add an output directory or file
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    outputs: Vec<PathBuf>,

    /// Bytes per block in the copy loop
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Files processed in parallel (0 = one per CPU)
    #[arg(short = 'j', long, default_value_t = 0)]
    jobs: usize,

    /// Continue with the remaining files when one fails
    #[arg(long)]
    keep_going: bool,

    /// Scan the inputs and print the plan without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Report format: text or json
    #[arg(long, default_value = "text", value_parser = parse_format)]
    format: OutputFormat,

    /// More log output on stderr (repeat for more)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// No log output
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format: text or json
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("xorshare {}", get_version());
        return ExitCode::SUCCESS;
    }

    let logging = LoggingConfig {
        verbosity: cli.verbose,
        quiet: cli.quiet,
        format: cli.log_format,
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = TransformOptions {
        inputs: cli.inputs,
        outputs: cli.outputs,
        block_size: cli.block_size,
        jobs: cli.jobs,
        keep_going: cli.keep_going,
    };

    let result = if cli.dry_run {
        match show_plan(&options, cli.format) {
            Ok(plan) => {
                print!("{}", plan);
                Ok(())
            }
            Err(e) => Err(e),
        }
    } else {
        match run_transform(&options) {
            Ok(summary) => match show_summary(&summary, cli.format) {
                Ok(report) => {
                    print!("{}", report);
                    summary.into_result().map(|_| ())
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
