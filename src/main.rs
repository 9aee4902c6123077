use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;

use water::Provider;
use water::core::config::{self, CliOverrides};
use water::tui;

#[derive(Parser)]
#[command(name = "water", about = "Water IA: a Roblox Luau scripting assistant")]
struct Args {
    /// Model provider to use (overrides config and WATER_PROVIDER)
    #[arg(short, long, value_enum)]
    provider: Option<Provider>,

    /// Model name (overrides config and WATER_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Directory holding users, scripts and the log file
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("water: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cli = CliOverrides {
        provider: args.provider,
        model: args.model,
        data_dir: args.data_dir,
    };
    let resolved = config::resolve(&file_config, &cli);

    // File logger: stdout belongs to the terminal UI
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if fs::create_dir_all(&resolved.data_dir).is_ok()
        && let Ok(log_file) = File::create(resolved.data_dir.join("water.log"))
    {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!(
        "Water starting up with provider {:?}, model {}",
        resolved.provider,
        resolved.model_name
    );

    let provider = match tui::build_provider(&resolved) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("Could not build provider: {e}");
            eprintln!("water: {e}");
            return ExitCode::FAILURE;
        }
    };

    match tui::run(resolved, provider) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("water: {e}");
            ExitCode::FAILURE
        }
    }
}
