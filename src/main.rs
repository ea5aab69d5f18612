mod cli;
mod error;
mod launcher;
mod logging;
mod model;
mod orchestrator;
mod paths;
mod store;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    if is_headless {
        logging::init_stderr(args.verbose)?;
    } else {
        let log_path = match &args.log_file {
            Some(p) => p.clone(),
            None => paths::default_log_path()?,
        };
        logging::init_file(&log_path, args.verbose)?;
    }

    let code = cli::run(args).await?;
    if is_headless {
        // Propagate the OpenOCD exit status in headless mode
        std::process::exit(code);
    }
    Ok(())
}
