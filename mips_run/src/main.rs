use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use crate::app::App;
use crate::config::Config;
use crate::error::{Result, RunError};

mod app;
mod config;
mod error;

fn run() -> Result<()> {
    let path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(RunError::Usage)?;

    let config = Config::load(&path)?;
    let mut app = App::start(config)?;
    let report = app.run()?;

    info!(
        "{} instructions in {} slices, PC: 0x{:08x}{}",
        report.executed,
        report.slices,
        report.pc,
        if report.stopped { " (stopped)" } else { "" }
    );

    Ok(())
}

fn main() -> ExitCode {
    // Also forwards the `log` records emitted by the interpreter
    tracing_subscriber::fmt().init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
