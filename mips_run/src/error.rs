use std::path::PathBuf;

use mips_cpu::MipsError;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, RunError>;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Usage: mips_run <config.ini>")]
    Usage,
    #[error("No Image given in the [Run] section of {0}")]
    MissingImage(PathBuf),
    #[error("Memory image is empty: {0}")]
    EmptyImage(PathBuf),
    #[error("Interpreter error: {0}")]
    Mips(#[from] MipsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Couldn't load config: {0}")]
    Ini(#[from] ini::Error),
}
