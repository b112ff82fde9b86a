//! Error types for the checker library

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading inputs, building clients or running checks
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No items found in {}", path.display())]
    EmptyInput { path: PathBuf },
}

/// Library result type
pub type Result<T> = std::result::Result<T, CheckError>;
