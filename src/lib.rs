//! Bulk Checker - concurrent identity verification
//!
//! Checks a list of items (emails) against a verification endpoint with a
//! bounded number of workers, optional rotating proxies and append-only
//! result files.

pub mod check;
pub mod config;
pub mod error;
pub mod input;
pub mod proxy;

pub use check::*;
pub use config::{CheckerConfig, RequestProfile};
pub use error::{CheckError, Result};
pub use proxy::*;
