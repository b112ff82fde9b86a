//! Bulk checking: attempts, retry loop, dispatch and result files
//!
//! This module provides functionality for:
//! - Classifying one item per request against the verification endpoint
//! - Retrying transient faults and unexpected statuses until a definitive answer
//! - Running items concurrently with a bounded worker count
//! - Appending live and dead results to durable files

pub mod attempt;
pub mod engine;
pub mod fault;
pub mod sink;
pub mod worker;

pub use attempt::{Attempt, HttpVerifier, Verifier, FALLBACK_REASON};
pub use engine::{Dispatcher, RunProgress, RunSummary};
pub use fault::IsTransient;
pub use sink::{Category, ResultSink};
pub use worker::{Assignment, ItemReport, Verdict};
