//! # ringlane-test-support
//!
//! Testing infrastructure for ringlane.
//!
//! ## Components
//!
//! - **StressConfig / run_spsc / run_mpsc** - Multi-threaded runs over the real rings
//! - **ProducerOrderChecker** - Per-producer FIFO and no-loss / no-duplication checks
//!
//! ## Inspired By
//!
//! Aeron's comprehensive testing infrastructure:
//! - `aeron-test-support` - Test harnesses and utilities
//! - `aeron-system-tests` - End-to-end system tests

pub mod stress;
pub mod verify;

pub use stress::{
    join_producers, print_summary, run_mpsc, run_spsc, Drain, StressConfig, StressCounters,
    StressReport,
};
pub use verify::{decode, encode, ProducerOrderChecker, VerifyStats};
