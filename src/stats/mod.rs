//! Throughput accounting and operational statistics
//!
//! This module provides:
//! - The shared throughput ledger written by every server loop
//! - Sliding-window rate queries for dashboards and periodic log summaries
//! - Byte-count formatting helpers

pub mod format;
pub mod ledger;

pub use format::format_bytes;
pub use ledger::{DirectionalRate, LedgerError, RateReport, ThroughputLedger, TrafficLabel};
