//! Throughput accounting ledger
//!
//! Records every byte sent or received, tagged by traffic label, in a
//! fixed-capacity ring and answers sliding-window rate queries. All control
//! and media loops write into one shared instance; a single mutex guards
//! both the ring and the lifetime totals so the invariants hold under
//! arbitrary interleavings.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use crate::protocol::constants::DEFAULT_LEDGER_CAPACITY;
use crate::protocol::TrafficClass;
use crate::stats::format::format_bytes;

/// Ledger tag for one accounting entry
///
/// Pure control messages (no traffic class on the envelope) are tagged
/// `Control`; everything else is tagged by its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficLabel {
    Control,
    Video,
    Audio,
    Text,
    File,
}

impl From<TrafficClass> for TrafficLabel {
    fn from(class: TrafficClass) -> Self {
        match class {
            TrafficClass::Video => TrafficLabel::Video,
            TrafficClass::Audio => TrafficLabel::Audio,
            TrafficClass::Text => TrafficLabel::Text,
            TrafficClass::File => TrafficLabel::File,
        }
    }
}

impl From<Option<TrafficClass>> for TrafficLabel {
    fn from(class: Option<TrafficClass>) -> Self {
        class.map_or(TrafficLabel::Control, TrafficLabel::from)
    }
}

impl std::fmt::Display for TrafficLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficLabel::Control => write!(f, "CONTROL"),
            TrafficLabel::Video => write!(f, "VIDEO"),
            TrafficLabel::Audio => write!(f, "AUDIO"),
            TrafficLabel::Text => write!(f, "TEXT"),
            TrafficLabel::File => write!(f, "FILE"),
        }
    }
}

/// One send/receive accounting record
#[derive(Debug, Clone)]
struct ThroughputEntry {
    at: Instant,
    bytes_sent: u64,
    bytes_received: u64,
    label: TrafficLabel,
}

/// Sent/received rates for one label, in bytes per second
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionalRate {
    pub sent: f64,
    pub received: f64,
}

/// Result of a sliding-window rate query
#[derive(Debug, Clone)]
pub struct RateReport {
    /// Aggregate sent rate over the window, bytes per second
    pub total_sent_rate: f64,
    /// Aggregate received rate over the window, bytes per second
    pub total_received_rate: f64,
    /// Per-label rates over the window
    pub by_label: HashMap<TrafficLabel, DirectionalRate>,
    /// Lifetime bytes sent, unaffected by ring eviction
    pub total_bytes_sent: u64,
    /// Lifetime bytes received, unaffected by ring eviction
    pub total_bytes_received: u64,
}

/// Error type for ledger queries
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Rate query with a zero or negative window
    InvalidWindow(f64),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InvalidWindow(w) => {
                write!(f, "Rate window must be positive, got {}", w)
            }
        }
    }
}

impl std::error::Error for LedgerError {}

struct LedgerInner {
    entries: VecDeque<ThroughputEntry>,
    capacity: usize,
    total_sent: u64,
    total_received: u64,
}

/// Bounded-history, thread-safe byte counters with windowed rate queries
///
/// The ring holds at most `capacity` entries; the oldest is evicted first,
/// bounding memory regardless of call rate. Lifetime totals are monotonic
/// and never evicted.
pub struct ThroughputLedger {
    inner: Mutex<LedgerInner>,
}

impl ThroughputLedger {
    /// Create a ledger with the default ring capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }

    /// Create a ledger holding at most `capacity` recent entries
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LedgerInner {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                total_sent: 0,
                total_received: 0,
            }),
        }
    }

    /// Record bytes sent under the given label
    pub fn record_sent(&self, bytes: u64, label: TrafficLabel) {
        self.record(bytes, 0, label);
    }

    /// Record bytes received under the given label
    pub fn record_received(&self, bytes: u64, label: TrafficLabel) {
        self.record(0, bytes, label);
    }

    fn record(&self, sent: u64, received: u64, label: TrafficLabel) {
        let mut inner = self.inner.lock().expect("ledger lock poisoned");

        inner.total_sent += sent;
        inner.total_received += received;

        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(ThroughputEntry {
            at: Instant::now(),
            bytes_sent: sent,
            bytes_received: received,
            label,
        });
    }

    /// Compute rates over the last `window_secs` seconds.
    ///
    /// Only entries with a timestamp inside the window contribute. Rates
    /// are byte sums divided by the window length.
    pub fn rate_since(&self, window_secs: f64) -> Result<RateReport, LedgerError> {
        if window_secs <= 0.0 {
            return Err(LedgerError::InvalidWindow(window_secs));
        }

        let inner = self.inner.lock().expect("ledger lock poisoned");
        let now = Instant::now();

        let mut by_label: HashMap<TrafficLabel, DirectionalRate> = HashMap::new();
        for entry in &inner.entries {
            if now.duration_since(entry.at).as_secs_f64() > window_secs {
                continue;
            }
            let rate = by_label.entry(entry.label).or_default();
            rate.sent += entry.bytes_sent as f64;
            rate.received += entry.bytes_received as f64;
        }

        let mut total_sent_rate = 0.0;
        let mut total_received_rate = 0.0;
        for rate in by_label.values_mut() {
            rate.sent /= window_secs;
            rate.received /= window_secs;
            total_sent_rate += rate.sent;
            total_received_rate += rate.received;
        }

        Ok(RateReport {
            total_sent_rate,
            total_received_rate,
            by_label,
            total_bytes_sent: inner.total_sent,
            total_bytes_received: inner.total_received,
        })
    }

    /// Lifetime bytes sent
    pub fn total_sent(&self) -> u64 {
        self.inner.lock().expect("ledger lock poisoned").total_sent
    }

    /// Lifetime bytes received
    pub fn total_received(&self) -> u64 {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .total_received
    }

    /// One-line operational summary over the given window
    pub fn summary(&self, window_secs: f64) -> Result<String, LedgerError> {
        let report = self.rate_since(window_secs)?;
        Ok(format!(
            "Sent: {:.2} B/s, Received: {:.2} B/s, Total Sent: {}, Total Received: {}",
            report.total_sent_rate,
            report.total_received_rate,
            format_bytes(report.total_bytes_sent),
            format_bytes(report.total_bytes_received),
        ))
    }
}

impl Default for ThroughputLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_over_window() {
        let ledger = ThroughputLedger::new();

        ledger.record_sent(1000, TrafficLabel::Video);
        ledger.record_sent(500, TrafficLabel::Video);
        ledger.record_received(200, TrafficLabel::Control);

        let report = ledger.rate_since(5.0).unwrap();

        // 1500 bytes sent over a 5 second window
        assert_eq!(report.total_sent_rate, 300.0);
        assert_eq!(report.total_received_rate, 40.0);
        assert_eq!(report.total_bytes_sent, 1500);
        assert_eq!(report.total_bytes_received, 200);
    }

    #[test]
    fn test_per_label_rates() {
        let ledger = ThroughputLedger::new();

        ledger.record_sent(100, TrafficLabel::Video);
        ledger.record_sent(300, TrafficLabel::Audio);
        ledger.record_received(50, TrafficLabel::Audio);

        let report = ledger.rate_since(2.0).unwrap();

        let video = report.by_label[&TrafficLabel::Video];
        let audio = report.by_label[&TrafficLabel::Audio];
        assert_eq!(video.sent, 50.0);
        assert_eq!(video.received, 0.0);
        assert_eq!(audio.sent, 150.0);
        assert_eq!(audio.received, 25.0);
        assert!(!report.by_label.contains_key(&TrafficLabel::Text));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let ledger = ThroughputLedger::new();

        assert!(matches!(
            ledger.rate_since(0.0),
            Err(LedgerError::InvalidWindow(w)) if w == 0.0
        ));
        assert!(matches!(
            ledger.rate_since(-3.0),
            Err(LedgerError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_bounded_history_evicts_oldest() {
        let ledger = ThroughputLedger::with_capacity(2);

        ledger.record_sent(100, TrafficLabel::Text);
        ledger.record_sent(200, TrafficLabel::Text);
        ledger.record_sent(400, TrafficLabel::Text);

        let report = ledger.rate_since(10.0).unwrap();

        // Only the two newest entries survive in the ring
        assert_eq!(report.total_sent_rate, 60.0);
        // Lifetime totals are unaffected by eviction
        assert_eq!(report.total_bytes_sent, 700);
    }

    #[test]
    fn test_concurrent_writers() {
        use std::sync::Arc;

        let ledger = Arc::new(ThroughputLedger::with_capacity(16));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for _ in 0..250 {
                    ledger.record_sent(1, TrafficLabel::Control);
                    ledger.record_received(2, TrafficLabel::Control);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.total_sent(), 1000);
        assert_eq!(ledger.total_received(), 2000);
    }

    #[test]
    fn test_summary_formatting() {
        let ledger = ThroughputLedger::new();
        ledger.record_sent(2048, TrafficLabel::File);

        let summary = ledger.summary(1.0).unwrap();
        assert!(summary.contains("Total Sent: 2.00 KB"));
    }

    #[test]
    fn test_label_from_class() {
        assert_eq!(TrafficLabel::from(None), TrafficLabel::Control);
        assert_eq!(
            TrafficLabel::from(Some(TrafficClass::Video)),
            TrafficLabel::Video
        );
    }
}
