//! Bounded aggregation of satellite acquisition results.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use crate::framing::Frame;
use crate::{Error, Result};

/// One satellite acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcqRecord {
    /// PRN of the satellite the attempt was made against.
    pub sat: u8,
    /// Signal-to-noise ratio of the attempt.
    pub snr: f32,
}

impl AcqRecord {
    /// `MSG_ACQ_RESULT` payload length: SNR, code phase, carrier frequency
    /// and PRN.
    pub const PAYLOAD_LEN: usize = 13;

    /// Decode from a `MSG_ACQ_RESULT` payload, or `None` if too short.
    ///
    /// Code phase and carrier frequency are present on the wire but not
    /// consumed here.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.len() < Self::PAYLOAD_LEN {
            return None;
        }
        Some(AcqRecord {
            sat: payload[12],
            snr: f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        })
    }

    /// Encode as a `MSG_ACQ_RESULT` payload.
    #[must_use]
    pub fn to_payload(self) -> Vec<u8> {
        let mut payload = vec![0u8; Self::PAYLOAD_LEN];
        payload[..4].copy_from_slice(&self.snr.to_le_bytes());
        payload[12] = self.sat;
        payload
    }
}

/// Insertion-ordered window of acquisition results with derived statistics.
///
/// `capacity` bounds the number of retained records, 0 meaning unbounded.
/// When full, the oldest record is evicted before each append, so the newest
/// `capacity` records are always retained in arrival order.
#[derive(Debug, Default)]
pub struct AcqResults {
    records: VecDeque<AcqRecord>,
    capacity: usize,
}

impl AcqResults {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        AcqResults {
            records: VecDeque::new(),
            capacity,
        }
    }

    /// New store wrapped for sharing between the decode loop (writer) and the
    /// monitor (reader).
    #[must_use]
    pub fn shared(capacity: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Append `record`, evicting from the front first if the store is full.
    pub fn ingest(&mut self, record: AcqRecord) {
        while self.capacity > 0 && self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &AcqRecord> {
        self.records.iter()
    }

    /// Maximum SNR across retained records, or 0 when the store is empty.
    /// The empty case is a legitimate query result, not an error.
    #[must_use]
    pub fn max_snr(&self) -> f32 {
        self.records
            .iter()
            .map(|r| r.snr)
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    /// Mean of each satellite's maximum SNR, taken over the satellites whose
    /// maximum meets `threshold` (inclusive); 0 when none qualify.
    ///
    /// This answers "how strong are the signals we are confidently tracking",
    /// ignoring satellites never acquired well enough to matter.
    #[must_use]
    pub fn mean_max_snrs(&self, threshold: f32) -> f32 {
        let mut best: HashMap<u8, f32> = HashMap::new();
        for r in &self.records {
            let snr = best.entry(r.sat).or_insert(f32::NEG_INFINITY);
            if r.snr > *snr {
                *snr = r.snr;
            }
        }

        let mut sum = 0.0f32;
        let mut count = 0usize;
        for snr in best.values().filter(|snr| **snr >= threshold) {
            sum += *snr;
            count += 1;
        }
        if count == 0 {
            return 0.0;
        }
        sum / count as f32
    }

    /// Render the report: the most recent `tail` records, the maximum SNR,
    /// and the mean of qualifying per-satellite maxima at `threshold`.
    #[must_use]
    pub fn summary(&self, tail: usize, threshold: f32) -> String {
        let skip = self.records.len().saturating_sub(tail);
        let mut out = String::new();
        let _ = writeln!(out, "Last {} acquisitions:", self.records.len() - skip);
        for r in self.records.iter().skip(skip) {
            let _ = writeln!(out, "PRN {:2}, SNR: {:6.2}", r.sat, r.snr);
        }
        let _ = writeln!(out, "Max SNR         : {:6.2}", self.max_snr());
        let _ = writeln!(out, "Mean of max SNRs: {:6.2}", self.mean_max_snrs(threshold));
        out
    }
}

/// Dispatcher subscriber that ingests `MSG_ACQ_RESULT` frames into `results`.
///
/// A payload too short to decode is a handler-local error: the dispatcher
/// logs it and the stream continues.
pub fn subscriber(
    results: Arc<Mutex<AcqResults>>,
) -> impl FnMut(&Frame) -> Result<()> + Send + 'static {
    move |frame: &Frame| {
        let record =
            AcqRecord::from_payload(&frame.payload).ok_or_else(|| Error::ShortPayload {
                msg_type: frame.msg_type,
                len: frame.payload.len(),
            })?;
        results
            .lock()
            .expect("acquisition results lock poisoned")
            .ingest(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sat: u8, snr: f32) -> AcqRecord {
        AcqRecord { sat, snr }
    }

    #[test]
    fn bounded_store_keeps_newest_in_order() {
        let mut results = AcqResults::new(3);
        for i in 1..=5 {
            results.ingest(record(i, f32::from(i)));
        }

        assert_eq!(results.len(), 3);
        let sats: Vec<u8> = results.records().map(|r| r.sat).collect();
        assert_eq!(sats, [3, 4, 5], "newest records retained, order preserved");
    }

    #[test]
    fn unbounded_store_never_evicts() {
        let mut results = AcqResults::new(0);
        for i in 0..1000 {
            results.ingest(record(1, i as f32));
        }
        assert_eq!(results.len(), 1000);
    }

    #[test]
    fn max_snr_of_empty_store_is_zero() {
        assert_eq!(AcqResults::new(0).max_snr(), 0.0);
    }

    #[test]
    fn max_snr_over_records() {
        let mut results = AcqResults::new(0);
        results.ingest(record(1, 10.0));
        results.ingest(record(2, 30.0));
        assert_eq!(results.max_snr(), 30.0);
    }

    #[test]
    fn mean_of_qualifying_per_satellite_maxima() {
        let mut results = AcqResults::new(0);
        results.ingest(record(1, 10.0));
        results.ingest(record(1, 28.0));
        results.ingest(record(2, 30.0));
        results.ingest(record(3, 20.0));

        // Qualifying maxima are 28 (sat 1) and 30 (sat 2)
        assert_eq!(results.mean_max_snrs(25.0), 29.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut results = AcqResults::new(0);
        results.ingest(record(1, 25.0));
        assert_eq!(results.mean_max_snrs(25.0), 25.0);
    }

    #[test]
    fn mean_is_zero_when_no_satellite_qualifies() {
        let mut results = AcqResults::new(0);
        results.ingest(record(1, 10.0));
        results.ingest(record(2, 20.0));
        assert_eq!(results.mean_max_snrs(25.0), 0.0);

        assert_eq!(AcqResults::new(0).mean_max_snrs(25.0), 0.0);
    }

    #[test]
    fn payload_round_trip() {
        let rec = record(22, 31.5);
        let got = AcqRecord::from_payload(&rec.to_payload()).unwrap();
        assert_eq!(got, rec);
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(AcqRecord::from_payload(&[0u8; 12]).is_none());
    }

    #[test]
    fn summary_reports_tail_and_statistics() {
        let mut results = AcqResults::new(0);
        results.ingest(record(1, 10.0));
        results.ingest(record(1, 28.0));
        results.ingest(record(2, 30.0));

        let report = results.summary(2, 25.0);
        assert!(report.starts_with("Last 2 acquisitions:"));
        assert!(!report.contains("SNR:  10.00"), "only the tail is listed");
        assert!(report.contains("PRN  1, SNR:  28.00"));
        assert!(report.contains("PRN  2, SNR:  30.00"));
        assert!(report.contains("Max SNR         :  30.00"));
        assert!(report.contains("Mean of max SNRs:  29.00"));
    }

    #[test]
    fn summary_of_empty_store() {
        let report = AcqResults::new(0).summary(32, 25.0);
        assert!(report.contains("Last 0 acquisitions:"));
        assert!(report.contains("Max SNR         :   0.00"));
    }
}
