//! C2 — Bit Classifier.
//!
//! Consumes pulse samples from C1 and turns each into a `BitSymbol` plus a
//! `phase_valid` flag, while maintaining the SNR ring used for the coarse
//! 0-3 signal-quality bar.

use std::collections::VecDeque;

use crate::config::Config;
use crate::pulse::{MonotonicMillis, PulseMailbox};

/// The decoded value of one received pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitSymbol {
    Zero,
    One,
    Marker,
    Invalid,
}

/// One classified bit as handed to C3/C4.
///
/// `edge_time` is `None` for `Invalid` symbols, replacing the legacy
/// legacy sentinel-integer approach some WWVB decoders use; an explicit
/// optional makes "no edge" a type-level fact instead of a magic value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedBit {
    pub symbol: BitSymbol,
    pub edge_time: Option<MonotonicMillis>,
    pub phase_valid: bool,
}

/// Classify a pulse width against the configured bands.
fn classify_width(width_ms: u32, cfg: &Config) -> BitSymbol {
    if cfg.zero_band.contains(width_ms) {
        BitSymbol::Zero
    } else if cfg.one_band.contains(width_ms) {
        BitSymbol::One
    } else if cfg.marker_band.contains(width_ms) {
        BitSymbol::Marker
    } else {
        BitSymbol::Invalid
    }
}

/// Ring buffer of the last `N` inter-edge intervals, reduced to a coarse
/// 0-3 signal-quality bar.
pub struct SnrWindow {
    intervals: VecDeque<i64>,
    capacity: usize,
}

impl SnrWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, interval_ms: i64) {
        if self.intervals.len() == self.capacity {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval_ms);
    }

    fn mean(&self) -> i64 {
        if self.intervals.is_empty() {
            return 1000;
        }
        let sum: i64 = self.intervals.iter().sum();
        sum / self.intervals.len() as i64
    }

    /// Coarse 0-3 quality bar: 0 is worst, 3 is best. Buckets the absolute
    /// deviation of the mean inter-edge interval from 1000 ms.
    pub fn quality(&self) -> u8 {
        let deviation = (1000 - self.mean()).unsigned_abs();
        match deviation {
            0..=100 => 3,
            101..=400 => 2,
            401..=700 => 1,
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Drives C2: polls the pulse mailbox, filters noise, classifies widths,
/// and tracks inter-edge timing for the SNR window.
pub struct BitClassifier<'a> {
    mailbox: &'a PulseMailbox,
    cfg: Config,
    cursor: MonotonicMillis,
    previous_edge: Option<MonotonicMillis>,
    snr: SnrWindow,
}

impl<'a> BitClassifier<'a> {
    pub fn new(mailbox: &'a PulseMailbox, cfg: Config) -> Self {
        let snr = SnrWindow::new(cfg.snr_window_len);
        Self {
            mailbox,
            cfg,
            cursor: 0,
            previous_edge: None,
            snr,
        }
    }

    pub fn snr_quality(&self) -> u8 {
        self.snr.quality()
    }

    /// Block (cooperatively polling at ~1 ms) until the next pulse arrives,
    /// then classify it. Pulses narrower than `noise_floor_ms` are
    /// filtered here and never returned to the caller; the loop instead
    /// moves on to the next pulse.
    pub fn next_bit(&mut self) -> ClassifiedBit {
        loop {
            let sample = self.mailbox.wait_for_next(self.cursor);
            self.cursor = sample.edge_time;

            if sample.width_ms < self.cfg.noise_floor_ms {
                log::debug!(
                    "noise pulse rejected: width_ms={} at edge={}",
                    sample.width_ms,
                    sample.edge_time
                );
                continue;
            }

            let symbol = classify_width(sample.width_ms, &self.cfg);

            let interval = self
                .previous_edge
                .map(|prev| sample.edge_time as i64 - prev as i64);
            if let Some(interval_ms) = interval {
                self.snr.push(interval_ms);
            }
            self.previous_edge = Some(sample.edge_time);

            if symbol == BitSymbol::Invalid {
                log::debug!(
                    "invalid pulse width {} at edge={}",
                    sample.width_ms,
                    sample.edge_time
                );
                return ClassifiedBit {
                    symbol,
                    edge_time: None,
                    phase_valid: false,
                };
            }

            let phase_valid = interval
                .map(|delta| (delta - 1000).abs() <= self.cfg.edge_tolerance_ms)
                .unwrap_or(false);

            return ClassifiedBit {
                symbol,
                edge_time: Some(sample.edge_time),
                phase_valid,
            };
        }
    }
}
