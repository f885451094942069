//! C1 — Pulse Capture.
//!
//! Measures the width of each negative pulse on the WWVB receiver's digital
//! output and publishes `(edge_time, width_ms)` as an atomic pair. Runs on
//! its own worker thread; the only contract downstream consumers rely on
//! is that both fields of a `PulseSample` are always read together, and
//! that a fresh sample is visible by the time the falling edge that
//! produced it has fully been processed.

use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// One measured pulse: when its falling edge occurred, and how long (in
/// whole milliseconds) the line stayed low.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseSample {
    pub edge_time: MonotonicMillis,
    pub width_ms: u32,
}

/// A monotonic timestamp, expressed in milliseconds since an arbitrary
/// epoch fixed at process start. Using a plain integer (rather than
/// `std::time::Instant`, which isn't `Copy`-comparable across threads in a
/// way that's convenient to store in a mailbox) keeps `PulseSample` cheap
/// to copy and compare.
pub type MonotonicMillis = u64;

/// Converts a `std::time::Instant` to `MonotonicMillis` relative to `epoch`.
pub fn millis_since(epoch: Instant, now: Instant) -> MonotonicMillis {
    now.saturating_duration_since(epoch).as_millis() as MonotonicMillis
}

/// Single-writer, multi-reader mailbox for the latest pulse sample.
///
/// The capture worker is the sole writer; the bit classifier polls it,
/// suspending only while waiting for the next pulse. A `Condvar` lets
/// `wait_for_next` block cooperatively instead of spin-polling in a tight
/// loop, while still checking roughly every 1 ms via a timeout wait.
pub struct PulseMailbox {
    inner: Mutex<Option<PulseSample>>,
    published: Condvar,
}

impl PulseMailbox {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            published: Condvar::new(),
        }
    }

    /// Publish a newly captured pulse. Called only by W1.
    pub fn publish(&self, sample: PulseSample) {
        let mut guard = self.inner.lock().unwrap();
        *guard = Some(sample);
        self.published.notify_all();
    }

    /// Return the most recent sample, if it is newer than `after`.
    pub fn latest_since(&self, after: MonotonicMillis) -> Option<PulseSample> {
        let guard = self.inner.lock().unwrap();
        match *guard {
            Some(sample) if sample.edge_time > after => Some(sample),
            _ => None,
        }
    }

    /// Block, polling at roughly 1 ms granularity, until a sample newer
    /// than `after` is published.
    pub fn wait_for_next(&self, after: MonotonicMillis) -> PulseSample {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(sample) = *guard {
                if sample.edge_time > after {
                    return sample;
                }
            }
            let (next_guard, _timeout) = self
                .published
                .wait_timeout(guard, std::time::Duration::from_millis(1))
                .unwrap();
            guard = next_guard;
        }
    }
}

impl Default for PulseMailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Abstraction over the hardware line the WWVB receiver's output is wired
/// to. A real implementation (see `demos/live_decode.rs`) polls a GPIO
/// line via `gpiocdev`; tests supply a synthetic source.
pub trait EdgeSource {
    /// Block until the line goes low (falling edge), returning the
    /// timestamp.
    fn wait_falling(&mut self) -> MonotonicMillis;
    /// Block until the line goes high again (rising edge), returning the
    /// timestamp.
    fn wait_rising(&mut self) -> MonotonicMillis;
}

/// Runs the pulse capture loop against `source`, publishing every
/// measured pulse width into `mailbox`. Never returns; intended to be the
/// body of the capture worker thread.
///
/// Pulses shorter than the noise floor are still published here; noise
/// filtering happens downstream in the bit classifier.
pub fn run_capture_loop(mut source: impl EdgeSource, mailbox: &PulseMailbox) -> ! {
    loop {
        let fall = source.wait_falling();
        let rise = source.wait_rising();
        let width_ms = rise.saturating_sub(fall) as u32;
        log::trace!("pulse captured: edge={fall} width_ms={width_ms}");
        mailbox.publish(PulseSample {
            edge_time: fall,
            width_ms,
        });
    }
}
