//! C4 — Frame Accumulator.
//!
//! Gathers the 58 interior bits (seconds 1..58) of a WWVB minute, checking
//! marker positions and bit-arrival phase as it goes, and bails out on the
//! first defect.

use crate::bits::{BitClassifier, BitSymbol};
use crate::config::Config;
use crate::pulse::MonotonicMillis;

/// A successfully accumulated 58-interior-bit frame.
///
/// `bits[sec]` holds the symbol received at second `sec` (1..=58); index 0
/// is unused (positions 0 and 59 are the minute markers handled by the
/// frame synchronizer, not part of the interior frame). `value` is a
/// 58-bit shift register built alongside `bits`, kept as a diagnostic raw
/// value even though `bits` is what the decoder actually reads from.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame {
    bits: [BitSymbol; 59],
    value: u64,
}

impl RawFrame {
    /// Symbol received at second `sec` (1..=58).
    pub fn bit_at(&self, sec: usize) -> BitSymbol {
        self.bits[sec]
    }

    /// The raw shift register value, for diagnostics.
    pub fn raw_value(&self) -> u64 {
        self.value
    }
}

/// Signed offset, in milliseconds, of `edge_time` from its nominal
/// position `sec` seconds after `minute_start` — re-expressed as the
/// (possibly negative) distance to the nearer second boundary.
fn phase_offset_ms(edge_time: MonotonicMillis, minute_start: MonotonicMillis, sec: u64) -> i64 {
    let nominal = minute_start as i64 + (sec as i64) * 1000;
    let raw = edge_time as i64 - nominal;
    let modded = raw.rem_euclid(1000);
    if modded > 500 {
        modded - 1000
    } else {
        modded
    }
}

/// Collects one minute's interior frame, starting from `minute_start`
/// (the top-of-minute edge time the frame synchronizer handed off).
/// Returns `None` as soon as any second fails validation.
pub fn collect_frame(
    classifier: &mut BitClassifier,
    minute_start: MonotonicMillis,
    cfg: &Config,
) -> Option<RawFrame> {
    let mut bits = [BitSymbol::Invalid; 59];
    let mut value: u64 = 0;

    for sec in 1u64..=58 {
        let bit = classifier.next_bit();

        if !bit.phase_valid {
            log::debug!("frame rejected at sec={sec}: phase_invalid");
            return None;
        }

        let is_marker_position = sec % 10 == 9;
        if is_marker_position {
            if bit.symbol != BitSymbol::Marker {
                log::debug!("frame rejected at sec={sec}: expected MARKER, got {:?}", bit.symbol);
                return None;
            }
        } else {
            match bit.symbol {
                BitSymbol::Zero | BitSymbol::One => {
                    let edge_time = bit.edge_time.expect("valid symbol carries edge_time");
                    let offset = phase_offset_ms(edge_time, minute_start, sec);
                    if offset.unsigned_abs() > cfg.phase_tolerance_ms as u64 {
                        log::debug!(
                            "frame rejected at sec={sec}: phase_offset={offset}ms exceeds tolerance"
                        );
                        return None;
                    }
                }
                _ => {
                    log::debug!("frame rejected at sec={sec}: expected ZERO/ONE, got {:?}", bit.symbol);
                    return None;
                }
            }
        }

        bits[sec as usize] = bit.symbol;
        value <<= 1;
        if bit.symbol == BitSymbol::One {
            value |= 1;
        }
    }

    Some(RawFrame { bits, value })
}
