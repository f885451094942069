//! Wires C1..C5 and the Clock Store into the long-lived workers: W1
//! (pulse capture) runs on its own thread; W2 (the signal pipeline) runs
//! inline in `run`; the one-shot resync scratch worker is spawned fresh
//! each minute.
//!
//! The autonomous RTC reader/writer is collapsed into synchronous
//! register writes inside `RtcClockStore::set_command` rather than a
//! fourth thread — see DESIGN.md for that design decision. The ordering
//! guarantees this relies on (resync independent of bit collection,
//! `WRITE_DATE_TIME` only after `READ`) hold regardless of whether that
//! responder is its own thread or folded into the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bits::BitClassifier;
use crate::clock_store::ClockStore;
use crate::config::Config;
use crate::decode::decode_frame;
use crate::errors::WwvbError;
use crate::frame::collect_frame;
use crate::pulse::{run_capture_loop, EdgeSource, PulseMailbox};
use crate::sync::{find_minute_boundary, resync_delay, spawn_resync, PriorFrameState};

/// Century used to expand the RTC's 2-digit year field into a full
/// 4-digit commit value; the RV-3028-C7 itself only supports 2000-2099.
pub const CENTURY_BASE: i32 = 2000;

/// Runs the engine forever against `edge_source` and `clock`.
///
/// `clock_valid` is set to `true` the moment the first frame is
/// successfully committed and is never cleared again; it's handed in
/// separately from the `ClockStore` trait so callers (e.g. an LCD
/// renderer) can watch it without needing a `ClockStore` reference of
/// their own.
///
/// Returns only on a fatal error: `WorkerSpawnFailed` if the
/// pulse-capture or a resync scratch worker can't be spawned.
pub fn run<S, C>(
    edge_source: S,
    clock: Arc<C>,
    cfg: Config,
    clock_valid: Arc<AtomicBool>,
) -> Result<(), WwvbError<C::Error>>
where
    S: EdgeSource + Send + 'static,
    C: ClockStore + Send + Sync + 'static,
{
    let mailbox = Arc::new(PulseMailbox::new());
    let capture_mailbox = mailbox.clone();

    std::thread::Builder::new()
        .name("wwvb-pulse-capture".into())
        .spawn(move || run_capture_loop(edge_source, &capture_mailbox))
        .map_err(|_| WwvbError::WorkerSpawnFailed)?;

    let mut classifier = BitClassifier::new(&mailbox, cfg);
    let mut prior = PriorFrameState::default();

    loop {
        let top_of_minute = find_minute_boundary(&mut classifier, &prior);
        log::info!(
            "top of minute at edge={} (leap_second_consumed={})",
            top_of_minute.edge_time,
            top_of_minute.leap_second_consumed
        );

        let Some(raw_frame) = collect_frame(&mut classifier, top_of_minute.edge_time, &cfg) else {
            log::warn!("frame accumulation failed; resuming search");
            continue;
        };

        let decoded = match decode_frame(&raw_frame) {
            Ok(decoded) => decoded,
            Err(reason) => {
                log::warn!("frame decode rejected: {reason}");
                continue;
            }
        };

        // Resync the second counter independently of, and in parallel
        // with, the next round of bit collection.
        let (delay, carry) = resync_delay(&cfg, decoded.dut_sign, decoded.dut_tenths);
        spawn_resync(clock.clone(), delay, 1 + carry).map_err(|_| WwvbError::WorkerSpawnFailed)?;

        match crate::decode::commit(clock.as_ref(), &decoded, CENTURY_BASE) {
            Ok(()) => {
                clock_valid.store(true, Ordering::Release);
                let (month, day) =
                    crate::decode::day_of_year_to_month_day(decoded.day_of_year, decoded.leap_year)
                        .unwrap_or((0, 0));
                log::info!(
                    "committed {:04}-{:02}-{:02} {:02}:{:02} decoded from WWVB frame",
                    CENTURY_BASE + decoded.year as i32,
                    month,
                    day,
                    decoded.hour,
                    decoded.minute
                );
            }
            Err(err) => {
                log::error!("clock store commit failed: {err:?}");
            }
        }

        prior = PriorFrameState {
            leap_second_pending: decoded.leap_second_pending,
            last_day_of_month: is_last_day_of_month(&decoded),
            hour: decoded.hour,
            minute: decoded.minute,
        };
    }
}

fn is_last_day_of_month(decoded: &crate::decode::DecodedTime) -> bool {
    let Some((month, day)) = crate::decode::day_of_year_to_month_day(decoded.day_of_year, decoded.leap_year)
    else {
        return false;
    };
    day == crate::calendar::days_in_month(month, decoded.leap_year) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_day_of_month_detection() {
        use crate::decode::{DecodedTime, DstState, DutSign};
        let decoded = DecodedTime {
            minute: 59,
            hour: 23,
            day_of_year: 365, // Dec 31 in a non-leap year
            year: 23,
            dut_sign: DutSign::Positive,
            dut_tenths: 0,
            leap_year: false,
            leap_second_pending: true,
            dst_state: DstState::Standard,
        };
        assert!(is_last_day_of_month(&decoded));
    }
}
