//! C3 — Frame Synchronizer.
//!
//! Finds the minute boundary by watching for two consecutive phase-valid
//! markers (three during a leap-second minute), then fires a one-shot
//! scratch worker that resynchronizes the Clock Store's second counter.

use std::sync::Arc;
use std::time::Duration;

use crate::bits::{BitClassifier, BitSymbol};
use crate::clock_store::{ClockCommand, ClockStore};
use crate::config::Config;
use crate::decode::DutSign;
use crate::pulse::MonotonicMillis;

/// Carries just enough state from the previously decoded frame to resolve
/// the leap-second minute's extra-marker special case, without needing
/// the whole `DecodedTime` kept around.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriorFrameState {
    pub leap_second_pending: bool,
    pub last_day_of_month: bool,
    pub hour: u8,
    pub minute: u8,
}

impl PriorFrameState {
    fn expects_leap_second(&self) -> bool {
        self.leap_second_pending && self.last_day_of_month && self.hour == 23 && self.minute == 59
    }
}

/// Result of a successful minute-boundary search.
#[derive(Clone, Copy, Debug)]
pub struct TopOfMinute {
    pub edge_time: MonotonicMillis,
    /// True if a third marker (the leap-second insertion case) was
    /// consumed to reach this boundary.
    pub leap_second_consumed: bool,
}

/// Searches for the next minute boundary: `SEARCHING` until a phase-valid
/// marker arrives, then `WAIT_SECOND` for a confirming one. Non-marker or
/// phase-invalid bits restart the search.
pub fn find_minute_boundary(
    classifier: &mut BitClassifier,
    prior: &PriorFrameState,
) -> TopOfMinute {
    loop {
        // SEARCHING
        let first = loop {
            let bit = classifier.next_bit();
            if bit.symbol == BitSymbol::Marker && bit.phase_valid {
                break bit;
            }
        };

        // WAIT_SECOND
        let second = classifier.next_bit();
        if second.symbol == BitSymbol::Marker && second.phase_valid {
            if prior.expects_leap_second() {
                let third = classifier.next_bit();
                if third.symbol == BitSymbol::Marker && third.phase_valid {
                    log::info!("leap second minute: consumed three consecutive markers");
                    return TopOfMinute {
                        edge_time: third.edge_time.expect("marker always carries edge_time"),
                        leap_second_consumed: true,
                    };
                }
                // Third marker failed to materialize; treat `second` as
                // top-of-minute and fall through to normal locking, since
                // two consecutive markers were still observed.
            }
            return TopOfMinute {
                edge_time: second.edge_time.expect("marker always carries edge_time"),
                leap_second_consumed: false,
            };
        }
        // second wasn't a confirming marker: restart the search rather
        // than re-trying it as a fresh candidate.
        let _ = first;
    }
}

/// Computes the resync delay and the `seconds` value to commit:
/// `Δ = 205ms + (tenths of DUT × 100ms)`, clamped to stay positive by
/// adding whole seconds, which become `carry`.
pub fn resync_delay(cfg: &Config, dut_sign: DutSign, dut_tenths: u8) -> (Duration, u8) {
    let signed_tenths: i64 = match dut_sign {
        DutSign::Positive => dut_tenths as i64,
        DutSign::Negative => -(dut_tenths as i64),
        DutSign::Invalid => 0,
    };
    let mut delta_ms = cfg.resync_base_delay_ms + signed_tenths * cfg.resync_dut_step_ms;
    let mut carry: u8 = 0;
    while delta_ms <= 0 {
        delta_ms += 1000;
        carry += 1;
    }
    (Duration::from_millis(delta_ms as u64), carry)
}

/// Spawns the one-shot scratch worker that performs the actual
/// `SYNC_SECONDS` resync after `delay`. Returns immediately so the
/// synchronizer can begin frame accumulation without blocking.
pub fn spawn_resync<C>(
    clock: Arc<C>,
    delay: Duration,
    seconds: u8,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    C: ClockStore + Send + Sync + 'static,
{
    std::thread::Builder::new()
        .name("wwvb-resync".into())
        .spawn(move || {
            std::thread::sleep(delay);
            while clock.read_command() != ClockCommand::Read {
                std::thread::sleep(Duration::from_millis(1));
            }
            clock.set_command(ClockCommand::SyncSeconds(seconds));
            log::debug!("resync issued: seconds={seconds}");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock_store::MailboxClockStore;
    use crate::pulse::{PulseMailbox, PulseSample};

    fn publish_pulse(mailbox: &PulseMailbox, edge_time: MonotonicMillis, width_ms: u32) {
        mailbox.publish(PulseSample { edge_time, width_ms });
    }

    #[test]
    fn locks_on_two_consecutive_markers() {
        let mailbox = PulseMailbox::new();
        let mut classifier = BitClassifier::new(&mailbox, Config::default());
        // A marker followed one second later by a confirming marker.
        publish_pulse(&mailbox, 1_000, 800);
        let _ = classifier.next_bit();
        publish_pulse(&mailbox, 2_000, 800);

        let result = find_minute_boundary(&mut classifier, &PriorFrameState::default());
        assert_eq!(result.edge_time, 2_000);
        assert!(!result.leap_second_consumed);
    }

    #[test]
    fn leap_second_minute_consumes_three_markers() {
        let mailbox = PulseMailbox::new();
        let mut classifier = BitClassifier::new(&mailbox, Config::default());
        publish_pulse(&mailbox, 1_000, 800);
        let _ = classifier.next_bit();
        publish_pulse(&mailbox, 2_000, 800);

        let prior = PriorFrameState {
            leap_second_pending: true,
            last_day_of_month: true,
            hour: 23,
            minute: 59,
        };

        // find_minute_boundary will ask for a third bit; we must publish it
        // before the call drains the mailbox, so run it from a scripted
        // sequence instead of pre-publishing (classifier blocks until a
        // newer sample exists).
        std::thread::scope(|scope| {
            let mailbox_ref = &mailbox;
            let handle = scope.spawn(move || find_minute_boundary(&mut classifier, &prior));
            std::thread::sleep(Duration::from_millis(20));
            publish_pulse(mailbox_ref, 3_000, 800);
            let result = handle.join().unwrap();
            assert_eq!(result.edge_time, 3_000);
            assert!(result.leap_second_consumed);
        });
    }

    #[test]
    fn resync_delay_clamps_negative_deltas_and_tracks_carry() {
        let cfg = Config::default();
        let (delay, carry) = resync_delay(&cfg, DutSign::Negative, 9);
        // 205 - 900 = -695 -> + 1000 => 305ms, carry = 1
        assert_eq!(delay, Duration::from_millis(305));
        assert_eq!(carry, 1);

        let (delay, carry) = resync_delay(&cfg, DutSign::Positive, 2);
        assert_eq!(delay, Duration::from_millis(405));
        assert_eq!(carry, 0);

        let (_, carry) = resync_delay(&cfg, DutSign::Invalid, 7);
        assert_eq!(carry, 0);
    }

    #[test]
    fn spawn_resync_issues_sync_seconds_after_delay() {
        let clock = Arc::new(MailboxClockStore::new());
        let handle = spawn_resync(clock.clone(), Duration::from_millis(5), 2).unwrap();
        handle.join().unwrap();
        assert_eq!(clock.read_command(), ClockCommand::Read);
        assert_eq!(clock.take_last_sync_seconds(), Some(2));
    }
}
