//! End-to-end scenarios run against the public pipeline API: seed the
//! classifier at a minute boundary, publish a scripted sequence of
//! second pulses, and run frame accumulation/decode/commit exactly as
//! `engine::run` would.

use wwvb_rtc_engine::bits::{BitClassifier, BitSymbol};
use wwvb_rtc_engine::clock_store::{ClockStore, MailboxClockStore};
use wwvb_rtc_engine::config::Config;
use wwvb_rtc_engine::decode::{commit, day_of_year_to_month_day, decode_frame, DstState, DutSign};
use wwvb_rtc_engine::frame::collect_frame;
use wwvb_rtc_engine::pulse::{MonotonicMillis, PulseMailbox, PulseSample};
use wwvb_rtc_engine::sync::{find_minute_boundary, resync_delay, PriorFrameState};

fn ones_in_range(start: usize, end: usize, value: u32) -> Vec<(usize, BitSymbol)> {
    let width = end - start + 1;
    (0..width)
        .map(|i| {
            let bit = (value >> (width - 1 - i)) & 1;
            (start + i, if bit == 1 { BitSymbol::One } else { BitSymbol::Zero })
        })
        .collect()
}

/// Builds the literal 2023-06-15 23:59 UTC nominal frame.
fn nominal_frame_bits() -> Vec<(usize, BitSymbol)> {
    let mut bits = Vec::new();
    bits.extend(ones_in_range(1, 3, 5)); // minutes tens = 5
    bits.extend(ones_in_range(5, 8, 9)); // minutes ones = 9 -> minute 59
    bits.extend(ones_in_range(12, 13, 2)); // hours tens = 2
    bits.extend(ones_in_range(15, 18, 3)); // hours ones = 3 -> hour 23
    bits.extend(ones_in_range(22, 23, 1)); // doy hundreds = 1
    bits.extend(ones_in_range(25, 28, 6)); // doy tens = 6
    bits.extend(ones_in_range(30, 33, 6)); // doy ones = 6 -> day_of_year 166
    bits.push((36, BitSymbol::Zero));
    bits.push((37, BitSymbol::One));
    bits.push((38, BitSymbol::Zero)); // DUT sign '+'
    bits.extend(ones_in_range(40, 43, 2)); // dut tenths = 2
    bits.extend(ones_in_range(45, 48, 2)); // year tens = 2
    bits.extend(ones_in_range(50, 53, 3)); // year ones = 3 -> year 23
    bits.push((57, BitSymbol::One));
    bits.push((58, BitSymbol::One)); // DST ENABLED
    bits
}

fn symbol_at(bits: &[(usize, BitSymbol)], sec: usize) -> BitSymbol {
    bits.iter()
        .find(|(s, _)| *s == sec)
        .map(|(_, sym)| *sym)
        .unwrap_or(BitSymbol::Zero)
}

/// Seeds the classifier's edge cursor at a synthetic minute-start marker,
/// then publishes seconds 1..=58 per `bits` (anything unspecified is a
/// ZERO), exactly as `decode.rs`'s `frame_from_map` test helper does.
/// Returns the accumulated frame, or `None` if a defect caused rejection.
fn run_one_minute(
    bits: &[(usize, BitSymbol)],
    start_edge: MonotonicMillis,
) -> Option<wwvb_rtc_engine::frame::RawFrame> {
    let cfg = Config::default();
    let mailbox = PulseMailbox::new();
    let mut classifier = BitClassifier::new(&mailbox, cfg);

    mailbox.publish(PulseSample { edge_time: start_edge, width_ms: 800 });
    let _ = classifier.next_bit();
    let minute_start = start_edge;

    let mut edge = start_edge;
    for sec in 1u64..=58 {
        edge += 1000;
        let symbol = symbol_at(bits, sec as usize);
        let width = match (sec % 10 == 9, symbol) {
            (true, _) => 800,
            (false, BitSymbol::One) => 500,
            (false, BitSymbol::Marker) => 800, // deliberately wrong-position marker
            (false, BitSymbol::Invalid) => 100, // noise: filtered by C2
            _ => 200,
        };
        mailbox.publish(PulseSample { edge_time: edge, width_ms: width });
    }

    collect_frame(&mut classifier, minute_start, &cfg)
}

#[test]
fn scenario_1_nominal_minute() {
    let frame = run_one_minute(&nominal_frame_bits(), 100_000).expect("frame should accumulate");
    let decoded = decode_frame(&frame).expect("frame should decode");

    assert_eq!(decoded.minute, 59);
    assert_eq!(decoded.hour, 23);
    assert_eq!(decoded.day_of_year, 166);
    assert_eq!(decoded.year, 23);
    assert_eq!(decoded.dut_sign, DutSign::Positive);
    assert_eq!(decoded.dut_tenths, 2);
    assert!(!decoded.leap_year);
    assert!(!decoded.leap_second_pending);
    assert_eq!(decoded.dst_state, DstState::Enabled);

    let (month, day) = day_of_year_to_month_day(decoded.day_of_year, decoded.leap_year).unwrap();
    assert_eq!((month, day), (6, 15));

    let store = MailboxClockStore::new();
    commit(&store, &decoded, 2000).unwrap();
    assert!(store.clock_valid());
    assert_eq!(store.calendar().unwrap().year, 2023);
}

#[test]
fn scenario_2_noise_burst_rejects_frame() {
    let mut bits = nominal_frame_bits();
    bits.retain(|(sec, _)| *sec != 17);
    bits.push((17, BitSymbol::Invalid)); // 100ms noise burst mid-frame

    // The noise pulse is filtered by C2 and never classified, so the next
    // real pulse (sec=18) arrives ~2s after the last classified edge
    // (sec=16): outside the edge tolerance, so it comes back phase_invalid
    // and C4 bails.
    let frame = run_one_minute(&bits, 200_000);
    assert!(frame.is_none(), "frame should be rejected after the noise burst");
}

#[test]
fn scenario_3_marker_at_wrong_position_rejects_frame() {
    let mut bits = nominal_frame_bits();
    bits.retain(|(sec, _)| *sec != 5);
    bits.push((5, BitSymbol::Marker)); // marker where ZERO/ONE expected

    let frame = run_one_minute(&bits, 300_000);
    assert!(frame.is_none());
}

#[test]
fn scenario_4_leap_year_rollover_requires_leap_bit() {
    let mut bits = Vec::new();
    bits.extend(ones_in_range(22, 23, 3)); // doy hundreds = 3
    bits.extend(ones_in_range(25, 28, 6)); // doy tens = 6
    bits.extend(ones_in_range(30, 33, 6)); // doy ones = 6 -> day_of_year 366

    let frame = run_one_minute(&bits, 400_000).expect("frame should still accumulate cleanly");
    assert!(decode_frame(&frame).is_err(), "day 366 in a non-leap year must be rejected");

    bits.push((55, BitSymbol::One)); // leap-year bit set
    let frame = run_one_minute(&bits, 410_000).unwrap();
    let decoded = decode_frame(&frame).unwrap();
    assert!(decoded.leap_year);
    let (month, day) = day_of_year_to_month_day(366, true).unwrap();
    assert_eq!((month, day), (12, 31));
}

#[test]
fn scenario_5_invalid_dut_sign_still_accepted() {
    let mut bits = Vec::new();
    bits.push((36, BitSymbol::One));
    bits.push((37, BitSymbol::One));
    bits.push((38, BitSymbol::One)); // 111: invalid pattern

    let frame = run_one_minute(&bits, 500_000).expect("frame should accumulate");
    let decoded = decode_frame(&frame).expect("frame should still be accepted");
    assert_eq!(decoded.dut_sign, DutSign::Invalid);

    let cfg = Config::default();
    let (_, carry) = resync_delay(&cfg, decoded.dut_sign, decoded.dut_tenths);
    assert_eq!(carry, 0, "invalid DUT sign must be treated as zero offset");
}

#[test]
fn scenario_6_leap_second_minute_consumes_three_markers() {
    let mailbox = PulseMailbox::new();
    let cfg = Config::default();
    let mut classifier = BitClassifier::new(&mailbox, cfg);

    // Seed plus two confirming markers one second apart, mirroring
    // sync.rs's own leap-second test.
    mailbox.publish(PulseSample { edge_time: 1_000, width_ms: 800 });
    let _ = classifier.next_bit();
    mailbox.publish(PulseSample { edge_time: 2_000, width_ms: 800 });

    let prior = PriorFrameState {
        leap_second_pending: true,
        last_day_of_month: true,
        hour: 23,
        minute: 59,
    };

    std::thread::scope(|scope| {
        let handle = scope.spawn(move || find_minute_boundary(&mut classifier, &prior));
        std::thread::sleep(std::time::Duration::from_millis(20));
        mailbox.publish(PulseSample { edge_time: 3_000, width_ms: 800 }); // the extra leap-second marker
        let top = handle.join().unwrap();
        assert!(top.leap_second_consumed);
        assert_eq!(top.edge_time, 3_000);
    });
}
