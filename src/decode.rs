//! C5 — Frame Decoder.
//!
//! Extracts BCD fields from a `RawFrame`, validates the DUT sign pattern,
//! converts day-of-year to month/day, determines DST/leap-second state,
//! and commits the result to the Clock Store.

use crate::bits::BitSymbol;
use crate::calendar::{day_of_week, days_in_month};
use crate::clock_store::{CalendarFields, ClockCommand, ClockStore};
use crate::frame::RawFrame;

/// Sign of the broadcast DUT1 correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DutSign {
    Positive,
    Negative,
    /// Bits 36..38 didn't match either valid pattern. The frame is still
    /// accepted; DUT correction is simply skipped (treated as zero).
    Invalid,
}

/// DST transition state. Discriminants match the wire/NVRAM encoding,
/// which is *not* the same as the raw 2-bit pattern broadcast in seconds
/// 57-58 (see `decode_dst_bits`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DstState {
    Standard = 0,
    Ending = 1,
    Starting = 2,
    Enabled = 3,
}

/// The fully decoded contents of one minute frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedTime {
    pub minute: u8,
    pub hour: u8,
    pub day_of_year: u16,
    pub year: u8,
    pub dut_sign: DutSign,
    pub dut_tenths: u8,
    pub leap_year: bool,
    pub leap_second_pending: bool,
    pub dst_state: DstState,
}

/// Reads seconds `start..=end` (1-based) as a plain MSB-first binary
/// value: bit at `start` is the most significant.
fn field_value(frame: &RawFrame, start: usize, end: usize) -> u32 {
    let mut value = 0u32;
    for sec in start..=end {
        value <<= 1;
        if frame.bit_at(sec) == BitSymbol::One {
            value |= 1;
        }
    }
    value
}

fn decode_dut_sign(frame: &RawFrame) -> DutSign {
    let pattern = (
        frame.bit_at(36) == BitSymbol::One,
        frame.bit_at(37) == BitSymbol::One,
        frame.bit_at(38) == BitSymbol::One,
    );
    match pattern {
        (false, true, false) => DutSign::Positive,
        (false, false, true) => DutSign::Negative,
        _ => DutSign::Invalid,
    }
}

fn decode_dst_bits(bit57: bool, bit58: bool) -> DstState {
    match (bit57, bit58) {
        (false, false) => DstState::Standard,
        (true, false) => DstState::Ending,
        (false, true) => DstState::Starting,
        (true, true) => DstState::Enabled,
    }
}

/// Converts a day-of-year (1-based) to `(month, day)` by walking months
/// and subtracting each one's length. Returns `None` if `day_of_year`
/// exceeds what the given year (leap or not) can hold.
pub fn day_of_year_to_month_day(day_of_year: u16, leap_year: bool) -> Option<(u8, u8)> {
    if day_of_year == 0 {
        return None;
    }
    let mut remaining = day_of_year as i32;
    for month in 1u8..=12 {
        let len = days_in_month(month, leap_year) as i32;
        remaining -= len;
        if remaining <= 0 {
            return Some((month, (remaining + len) as u8));
        }
    }
    None
}

/// Inverse of `day_of_year_to_month_day`, used by its round-trip test and
/// available for diagnostics.
pub fn month_day_to_day_of_year(month: u8, day: u8, leap_year: bool) -> u16 {
    let mut total = day as u16;
    for m in 1..month {
        total += days_in_month(m, leap_year);
    }
    total
}

/// Decodes a raw frame into its fields, rejecting it outright on any
/// structural anomaly other than an invalid DUT sign.
pub fn decode_frame(frame: &RawFrame) -> Result<DecodedTime, &'static str> {
    let minute = field_value(frame, 1, 3) * 10 + field_value(frame, 5, 8);
    if minute > 59 {
        return Err("minute out of range");
    }

    let hour = field_value(frame, 12, 13) * 10 + field_value(frame, 15, 18);
    if hour > 23 {
        return Err("hour out of range");
    }

    let day_of_year =
        field_value(frame, 22, 23) * 100 + field_value(frame, 25, 28) * 10 + field_value(frame, 30, 33);

    let year = field_value(frame, 45, 48) * 10 + field_value(frame, 50, 53);
    if year > 99 {
        return Err("year out of range");
    }

    let leap_year = frame.bit_at(55) == BitSymbol::One;
    if day_of_year_to_month_day(day_of_year as u16, leap_year).is_none() {
        return Err("day-of-year exceeds year maximum");
    }

    let dut_sign = decode_dut_sign(frame);
    let dut_tenths = field_value(frame, 40, 43) as u8;
    let leap_second_pending = frame.bit_at(56) == BitSymbol::One;
    let dst_state = decode_dst_bits(frame.bit_at(57) == BitSymbol::One, frame.bit_at(58) == BitSymbol::One);

    Ok(DecodedTime {
        minute: minute as u8,
        hour: hour as u8,
        day_of_year: day_of_year as u16,
        year: year as u8,
        dut_sign,
        dut_tenths,
        leap_year,
        leap_second_pending,
        dst_state,
    })
}

/// Commits a decoded frame to the Clock Store: resolves month/day from
/// day-of-year, computes weekday, writes the calendar fields and NVRAM
/// DST state, and marks `clock_valid`. Seconds are intentionally left
/// alone here; they're owned by the synchronizer's separate resync.
///
/// Waits for the mailbox to read `READ` before issuing `WRITE_DATE_TIME`.
pub fn commit<C: ClockStore>(store: &C, decoded: &DecodedTime, century_base: i32) -> Result<(), C::Error> {
    let (month, day) = day_of_year_to_month_day(decoded.day_of_year, decoded.leap_year)
        .expect("decode_frame already validated day_of_year");
    let year = century_base + decoded.year as i32;
    let weekday = day_of_week(year, month, day);

    while store.read_command() != ClockCommand::Read {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    store.set_command(ClockCommand::WriteDateTime);
    store.write_calendar(CalendarFields {
        year,
        month,
        day,
        weekday,
        hour: decoded.hour,
        minute: decoded.minute,
    })?;
    store.set_dst_state(decoded.dst_state as u8)?;
    store.mark_clock_valid();
    Ok(())
}
