//! Clock Store interface: the external collaborator holding persistent
//! calendar time, DST state, and GMT offset across power cycles.
//! Expressed here as a trait so the engine can run against either a real
//! RV-3028-C7 (`crate::rtc::RtcClockStore`) or an in-memory mailbox used
//! by tests and `demos/replay_log.rs`.

use std::sync::Mutex;

use chrono::Weekday;

/// Single-slot mailbox command exchanged between the engine and the
/// autonomous RTC-reader responder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockCommand {
    Read,
    WriteDateTime,
    /// Resync the second counter to `seconds`.
    SyncSeconds(u8),
}

/// The calendar fields committed by the frame decoder's commit step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
}

/// The Clock Store contract.
///
/// Callers must wait until `read_command()` is `Read` before issuing a new
/// command: the `WRITE_DATE_TIME` command from the frame decoder's commit
/// step must be issued only after the mailbox shows `Read`.
pub trait ClockStore {
    type Error: std::fmt::Debug;

    fn read_command(&self) -> ClockCommand;
    fn set_command(&self, command: ClockCommand);

    /// Commit new calendar fields. Implementations must hold their
    /// internal lock for the duration of the write.
    fn write_calendar(&self, fields: CalendarFields) -> Result<(), Self::Error>;

    fn dst_state(&self) -> u8;
    fn set_dst_state(&self, state: u8) -> Result<(), Self::Error>;

    fn gmt_offset_hours(&self) -> i8;
    fn set_gmt_offset_hours(&self, hours: i8) -> Result<(), Self::Error>;

    /// Whether any frame has ever been successfully decoded and committed.
    fn clock_valid(&self) -> bool;
    fn mark_clock_valid(&self);
}

/// In-memory `ClockStore` used by tests, `demos/replay_log.rs`, and
/// anywhere a real I2C RTC isn't available.
pub struct MailboxClockStore {
    state: Mutex<MailboxState>,
}

struct MailboxState {
    command: ClockCommand,
    calendar: Option<CalendarFields>,
    dst_state: u8,
    gmt_offset_hours: i8,
    clock_valid: bool,
    last_sync_seconds: Option<u8>,
}

impl MailboxClockStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MailboxState {
                command: ClockCommand::Read,
                calendar: None,
                dst_state: 0,
                gmt_offset_hours: 0,
                clock_valid: false,
                last_sync_seconds: None,
            }),
        }
    }

    pub fn calendar(&self) -> Option<CalendarFields> {
        self.state.lock().unwrap().calendar
    }

    /// Test/demo helper: drains the last `SYNC_SECONDS` value observed,
    /// also resetting the mailbox back to `READ` as the real RTC's
    /// autonomous responder would.
    pub fn take_last_sync_seconds(&self) -> Option<u8> {
        let mut guard = self.state.lock().unwrap();
        let value = guard.last_sync_seconds.take();
        guard.command = ClockCommand::Read;
        value
    }
}

impl Default for MailboxClockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockStore for MailboxClockStore {
    type Error = std::convert::Infallible;

    fn read_command(&self) -> ClockCommand {
        self.state.lock().unwrap().command
    }

    fn set_command(&self, command: ClockCommand) {
        let mut guard = self.state.lock().unwrap();
        if let ClockCommand::SyncSeconds(seconds) = command {
            guard.last_sync_seconds = Some(seconds);
            guard.command = ClockCommand::Read;
            return;
        }
        guard.command = command;
    }

    fn write_calendar(&self, fields: CalendarFields) -> Result<(), Self::Error> {
        let mut guard = self.state.lock().unwrap();
        guard.calendar = Some(fields);
        guard.command = ClockCommand::Read;
        Ok(())
    }

    fn dst_state(&self) -> u8 {
        self.state.lock().unwrap().dst_state
    }

    fn set_dst_state(&self, state: u8) -> Result<(), Self::Error> {
        self.state.lock().unwrap().dst_state = state;
        Ok(())
    }

    fn gmt_offset_hours(&self) -> i8 {
        self.state.lock().unwrap().gmt_offset_hours
    }

    fn set_gmt_offset_hours(&self, hours: i8) -> Result<(), Self::Error> {
        self.state.lock().unwrap().gmt_offset_hours = hours;
        Ok(())
    }

    fn clock_valid(&self) -> bool {
        self.state.lock().unwrap().clock_valid
    }

    fn mark_clock_valid(&self) {
        self.state.lock().unwrap().clock_valid = true;
    }
}
