//! RV-3028-C7 register driver and its `ClockStore` adapter.
//!
//! The low-level I2C transport is a thin, concrete implementation that
//! backs the `ClockStore` trait when the engine runs against a real chip;
//! the decode pipeline itself never touches I2C directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

use crate::bcd::{bcd2int, int2bcd};
use crate::clock_store::{CalendarFields, ClockCommand, ClockStore};

const RV3028_ADDRESS: u8 = 0xA4 >> 1;

const REG_SECONDS: u8 = 0x00;
const REG_MINUTES: u8 = 0x01;
const REG_HOURS: u8 = 0x02;
const REG_WEEKDAY: u8 = 0x03;
const REG_DATE: u8 = 0x04;
const REG_MONTH: u8 = 0x05;
const REG_YEAR: u8 = 0x06;

/// First address of the "Unix Time Counter" (4 bytes, little-endian).
const REG_UNIX_TIME_0: u8 = 0x1B;

/// Scratch general-purpose registers used to persist the engine's own
/// NVRAM fields: byte 0 is `dst_state`, bytes 1-4 are the little-endian
/// `gmt_offset_hours` as a 32-bit value. The real RV-3028-C7 exposes only
/// a handful of spare bytes for this; we use the block starting here
/// rather than the chip's unrelated EEPROM password/clkout configuration
/// bytes. See DESIGN.md for the rationale.
const REG_NVRAM_BASE: u8 = 0x1F;

/// RV-3028-C7 Extreme Low Power Real-Time Clock (RTC) driver.
pub struct RV3028<I2C> {
    i2c: I2C,
}

impl<I2C, E> RV3028<I2C>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        RV3028 { i2c }
    }

    fn write_register(&mut self, reg: u8, data: u8) -> Result<(), E> {
        self.i2c.write(RV3028_ADDRESS, &[reg, data])
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, E> {
        let mut buf = [0];
        self.i2c.write_read(RV3028_ADDRESS, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn read_multi_registers(&mut self, reg: u8, read_buf: &mut [u8]) -> Result<(), E> {
        self.i2c.write_read(RV3028_ADDRESS, &[reg], read_buf)
    }

    /// Set the BCD time-tracking registers (hour/minute/second together).
    fn set_time(&mut self, time: &chrono::NaiveTime) -> Result<(), E> {
        let write_buf = [
            REG_SECONDS,
            int2bcd(time.second() as u8),
            int2bcd(time.minute() as u8),
            int2bcd(time.hour() as u8),
        ];
        self.i2c.write(RV3028_ADDRESS, &write_buf)
    }

    /// Set just the minutes and hours registers, leaving seconds alone.
    /// Used by the Clock Store's calendar commit, which is kept separate
    /// from the seconds resync owned by the frame synchronizer.
    fn set_hour_minute(&mut self, hour: u8, minute: u8) -> Result<(), E> {
        let write_buf = [REG_MINUTES, int2bcd(minute), int2bcd(hour)];
        self.i2c.write(RV3028_ADDRESS, &write_buf)
    }

    /// Set just the seconds register. Writing it resets the RTC's
    /// internal prescaler, which is exactly what the top-of-minute resync
    /// wants.
    pub fn set_seconds_register(&mut self, seconds: u8) -> Result<(), E> {
        self.write_register(REG_SECONDS, int2bcd(seconds))
    }

    /// Set the internal BCD date registers. Only years 2000-2099 are
    /// supported, matching the chip's 2-digit year register.
    fn set_date(&mut self, date: &NaiveDate) -> Result<(), E> {
        let year = if date.year() > 2000 { (date.year() - 2000) as u8 } else { 0 };
        let month = (date.month() % 13) as u8;
        let day = (date.day() % 32) as u8;
        let weekday = (date.weekday() as u8) % 7;

        let write_buf = [
            REG_WEEKDAY,
            int2bcd(weekday),
            int2bcd(day),
            int2bcd(month),
            int2bcd(year),
        ];
        self.i2c.write(RV3028_ADDRESS, &write_buf)
    }

    /// Get the year, month, day from the internal BCD registers.
    pub fn get_ymd(&mut self) -> Result<(i32, u8, u8), E> {
        let year: i32 = bcd2int(self.read_register(REG_YEAR)?) as i32 + 2000;
        let month = bcd2int(self.read_register(REG_MONTH)?);
        let day = bcd2int(self.read_register(REG_DATE)?);
        Ok((year, month, day))
    }

    /// Get the hour, minute, second from the internal BCD registers.
    pub fn get_hms(&mut self) -> Result<(u8, u8, u8), E> {
        let hours = bcd2int(self.read_register(REG_HOURS)?);
        let minutes = bcd2int(self.read_register(REG_MINUTES)?);
        let seconds = bcd2int(self.read_register(REG_SECONDS)?);
        Ok((hours, minutes, seconds))
    }

    /// Set just the Unix time counter. Prefer `set_datetime` to keep all
    /// the BCD registers aligned; this does not reset the prescaler.
    pub fn set_unix_time(&mut self, unix_time: u32) -> Result<(), E> {
        let bytes = unix_time.to_le_bytes();
        self.i2c
            .write(RV3028_ADDRESS, &[REG_UNIX_TIME_0, bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Read the Unix time counter (seconds since 1970, wraps ~2106).
    pub fn get_unix_time(&mut self) -> Result<u32, E> {
        let mut read_buf = [0u8; 4];
        self.read_multi_registers(REG_UNIX_TIME_0, &mut read_buf)?;
        Ok(u32::from_le_bytes(read_buf))
    }

    /// Read the Unix time counter twice to avoid tearing against an
    /// internal increment, as the vendor app notes recommend.
    pub fn get_unix_time_blocking(&mut self) -> Result<u32, E> {
        loop {
            let val1 = self.get_unix_time()?;
            let val2 = self.get_unix_time()?;
            if val1 == val2 {
                return Ok(val2);
            }
        }
    }

    /// Write the engine's 5-byte NVRAM block: byte 0 is `dst_state`,
    /// bytes 1-4 are little-endian `gmt_offset_hours`.
    pub fn write_nvram(&mut self, dst_state: u8, gmt_offset_hours: i8) -> Result<(), E> {
        let offset_bytes = (gmt_offset_hours as i32).to_le_bytes();
        let write_buf = [
            REG_NVRAM_BASE,
            dst_state,
            offset_bytes[0],
            offset_bytes[1],
            offset_bytes[2],
            offset_bytes[3],
        ];
        self.i2c.write(RV3028_ADDRESS, &write_buf)
    }

    pub fn read_nvram(&mut self) -> Result<(u8, i8), E> {
        let mut buf = [0u8; 5];
        self.read_multi_registers(REG_NVRAM_BASE, &mut buf)?;
        let dst_state = buf[0];
        let offset = i32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as i8;
        Ok((dst_state, offset))
    }
}

impl<I2C, E> rtcc::DateTimeAccess for RV3028<I2C>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    type Error = E;

    fn datetime(&mut self) -> Result<NaiveDateTime, Self::Error> {
        let unix_timestamp = self.get_unix_time()?;
        Ok(NaiveDateTime::from_timestamp_opt(unix_timestamp.into(), 0).unwrap())
    }

    /// Resets the internal prescaler pipeline when it writes the Seconds
    /// register, which helps align with an external clock reference.
    fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Self::Error> {
        let unix_timestamp: u32 = datetime.timestamp().try_into().unwrap();
        self.set_unix_time(unix_timestamp)?;
        self.set_date(&datetime.date())?;
        self.set_time(&datetime.time())?;
        Ok(())
    }
}

/// `ClockStore` backed by a real RV-3028-C7 over I2C.
///
/// The command mailbox itself is a plain in-process `Mutex`, since (unlike
/// the calendar fields) it has no hardware register of its own: it's the
/// software contract the engine and the autonomous RTC-reader responder
/// use to hand off work.
pub struct RtcClockStore<I2C> {
    rtc: Mutex<RV3028<I2C>>,
    command: Mutex<ClockCommand>,
    clock_valid: AtomicBool,
}

impl<I2C, E> RtcClockStore<I2C>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    pub fn new(rtc: RV3028<I2C>) -> Self {
        Self {
            rtc: Mutex::new(rtc),
            command: Mutex::new(ClockCommand::Read),
            clock_valid: AtomicBool::new(false),
        }
    }
}

impl<I2C, E> ClockStore for RtcClockStore<I2C>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    type Error = E;

    fn read_command(&self) -> ClockCommand {
        *self.command.lock().unwrap()
    }

    fn set_command(&self, command: ClockCommand) {
        if let ClockCommand::SyncSeconds(seconds) = command {
            let mut rtc = self.rtc.lock().unwrap();
            if let Err(err) = rtc.set_seconds_register(seconds % 60) {
                log::warn!("SYNC_SECONDS write failed: {err:?}");
            }
            *self.command.lock().unwrap() = ClockCommand::Read;
            return;
        }
        *self.command.lock().unwrap() = command;
    }

    fn write_calendar(&self, fields: CalendarFields) -> Result<(), Self::Error> {
        let mut rtc = self.rtc.lock().unwrap();
        let date = NaiveDate::from_ymd_opt(fields.year, fields.month as u32, fields.day as u32)
            .expect("caller validated date components");
        rtc.set_date(&date)?;
        rtc.set_hour_minute(fields.hour, fields.minute)?;
        *self.command.lock().unwrap() = ClockCommand::Read;
        Ok(())
    }

    fn dst_state(&self) -> u8 {
        self.rtc
            .lock()
            .unwrap()
            .read_nvram()
            .map(|(dst, _)| dst)
            .unwrap_or(0)
    }

    fn set_dst_state(&self, state: u8) -> Result<(), Self::Error> {
        let mut rtc = self.rtc.lock().unwrap();
        let (_, offset) = rtc.read_nvram()?;
        rtc.write_nvram(state, offset)
    }

    fn gmt_offset_hours(&self) -> i8 {
        self.rtc
            .lock()
            .unwrap()
            .read_nvram()
            .map(|(_, offset)| offset)
            .unwrap_or(0)
    }

    fn set_gmt_offset_hours(&self, hours: i8) -> Result<(), Self::Error> {
        let mut rtc = self.rtc.lock().unwrap();
        let (dst_state, _) = rtc.read_nvram()?;
        rtc.write_nvram(dst_state, hours)
    }

    fn clock_valid(&self) -> bool {
        self.clock_valid.load(Ordering::Acquire)
    }

    fn mark_clock_valid(&self) {
        self.clock_valid.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTrans};
    use std::vec;

    #[test]
    fn test_set_unix_time() {
        let unix_time: u32 = 1_614_456_789;
        let bytes = unix_time.to_le_bytes();
        let expectations = [I2cTrans::write(
            RV3028_ADDRESS,
            vec![REG_UNIX_TIME_0, bytes[0], bytes[1], bytes[2], bytes[3]],
        )];
        let mock = I2cMock::new(&expectations);
        let mut rv3028 = RV3028::new(mock);
        rv3028.set_unix_time(unix_time).unwrap();
    }

    #[test]
    fn test_get_unix_time() {
        let unix_time: u32 = 1_614_456_789;
        let bytes = unix_time.to_le_bytes();
        let expectations = [
            I2cTrans::write_read(RV3028_ADDRESS, vec![REG_UNIX_TIME_0], bytes.to_vec()),
            I2cTrans::write_read(RV3028_ADDRESS, vec![REG_UNIX_TIME_0], bytes.to_vec()),
        ];
        let mock = I2cMock::new(&expectations);
        let mut rv3028 = RV3028::new(mock);
        assert_eq!(rv3028.get_unix_time().unwrap(), unix_time);
    }

    #[test]
    fn sync_seconds_writes_only_seconds_register() {
        let expectations = [I2cTrans::write(RV3028_ADDRESS, vec![REG_SECONDS, int2bcd(42)])];
        let mock = I2cMock::new(&expectations);
        let mut rv3028 = RV3028::new(mock);
        rv3028.set_seconds_register(42).unwrap();
    }

    #[test]
    fn nvram_round_trip() {
        let write_buf = vec![REG_NVRAM_BASE, 2, 0xF4, 0xFF, 0xFF, 0xFF]; // dst=2, offset=-12
        let read_buf = vec![2u8, 0xF4, 0xFF, 0xFF, 0xFF];
        let expectations = [
            I2cTrans::write(RV3028_ADDRESS, write_buf),
            I2cTrans::write_read(RV3028_ADDRESS, vec![REG_NVRAM_BASE], read_buf),
        ];
        let mock = I2cMock::new(&expectations);
        let mut rv3028 = RV3028::new(mock);
        rv3028.write_nvram(2, -12).unwrap();
        assert_eq!(rv3028.read_nvram().unwrap(), (2, -12));
    }
}
