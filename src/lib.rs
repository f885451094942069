//! WWVB 60 kHz time-signal decoder disciplining an RV-3028-C7 real-time
//! clock.
//!
//! The crate is organized around the five-component pipeline described in
//! the design notes: pulse capture (`pulse`), bit classification
//! (`bits`), minute-boundary synchronization (`sync`), frame accumulation
//! (`frame`), and frame decoding (`decode`), all feeding a `ClockStore`
//! (`clock_store`, backed in production by `rtc::RtcClockStore`). `engine`
//! wires the pipeline into the long-lived worker threads.

pub mod bcd;
pub mod bits;
pub mod calendar;
pub mod clock_store;
pub mod config;
pub mod decode;
pub mod engine;
pub mod errors;
pub mod frame;
pub mod pulse;
pub mod rtc;
pub mod sync;

pub use clock_store::{CalendarFields, ClockCommand, ClockStore, MailboxClockStore};
pub use config::Config;
pub use decode::{DecodedTime, DstState, DutSign};
pub use errors::WwvbError;
pub use frame::RawFrame;
pub use pulse::{EdgeSource, MonotonicMillis, PulseMailbox, PulseSample};
pub use rtc::{RtcClockStore, RV3028};
