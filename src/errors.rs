//! Crate-wide error type.
//!
//! `NoiseRejected` from spec §7 is deliberately absent here: it is recovered
//! locally inside the bit classifier and frame accumulator (logged and
//! retried), so it never needs to cross a component boundary as a `Result`.

use thiserror::Error;

/// Errors that can surface from the WWVB engine.
///
/// `E` is the transport error type of whatever `embedded-hal` I2C
/// implementation backs the Clock Store. It's only required to be
/// `Debug` (matching `ClockStore::Error`'s own bound), not
/// `std::error::Error`, since embedded-hal 0.2.x I2C implementations
/// aren't guaranteed to implement the latter.
#[derive(Error, Debug)]
pub enum WwvbError<E: std::fmt::Debug> {
    /// Pulse capture hardware (GPIO line / interrupt source) could not be
    /// acquired at startup. Fatal.
    #[error("pulse capture hardware unavailable")]
    PulseCaptureStartFailed,

    /// The RTC did not respond during initialization. Fatal.
    #[error("RTC hardware absent at init")]
    RtcAbsent,

    /// No capacity to launch a scratch worker (resync or diagnostics). Fatal.
    #[error("no capacity to spawn scratch worker")]
    WorkerSpawnFailed,

    /// Clock Store command mailbox was not `READ` when a new command was
    /// about to be issued. Recoverable by waiting.
    #[error("clock store command mailbox busy")]
    ClockStoreBusy,

    /// A frame was structurally invalid (bad marker position, DUT sign
    /// garbage that could not even be treated as zero, day-of-year out of
    /// range, etc). Recoverable: the frame is discarded.
    #[error("frame rejected: {0}")]
    FrameInvalid(&'static str),

    /// Underlying I2C transport error.
    #[error("i2c transport error: {0:?}")]
    Transport(E),
}
