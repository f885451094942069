//! Runtime configuration for the decode pipeline's tunable heuristics:
//! bit classification bands, phase tolerances, and SNR window length.

/// Width range, in milliseconds, classified as a particular bit symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WidthBand {
    pub min_ms: u32,
    pub max_ms: u32,
}

impl WidthBand {
    pub fn contains(&self, width_ms: u32) -> bool {
        (self.min_ms..=self.max_ms).contains(&width_ms)
    }
}

/// Tunable parameters for the decode pipeline.
///
/// Defaults match the nominal WWVB pulse widths and tolerances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Pulses narrower than this are noise, filtered upstream of C2.
    pub noise_floor_ms: u32,
    /// Width band classified as a `ZERO` bit.
    pub zero_band: WidthBand,
    /// Width band classified as a `ONE` bit.
    pub one_band: WidthBand,
    /// Width band classified as a `MARKER` bit.
    pub marker_band: WidthBand,
    /// Max deviation from 1000 ms between successive edges for a bit to be
    /// `phase_valid` (the inter-edge cadence check).
    pub edge_tolerance_ms: i64,
    /// Max deviation from a bit's nominal position within the 60-second
    /// frame for it to be accepted by the frame accumulator.
    pub phase_tolerance_ms: i64,
    /// Number of inter-edge intervals retained by the SNR ring.
    pub snr_window_len: usize,
    /// Base resync delay before a `SYNC_SECONDS` command is issued, in ms
    /// (`205 ms + tenths-of-DUT1 * 100 ms`).
    pub resync_base_delay_ms: i64,
    /// Per-tenth-of-a-second DUT1 contribution to the resync delay, in ms.
    pub resync_dut_step_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            noise_floor_ms: 150,
            zero_band: WidthBand { min_ms: 150, max_ms: 230 },
            one_band: WidthBand { min_ms: 450, max_ms: 530 },
            marker_band: WidthBand { min_ms: 650, max_ms: 830 },
            edge_tolerance_ms: 50,
            phase_tolerance_ms: 25,
            snr_window_len: 30,
            resync_base_delay_ms: 205,
            resync_dut_step_ms: 100,
        }
    }
}
