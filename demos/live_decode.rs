//! Runs the full WWVB pipeline against a real GPIO input and an RV-3028-C7
//! attached over i2c1, the way `examples/discipline.rs` and friends in the
//! underlying RTC driver crate talk to real hardware.
//!
//! Tested against a Raspberry Pi 3+ with a WWVB receiver module's output
//! wired to a GPIO input pin, and the RTC's SDA/SCL/GND/3.3V wired to
//! i2c1 (enabled via `sudo raspi-config`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use gpiocdev::line::EdgeKind;
use gpiocdev::request::Request;
use gpiocdev::line::EdgeDetection;
use linux_embedded_hal::I2cdev;

use wwvb_rtc_engine::config::Config;
use wwvb_rtc_engine::pulse::{EdgeSource, MonotonicMillis};
use wwvb_rtc_engine::rtc::{RtcClockStore, RV3028};

const RECEIVER_GPIO_LINE: u32 = 17;

/// Adapts a `gpiocdev` edge-triggered request to the engine's
/// `EdgeSource` contract.
struct GpioEdgeSource {
    request: Request,
}

impl GpioEdgeSource {
    fn open(chip: &str, line: u32) -> Result<Self> {
        let request = Request::builder()
            .on_chip(chip)
            .with_line(line)
            .with_edge_detection(EdgeDetection::BothEdges)
            .request()
            .context("failed to request WWVB receiver GPIO line")?;
        Ok(Self { request })
    }

    fn wait_for(&mut self, kind: EdgeKind) -> MonotonicMillis {
        loop {
            let event = self
                .request
                .read_edge_event()
                .expect("gpio edge event read failed");
            if event.kind == kind {
                return event.timestamp_ns / 1_000_000;
            }
        }
    }
}

impl EdgeSource for GpioEdgeSource {
    fn wait_falling(&mut self) -> MonotonicMillis {
        self.wait_for(EdgeKind::Falling)
    }

    fn wait_rising(&mut self) -> MonotonicMillis {
        self.wait_for(EdgeKind::Rising)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let edge_source =
        GpioEdgeSource::open("/dev/gpiochip0", RECEIVER_GPIO_LINE).context("opening receiver GPIO")?;

    let i2c = I2cdev::new("/dev/i2c-1").context("opening RTC i2c bus")?;
    let rtc = RV3028::new(i2c);
    let clock = Arc::new(RtcClockStore::new(rtc));

    let clock_valid = Arc::new(AtomicBool::new(false));
    {
        let clock_valid = clock_valid.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(std::time::Duration::from_secs(5));
            log::info!("clock_valid = {}", clock_valid.load(Ordering::Acquire));
        });
    }

    wwvb_rtc_engine::engine::run(edge_source, clock, Config::default(), clock_valid)
        .map_err(|err| anyhow::anyhow!("engine halted with fatal error: {err}"))
}
