//! Replays a recorded pulse-edge log through the engine against an
//! in-memory Clock Store, without needing real WWVB hardware or an RTC
//! chip attached. Useful for exercising the decode pipeline against a
//! capture taken on real hardware (`demos/live_decode.rs` could be
//! extended to dump the same format).
//!
//! Log format: one `fall_ms rise_ms` pair per line, both monotonic
//! millisecond timestamps, whitespace separated.

use std::env;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use wwvb_rtc_engine::clock_store::MailboxClockStore;
use wwvb_rtc_engine::config::Config;
use wwvb_rtc_engine::pulse::{EdgeSource, MonotonicMillis};

struct LogEdgeSource {
    edges: std::vec::IntoIter<(MonotonicMillis, MonotonicMillis)>,
    pending_rise: Option<MonotonicMillis>,
}

impl LogEdgeSource {
    fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let mut edges = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let fall: MonotonicMillis = parts
                .next()
                .context("missing fall timestamp")?
                .parse()
                .context("invalid fall timestamp")?;
            let rise: MonotonicMillis = parts
                .next()
                .context("missing rise timestamp")?
                .parse()
                .context("invalid rise timestamp")?;
            edges.push((fall, rise));
        }
        Ok(Self {
            edges: edges.into_iter(),
            pending_rise: None,
        })
    }
}

impl EdgeSource for LogEdgeSource {
    fn wait_falling(&mut self) -> MonotonicMillis {
        let (fall, rise) = self.edges.next().expect("pulse log exhausted");
        self.pending_rise = Some(rise);
        fall
    }

    fn wait_rising(&mut self) -> MonotonicMillis {
        self.pending_rise.take().expect("wait_falling must precede wait_rising")
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "pulses.log".to_string());
    let edge_source = LogEdgeSource::load(&path)?;

    let clock = Arc::new(MailboxClockStore::new());
    let clock_valid = Arc::new(AtomicBool::new(false));

    wwvb_rtc_engine::engine::run(edge_source, clock, Config::default(), clock_valid)
        .map_err(|err| anyhow::anyhow!("engine halted with fatal error: {err}"))
}
