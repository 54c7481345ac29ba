//! Clock service.
//!
//! Emits once at startup, then on every whole minute of the wall clock so the
//! displayed time never lags behind by the process start offset.

use crate::config::ClockConfig;
use capy_engine::{Fragment, Probe, PulseStream, SourceError, aligned_tick};
use chrono::{DateTime, TimeZone};
use std::fmt::{Display, Write};
use std::time::Duration;

pub struct ClockProbe {
    format: String,
    interval: Duration,
}

impl ClockProbe {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            format: config.format.clone(),
            interval: config.interval(),
        }
    }
}

impl Probe for ClockProbe {
    fn name(&self) -> &'static str {
        "clock"
    }

    async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
        Ok(aligned_tick(self.interval))
    }

    async fn query(&mut self) -> Result<Fragment, SourceError> {
        let now = chrono::Local::now();
        Ok(Fragment::new(format_time(&now, &self.format)?))
    }
}

/// strftime-style formatting that reports bad format strings instead of panicking.
pub fn format_time<Tz>(time: &DateTime<Tz>, format: &str) -> Result<String, SourceError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut text = String::new();
    write!(text, "{}", time.format(format))
        .map_err(|_| SourceError::UnexpectedOutput(format!("invalid clock format {format:?}")))?;
    Ok(text)
}
