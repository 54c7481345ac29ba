//! Backlight brightness service.
//!
//! Watches the kernel brightness attribute with notify and asks `xbacklight`
//! for the percentage whenever it changes. A missing attribute disables the
//! source for the rest of the session.

use crate::config::BrightnessConfig;
use crate::services::command;
use capy_engine::{Fragment, Probe, Pulse, PulseStream, SourceError, pulse_channel};
use log::warn;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;

pub struct BrightnessProbe {
    path: PathBuf,
    /// Kept alive for as long as the source runs.
    watcher: Option<RecommendedWatcher>,
}

impl BrightnessProbe {
    pub fn new(config: &BrightnessConfig) -> Self {
        Self {
            path: config.path.clone(),
            watcher: None,
        }
    }
}

impl Probe for BrightnessProbe {
    fn name(&self) -> &'static str {
        "brightness"
    }

    async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
        let (tx, rx) = pulse_channel();

        // Initial reading before the first change.
        let _ = tx.try_send(Pulse::now());

        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                // A full channel already holds a pending pulse.
                Ok(_) => {
                    let _ = tx.try_send(Pulse::now());
                }
                Err(e) => warn!("brightness: watch error: {}", e),
            },
        )
        .map_err(|e| SourceError::Watch(e.to_string()))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| SourceError::Watch(format!("{}: {}", self.path.display(), e)))?;

        self.watcher = Some(watcher);
        Ok(rx)
    }

    async fn query(&mut self) -> Result<Fragment, SourceError> {
        let output = command::output("xbacklight", &["-get"]).await?;
        let percentage = parse_brightness(&output)?;
        Ok(Fragment::new(format!("brightness {percentage:.0}%")))
    }
}

pub fn parse_brightness(output: &str) -> Result<f64, SourceError> {
    Ok(output.trim().parse()?)
}
