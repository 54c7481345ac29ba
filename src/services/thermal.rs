//! CPU temperature service, polled through `acpi --thermal`.

use crate::config::ThermalConfig;
use crate::functions::formatting::Emphasis;
use crate::services::command;
use capy_engine::{Fragment, Probe, PulseStream, SourceError, eager_tick};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static THERMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Thermal 0: ok, ([.0-9]+) degrees F").expect("thermal pattern is valid")
});

pub struct ThermalProbe {
    poll_interval: Duration,
    warning_f: f64,
    urgent_f: f64,
}

impl ThermalProbe {
    pub fn new(config: &ThermalConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            warning_f: config.warning_f,
            urgent_f: config.urgent_f,
        }
    }

    fn emphasis(&self, temperature: f64) -> Emphasis {
        if temperature >= self.urgent_f {
            Emphasis::Urgent
        } else if temperature >= self.warning_f {
            Emphasis::Warning
        } else {
            Emphasis::Normal
        }
    }

    pub fn format(&self, temperature: f64) -> Fragment {
        Fragment::new(self.emphasis(temperature).apply(format!("{temperature:.1} \u{00b0}F")))
    }
}

impl Probe for ThermalProbe {
    fn name(&self) -> &'static str {
        "thermal"
    }

    async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
        Ok(eager_tick(self.poll_interval))
    }

    async fn query(&mut self) -> Result<Fragment, SourceError> {
        let output = command::output("acpi", &["--thermal", "--fahrenheit"]).await?;
        let temperature = parse_temperature(&output)?;
        Ok(self.format(temperature))
    }
}

/// Temperature of the first thermal zone, in degrees Fahrenheit.
pub fn parse_temperature(output: &str) -> Result<f64, SourceError> {
    let caps = THERMAL_RE
        .captures(output)
        .ok_or_else(|| SourceError::UnexpectedOutput(output.to_string()))?;
    Ok(caps[1].parse()?)
}
