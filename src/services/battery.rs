//! Battery monitoring service.
//!
//! Polls `acpi --battery` once a minute and whenever UPower reports a device
//! change over D-Bus. UPower tends to fire several signals per real change,
//! so all triggers go through a short debounce.

use crate::config::BatteryConfig;
use crate::functions::formatting::{Emphasis, hours_minutes};
use crate::services::command;
use capy_engine::{
    Fragment, Probe, Pulse, PulseStream, SourceError, debounce, eager_tick, merge, pulse_channel,
};
use log::{info, warn};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc;

const FULL_OUTPUT: &str = "Battery 0: Full, 100%";

static BATTERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Battery 0: (Unknown|Charging|Discharging), (\d+)%(, (\d+):(\d+):(\d+))?")
        .expect("battery pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChargeState {
    Full,
    Charging,
    Discharging,
    Unknown,
}

/// One parsed `acpi --battery` report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryReading {
    pub state: ChargeState,
    pub percentage: u32,
    /// Time to full or to empty, when acpi reports one.
    pub remaining: Option<Duration>,
}

pub struct BatteryProbe {
    low_percent: u32,
    poll_interval: Duration,
    quiet: Duration,
}

impl BatteryProbe {
    pub fn new(config: &BatteryConfig) -> Self {
        Self {
            low_percent: config.low_percent,
            poll_interval: config.poll_interval(),
            quiet: config.debounce(),
        }
    }
}

impl Probe for BatteryProbe {
    fn name(&self) -> &'static str {
        "battery"
    }

    async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
        let (events_tx, events) = pulse_channel();

        tokio::spawn(async move {
            if let Err(e) = dbus_worker(events_tx).await {
                warn!("UPower D-Bus watch failed: {}. Falling back to polling.", e);
            }
        });

        let polling = eager_tick(self.poll_interval);
        Ok(debounce(merge([polling, events]), self.quiet))
    }

    async fn query(&mut self) -> Result<Fragment, SourceError> {
        let output = command::output("acpi", &["--battery"]).await?;
        let reading = parse_battery(&output)?;
        Ok(format_battery(&reading, self.low_percent))
    }
}

/// Parse the first battery line printed by `acpi --battery`.
pub fn parse_battery(output: &str) -> Result<BatteryReading, SourceError> {
    if output.trim_end() == FULL_OUTPUT {
        return Ok(BatteryReading {
            state: ChargeState::Full,
            percentage: 100,
            remaining: None,
        });
    }

    let caps = BATTERY_RE
        .captures(output)
        .ok_or_else(|| SourceError::UnexpectedOutput(output.to_string()))?;

    let state = match &caps[1] {
        "Charging" => ChargeState::Charging,
        "Discharging" => ChargeState::Discharging,
        _ => ChargeState::Unknown,
    };
    let percentage = caps[2].parse()?;

    let remaining = match (caps.get(4), caps.get(5), caps.get(6)) {
        (Some(h), Some(m), Some(s)) => {
            let hours: u64 = h.as_str().parse()?;
            let minutes: u64 = m.as_str().parse()?;
            let seconds: u64 = s.as_str().parse()?;
            let total = hours
                .checked_mul(3600)
                .zip(minutes.checked_mul(60))
                .and_then(|(h, m)| h.checked_add(m)?.checked_add(seconds))
                .ok_or_else(|| SourceError::UnexpectedOutput(output.to_string()))?;
            Some(Duration::from_secs(total))
        }
        _ => None,
    };

    Ok(BatteryReading {
        state,
        percentage,
        remaining,
    })
}

/// Render a reading.
///
/// While discharging above `low_percent`, the remaining time is scaled down to
/// the time left until `low_percent` is reached rather than until empty.
pub fn format_battery(reading: &BatteryReading, low_percent: u32) -> Fragment {
    let percentage = reading.percentage;
    let total_minutes = reading.remaining.map_or(0, |d| d.as_secs() / 60);

    let text = match reading.state {
        ChargeState::Full => format!("charged {percentage}%"),
        ChargeState::Charging => {
            format!("charging {percentage}% ({})", hours_minutes(total_minutes))
        }
        ChargeState::Discharging if percentage <= low_percent => Emphasis::Urgent.apply(format!(
            "discharging {percentage}% ({})",
            hours_minutes(total_minutes)
        )),
        ChargeState::Discharging => {
            // Never larger than total_minutes, so the narrowing is lossless.
            let derated = (u128::from(total_minutes) * u128::from(percentage - low_percent)
                / u128::from(percentage)) as u64;
            format!("discharging {percentage}% ({})", hours_minutes(derated))
        }
        ChargeState::Unknown => format!("unknown {percentage}%"),
    };

    Fragment::new(text)
}

/// Forward UPower device property changes as pulses.
async fn dbus_worker(
    events: mpsc::Sender<Pulse>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use futures_util::stream::StreamExt;
    use zbus::Connection;

    let connection = Connection::system().await?;

    let rule = zbus::MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface("org.freedesktop.DBus.Properties")?
        .member("PropertiesChanged")?
        .path_namespace("/org/freedesktop/UPower/devices")?
        .build();

    let mut stream = zbus::MessageStream::for_match_rule(rule, &connection, Some(100)).await?;

    info!("Listening for UPower D-Bus signals...");

    while let Some(msg) = stream.next().await {
        if msg.is_ok() && events.send(Pulse::now()).await.is_err() {
            break;
        }
    }

    info!("UPower signal stream ended");
    Ok(())
}
