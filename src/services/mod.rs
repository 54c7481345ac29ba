//! Status sources for capy-status.
//!
//! Each service owns one slot of the status line and runs on its own task.
//!
//! - `battery` - acpi readings, refreshed on UPower D-Bus signals
//! - `brightness` - backlight level, refreshed on sysfs changes
//! - `network` - throughput streamed from ifstat
//! - `thermal` - CPU temperature with warning and urgent colours
//! - `memory` - RAM usage from /proc/meminfo
//! - `clock` - local time on whole minutes

pub mod battery;
pub mod brightness;
pub mod clock;
pub mod command;
pub mod memory;
pub mod network;
pub mod thermal;

use crate::config::Config;
use capy_engine::{PolledSource, StatusLine, StreamedSource};

/// Build the status line with every source in display order.
pub fn status_line(config: &Config) -> StatusLine {
    StatusLine::new(config.separator.clone())
        .with_source(PolledSource::boxed(battery::BatteryProbe::new(&config.battery)))
        .with_source(PolledSource::boxed(brightness::BrightnessProbe::new(&config.brightness)))
        .with_source(StreamedSource::boxed(network::NetworkProbe::new(&config.network)))
        .with_source(PolledSource::boxed(thermal::ThermalProbe::new(&config.thermal)))
        .with_source(PolledSource::boxed(memory::MemoryProbe::new(&config.memory)))
        .with_source(PolledSource::boxed(clock::ClockProbe::new(&config.clock)))
}
