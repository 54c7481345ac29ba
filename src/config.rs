//! User configuration.
//!
//! Read once at startup from `$XDG_CONFIG_HOME/capy-status/config.json`.
//! Every key is optional; a missing or broken file just means defaults.

use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the rendered line goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// `xsetroot -name`, for dwm-style bars.
    #[default]
    Xsetroot,
    /// One line per change on stdout.
    Stdout,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Placed between two fields. The leading \x01 resets colours.
    pub separator: String,
    pub sink: SinkKind,
    pub battery: BatteryConfig,
    pub brightness: BrightnessConfig,
    pub network: NetworkConfig,
    pub thermal: ThermalConfig,
    pub memory: MemoryConfig,
    pub clock: ClockConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: "\x01 | ".to_string(),
            sink: SinkKind::default(),
            battery: BatteryConfig::default(),
            brightness: BrightnessConfig::default(),
            network: NetworkConfig::default(),
            thermal: ThermalConfig::default(),
            memory: MemoryConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// At or below this percentage, discharging is urgent and the remaining
    /// time is no longer derated.
    pub low_percent: u32,
    pub poll_secs: u64,
    /// Quiet period for collapsing bursts of UPower signals.
    pub debounce_ms: u64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            low_percent: 20,
            poll_secs: 60,
            debounce_ms: 1000,
        }
    }
}

impl BatteryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    /// Kernel attribute watched for changes.
    pub path: PathBuf,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/sys/class/backlight/intel_backlight/brightness"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Lines `ifstat` prints before the first sample.
    pub header_lines: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { header_lines: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub warning_f: f64,
    pub urgent_f: f64,
    pub poll_secs: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            warning_f: 176.0,
            urgent_f: 185.0,
            poll_secs: 1,
        }
    }
}

impl ThermalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub path: PathBuf,
    pub poll_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
            poll_secs: 1,
        }
    }
}

impl MemoryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// chrono strftime format.
    pub format: String,
    /// Ticks land on wall-clock multiples of this.
    pub interval_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            format: "%a %-d %b %Y %-I:%M %P %z".to_string(),
            interval_secs: 60,
        }
    }
}

impl ClockConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/capy-status/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("capy-status").join("config.json"))
    }

    /// Load from a config file, or return defaults if it is missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::with_nonzero_intervals)
    }

    /// Replace zero intervals, which would poll in a busy loop, with defaults.
    fn with_nonzero_intervals(mut self) -> Self {
        let defaults = Self::default();
        nonzero_or_default(
            "battery.poll_secs",
            &mut self.battery.poll_secs,
            defaults.battery.poll_secs,
        );
        nonzero_or_default(
            "thermal.poll_secs",
            &mut self.thermal.poll_secs,
            defaults.thermal.poll_secs,
        );
        nonzero_or_default(
            "memory.poll_secs",
            &mut self.memory.poll_secs,
            defaults.memory.poll_secs,
        );
        nonzero_or_default(
            "clock.interval_secs",
            &mut self.clock.interval_secs,
            defaults.clock.interval_secs,
        );
        self
    }
}

fn nonzero_or_default(key: &str, value: &mut u64, default: u64) {
    if *value == 0 {
        warn!("Config {} must be at least 1, using {}", key, default);
        *value = default;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("capy-status-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load(&scratch_path("missing"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let path = scratch_path("invalid");
        fs::write(&path, "{ not json").unwrap();

        let config = Config::load(&path);
        fs::remove_file(&path).ok();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let path = scratch_path("partial");
        fs::write(
            &path,
            r#"{ "sink": "stdout", "separator": " :: ", "thermal": { "urgent_f": 190.5 } }"#,
        )
        .unwrap();

        let config = Config::load(&path);
        fs::remove_file(&path).ok();

        assert_eq!(config.sink, SinkKind::Stdout);
        assert_eq!(config.separator, " :: ");
        assert_eq!(config.thermal.urgent_f, 190.5);
        assert_eq!(config.thermal.warning_f, 176.0);
        assert_eq!(config.battery, BatteryConfig::default());
    }

    #[test]
    fn test_zero_intervals_fall_back_to_defaults() {
        let config = Config::from_json(
            r#"{
                "battery": { "poll_secs": 0, "debounce_ms": 0 },
                "thermal": { "poll_secs": 0 },
                "memory": { "poll_secs": 0 },
                "clock": { "interval_secs": 0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.battery.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.battery.debounce(), Duration::ZERO);
        assert_eq!(config.thermal.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.memory.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.clock.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.separator, "\x01 | ");
        assert_eq!(config.battery.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.battery.debounce(), Duration::from_secs(1));
        assert_eq!(config.clock.interval(), Duration::from_secs(60));
        assert_eq!(config.network.header_lines, 2);
    }
}
