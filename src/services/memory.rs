//! RAM usage service, read from `/proc/meminfo`.

use crate::config::MemoryConfig;
use capy_engine::{Fragment, Probe, PulseStream, SourceError, eager_tick};
use std::path::PathBuf;
use std::time::Duration;

pub struct MemoryProbe {
    path: PathBuf,
    poll_interval: Duration,
}

impl MemoryProbe {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            path: config.path.clone(),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Probe for MemoryProbe {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
        Ok(eager_tick(self.poll_interval))
    }

    async fn query(&mut self) -> Result<Fragment, SourceError> {
        let meminfo = tokio::fs::read_to_string(&self.path).await?;
        let used = used_percent(&meminfo)?;
        Ok(Fragment::new(format!("RAM: {used:.0}%")))
    }
}

/// Share of memory not available to new allocations, in percent.
///
/// Lines look like `MemTotal:       16318888 kB`; anything else is skipped.
pub fn used_percent(meminfo: &str) -> Result<f64, SourceError> {
    let mut total = None;
    let mut available = None;

    for line in meminfo.lines() {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = rest.trim().strip_suffix("kB") else {
            continue;
        };
        let Ok(kb) = kb.trim().parse::<u64>() else {
            continue;
        };

        match name.trim() {
            "MemTotal" => total = Some(kb),
            "MemAvailable" => available = Some(kb),
            _ => {}
        }
    }

    let total = total
        .filter(|&kb| kb > 0)
        .ok_or(SourceError::MissingField("MemTotal"))?;
    let available = available.ok_or(SourceError::MissingField("MemAvailable"))?;

    Ok(100.0 * total.saturating_sub(available) as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16000000 kB
MemFree:         1000000 kB
MemAvailable:    4000000 kB
Buffers:          250000 kB
HugePages_Total:       0
";

    #[test]
    fn test_used_percent() {
        assert_eq!(used_percent(MEMINFO).unwrap(), 75.0);
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            used_percent("MemFree: 10 kB\n"),
            Err(SourceError::MissingField("MemTotal"))
        ));
        assert!(matches!(
            used_percent("MemTotal: 0 kB\nMemAvailable: 0 kB\n"),
            Err(SourceError::MissingField("MemTotal"))
        ));
        assert!(matches!(
            used_percent("MemTotal: 100 kB\n"),
            Err(SourceError::MissingField("MemAvailable"))
        ));
    }

    #[tokio::test]
    async fn test_query_reads_file() {
        let path =
            std::env::temp_dir().join(format!("capy-status-meminfo-{}", std::process::id()));
        std::fs::write(&path, MEMINFO).unwrap();

        let mut probe = MemoryProbe::new(&MemoryConfig {
            path: path.clone(),
            poll_secs: 1,
        });
        let fragment = probe.query().await;
        std::fs::remove_file(&path).ok();

        assert_eq!(fragment.unwrap().as_str(), "RAM: 75%");
    }

    #[tokio::test]
    async fn test_query_missing_file() {
        let mut probe = MemoryProbe::new(&MemoryConfig {
            path: PathBuf::from("/nonexistent/capy-status/meminfo"),
            poll_secs: 1,
        });
        assert!(matches!(probe.query().await, Err(SourceError::Io(_))));
    }
}
