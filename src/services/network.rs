//! Network throughput service.
//!
//! `ifstat -T` prints a sample every second on its own; each line becomes a
//! fragment with the total download and upload rates in KB/s.

use crate::config::NetworkConfig;
use crate::services::command;
use capy_engine::{Fragment, SourceError, StreamProbe};
use tokio::process::Child;
use tokio::sync::mpsc;

pub struct NetworkProbe {
    header_lines: usize,
    /// Kills `ifstat` when the source goes away.
    child: Option<Child>,
}

impl NetworkProbe {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            header_lines: config.header_lines,
            child: None,
        }
    }
}

impl StreamProbe for NetworkProbe {
    type Item = String;

    fn name(&self) -> &'static str {
        "network"
    }

    async fn open(&mut self) -> Result<mpsc::Receiver<String>, SourceError> {
        let (child, lines) = command::spawn_lines("ifstat", &["-T"], self.header_lines)?;
        self.child = Some(child);
        Ok(lines)
    }

    fn format(&mut self, line: String) -> Result<Fragment, SourceError> {
        let (down, up) = parse_rates(&line)?;
        Ok(Fragment::new(format!("{down:.1} down/{up:.1} up")))
    }
}

/// The last two columns of an `ifstat -T` sample: total in and out.
pub fn parse_rates(line: &str) -> Result<(f64, f64), SourceError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [.., down, up] = fields.as_slice() else {
        return Err(SourceError::UnexpectedOutput(line.to_string()));
    };

    Ok((down.parse()?, up.parse()?))
}
