//! Display sinks for the rendered status line.

use crate::config::SinkKind;
use capy_engine::{DisplaySink, SinkError};
use std::process::Stdio;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::process::Command;

pub enum Display {
    /// Root window name, read by dwm and friends.
    RootName,
    Stdout(Stdout),
}

impl Display {
    pub fn new(kind: SinkKind) -> Self {
        match kind {
            SinkKind::Xsetroot => Display::RootName,
            SinkKind::Stdout => Display::Stdout(tokio::io::stdout()),
        }
    }
}

impl DisplaySink for Display {
    async fn show(&mut self, text: &str) -> Result<(), SinkError> {
        match self {
            Display::RootName => {
                let status = Command::new("xsetroot")
                    .arg("-name")
                    .arg(text)
                    .stdin(Stdio::null())
                    .status()
                    .await?;

                if !status.success() {
                    return Err(SinkError::CommandFailed {
                        program: "xsetroot".to_string(),
                        status,
                    });
                }
            }
            Display::Stdout(out) => {
                out.write_all(text.as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
        }
        Ok(())
    }
}
