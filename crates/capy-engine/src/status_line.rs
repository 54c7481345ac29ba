//! Fan-in of all sources into one aggregator.
//!
//! Every source gets its own task and private channel, plus a forwarding task
//! that tags its fragments with the slot index and feeds the shared update
//! channel. Only the aggregator task reads that channel.

use crate::aggregator::{Aggregator, DisplaySink, Update};
use crate::source::{FragmentSender, Source};
use log::{info, warn};
use tokio::sync::mpsc;

/// Capacity of the shared update channel.
/// 64 absorbs a startup burst from every source without holding anyone back.
pub const CHANNEL_CAPACITY: usize = 64;

/// Sources in display order, joined by a separator.
pub struct StatusLine {
    sources: Vec<Box<dyn Source>>,
    separator: String,
}

impl StatusLine {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            sources: Vec::new(),
            separator: separator.into(),
        }
    }

    /// Append a source; its slot is the next free index.
    pub fn with_source(mut self, source: Box<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Start every source and aggregate into `sink`.
    ///
    /// Returns once every source has finished, which in practice means never.
    pub async fn run<S: DisplaySink>(self, sink: S) {
        if self.is_empty() {
            warn!("Status line has no sources, showing an empty line");
        }

        let (updates_tx, updates_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let aggregator = Aggregator::new(self.sources.len(), self.separator, sink);

        for (index, source) in self.sources.into_iter().enumerate() {
            spawn_source(index, source, updates_tx.clone());
        }
        drop(updates_tx);

        aggregator.run(updates_rx).await;
    }
}

fn spawn_source(index: usize, source: Box<dyn Source>, updates: mpsc::Sender<Update>) {
    let (out, mut fragments) = FragmentSender::channel();

    info!("Starting {} source in slot {}", source.name(), index);
    tokio::spawn(source.run(out));

    tokio::spawn(async move {
        while let Some(fragment) = fragments.recv().await {
            if updates.send(Update { index, fragment }).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, SourceError};
    use crate::source::{Fragment, PolledSource, Probe};
    use crate::tick::{PulseStream, eager_tick};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const UNIT: Duration = Duration::from_secs(1);

    type Script = fn(usize) -> Result<Fragment, SourceError>;

    struct Ticked {
        name: &'static str,
        calls: usize,
        script: Script,
    }

    impl Ticked {
        fn boxed(name: &'static str, script: Script) -> Box<dyn Source> {
            PolledSource::boxed(Self {
                name,
                calls: 0,
                script,
            })
        }
    }

    impl Probe for Ticked {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn triggers(&mut self) -> Result<PulseStream, SourceError> {
            Ok(eager_tick(UNIT))
        }

        async fn query(&mut self) -> Result<Fragment, SourceError> {
            let reply = (self.script)(self.calls);
            self.calls += 1;
            reply
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl DisplaySink for Recorder {
        async fn show(&mut self, text: &str) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_sources_end_to_end() {
        let status_line = StatusLine::new("|")
            .with_source(Ticked::boxed("a", |_| Ok("X".into())))
            .with_source(Ticked::boxed("b", |n| {
                Ok(Fragment::from(if n == 0 { "Y" } else { "Z" }))
            }))
            .with_source(Ticked::boxed("c", |_| {
                Err(SourceError::UnexpectedOutput("nope".into()))
            }));
        assert_eq!(status_line.len(), 3);

        let recorder = Recorder::default();
        let handle = tokio::spawn(status_line.run(recorder.clone()));

        tokio::time::sleep(UNIT * 3 + UNIT / 2).await;
        handle.abort();

        let calls = recorder.calls();
        assert_eq!(calls.first().map(String::as_str), Some("...|...|..."));
        assert_eq!(calls.last().map(String::as_str), Some("X|Z|(err)"));

        for pair in calls.windows(2) {
            assert_ne!(pair[0], pair[1], "duplicate consecutive push");
        }

        let settled = calls.iter().position(|c| c == "X|Y|(err)").unwrap();
        assert_eq!(calls[settled + 1], "X|Z|(err)");
        assert_eq!(calls.len(), settled + 2);
    }

    #[tokio::test]
    async fn test_run_returns_when_sources_finish() {
        struct Once;

        impl Source for Once {
            fn name(&self) -> &str {
                "once"
            }

            fn run(
                self: Box<Self>,
                out: FragmentSender,
            ) -> futures_util::future::BoxFuture<'static, ()> {
                Box::pin(async move {
                    out.emit(Fragment::from("done")).await;
                })
            }
        }

        let recorder = Recorder::default();
        StatusLine::new(" / ")
            .with_source(Box::new(Once))
            .run(recorder.clone())
            .await;

        assert_eq!(recorder.calls(), vec!["...", "done"]);
    }

    #[tokio::test]
    async fn test_empty_status_line_returns_without_pushing() {
        let status_line = StatusLine::new("|");
        assert!(status_line.is_empty());

        let recorder = Recorder::default();
        status_line.run(recorder.clone()).await;

        assert!(recorder.calls().is_empty());
    }
}
