//! The single point where fragments become the status line.

use crate::error::SinkError;
use crate::source::Fragment;
use log::{debug, info, warn};
use std::future::Future;
use tokio::sync::mpsc;

/// Whatever finally shows the status line (root window name, stdout, ...).
pub trait DisplaySink: Send {
    /// Best-effort display of `text`. Errors are logged by the caller.
    fn show(&mut self, text: &str) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// A new fragment for the slot at `index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub index: usize,
    pub fragment: Fragment,
}

/// Owns one slot per source and the last text pushed to the sink.
///
/// Slots are only written through [`Aggregator::apply_update`], which runs
/// sequentially, so the rendered text is never built from a half-updated
/// slot array.
pub struct Aggregator<S> {
    slots: Vec<Fragment>,
    separator: String,
    last_pushed: String,
    sink: S,
}

impl<S: DisplaySink> Aggregator<S> {
    pub fn new(slot_count: usize, separator: impl Into<String>, sink: S) -> Self {
        Self {
            slots: vec![Fragment::placeholder(); slot_count],
            separator: separator.into(),
            last_pushed: String::new(),
            sink,
        }
    }

    /// Current slots joined with the separator, in source order.
    pub fn render(&self) -> String {
        self.slots
            .iter()
            .map(Fragment::as_str)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    pub fn last_pushed(&self) -> &str {
        &self.last_pushed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Store the fragment and push the new text if it changed.
    ///
    /// Returns whether the sink was invoked.
    pub async fn apply_update(&mut self, update: Update) -> bool {
        let Some(slot) = self.slots.get_mut(update.index) else {
            warn!(
                "Ignoring update for unknown slot {} ({} slots)",
                update.index,
                self.slots.len()
            );
            return false;
        };

        *slot = update.fragment;
        self.push_if_changed().await
    }

    /// Consume updates until every sender is gone.
    ///
    /// The all-placeholder line is pushed first so the bar shows up before
    /// the slowest source reports.
    pub async fn run(mut self, mut updates: mpsc::Receiver<Update>) {
        self.push_if_changed().await;

        while let Some(update) = updates.recv().await {
            self.apply_update(update).await;
        }

        info!("All sources finished");
    }

    async fn push_if_changed(&mut self) -> bool {
        let text = self.render();
        if text == self.last_pushed {
            return false;
        }

        debug!("Status line: {:?}", text);
        if let Err(e) = self.sink.show(&text).await {
            // Remembered anyway: the same text is not retried.
            warn!("Display sink failed: {}", e);
        }

        self.last_pushed = text;
        true
    }
}
