//! Source loops: one long-running task per monitored quantity.
//!
//! A source turns triggers into [`Fragment`]s and hands them to its
//! [`FragmentSender`]. Two flavours are provided:
//!
//! - [`Probe`] + [`PolledSource`]: a trigger stream (ticks, watched events or
//!   both) and one query per trigger.
//! - [`StreamProbe`] + [`StreamedSource`]: the collaborator's own output is the
//!   trigger, e.g. a command printing one line per sample.
//!
//! Failure handling is the same for both. A failed query becomes the error
//! fragment and the loop carries on. A failed setup emits the error fragment
//! once and ends the loop for good.

use crate::error::SourceError;
use crate::tick::PulseStream;
use futures_util::future::BoxFuture;
use log::{debug, error, info, warn};
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;

/// Shown in a slot before its source has reported.
pub const PLACEHOLDER: &str = "...";

/// Shown in place of a source whose query or setup failed.
pub const ERROR_TEXT: &str = "(err)";

/// One source's display text for one reporting cycle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn error() -> Self {
        Self(ERROR_TEXT.to_string())
    }

    pub fn placeholder() -> Self {
        Self(PLACEHOLDER.to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output handle of a single source.
#[derive(Clone, Debug)]
pub struct FragmentSender {
    tx: mpsc::Sender<Fragment>,
}

impl FragmentSender {
    /// Private per-source channel. A single slot keeps a source from running
    /// ahead of the aggregator.
    pub fn channel() -> (Self, mpsc::Receiver<Fragment>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Hand a fragment over. Returns false once nobody is listening anymore.
    pub async fn emit(&self, fragment: Fragment) -> bool {
        self.tx.send(fragment).await.is_ok()
    }
}

/// A long-running producer of fragments.
///
/// This is the object-safe unit the status line spawns; most sources are
/// built from a [`Probe`] or a [`StreamProbe`] instead of implementing it
/// directly.
pub trait Source: Send {
    fn name(&self) -> &str;

    /// Run until the source is done for good.
    fn run(self: Box<Self>, out: FragmentSender) -> BoxFuture<'static, ()>;
}

/// A collaborator queried once per trigger.
pub trait Probe: Send + 'static {
    fn name(&self) -> &'static str;

    /// Set up the trigger stream. An error here is permanent.
    fn triggers(&mut self) -> impl Future<Output = Result<PulseStream, SourceError>> + Send;

    /// Query the collaborator and format the result. An error here is
    /// retried on the next trigger.
    fn query(&mut self) -> impl Future<Output = Result<Fragment, SourceError>> + Send;
}

/// Runs a [`Probe`] as a [`Source`].
pub struct PolledSource<P> {
    probe: P,
}

impl<P: Probe> PolledSource<P> {
    pub const fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn boxed(probe: P) -> Box<dyn Source> {
        Box::new(Self::new(probe))
    }
}

impl<P: Probe> Source for PolledSource<P> {
    fn name(&self) -> &str {
        self.probe.name()
    }

    fn run(self: Box<Self>, out: FragmentSender) -> BoxFuture<'static, ()> {
        Box::pin(poll_loop(self.probe, out))
    }
}

async fn poll_loop<P: Probe>(mut probe: P, out: FragmentSender) {
    let name = probe.name();

    let mut triggers = match probe.triggers().await {
        Ok(triggers) => triggers,
        Err(e) => {
            error!("{}: setup failed: {}", name, e);
            out.emit(Fragment::error()).await;
            return;
        }
    };

    info!("{} source running", name);

    while triggers.recv().await.is_some() {
        let fragment = match probe.query().await {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!("{}: {}", name, e);
                Fragment::error()
            }
        };

        if !out.emit(fragment).await {
            debug!("{}: status line gone, stopping", name);
            return;
        }
    }

    warn!("{}: trigger stream ended", name);
    out.emit(Fragment::error()).await;
}

/// A collaborator whose output drives the source.
pub trait StreamProbe: Send + 'static {
    type Item: Send + 'static;

    fn name(&self) -> &'static str;

    /// Start the collaborator. An error here is permanent.
    fn open(
        &mut self,
    ) -> impl Future<Output = Result<mpsc::Receiver<Self::Item>, SourceError>> + Send;

    /// Turn one item into a fragment. An error here only affects this item.
    fn format(&mut self, item: Self::Item) -> Result<Fragment, SourceError>;
}

/// Runs a [`StreamProbe`] as a [`Source`].
pub struct StreamedSource<P> {
    probe: P,
}

impl<P: StreamProbe> StreamedSource<P> {
    pub const fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn boxed(probe: P) -> Box<dyn Source> {
        Box::new(Self::new(probe))
    }
}

impl<P: StreamProbe> Source for StreamedSource<P> {
    fn name(&self) -> &str {
        self.probe.name()
    }

    fn run(self: Box<Self>, out: FragmentSender) -> BoxFuture<'static, ()> {
        Box::pin(stream_loop(self.probe, out))
    }
}

async fn stream_loop<P: StreamProbe>(mut probe: P, out: FragmentSender) {
    let name = probe.name();

    let mut items = match probe.open().await {
        Ok(items) => items,
        Err(e) => {
            error!("{}: setup failed: {}", name, e);
            out.emit(Fragment::error()).await;
            return;
        }
    };

    info!("{} source running", name);

    while let Some(item) = items.recv().await {
        let fragment = probe.format(item).unwrap_or_else(|e| {
            warn!("{}: {}", name, e);
            Fragment::error()
        });

        if !out.emit(fragment).await {
            debug!("{}: status line gone, stopping", name);
            return;
        }
    }

    warn!("{}: output stream ended", name);
    out.emit(Fragment::error()).await;
}
