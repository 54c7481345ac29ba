//! capy-engine - the moving parts behind a single-line status bar
//!
//! - `tick` - eager and wall-clock aligned pulse streams
//! - `debounce` - collapsing bursts of pulses
//! - `source` - polled and streamed source loops with error fragments
//! - `aggregator` - slots, change detection and the display sink
//! - `status_line` - fan-in of every source into the aggregator

pub mod aggregator;
pub mod debounce;
pub mod error;
pub mod source;
pub mod status_line;
pub mod tick;

pub use aggregator::{Aggregator, DisplaySink, Update};
pub use debounce::debounce;
pub use error::{SinkError, SourceError};
pub use source::{
    ERROR_TEXT, Fragment, FragmentSender, PLACEHOLDER, PolledSource, Probe, Source, StreamProbe,
    StreamedSource,
};
pub use status_line::StatusLine;
pub use tick::{
    Pulse, PulseStream, aligned_tick, eager_tick, merge, next_boundary, pulse_channel,
};
