//! Debouncing for bursty pulse streams.
//!
//! Some event sources (UPower in particular) report several signals for one
//! real change. [`debounce`] collapses such a burst into a single pulse that is
//! emitted once the input has been quiet for a while.
//!
//! The pending deadline lives inside the debouncing task and is only ever
//! touched there, so replacing it cannot race with it firing: a replaced
//! deadline never fires and no pulse is emitted twice.

use crate::tick::{Pulse, PulseStream, pulse_channel};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

/// Re-emit the latest input pulse once no new pulse has arrived for `quiet`.
///
/// The emitted pulse keeps the timestamp of the last input in the burst.
/// When the input closes, a pending pulse is still flushed after its quiet
/// period, then the output closes.
pub fn debounce(input: PulseStream, quiet: Duration) -> PulseStream {
    let (tx, rx) = pulse_channel();
    tokio::spawn(Debouncer::new(input, quiet).run(tx));
    rx
}

enum Event {
    Pulse(Pulse),
    Quiet,
    InputClosed,
}

struct Debouncer {
    input: PulseStream,
    input_open: bool,
    quiet: Duration,
    last_seen: Option<Pulse>,
    deadline: Option<Instant>,
}

impl Debouncer {
    fn new(input: PulseStream, quiet: Duration) -> Self {
        Self {
            input,
            input_open: true,
            quiet,
            last_seen: None,
            deadline: None,
        }
    }

    async fn run(mut self, out: mpsc::Sender<Pulse>) {
        loop {
            match self.next_event().await {
                Event::Pulse(pulse) => {
                    self.last_seen = Some(pulse);
                    self.deadline = Some(Instant::now() + self.quiet);
                }
                Event::Quiet => {
                    self.deadline = None;
                    if let Some(pulse) = self.last_seen.take() {
                        if out.send(pulse).await.is_err() {
                            return;
                        }
                    }
                }
                Event::InputClosed => {
                    self.input_open = false;
                }
            }

            if !self.input_open && self.deadline.is_none() {
                return;
            }
        }
    }

    async fn next_event(&mut self) -> Event {
        let Some(deadline) = self.deadline else {
            return match self.input.recv().await {
                Some(pulse) => Event::Pulse(pulse),
                None => Event::InputClosed,
            };
        };

        // New pulses win over a deadline reached at the same moment.
        tokio::select! {
            biased;
            received = self.input.recv(), if self.input_open => match received {
                Some(pulse) => Event::Pulse(pulse),
                None => Event::InputClosed,
            },
            () = time::sleep_until(deadline) => Event::Quiet,
        }
    }
}
