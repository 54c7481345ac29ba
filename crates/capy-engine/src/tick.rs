//! Pulse streams: eager ticking, wall-clock alignment and merging.
//!
//! Every stream is backed by its own tokio task and a single-slot channel,
//! so a slow consumer holds the producer back instead of piling pulses up.
//! A producer task exits as soon as its receiver is dropped.

use log::debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Capacity of every pulse channel.
pub const PULSE_CAPACITY: usize = 1;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// "Something happened now." Carries no payload besides its timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pulse(Instant);

impl Pulse {
    #[inline]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    #[inline]
    pub const fn instant(self) -> Instant {
        self.0
    }
}

/// Receiving half of a pulse stream.
pub type PulseStream = mpsc::Receiver<Pulse>;

/// Create a pulse channel with the standard capacity.
pub fn pulse_channel() -> (mpsc::Sender<Pulse>, PulseStream) {
    mpsc::channel(PULSE_CAPACITY)
}

/// Like a plain interval, but the first pulse fires immediately.
///
/// After the first pulse, one pulse is sent every `interval`. Consecutive
/// pulses are never closer than `interval`: a late tick pushes the schedule
/// back rather than bursting to catch up.
pub fn eager_tick(interval: Duration) -> PulseStream {
    let (tx, rx) = pulse_channel();

    tokio::spawn(async move {
        if tx.send(Pulse::now()).await.is_err() {
            return;
        }
        run_ticks(&tx, interval).await;
    });

    rx
}

/// Eager tick whose second pulse lands on the next wall-clock multiple of
/// `interval` (e.g. the next whole minute).
pub fn aligned_tick(interval: Duration) -> PulseStream {
    let wall_now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    aligned_tick_from(wall_now, interval)
}

/// [`aligned_tick`] with an explicit wall-clock reading (time since the UNIX epoch).
pub fn aligned_tick_from(wall_now: Duration, interval: Duration) -> PulseStream {
    let delay = next_boundary(wall_now, interval).saturating_sub(wall_now);
    let boundary = Instant::now() + delay;
    let (tx, rx) = pulse_channel();

    tokio::spawn(async move {
        if tx.send(Pulse::now()).await.is_err() {
            return;
        }

        debug!("Aligning ticker: next boundary in {:?}", delay);
        time::sleep_until(boundary).await;

        if tx.send(Pulse::now()).await.is_err() {
            return;
        }
        run_ticks(&tx, interval).await;
    });

    rx
}

/// Next multiple of `interval` strictly after `now`.
///
/// `now` is rounded to the nearest multiple (halves round up); if that is not
/// in the future, one more interval is added. A zero interval returns `now`.
pub fn next_boundary(now: Duration, interval: Duration) -> Duration {
    let step = interval.as_nanos();
    if step == 0 {
        return now;
    }

    let now_ns = now.as_nanos();
    let rounded = (now_ns + step / 2) / step * step;
    let boundary = if rounded <= now_ns {
        rounded + step
    } else {
        rounded
    };

    duration_from_nanos(boundary)
}

/// Merge several pulse streams into one.
///
/// Pulses from the same input keep their order. The merged stream closes once
/// every input has closed.
pub fn merge(streams: impl IntoIterator<Item = PulseStream>) -> PulseStream {
    let (tx, rx) = pulse_channel();

    for mut stream in streams {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(pulse) = stream.recv().await {
                if tx.send(pulse).await.is_err() {
                    break;
                }
            }
        });
    }

    rx
}

async fn run_ticks(tx: &mpsc::Sender<Pulse>, interval: Duration) {
    // tokio rejects a zero period
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if tx.send(Pulse::now()).await.is_err() {
            debug!("Ticker receiver dropped, stopping");
            return;
        }
    }
}

fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    // always below one billion
    let subsec = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(secs, subsec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const SECOND: Duration = Duration::from_secs(1);
    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_eager_tick_fires_immediately() {
        let start = Instant::now();
        let mut ticks = eager_tick(MINUTE);

        let first = ticks.recv().await.unwrap();
        assert!(first.instant().duration_since(start) < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_tick_spacing() {
        let mut ticks = eager_tick(SECOND);

        let mut previous = ticks.recv().await.unwrap();
        for _ in 0..5 {
            let next = ticks.recv().await.unwrap();
            assert!(next.instant().duration_since(previous.instant()) >= SECOND);
            previous = next;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_tick_keeps_running() {
        let mut ticks = eager_tick(SECOND);
        for _ in 0..30 {
            let next = timeout(SECOND * 2, ticks.recv()).await;
            assert!(matches!(next, Ok(Some(_))));
        }
    }

    #[test]
    fn test_next_boundary_rounds_down_then_adds_interval() {
        let now = Duration::from_secs(120 + 20);
        assert_eq!(next_boundary(now, MINUTE), Duration::from_secs(180));
    }

    #[test]
    fn test_next_boundary_rounds_up() {
        let now = Duration::from_secs(120 + 40);
        assert_eq!(next_boundary(now, MINUTE), Duration::from_secs(180));
    }

    #[test]
    fn test_next_boundary_on_boundary_moves_forward() {
        let now = Duration::from_secs(180);
        assert_eq!(next_boundary(now, MINUTE), Duration::from_secs(240));
    }

    #[test]
    fn test_next_boundary_halfway_and_subsecond() {
        assert_eq!(next_boundary(Duration::from_secs(30), MINUTE), MINUTE);
        assert_eq!(
            next_boundary(Duration::from_millis(59_999), MINUTE),
            MINUTE
        );
        assert_eq!(next_boundary(Duration::from_secs(7), Duration::ZERO), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aligned_tick_lands_on_boundaries() {
        let start = Instant::now();
        let mut ticks = aligned_tick_from(Duration::from_secs(600 + 20), MINUTE);

        let first = ticks.recv().await.unwrap();
        assert_eq!(first.instant(), start);

        let second = ticks.recv().await.unwrap();
        assert_eq!(second.instant().duration_since(start), Duration::from_secs(40));

        let third = ticks.recv().await.unwrap();
        assert_eq!(third.instant().duration_since(start), Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_forwards_all_and_closes() {
        let (tx_a, rx_a) = pulse_channel();
        let (tx_b, rx_b) = pulse_channel();
        let mut merged = merge([rx_a, rx_b]);

        let a = Pulse::now();
        tx_a.send(a).await.unwrap();
        assert_eq!(merged.recv().await, Some(a));

        time::sleep(SECOND).await;
        let b = Pulse::now();
        tx_b.send(b).await.unwrap();
        assert_eq!(merged.recv().await, Some(b));

        drop(tx_a);
        drop(tx_b);
        assert_eq!(merged.recv().await, None);
    }
}
