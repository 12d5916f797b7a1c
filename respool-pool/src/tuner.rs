//! # Pool Tuner
//!
//! Background thread that grows the pool under sustained contention.
//!
//! Once per interval it reads the wait accumulator. Above the threshold it
//! builds one more resource (if below `max_size`). The accumulator is then
//! reset whatever happened, so a burst of contention only ever buys one
//! resource per interval. The same tick also refills the pool back to
//! `min_size` after broken resources were discarded and could not be
//! replaced at the time.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::pool::Shared;

/// Result of one tuning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneOutcome {
    /// Wait stayed under the threshold; nothing to do.
    Steady,
    /// The pool was below `min_size` and this many resources were rebuilt.
    Refilled(usize),
    /// One resource was added.
    Grown,
    /// Growth was warranted but the pool is already at `max_size`.
    AtCapacity,
    /// The constructor failed; nothing was added.
    Failed,
}

impl<T, E: fmt::Display> Shared<T, E> {
    /// Runs one tuning step and resets the wait accumulator.
    pub(crate) fn tune(&self) -> TuneOutcome {
        let outcome = if self.live() < self.config.min_size {
            self.refill()
        } else {
            let waited = self.metrics.pending_wait();
            if waited > self.config.wait_threshold {
                let outcome = self.grow_one();
                match outcome {
                    TuneOutcome::Grown => info!(
                        waited_ms = waited.as_millis() as u64,
                        live = self.live(),
                        "sustained pool contention, added a resource"
                    ),
                    TuneOutcome::AtCapacity => debug!(
                        waited_ms = waited.as_millis() as u64,
                        max_size = self.config.max_size,
                        "pool contention at capacity"
                    ),
                    _ => {}
                }
                outcome
            } else {
                TuneOutcome::Steady
            }
        };

        self.metrics.reset_pending_wait();
        outcome
    }

    fn refill(&self) -> TuneOutcome {
        let mut added = 0;
        while self.live() < self.config.min_size {
            if self.grow_one() != TuneOutcome::Grown {
                break;
            }
            added += 1;
        }

        if added == 0 {
            return TuneOutcome::Failed;
        }
        info!(added, live = self.live(), "refilled pool to its floor");
        TuneOutcome::Refilled(added)
    }
}

/// Handle for the background tuner thread.
///
/// Dropping the handle signals shutdown and joins the thread. The thread
/// waits on a condition variable rather than sleeping, so shutdown does not
/// have to sit out the rest of an interval.
pub(crate) struct Tuner {
    stop: Arc<(Mutex<bool>, Condvar)>,
    join: Option<JoinHandle<()>>,
}

impl Tuner {
    pub(crate) fn spawn<T, E>(shared: Arc<Shared<T, E>>) -> io::Result<Tuner>
    where
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_thread = Arc::clone(&stop);

        let join = thread::Builder::new()
            .name("respool-tuner".to_string())
            .spawn(move || run(&shared, &stop_thread))?;

        Ok(Tuner {
            stop,
            join: Some(join),
        })
    }

    fn stop(&mut self) {
        let (flag, signal) = &*self.stop;
        *flag.lock() = true;
        signal.notify_all();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("pool tuner thread panicked");
            }
        }
    }
}

impl Drop for Tuner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T, E: fmt::Display>(shared: &Shared<T, E>, stop: &(Mutex<bool>, Condvar)) {
    let (flag, signal) = stop;
    loop {
        let deadline = Instant::now() + shared.config.tune_interval;
        {
            let mut stopped = flag.lock();
            while !*stopped {
                if signal.wait_until(&mut stopped, deadline).timed_out() {
                    break;
                }
            }
            if *stopped {
                return;
            }
        }
        shared.tune();
    }
}
