//! # Resource Pool
//!
//! Purpose: Lend resources built by a caller-supplied constructor, blocking
//! while none are idle.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable resources.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle resources or
//!    adjusting the live count; constructors run outside the lock.
//! 3. **Slot Reservation**: A slot is reserved before a constructor runs and
//!    released if it fails, so `live` never exceeds `max_size`.
//! 4. **RAII Guards**: [`Pooled`] hands the resource back on drop, or drops
//!    it and frees its slot when marked broken.
//!
//! ## Structure Overview
//!
//! ```text
//! ResourcePool<T, E>
//!   ├── shared: Arc<Shared<T, E>>
//!   │     ├── state: Mutex<PoolState<T>>  (idle queue + live count)
//!   │     ├── available: Condvar          (signalled on release/growth)
//!   │     ├── make: Box<dyn Fn() -> Result<T, E>>
//!   │     └── metrics: PoolMetrics        (wait accumulator + counters)
//!   └── tuner: Tuner                      (background thread, joined on drop)
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::metrics::{PoolMetrics, PoolStats};
use crate::tuner::{TuneOutcome, Tuner};

type Constructor<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Number of accounting slices per tune interval for blocked waiters.
const WAIT_SLICES_PER_INTERVAL: u32 = 10;

struct PoolState<T> {
    idle: VecDeque<T>,
    live: usize,
}

/// State shared between pool handles, guards, and the tuner thread.
pub(crate) struct Shared<T, E> {
    pub(crate) config: PoolConfig,
    make: Constructor<T, E>,
    state: Mutex<PoolState<T>>,
    available: Condvar,
    pub(crate) metrics: PoolMetrics,
}

impl<T, E: fmt::Display> Shared<T, E> {
    pub(crate) fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Reserves a slot for a new resource, failing at capacity.
    fn try_reserve(&self) -> bool {
        let mut state = self.state.lock();
        if state.live >= self.config.max_size {
            return false;
        }
        state.live += 1;
        true
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
    }

    fn push_idle(&self, resource: T) {
        let mut state = self.state.lock();
        debug_assert!(
            state.idle.len() < state.live,
            "more resources returned than were lent out"
        );
        state.idle.push_back(resource);
        drop(state);
        self.available.notify_one();
    }

    /// Builds one more resource if a slot is free and makes it available.
    ///
    /// Constructor failures are logged and counted; the reserved slot is
    /// handed back so nothing dead ever reaches the idle queue.
    pub(crate) fn grow_one(&self) -> TuneOutcome {
        if !self.try_reserve() {
            return TuneOutcome::AtCapacity;
        }

        match (self.make)() {
            Ok(resource) => {
                self.metrics.record_grown();
                self.push_idle(resource);
                TuneOutcome::Grown
            }
            Err(err) => {
                self.release_slot();
                self.metrics.record_create_failure();
                warn!(error = %err, "failed to create pooled resource");
                TuneOutcome::Failed
            }
        }
    }

    fn acquire(&self) -> T {
        let mut state = self.state.lock();
        if let Some(resource) = state.idle.pop_front() {
            drop(state);
            self.metrics.record_acquire(false);
            return resource;
        }

        // Wake up periodically to report blocked time, so the tuner sees a
        // waiter that is still stuck.
        let slice = self.wait_slice();
        let mut last = Instant::now();
        let resource = loop {
            self.available.wait_for(&mut state, slice);
            let now = Instant::now();
            self.metrics.record_wait(now.duration_since(last));
            last = now;
            if let Some(resource) = state.idle.pop_front() {
                break resource;
            }
        };
        drop(state);

        self.metrics.record_acquire(true);
        resource
    }

    fn release(&self, resource: T) {
        self.push_idle(resource);
    }

    fn discard(&self, resource: T) {
        drop(resource);
        self.release_slot();
        self.metrics.record_discard();
        debug!("discarded broken pooled resource");

        if self.grow_one() == TuneOutcome::Grown {
            debug!("replaced discarded pooled resource");
        }
    }

    fn wait_slice(&self) -> Duration {
        (self.config.tune_interval / WAIT_SLICES_PER_INTERVAL).max(Duration::from_millis(1))
    }

    fn stats(&self) -> PoolStats {
        let (live, idle) = {
            let state = self.state.lock();
            (state.live, state.idle.len())
        };
        self.metrics
            .snapshot(live, idle, self.config.min_size, self.config.max_size)
    }
}

/// Generic pool of resources of type `T`, built by a constructor that fails
/// with `E`.
///
/// Resources are created up front (`min_size` of them) and by the tuner as
/// contention demands, never beyond `max_size`. The pool does not shrink on
/// its own; only resources discarded as broken leave it.
pub struct ResourcePool<T, E> {
    shared: Arc<Shared<T, E>>,
    // Dropped (stopped and joined) together with the pool.
    _tuner: Tuner,
}

impl<T, E> ResourcePool<T, E>
where
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Creates a pool with the given bounds and default tuning.
    pub fn new<F>(min_size: usize, max_size: usize, make: F) -> PoolResult<Self, E>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self::with_config(PoolConfig::new(min_size, max_size), make)
    }

    /// Creates a pool from a full configuration.
    ///
    /// Builds `min_size` resources synchronously, then starts the tuner. If
    /// any step fails, everything built so far is dropped and the error is
    /// returned.
    pub fn with_config<F>(config: PoolConfig, make: F) -> PoolResult<Self, E>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let config = config.validate::<E>()?;

        let mut idle = VecDeque::with_capacity(config.max_size);
        for _ in 0..config.min_size {
            idle.push_back(make().map_err(PoolError::Create)?);
        }

        let live = idle.len();
        let shared = Arc::new(Shared {
            config,
            make: Box::new(make),
            state: Mutex::new(PoolState { idle, live }),
            available: Condvar::new(),
            metrics: PoolMetrics::default(),
        });
        let tuner = Tuner::spawn(Arc::clone(&shared)).map_err(PoolError::Spawn)?;

        Ok(ResourcePool {
            shared,
            _tuner: tuner,
        })
    }

    /// Takes a resource, blocking until one is idle.
    ///
    /// Time spent blocked feeds the tuner's wait counter. There is no
    /// timeout; pair every call with exactly one [`release`](Self::release)
    /// or [`discard`](Self::discard), or use [`get`](Self::get).
    pub fn acquire(&self) -> T {
        self.shared.acquire()
    }

    /// Takes a resource wrapped in a guard that returns it on drop.
    pub fn get(&self) -> Pooled<'_, T, E> {
        Pooled {
            shared: &*self.shared,
            resource: Some(self.shared.acquire()),
            broken: false,
        }
    }

    /// Returns a healthy resource obtained from [`acquire`](Self::acquire).
    pub fn release(&self, resource: T) {
        self.shared.release(resource);
    }

    /// Drops a broken resource obtained from [`acquire`](Self::acquire).
    ///
    /// The slot is freed and a replacement is attempted right away. If the
    /// constructor fails, the tuner refills up to `min_size` later.
    pub fn discard(&self, resource: T) {
        self.shared.discard(resource);
    }

    /// Runs one tuning step now instead of waiting for the next tick.
    pub fn tune_now(&self) -> TuneOutcome {
        self.shared.tune()
    }

    /// Returns a snapshot of sizes and counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

impl<T, E> fmt::Debug for ResourcePool<T, E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("config", &self.shared.config)
            .field("stats", &self.shared.stats())
            .finish()
    }
}

/// RAII wrapper returning a resource to the pool on drop.
///
/// Call [`mark_broken`](Pooled::mark_broken) after a failure that leaves the
/// resource unusable; it is then discarded instead of recirculated.
pub struct Pooled<'a, T, E: fmt::Display> {
    shared: &'a Shared<T, E>,
    resource: Option<T>,
    broken: bool,
}

impl<T, E: fmt::Display> Pooled<'_, T, E> {
    /// Flags the resource so it is discarded when the guard drops.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Returns true once the resource has been flagged as broken.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Discards the resource immediately.
    pub fn discard(mut self) {
        self.broken = true;
    }
}

impl<T, E: fmt::Display> Deref for Pooled<'_, T, E> {
    type Target = T;

    fn deref(&self) -> &T {
        self.resource.as_ref().expect("resource exists until drop")
    }
}

impl<T, E: fmt::Display> DerefMut for Pooled<'_, T, E> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource.as_mut().expect("resource exists until drop")
    }
}

impl<T, E: fmt::Display> Drop for Pooled<'_, T, E> {
    fn drop(&mut self) {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => return,
        };

        if self.broken {
            self.shared.discard(resource);
        } else {
            self.shared.release(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    type Make = Box<dyn Fn() -> Result<usize, io::Error> + Send + Sync>;

    fn counting(counter: &Arc<AtomicUsize>) -> Make {
        let counter = Arc::clone(counter);
        Box::new(move || Ok(counter.fetch_add(1, Ordering::SeqCst)))
    }

    fn failing_when(counter: &Arc<AtomicUsize>, fail: &Arc<AtomicBool>) -> Make {
        let counter = Arc::clone(counter);
        let fail = Arc::clone(fail);
        Box::new(move || {
            if fail.load(Ordering::SeqCst) {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            } else {
                Ok(counter.fetch_add(1, Ordering::SeqCst))
            }
        })
    }

    /// Bounds with a tuner that never ticks during a test.
    fn quiet(min_size: usize, max_size: usize) -> PoolConfig {
        let mut config = PoolConfig::new(min_size, max_size);
        config.tune_interval = Duration::from_secs(3600);
        config
    }

    #[test]
    fn construct_creates_min_size_resources() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(3, 5), counting(&counter)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let stats = pool.stats();
        assert_eq!(stats.live, 3);
        assert_eq!(stats.idle, 3);
    }

    #[test]
    fn zero_min_size_builds_one() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(0, 2), counting(&counter)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(pool.config().min_size, 1);
    }

    #[test]
    fn inverted_bounds_create_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let err = ResourcePool::new(5, 3, counting(&counter)).unwrap_err();
        assert!(matches!(err, PoolError::InvalidSize { min: 5, max: 3 }));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn initial_fill_failure_propagates() {
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&counter);
        let result = ResourcePool::with_config(quiet(3, 3), move || {
            let id = inner.fetch_add(1, Ordering::SeqCst);
            if id == 1 {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            } else {
                Ok(id)
            }
        });
        assert!(matches!(result, Err(PoolError::Create(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fourth_acquire_blocks_until_release() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::new(3, 3, counting(&counter)).unwrap();
        let first = pool.acquire();
        let _second = pool.acquire();
        let _third = pool.acquire();

        let pool = &pool;
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            scope.spawn(move || {
                tx.send(pool.acquire()).unwrap();
            });

            assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
            pool.release(first);
            let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(got, first);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(pool.stats().waited_acquires, 1);
    }

    #[test]
    fn release_makes_resource_available_again() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 1), counting(&counter)).unwrap();
        let id = pool.acquire();
        pool.release(id);
        assert_eq!(pool.acquire(), id);
        assert_eq!(pool.stats().acquires, 2);
    }

    #[test]
    fn tune_is_steady_without_contention() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 4), counting(&counter)).unwrap();
        let id = pool.acquire();
        pool.release(id);
        assert_eq!(pool.tune_now(), TuneOutcome::Steady);
        assert_eq!(pool.stats().live, 1);
    }

    /// Holds every idle resource, lets one waiter block for `hold`, then
    /// releases. Returns with all resources back in the pool.
    fn contend(pool: &ResourcePool<usize, io::Error>, hold: Duration) {
        let held: Vec<usize> = (0..pool.stats().idle).map(|_| pool.acquire()).collect();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            scope.spawn(move || {
                tx.send(pool.acquire()).unwrap();
            });
            thread::sleep(hold);
            for id in held {
                pool.release(id);
            }
            let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            pool.release(got);
        });
    }

    #[test]
    fn contention_grows_by_exactly_one_up_to_max() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 2), counting(&counter)).unwrap();

        contend(&pool, Duration::from_millis(50));
        assert!(pool.stats().pending_wait > pool.config().wait_threshold);
        assert_eq!(pool.tune_now(), TuneOutcome::Grown);
        let stats = pool.stats();
        assert_eq!(stats.live, 2);
        assert_eq!(stats.grown, 1);
        assert_eq!(stats.pending_wait, Duration::ZERO);

        contend(&pool, Duration::from_millis(50));
        assert_eq!(pool.tune_now(), TuneOutcome::AtCapacity);
        assert_eq!(pool.stats().live, 2);
        assert_eq!(pool.stats().pending_wait, Duration::ZERO);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn background_tuner_unblocks_waiter() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut config = PoolConfig::new(1, 2);
        config.tune_interval = Duration::from_millis(20);
        let pool = ResourcePool::with_config(config, counting(&counter)).unwrap();

        let first = pool.acquire();
        let pool = &pool;
        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            scope.spawn(move || {
                tx.send(pool.acquire()).unwrap();
            });
            let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_ne!(second, first);
            assert_eq!(pool.stats().live, 2);

            // At capacity: a third caller waits for a release.
            let (tx, rx) = mpsc::channel();
            scope.spawn(move || {
                tx.send(pool.acquire()).unwrap();
            });
            assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
            assert_eq!(pool.stats().live, 2);
            pool.release(second);
            let third = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(third, second);
            pool.release(third);
        });
        pool.release(first);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn discard_replaces_resource() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(2, 2), counting(&counter)).unwrap();
        let broken = pool.acquire();
        pool.discard(broken);

        let stats = pool.stats();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(stats.live, 2);
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.discarded, 1);

        let a = pool.acquire();
        let b = pool.acquire();
        assert_ne!(a, broken);
        assert_ne!(b, broken);
    }

    #[test]
    fn failed_replacement_is_refilled_by_tuner() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let pool = ResourcePool::with_config(quiet(1, 1), failing_when(&counter, &fail)).unwrap();

        let broken = pool.acquire();
        fail.store(true, Ordering::SeqCst);
        pool.discard(broken);
        assert_eq!(pool.stats().live, 0);
        assert_eq!(pool.stats().create_failures, 1);

        assert_eq!(pool.tune_now(), TuneOutcome::Failed);
        assert_eq!(pool.stats().live, 0);

        fail.store(false, Ordering::SeqCst);
        assert_eq!(pool.tune_now(), TuneOutcome::Refilled(1));
        assert_eq!(pool.stats().live, 1);
        assert_eq!(pool.acquire(), 1);
    }

    #[test]
    fn guard_releases_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 1), counting(&counter)).unwrap();
        {
            let guard = pool.get();
            assert_eq!(*guard, 0);
            assert_eq!(pool.stats().idle, 0);
        }
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn broken_guard_is_discarded() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 1), counting(&counter)).unwrap();
        {
            let mut guard = pool.get();
            guard.mark_broken();
            assert!(guard.is_broken());
        }
        assert_eq!(pool.stats().discarded, 1);
        assert_eq!(pool.acquire(), 1);

        pool.release(1);
        pool.get().discard();
        assert_eq!(pool.acquire(), 2);
    }

    #[test]
    fn dropping_pool_stops_tuner_promptly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = ResourcePool::with_config(quiet(1, 1), counting(&counter)).unwrap();
        let start = Instant::now();
        drop(pool);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn dropping_pool_survives_a_panicked_tuner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_make = Arc::clone(&calls);
        let mut config = PoolConfig::new(1, 1);
        config.tune_interval = Duration::from_millis(10);
        let pool = ResourcePool::with_config(config, move || -> Result<usize, io::Error> {
            match calls_make.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(0),
                1 => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
                _ => panic!("constructor blew up"),
            }
        })
        .unwrap();

        // The immediate replacement fails, so the tuner's refill runs the
        // panicking constructor on its own thread.
        let resource = pool.acquire();
        pool.discard(resource);
        let deadline = Instant::now() + Duration::from_secs(2);
        while calls.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(calls.load(Ordering::SeqCst) >= 3);

        drop(pool);
    }
}
