use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Monotonic wall clock with pause/resume. Paused while the session waits
/// on the arbiter, running while the engine thinks.
pub struct GameClock {
    used: Duration,
    running: Option<Instant>,
}

impl Default for GameClock {
    fn default() -> Self {
        GameClock::new()
    }
}

impl GameClock {
    /// A fresh clock, already running.
    pub fn new() -> GameClock {
        GameClock { used: Duration::ZERO, running: Some(Instant::now()) }
    }

    /// Resumes the clock; a no-op while it is already running.
    pub fn start(&mut self) {
        if self.running.is_none() {
            self.running = Some(Instant::now());
        }
    }

    /// Pauses the clock, banking the elapsed time.
    pub fn stop(&mut self) {
        if let Some(since) = self.running.take() {
            self.used += since.elapsed();
        }
    }

    /// Total time spent running.
    pub fn used(&self) -> Duration {
        self.used + self.running.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

/// A one-shot deadline that flips a shared abort flag.
///
/// The timer thread parks on a condvar; cancelling wakes it before the
/// deadline so no stale alarm can fire into a later search. The flag is
/// the single piece of shared mutable state the searcher observes, and
/// the expiry path does nothing but store it.
pub struct Alarm {
    flag: Arc<AtomicBool>,
    pending: Option<(Arc<(Mutex<bool>, Condvar)>, JoinHandle<()>)>,
}

impl Default for Alarm {
    fn default() -> Self {
        Alarm::new()
    }
}

impl Alarm {
    pub fn new() -> Alarm {
        Alarm { flag: Arc::new(AtomicBool::new(false)), pending: None }
    }

    /// The flag the searcher polls at every recursion boundary.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    /// Whether the current search has been told to stop.
    pub fn aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Raises the abort flag immediately, as a user interrupt would.
    pub fn trigger_now(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Cancels any pending deadline and lowers the flag.
    pub fn reset(&mut self) {
        self.clear();
        self.flag.store(false, Ordering::Release);
    }

    /// Arms the deadline: after `delay` the abort flag goes up, unless
    /// [`Alarm::clear`] runs first.
    pub fn set(&mut self, delay: Duration) {
        self.clear();
        let flag = self.flag.clone();
        let pair = Arc::new((Mutex::new(false), Condvar::new()));
        let waiter = pair.clone();
        let handle = thread::spawn(move || {
            let (cancelled, cvar) = &*waiter;
            let guard = cancelled.lock().unwrap();
            let (guard, _) = cvar
                .wait_timeout_while(guard, delay, |cancelled| !*cancelled)
                .unwrap();
            if !*guard {
                flag.store(true, Ordering::Release);
            }
        });
        self.pending = Some((pair, handle));
    }

    /// Disarms a pending deadline, if any.
    pub fn clear(&mut self) {
        if let Some((pair, handle)) = self.pending.take() {
            let (cancelled, cvar) = &*pair;
            *cancelled.lock().unwrap() = true;
            cvar.notify_all();
            let _ = handle.join();
        }
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.clear();
    }
}
