use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use super::{CrossProcessEvent, CrossProcessMutex};

/// In-process stand-in for a named cross-process event: an `AtomicBool` plus
/// a `Condvar` so callers can block on `wait` instead of busy-polling.
pub struct LocalEvent {
    signaled: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl LocalEvent {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until signaled. Only useful within one process; named
    /// cross-process waiters would need a real OS primitive.
    pub fn wait(&self) {
        let guard = self.lock.lock().expect("mutex poisoned");
        let _unused = self
            .condvar
            .wait_while(guard, |()| !self.signaled.load(Ordering::Acquire))
            .expect("mutex poisoned");
    }
}

impl Default for LocalEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossProcessEvent for LocalEvent {
    fn signal(&self) {
        let _guard = self.lock.lock().expect("mutex poisoned");
        self.signaled.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    fn reset(&self) {
        let _guard = self.lock.lock().expect("mutex poisoned");
        self.signaled.store(false, Ordering::Release);
    }

    fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

/// In-process stand-in for a named cross-process mutex.
///
/// Modeled as a held/free flag behind a `Condvar` rather than wrapping
/// `std::sync::Mutex` directly: the `CrossProcessMutex` contract has
/// `lock`/`unlock` as separate `&self` calls (mirroring a raw OS handle),
/// which doesn't fit `std::sync::Mutex`'s guard-scoped API.
pub struct LocalMutex {
    held: Mutex<bool>,
    condvar: Condvar,
}

impl LocalMutex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            held: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }
}

impl Default for LocalMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossProcessMutex for LocalMutex {
    fn lock(&self) {
        let mut held = self.held.lock().expect("mutex poisoned");
        held = self.condvar.wait_while(held, |h| *h).expect("mutex poisoned");
        *held = true;
    }

    fn unlock(&self) {
        let mut held = self.held.lock().expect("mutex poisoned");
        *held = false;
        self.condvar.notify_one();
    }

    fn try_lock(&self) -> bool {
        let mut held = self.held.lock().expect("mutex poisoned");
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn event_starts_unsignaled_and_reports_state() {
        let ev = LocalEvent::new();
        assert!(!ev.is_signaled());
        ev.signal();
        assert!(ev.is_signaled());
        ev.reset();
        assert!(!ev.is_signaled());
    }

    #[test]
    fn event_wakes_a_waiting_thread() {
        let ev = Arc::new(LocalEvent::new());
        let waiter = ev.clone();
        let handle = std::thread::spawn(move || waiter.wait());

        std::thread::sleep(Duration::from_millis(20));
        ev.signal();
        handle.join().unwrap();
    }

    #[test]
    fn mutex_try_lock_fails_while_held() {
        let m = LocalMutex::new();
        assert!(m.try_lock());
        assert!(!m.try_lock());
        m.unlock();
        assert!(m.try_lock());
    }

    #[test]
    fn mutex_serializes_two_threads() {
        let m = Arc::new(LocalMutex::new());
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = m.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.lock();
                        let v = counter.load(Ordering::Relaxed);
                        counter.store(v + 1, Ordering::Relaxed);
                        m.unlock();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 400);
    }
}
