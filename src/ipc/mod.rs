/// An in-process `AtomicBool`-backed stand-in for the named OS signal/mutex
/// primitives these traits describe.
pub mod local_signal;

/// A named, OS-backed binary signal shared across processes.
///
/// This crate only ships [`local_signal::LocalEvent`], an in-process
/// implementation: a real cross-process signal (a named semaphore, an
/// `eventfd`, a Windows named event) is out of scope here, since the video
/// socket and module registry only need *something* that satisfies this
/// contract to build start/stop coordination and a self-test hook on top of.
pub trait CrossProcessEvent: Send + Sync {
    /// Raises the signal; wakes any waiter.
    fn signal(&self);
    /// Lowers the signal.
    fn reset(&self);
    /// Current state, without blocking.
    fn is_signaled(&self) -> bool;
}

/// A named, OS-backed mutual-exclusion primitive shared across processes.
///
/// As with [`CrossProcessEvent`], only an in-process stand-in
/// ([`local_signal::LocalMutex`]) ships here.
pub trait CrossProcessMutex: Send + Sync {
    /// Blocks until the mutex is acquired.
    fn lock(&self);
    /// Releases the mutex. Calling this without holding it is a logic error
    /// left to the caller to avoid, same as `std::sync::Mutex`'s guard
    /// discipline — there is no poisoning here since this is a bare signal.
    fn unlock(&self);
    /// Attempts to acquire without blocking; `true` on success.
    fn try_lock(&self) -> bool;
}
