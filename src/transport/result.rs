/// Outcome of a non-blocking read. Pairs with [`super::error::TransportError`]
/// to give every transport call the uniform `{Ok, WouldBlock, Closed, Error}`
/// shape described for this crate's sockets: `Ok(Ready(_))`, `Ok(WouldBlock)`
/// and `Ok(Closed)` are all non-error outcomes; only genuine I/O failures are
/// `Err(_)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome<T> {
    /// Data was available and is returned.
    Ready(T),
    /// No data available right now; the caller should try again later.
    WouldBlock,
    /// The peer closed the connection (TCP only: a zero-length read).
    Closed,
}

impl<T> RecvOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RecvOutcome<U> {
        match self {
            Self::Ready(t) => RecvOutcome::Ready(f(t)),
            Self::WouldBlock => RecvOutcome::WouldBlock,
            Self::Closed => RecvOutcome::Closed,
        }
    }

    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(t) => Some(t),
            Self::WouldBlock | Self::Closed => None,
        }
    }
}
