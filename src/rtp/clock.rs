use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// RTP clock rate for video: 90 kHz, per RFC 6184.
pub const RTP_CLOCK_RATE: u64 = 90_000;

const NTP_UNIX_EPOCH_DIFF_SECS: u64 = 2_208_988_800;

/// A clock anchored to a single coincident instant, expressed in three time
/// bases: a steady monotonic clock (for measuring elapsed RTP ticks), a wall
/// clock (for diagnostics) and an NTP 64-bit timestamp (for exchanging the
/// epoch with a peer during the handshake).
///
/// `now()` returns signed ticks at [`RTP_CLOCK_RATE`] since the epoch. Ticks
/// are derived fresh from the elapsed `Duration` on every call via a single
/// multiply-then-divide, so error never accumulates across calls; over a
/// 24-hour span the result is accurate to within one tick.
#[derive(Debug, Clone, Copy)]
pub struct RtpClock {
    steady_epoch: Instant,
    wall_epoch: SystemTime,
    ntp_epoch: u64,
}

impl RtpClock {
    /// Latches the current steady and wall clocks as a coincident pair and
    /// derives the NTP epoch from the wall-clock reading.
    #[must_use]
    pub fn new() -> Self {
        let steady_epoch = Instant::now();
        let wall_epoch = SystemTime::now();
        let ntp_epoch = ntp_from_wall(wall_epoch);
        Self {
            steady_epoch,
            wall_epoch,
            ntp_epoch,
        }
    }

    /// Reconstructs a clock from a peer's NTP epoch (received over the
    /// handshake), so that both ends' `now()` report the same tick value at
    /// the same wall-clock instant.
    ///
    /// The local steady epoch is derived by subtracting the offset between
    /// the local wall clock and the peer's NTP epoch from the local steady
    /// clock, aligning the two machines' RTP tick spaces to within one tick
    /// (assuming their wall clocks are themselves synchronized).
    #[must_use]
    pub fn from_peer_ntp_epoch(peer_ntp_epoch: u64) -> Self {
        let local_wall_now = SystemTime::now();
        let local_steady_now = Instant::now();
        let local_ntp_now = ntp_from_wall(local_wall_now);

        let local_since_1900 = ntp_to_duration(local_ntp_now);
        let peer_since_1900 = ntp_to_duration(peer_ntp_epoch);
        let offset = local_since_1900.saturating_sub(peer_since_1900);

        let steady_epoch = local_steady_now
            .checked_sub(offset)
            .unwrap_or(local_steady_now);
        let wall_epoch = local_wall_now.checked_sub(offset).unwrap_or(local_wall_now);

        Self {
            steady_epoch,
            wall_epoch,
            ntp_epoch: peer_ntp_epoch,
        }
    }

    /// Signed RTP ticks elapsed since the epoch. Negative if the epoch is in
    /// the future relative to the local steady clock (possible right after
    /// [`Self::from_peer_ntp_epoch`] if the peer is slightly ahead).
    #[must_use]
    pub fn now(&self) -> i64 {
        let steady_now = Instant::now();
        match steady_now.checked_duration_since(self.steady_epoch) {
            Some(elapsed) => ticks_from_duration(elapsed),
            None => -ticks_from_duration(self.steady_epoch.duration_since(steady_now)),
        }
    }

    #[must_use]
    pub fn steady_epoch(&self) -> Instant {
        self.steady_epoch
    }

    #[must_use]
    pub fn wall_epoch(&self) -> SystemTime {
        self.wall_epoch
    }

    /// The 64-bit NTP timestamp (32.32 fixed point, seconds since 1900) of
    /// the epoch, as exchanged during the handshake.
    #[must_use]
    pub fn ntp_epoch(&self) -> u64 {
        self.ntp_epoch
    }
}

impl Default for RtpClock {
    fn default() -> Self {
        Self::new()
    }
}

fn ntp_from_wall(wall: SystemTime) -> u64 {
    let since_unix = wall.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let secs = since_unix.as_secs().wrapping_add(NTP_UNIX_EPOCH_DIFF_SECS);
    let frac = (u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000;
    (secs << 32) | (frac & 0xffff_ffff)
}

fn ntp_to_duration(ntp: u64) -> Duration {
    let secs = ntp >> 32;
    let frac = ntp & 0xffff_ffff;
    let nanos = (frac * 1_000_000_000) >> 32;
    Duration::new(secs, nanos as u32)
}

fn ticks_from_duration(d: Duration) -> i64 {
    let nanos = d.as_nanos();
    ((nanos * u128::from(RTP_CLOCK_RATE)) / 1_000_000_000) as i64
}
