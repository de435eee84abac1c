use std::sync::atomic::{AtomicU8, Ordering};

/// Observed state of an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Unknown,
    Available,
    Unavailable,
}

impl Availability {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Availability::Available,
            2 => Availability::Unavailable,
            _ => Availability::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Availability::Unknown => 0,
            Availability::Available => 1,
            Availability::Unavailable => 2,
        }
    }
}

/// One-way circuit breaker shared by every request of a process.
///
/// Starts `Unknown`; the first successful call moves it to `Available`, any
/// failure latches it to `Unavailable` for good. Reads are relaxed: a request
/// racing with the trip may still make one last call.
#[derive(Debug)]
pub struct AvailabilityFlag(AtomicU8);

impl Default for AvailabilityFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl AvailabilityFlag {
    pub fn new() -> Self {
        Self::with_state(Availability::Unknown)
    }

    /// Starts in a given state, mostly for tests.
    pub fn with_state(state: Availability) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> Availability {
        Availability::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// Whether calls should still be attempted.
    pub fn is_usable(&self) -> bool {
        self.get() != Availability::Unavailable
    }

    /// Records a success. Has no effect once tripped.
    pub fn mark_available(&self) {
        let _ = self.0.compare_exchange(
            Availability::Unknown.as_u8(),
            Availability::Available.as_u8(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    /// Trips the breaker. Returns `true` only for the call that tripped it.
    pub fn mark_unavailable(&self) -> bool {
        self.0.swap(Availability::Unavailable.as_u8(), Ordering::Relaxed)
            != Availability::Unavailable.as_u8()
    }
}
