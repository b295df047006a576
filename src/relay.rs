//! Hysteresis relay filter with a configurable anti-chatter dwell.
//!
//! The relay follows the analog sensor through two independent
//! thresholds: from [`RelayState::Low`] it switches high only after the
//! sample has stayed **above** the upper threshold continuously for the
//! configured latch time, and from [`RelayState::High`] it switches low
//! only after the sample has stayed **below** the lower threshold just as
//! long. A sample that falls back to the boundary disarms the dwell
//! timer, so a brief spike or dip can never trip the relay.
//!
//! The thresholds and latch time are read live from [`Settings`] on every
//! poll; an edit made mid-dwell takes effect on the next poll with no
//! snapshot semantics.

use embassy_time::Instant;

use crate::settings::Settings;

/// Relay output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum RelayState {
    /// Relay de-energized.
    #[default]
    Low,
    /// Relay energized.
    High,
}

/// Sampled digital filter turning noisy sensor readings into a stable
/// relay output.
///
/// Exactly one dwell timestamp is armed at a time: the one matching the
/// transition the current state could make. The opposing timestamp is
/// structurally idle and cleared on every transition.
#[derive(Debug, Default)]
pub struct RelayFilter {
    state: RelayState,
    /// Armed while `Low` and the sample holds above the upper threshold.
    upper_exceeded_since: Option<Instant>,
    /// Armed while `High` and the sample holds below the lower threshold.
    lower_subceeded_since: Option<Instant>,
}

impl RelayFilter {
    /// Creates a filter resting in [`RelayState::Low`].
    pub const fn new() -> Self {
        Self {
            state: RelayState::Low,
            upper_exceeded_since: None,
            lower_subceeded_since: None,
        }
    }

    /// Current relay output.
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Advances the filter by one cycle.
    ///
    /// # Arguments
    ///
    /// * `sample` - latest sensor conversion result
    /// * `cfg` - live thresholds and latch time
    /// * `now` - cycle timestamp
    ///
    /// # Returns
    ///
    /// `(state_changed, state)`; `state_changed` is `true` on the single
    /// cycle where a transition is confirmed.
    pub fn poll(&mut self, sample: u32, cfg: &Settings, now: Instant) -> (bool, RelayState) {
        match self.state {
            RelayState::Low => {
                match self.upper_exceeded_since {
                    None if sample > cfg.upper_threshold => {
                        self.upper_exceeded_since = Some(now);
                    }
                    Some(_) if sample <= cfg.upper_threshold => {
                        self.upper_exceeded_since = None;
                    }
                    _ => {}
                }
                if let Some(since) = self.upper_exceeded_since {
                    if now - since > cfg.latch_time {
                        self.state = RelayState::High;
                        self.upper_exceeded_since = None;
                        self.lower_subceeded_since = None;
                        return (true, self.state);
                    }
                }
            }
            RelayState::High => {
                match self.lower_subceeded_since {
                    None if sample < cfg.lower_threshold => {
                        self.lower_subceeded_since = Some(now);
                    }
                    Some(_) if sample >= cfg.lower_threshold => {
                        self.lower_subceeded_since = None;
                    }
                    _ => {}
                }
                if let Some(since) = self.lower_subceeded_since {
                    if now - since > cfg.latch_time {
                        self.state = RelayState::Low;
                        self.lower_subceeded_since = None;
                        self.upper_exceeded_since = None;
                        return (true, self.state);
                    }
                }
            }
        }
        (false, self.state)
    }
}
