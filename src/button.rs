//! Button press debounce and duration classification.
//!
//! Each physical button (USB-select, Up, Down) gets one [`ButtonChannel`]
//! that is polled once per control cycle with the button's current level
//! and the cycle timestamp. A press is classified on release by how long
//! it was held, which also debounces contact bounce: anything shorter
//! than [`PRESS_SHORT_MIN`] is discarded as a glitch.
//!
//! # Classification
//!
//! | Held for              | Event             |
//! |-----------------------|-------------------|
//! | < 60 ms               | none (debounced)  |
//! | 60 ms .. 1000 ms      | [`Press::Short`]  |
//! | 1000 ms .. 4000 ms    | [`Press::Long`]   |
//! | >= 4000 ms            | [`Press::TooLong`], delivered **while still held** |
//!
//! A too-long hold is reported exactly once, at the first poll where the
//! ceiling is crossed; the channel then stays spent until the button is
//! physically released, so a stuck or leaned-on button cannot emit a
//! stream of events. Releasing a spent channel produces nothing.

use embassy_time::{Duration, Instant};

/// Minimum hold time for a press to register at all (debounce floor).
pub const PRESS_SHORT_MIN: Duration = Duration::from_millis(60);

/// Minimum hold time for a press to classify as long.
pub const PRESS_LONG_MIN: Duration = Duration::from_millis(1000);

/// Hold ceiling; crossing it emits [`Press::TooLong`] while still held.
pub const PRESS_MAX: Duration = Duration::from_millis(4000);

/// Classified button press event.
///
/// Produced at most once per physical press and consumed by value, so an
/// event cannot outlive the cycle it was returned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum Press {
    /// Held for at least 60 ms and released before 1000 ms.
    Short,
    /// Held for at least 1000 ms and released before 4000 ms.
    Long,
    /// Held past the 4000 ms ceiling; reported during the hold.
    TooLong,
}

/// Press tracking phase.
///
/// `Spent` marks a press whose too-long event was already delivered; the
/// channel ignores the rest of the hold until release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PressPhase {
    /// Button is up; waiting for the next press.
    #[default]
    Released,
    /// Button went down at `since`; duration still being measured.
    Held { since: Instant },
    /// Too-long event delivered; waiting for physical release.
    Spent,
}

/// Debouncing press classifier for a single button.
///
/// Feed it the raw (already polarity-normalized) button level once per
/// cycle; it returns a [`Press`] on the cycle where one is recognized.
#[derive(Debug, Default)]
pub struct ButtonChannel {
    phase: PressPhase,
}

impl ButtonChannel {
    /// Creates an idle channel.
    pub const fn new() -> Self {
        Self {
            phase: PressPhase::Released,
        }
    }

    /// Advances the channel by one cycle.
    ///
    /// # Arguments
    ///
    /// * `pressed` - current button level, `true` while held down
    /// * `now` - cycle timestamp from the monotonic clock
    ///
    /// # Returns
    ///
    /// The classification recognized this cycle, if any.
    pub fn poll(&mut self, pressed: bool, now: Instant) -> Option<Press> {
        match self.phase {
            PressPhase::Released => {
                if pressed {
                    self.phase = PressPhase::Held { since: now };
                }
                None
            }
            PressPhase::Held { since } => {
                if !pressed {
                    self.phase = PressPhase::Released;
                    Self::classify(now - since)
                } else if now - since >= PRESS_MAX {
                    self.phase = PressPhase::Spent;
                    Some(Press::TooLong)
                } else {
                    None
                }
            }
            PressPhase::Spent => {
                if !pressed {
                    self.phase = PressPhase::Released;
                }
                None
            }
        }
    }

    /// Maps a completed hold duration to its release classification.
    ///
    /// Durations past [`PRESS_MAX`] yield nothing: the too-long event was
    /// already delivered during the hold.
    fn classify(held: Duration) -> Option<Press> {
        if held >= PRESS_MAX {
            None
        } else if held >= PRESS_LONG_MIN {
            Some(Press::Long)
        } else if held >= PRESS_SHORT_MIN {
            Some(Press::Short)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn glitch_below_debounce_floor_is_discarded() {
        let mut btn = ButtonChannel::new();
        assert_eq!(btn.poll(true, at(0)), None);
        assert_eq!(btn.poll(false, at(30)), None);
    }

    #[test]
    fn short_press_classified_on_release() {
        let mut btn = ButtonChannel::new();
        assert_eq!(btn.poll(true, at(0)), None);
        assert_eq!(btn.poll(true, at(50)), None);
        assert_eq!(btn.poll(false, at(100)), Some(Press::Short));
    }

    #[test]
    fn short_boundary_is_inclusive() {
        let mut btn = ButtonChannel::new();
        btn.poll(true, at(0));
        assert_eq!(btn.poll(false, at(60)), Some(Press::Short));
    }

    #[test]
    fn long_press_classified_on_release() {
        let mut btn = ButtonChannel::new();
        btn.poll(true, at(0));
        assert_eq!(btn.poll(false, at(999)), Some(Press::Short));

        btn.poll(true, at(2000));
        assert_eq!(btn.poll(false, at(3000)), Some(Press::Long));
    }

    #[test]
    fn too_long_fires_once_during_hold() {
        let mut btn = ButtonChannel::new();
        btn.poll(true, at(0));
        assert_eq!(btn.poll(true, at(3999)), None);
        assert_eq!(btn.poll(true, at(4000)), Some(Press::TooLong));
        // Keeping the button down must not re-trigger.
        assert_eq!(btn.poll(true, at(8000)), None);
        assert_eq!(btn.poll(true, at(60_000)), None);
        // Release of a spent press is silent.
        assert_eq!(btn.poll(false, at(61_000)), None);
    }

    #[test]
    fn channel_recovers_after_spent_press() {
        let mut btn = ButtonChannel::new();
        btn.poll(true, at(0));
        assert_eq!(btn.poll(true, at(4500)), Some(Press::TooLong));
        btn.poll(false, at(5000));

        btn.poll(true, at(6000));
        assert_eq!(btn.poll(false, at(6100)), Some(Press::Short));
    }

    #[test]
    fn release_past_ceiling_without_hold_poll_is_silent() {
        // If the ceiling poll was missed, the release alone must not
        // manufacture a second classification.
        let mut btn = ButtonChannel::new();
        btn.poll(true, at(0));
        assert_eq!(btn.poll(false, at(4100)), None);
    }
}
