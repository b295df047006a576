//! Setup menu: button-driven runtime editing of the relay configuration.
//!
//! A four-state FSM interprets classified Up/Down presses to edit the
//! hysteresis thresholds and the latch time, with the status LED as the
//! only display:
//!
//! ```text
//!            Up short              Up/Down long (commit)
//!   Idle ───────────────► EditUpper ───────────────► Idle
//!   Idle ───────────────► EditLower ───────────────► Idle
//!            Down short
//!   Idle ───────────────► EditLatch ───────────────► Idle
//!            Up/Down long
//! ```
//!
//! While editing, short presses step the value and long presses commit it
//! to storage; there is no discard action, so the last adjusted value is
//! always the one kept. Hitting a range bound plays a 2-pulse one-shot on
//! the LED and resumes the edit pattern. In the threshold editors, a
//! too-long press of the matching button (Up for upper, Down for lower)
//! adopts the live sensor sample as the new threshold, commits it, and
//! confirms with a 3-pulse one-shot.
//!
//! Committed values intentionally do not enforce `lower < upper`; with
//! crossed thresholds the relay filter simply arms more eagerly inside
//! the overlap band, which is well-defined and left to the user.

use embassy_time::Duration;
use embedded_storage::Storage;

use crate::button::Press;
use crate::led::{LedSequencer, Pattern};
use crate::settings::{
    ConfigStore, LATCH_TIME_MAX, LATCH_TIME_STEP, SENSOR_MAX, THRESHOLD_STEP,
};

/// Menu FSM state; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum MenuState {
    /// Normal operation; LED shows relay feedback.
    #[default]
    Idle,
    /// Editing the upper (switch-on) threshold; LED fades up.
    EditUpper,
    /// Editing the lower (switch-off) threshold; LED fades down.
    EditLower,
    /// Editing the latch time; LED shows one counted pulse.
    EditLatch,
}

/// Button-driven configuration editor.
#[derive(Debug, Default)]
pub struct SetupMenu {
    state: MenuState,
}

impl SetupMenu {
    /// Creates a menu in [`MenuState::Idle`].
    pub const fn new() -> Self {
        Self {
            state: MenuState::Idle,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> MenuState {
        self.state
    }

    /// True while no edit is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == MenuState::Idle
    }

    /// Consumes this cycle's Up/Down classifications and advances the FSM.
    ///
    /// # Arguments
    ///
    /// * `up` / `down` - classifications from the Up and Down channels
    /// * `sample` - last-known sensor sample, for adopt-as-threshold
    /// * `store` - configuration owner; commits go through it
    /// * `led` - sequencer driven for user feedback
    ///
    /// # Errors
    ///
    /// Propagates storage errors from commits; the FSM state is advanced
    /// before the write, so a failed commit leaves the menu in Idle with
    /// the edited value still live in memory.
    pub fn poll<S: Storage>(
        &mut self,
        up: Option<Press>,
        down: Option<Press>,
        sample: u32,
        store: &mut ConfigStore<S>,
        led: &mut LedSequencer,
    ) -> Result<(), S::Error> {
        let entered = self.state;
        match self.state {
            MenuState::Idle => self.poll_idle(up, down, led),
            MenuState::EditUpper => self.poll_edit_upper(up, down, sample, store, led)?,
            MenuState::EditLower => self.poll_edit_lower(up, down, sample, store, led)?,
            MenuState::EditLatch => self.poll_edit_latch(up, down, store, led)?,
        }

        #[cfg(feature = "debug-mode")]
        if self.state != entered {
            defmt::info!("setup menu: {} -> {}", entered, self.state);
        }
        #[cfg(not(feature = "debug-mode"))]
        let _ = entered;

        Ok(())
    }

    fn poll_idle(&mut self, up: Option<Press>, down: Option<Press>, led: &mut LedSequencer) {
        if up == Some(Press::Long) || down == Some(Press::Long) {
            self.state = MenuState::EditLatch;
            led.set_pulse_count(1);
            led.set_pattern(Pattern::Number);
        } else if up == Some(Press::Short) {
            self.state = MenuState::EditUpper;
            led.set_pattern(Pattern::FadeUp);
        } else if down == Some(Press::Short) {
            self.state = MenuState::EditLower;
            led.set_pattern(Pattern::FadeDown);
        }
    }

    fn poll_edit_upper<S: Storage>(
        &mut self,
        up: Option<Press>,
        down: Option<Press>,
        sample: u32,
        store: &mut ConfigStore<S>,
        led: &mut LedSequencer,
    ) -> Result<(), S::Error> {
        if up == Some(Press::Long) || down == Some(Press::Long) {
            store.commit_upper_threshold()?;
            self.state = MenuState::Idle;
            led.set_pattern(Pattern::MatchRelay);
        } else if up == Some(Press::Short) {
            if step_threshold_up(&mut store.settings_mut().upper_threshold) {
                led.play_pulses_once(2, Pattern::FadeUp);
            }
        } else if down == Some(Press::Short) {
            if step_threshold_down(&mut store.settings_mut().upper_threshold) {
                led.play_pulses_once(2, Pattern::FadeUp);
            }
        } else if up == Some(Press::TooLong) {
            store.settings_mut().upper_threshold = sample;
            store.commit_upper_threshold()?;
            self.state = MenuState::Idle;
            led.play_pulses_once(3, Pattern::MatchRelay);
        }
        Ok(())
    }

    fn poll_edit_lower<S: Storage>(
        &mut self,
        up: Option<Press>,
        down: Option<Press>,
        sample: u32,
        store: &mut ConfigStore<S>,
        led: &mut LedSequencer,
    ) -> Result<(), S::Error> {
        if up == Some(Press::Long) || down == Some(Press::Long) {
            store.commit_lower_threshold()?;
            self.state = MenuState::Idle;
            led.set_pattern(Pattern::MatchRelay);
        } else if up == Some(Press::Short) {
            if step_threshold_up(&mut store.settings_mut().lower_threshold) {
                led.play_pulses_once(2, Pattern::FadeDown);
            }
        } else if down == Some(Press::Short) {
            if step_threshold_down(&mut store.settings_mut().lower_threshold) {
                led.play_pulses_once(2, Pattern::FadeDown);
            }
        } else if down == Some(Press::TooLong) {
            store.settings_mut().lower_threshold = sample;
            store.commit_lower_threshold()?;
            self.state = MenuState::Idle;
            led.play_pulses_once(3, Pattern::MatchRelay);
        }
        Ok(())
    }

    fn poll_edit_latch<S: Storage>(
        &mut self,
        up: Option<Press>,
        down: Option<Press>,
        store: &mut ConfigStore<S>,
        led: &mut LedSequencer,
    ) -> Result<(), S::Error> {
        if up == Some(Press::Long) || down == Some(Press::Long) {
            store.commit_latch_time()?;
            self.state = MenuState::Idle;
            led.set_pattern(Pattern::MatchRelay);
        } else if up == Some(Press::Short) {
            let latch = &mut store.settings_mut().latch_time;
            let raised = *latch + LATCH_TIME_STEP;
            if raised > LATCH_TIME_MAX {
                *latch = LATCH_TIME_MAX;
                led.play_pulses_once(2, Pattern::Number);
            } else {
                *latch = raised;
            }
        } else if down == Some(Press::Short) {
            let latch = &mut store.settings_mut().latch_time;
            if *latch <= LATCH_TIME_STEP {
                *latch = Duration::from_millis(0);
                led.play_pulses_once(2, Pattern::Number);
            } else {
                *latch = *latch - LATCH_TIME_STEP;
            }
        }
        Ok(())
    }
}

/// Raises a threshold by one step; returns `true` when clamped at the
/// sensor maximum.
fn step_threshold_up(value: &mut u32) -> bool {
    if *value + THRESHOLD_STEP > SENSOR_MAX {
        *value = SENSOR_MAX;
        true
    } else {
        *value += THRESHOLD_STEP;
        false
    }
}

/// Lowers a threshold by one step; returns `true` when clamped at zero.
fn step_threshold_down(value: &mut u32) -> bool {
    if *value <= THRESHOLD_STEP {
        *value = 0;
        true
    } else {
        *value -= THRESHOLD_STEP;
        false
    }
}
