//! Status LED pattern sequencer.
//!
//! Drives the single status indicator through six patterns, advancing one
//! timed phase per poll cycle and producing a PWM-like [`Intensity`] for
//! the platform to apply.
//!
//! # Patterns
//!
//! | Pattern       | Behavior                                              |
//! |---------------|-------------------------------------------------------|
//! | `Off` / `On`  | Static output, no phases                              |
//! | `Number`      | N on/off pulses; the final low phase of a continuous  |
//! |               | repetition is stretched to mark the boundary          |
//! | `FadeUp`      | Linear intensity ramp from dark to full               |
//! | `FadeDown`    | Linear intensity ramp from full to dark               |
//! | `MatchRelay`  | Mirrors the relay level, not time-driven              |
//!
//! # Modes
//!
//! Patterns normally repeat ([`PatternMode::Continuous`]). A one-shot run
//! ([`LedSequencer::play_once`]) plays the pattern a single time and then
//! hands control to a designated continuation pattern, which is how the
//! setup menu layers "blink twice, then go back to the edit fade" feedback
//! over whatever was showing. The counted-pulse pattern keeps separate
//! pulse counters for continuous and one-shot use so a one-shot burst
//! never clobbers the count a menu state is displaying.
//!
//! # Re-initialization
//!
//! A pattern's timing state is (re)armed only on the poll where the
//! requested pattern differs from the previously applied one. Requesting
//! the pattern that is already active is a no-op, so callers may re-assert
//! their pattern every cycle without restarting an in-flight animation.

use embassy_time::{Duration, Instant};

use crate::relay::RelayState;

/// LED drive level; 0 is dark, [`u16::MAX`] is full brightness.
pub type Intensity = u16;

/// Fully dark output.
pub const INTENSITY_OFF: Intensity = 0;

/// Full brightness output.
pub const INTENSITY_FULL: Intensity = u16::MAX;

/// Duration of a regular pulse phase in the counted-pulse pattern.
pub const PULSE_SHORT: Duration = Duration::from_millis(200);

/// Stretched final low phase marking the end of a continuous repetition.
pub const PULSE_LONG: Duration = Duration::from_millis(1100);

/// Total time of one fade from one extreme to the other.
pub const FADE_TIME: Duration = Duration::from_millis(1500);

/// Number of discrete intensity steps per fade.
pub const FADE_STEPS: u16 = 100;

/// Extra dwell on the penultimate fade step so the endpoint is visible.
const FADE_ENDPOINT_DWELL: Duration = Duration::from_millis(400);

/// Selectable LED pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum Pattern {
    /// Steady dark.
    #[default]
    Off,
    /// Steady full brightness.
    On,
    /// Counted on/off pulses.
    Number,
    /// Ramp from dark to full.
    FadeUp,
    /// Ramp from full to dark.
    FadeDown,
    /// Steady output mirroring the relay state.
    MatchRelay,
}

/// Playback mode for the active pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum PatternMode {
    /// Repeat indefinitely.
    #[default]
    Continuous,
    /// Play once, then switch to the continuation pattern.
    OneShot,
}

/// Time-sequenced pattern engine for the status LED.
#[derive(Debug)]
pub struct LedSequencer {
    /// Requested pattern; compared against `applied` to detect changes.
    pattern: Pattern,
    /// Pattern whose timing state is currently armed.
    applied: Option<Pattern>,
    mode: PatternMode,
    /// Pattern to switch to when a one-shot run completes.
    resume: Pattern,
    /// Pulse count for continuous counted-pulse runs.
    pulses_continuous: u16,
    /// Pulse count for one-shot counted-pulse runs.
    pulses_one_shot: u16,
    /// Phase index within the active pattern.
    phase: u16,
    phase_started: Instant,
    phase_len: Duration,
    /// Intensity delta per fade step.
    fade_step: Intensity,
    output: Intensity,
}

impl Default for LedSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl LedSequencer {
    /// Creates a sequencer resting dark in [`Pattern::Off`].
    pub const fn new() -> Self {
        Self {
            pattern: Pattern::Off,
            applied: None,
            mode: PatternMode::Continuous,
            resume: Pattern::Off,
            pulses_continuous: 0,
            pulses_one_shot: 0,
            phase: 0,
            phase_started: Instant::from_ticks(0),
            phase_len: PULSE_SHORT,
            fade_step: 0,
            output: INTENSITY_OFF,
        }
    }

    /// Requests a pattern in continuous mode.
    ///
    /// Takes effect (and re-initializes timing) on the next poll, unless
    /// the pattern is already the applied one.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
        self.mode = PatternMode::Continuous;
    }

    /// Requests a single run of `pattern`, continuing with `resume` once
    /// it completes.
    pub fn play_once(&mut self, pattern: Pattern, resume: Pattern) {
        self.pattern = pattern;
        self.mode = PatternMode::OneShot;
        self.resume = resume;
    }

    /// Sets the pulse count used by continuous counted-pulse runs.
    pub fn set_pulse_count(&mut self, count: u16) {
        self.pulses_continuous = count;
    }

    /// Plays `count` pulses once, then continues with `resume`.
    pub fn play_pulses_once(&mut self, count: u16, resume: Pattern) {
        self.pulses_one_shot = count;
        self.play_once(Pattern::Number, resume);
    }

    /// Currently requested pattern.
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Current playback mode.
    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    /// Advances the sequencer by one cycle.
    ///
    /// # Arguments
    ///
    /// * `relay` - current relay output, mirrored by [`Pattern::MatchRelay`]
    /// * `now` - cycle timestamp
    ///
    /// # Returns
    ///
    /// The intensity to drive onto the LED this cycle.
    pub fn poll(&mut self, relay: RelayState, now: Instant) -> Intensity {
        if self.applied != Some(self.pattern) {
            self.init_pattern(relay, now);
            self.applied = Some(self.pattern);
        }

        match self.pattern {
            Pattern::Off | Pattern::On => {}
            Pattern::Number => self.advance_pulses(now),
            Pattern::FadeUp => self.advance_fade(true, now),
            Pattern::FadeDown => self.advance_fade(false, now),
            Pattern::MatchRelay => self.output = Self::relay_level(relay),
        }

        self.output
    }

    /// Arms phase/timing state for a newly requested pattern.
    fn init_pattern(&mut self, relay: RelayState, now: Instant) {
        match self.pattern {
            Pattern::Off => self.output = INTENSITY_OFF,
            Pattern::On => self.output = INTENSITY_FULL,
            Pattern::Number => {
                // A zero count leaves the pattern inert rather than
                // emitting an empty repetition.
                if self.active_pulse_count() >= 1 {
                    self.phase = 0;
                    self.phase_started = now;
                    self.phase_len = PULSE_SHORT;
                    self.output = INTENSITY_OFF;
                }
            }
            Pattern::FadeUp | Pattern::FadeDown => {
                self.phase = 0;
                self.phase_started = now;
                self.phase_len = Self::fade_phase_len();
                self.fade_step = INTENSITY_FULL / FADE_STEPS;
                self.output = if self.pattern == Pattern::FadeUp {
                    INTENSITY_OFF
                } else {
                    INTENSITY_FULL
                };
            }
            Pattern::MatchRelay => self.output = Self::relay_level(relay),
        }
    }

    /// Advances the counted-pulse pattern when its phase deadline passes.
    ///
    /// Odd phases light the LED, even phases darken it. The final low
    /// phase of a continuous repetition runs [`PULSE_LONG`]; a completed
    /// one-shot run restores continuous mode and requests the
    /// continuation pattern.
    fn advance_pulses(&mut self, now: Instant) {
        let count = self.active_pulse_count();
        if count == 0 || now - self.phase_started < self.phase_len {
            return;
        }

        self.phase += 1;
        self.output = if self.phase % 2 == 1 {
            INTENSITY_FULL
        } else {
            INTENSITY_OFF
        };
        self.phase_len = if self.phase == count * 2 && self.mode == PatternMode::Continuous {
            PULSE_LONG
        } else {
            PULSE_SHORT
        };
        self.phase_started = now;

        if self.phase > count * 2 {
            match self.mode {
                PatternMode::Continuous => self.phase = 1,
                PatternMode::OneShot => {
                    self.mode = PatternMode::Continuous;
                    self.pattern = self.resume;
                }
            }
        }
    }

    /// Advances a fade when its phase deadline passes.
    ///
    /// The penultimate step dwells an extra [`FADE_ENDPOINT_DWELL`] so the
    /// fade's endpoint registers visually before the loop restarts or the
    /// one-shot completes.
    fn advance_fade(&mut self, rising: bool, now: Instant) {
        if now - self.phase_started < self.phase_len {
            return;
        }

        let level = (self.phase as u32 * self.fade_step as u32).min(INTENSITY_FULL as u32) as u16;
        self.output = if rising {
            level
        } else {
            INTENSITY_FULL - level
        };
        self.phase_started = now;
        self.phase += 1;

        if self.phase == FADE_STEPS - 1 {
            self.phase_len = self.phase_len + FADE_ENDPOINT_DWELL;
        }

        if self.phase >= FADE_STEPS {
            match self.mode {
                PatternMode::Continuous => {
                    self.phase_len = Self::fade_phase_len();
                    self.phase = 0;
                }
                PatternMode::OneShot => {
                    self.mode = PatternMode::Continuous;
                    self.pattern = self.resume;
                }
            }
        }
    }

    fn active_pulse_count(&self) -> u16 {
        match self.mode {
            PatternMode::Continuous => self.pulses_continuous,
            PatternMode::OneShot => self.pulses_one_shot,
        }
    }

    fn fade_phase_len() -> Duration {
        Duration::from_millis(FADE_TIME.as_millis() / FADE_STEPS as u64)
    }

    fn relay_level(relay: RelayState) -> Intensity {
        match relay {
            RelayState::High => INTENSITY_FULL,
            RelayState::Low => INTENSITY_OFF,
        }
    }
}
