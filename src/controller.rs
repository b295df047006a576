//! Outer poll loop composing the control core.
//!
//! One [`Controller::poll`] call is one control cycle. Each cycle the
//! platform samples the three buttons and hands over the latest sensor
//! conversion result; the controller advances every component exactly
//! once, in a fixed order, and returns the levels to drive:
//!
//! 1. The three [`ButtonChannel`]s classify this cycle's presses; the
//!    classifications live for exactly this cycle.
//! 2. The sensor sample is folded in (a failed conversion keeps the
//!    previous sample and bumps a diagnostic counter).
//! 3. [`RelayFilter`] runs; a transition while the menu is idle switches
//!    the LED to relay feedback.
//! 4. A short press of the select button toggles the USB port.
//! 5. [`SetupMenu`] consumes the Up/Down classifications.
//! 6. [`LedSequencer`] produces this cycle's LED intensity.
//! 7. [`ConfigStore`] performs the deferred USB-port write if due.
//!
//! Button events are therefore always computed before anything consumes
//! them, and the relay state the LED mirrors is always this cycle's.
//!
//! The controller never blocks and never reads a clock; the platform owns
//! the tick and must start the next analog conversion once per cycle
//! after consuming [`Outputs`].

use embassy_time::Instant;
use embedded_storage::Storage;

use crate::button::{ButtonChannel, Press};
use crate::led::{Intensity, LedSequencer, Pattern};
use crate::menu::SetupMenu;
use crate::relay::{RelayFilter, RelayState};
use crate::settings::{ConfigStore, UsbPort};

/// Raw inputs for one control cycle.
///
/// Button levels are polarity-normalized (`true` = pressed); wiring
/// conventions are the platform's concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inputs {
    /// USB-select button level.
    pub select_pressed: bool,
    /// Up button level.
    pub up_pressed: bool,
    /// Down button level.
    pub down_pressed: bool,
    /// This cycle's sensor conversion result, or `None` when the
    /// conversion produced no valid sample.
    pub sample: Option<u32>,
}

/// Levels to drive after one control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    /// Relay drive level.
    pub relay: RelayState,
    /// Which USB port's power and indicator lines to enable.
    pub usb_port: UsbPort,
    /// Status LED intensity.
    pub led: Intensity,
}

/// Owner and scheduler of all control-core state machines.
pub struct Controller<S> {
    select_button: ButtonChannel,
    up_button: ButtonChannel,
    down_button: ButtonChannel,
    relay: RelayFilter,
    menu: SetupMenu,
    led: LedSequencer,
    store: ConfigStore<S>,
    /// Last valid sensor sample; retained across failed conversions.
    last_sample: u32,
    /// Failed-conversion diagnostic counter.
    invalid_samples: u32,
}

impl<S: Storage> Controller<S> {
    /// Creates a controller around a loaded configuration store.
    ///
    /// The relay starts low and the LED dark, matching the hardware's
    /// power-on state; the LED picks up relay feedback on the first
    /// relay transition.
    pub fn new(store: ConfigStore<S>) -> Self {
        Self {
            select_button: ButtonChannel::new(),
            up_button: ButtonChannel::new(),
            down_button: ButtonChannel::new(),
            relay: RelayFilter::new(),
            menu: SetupMenu::new(),
            led: LedSequencer::new(),
            store,
            last_sample: 0,
            invalid_samples: 0,
        }
    }

    /// Runs one control cycle.
    ///
    /// # Arguments
    ///
    /// * `inputs` - this cycle's raw samples
    /// * `now` - cycle timestamp from the monotonic clock
    ///
    /// # Errors
    ///
    /// Propagates storage errors from configuration commits or the
    /// deferred USB-port write; all in-memory state remains consistent
    /// and the next cycle may simply proceed.
    pub fn poll(&mut self, inputs: &Inputs, now: Instant) -> Result<Outputs, S::Error> {
        let select = self.select_button.poll(inputs.select_pressed, now);
        let up = self.up_button.poll(inputs.up_pressed, now);
        let down = self.down_button.poll(inputs.down_pressed, now);

        match inputs.sample {
            Some(sample) => self.last_sample = sample,
            None => self.invalid_samples = self.invalid_samples.wrapping_add(1),
        }

        let (relay_changed, relay) = self.relay.poll(self.last_sample, self.store.settings(), now);
        if relay_changed && self.menu.is_idle() {
            #[cfg(feature = "debug-mode")]
            defmt::info!("relay -> {}", relay);
            self.led.set_pattern(Pattern::MatchRelay);
        }

        if select == Some(Press::Short) {
            let port = self.store.usb_port().other();
            #[cfg(feature = "debug-mode")]
            defmt::info!("usb port -> {}", port);
            self.store.select_port(port, now);
        }

        self.menu
            .poll(up, down, self.last_sample, &mut self.store, &mut self.led)?;

        let led = self.led.poll(relay, now);
        self.store.flush_if_due(now)?;

        Ok(Outputs {
            relay,
            usb_port: self.store.usb_port(),
            led,
        })
    }

    /// Configuration store, for inspection by the platform.
    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    /// Number of failed sensor conversions observed so far.
    pub fn invalid_samples(&self) -> u32 {
        self.invalid_samples
    }
}
