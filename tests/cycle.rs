//! End-to-end control-cycle tests: buttons, relay, menu, LED, and the
//! persistence policy driven together through `Controller::poll` against
//! an in-memory storage mock.

use embassy_time::Instant;
use embedded_storage::{ReadStorage, Storage};

use usb_selector_core::led::{INTENSITY_FULL, INTENSITY_OFF};
use usb_selector_core::settings::{THRESHOLD_STEP, UPPER_THRESHOLD_DEFAULT};
use usb_selector_core::{ConfigStore, Controller, Inputs, RelayState, UsbPort};

/// In-memory EEPROM stand-in with a write counter.
struct MemStorage {
    data: [u8; 16],
    writes: usize,
}

impl MemStorage {
    fn with_blocks(upper: u32, lower: u32, latch_ms: u32, port: u32) -> Self {
        let mut data = [0xFF; 16];
        for (index, value) in [upper, lower, latch_ms, port].into_iter().enumerate() {
            data[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        Self { data, writes: 0 }
    }

    fn block(&self, index: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[index * 4..index * 4 + 4]);
        u32::from_le_bytes(bytes)
    }
}

impl ReadStorage for MemStorage {
    type Error = core::convert::Infallible;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl Storage for MemStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn controller() -> Controller<MemStorage> {
    let storage = MemStorage::with_blocks(3000, 1000, 500, 0);
    let (store, report) = ConfigStore::load(storage).unwrap();
    assert!(!report.any());
    Controller::new(store)
}

fn idle(sample: u32) -> Inputs {
    Inputs {
        sample: Some(sample),
        ..Inputs::default()
    }
}

/// Presses one button for `hold_ms`, returning the release timestamp.
/// `which`: 0 = select, 1 = up, 2 = down.
fn press(ctl: &mut Controller<MemStorage>, which: usize, from_ms: u64, hold_ms: u64) -> u64 {
    let mut inputs = idle(0);
    match which {
        0 => inputs.select_pressed = true,
        1 => inputs.up_pressed = true,
        _ => inputs.down_pressed = true,
    }
    ctl.poll(&inputs, at(from_ms)).unwrap();
    let release = from_ms + hold_ms;
    ctl.poll(&idle(0), at(release)).unwrap();
    release
}

#[test]
fn blank_storage_boots_on_defaults_with_report() {
    let (store, report) = ConfigStore::load(MemStorage {
        data: [0xFF; 16],
        writes: 0,
    })
    .unwrap();
    assert!(report.any());
    assert_eq!(store.usb_port(), UsbPort::Port1);

    let mut ctl = Controller::new(store);
    let out = ctl.poll(&idle(0), at(0)).unwrap();
    assert_eq!(out.relay, RelayState::Low);
    assert_eq!(out.usb_port, UsbPort::Port1);
    assert_eq!(out.led, INTENSITY_OFF);
}

#[test]
fn select_press_toggles_port_and_coalesces_the_write() {
    let mut ctl = controller();

    let release = press(&mut ctl, 0, 0, 100);
    let out = ctl.poll(&idle(0), at(release + 1)).unwrap();
    assert_eq!(out.usb_port, UsbPort::Port2);
    // Deferred: nothing written during the settle window.
    ctl.poll(&idle(0), at(release + 5000)).unwrap();
    assert_eq!(ctl.store().storage().writes, 0);
    // One write once the window elapses uninterrupted.
    ctl.poll(&idle(0), at(release + 5001)).unwrap();
    assert_eq!(ctl.store().storage().writes, 1);
    assert_eq!(ctl.store().storage().block(3), 1);
}

#[test]
fn toggle_and_back_within_window_writes_nothing() {
    let mut ctl = controller();

    let first = press(&mut ctl, 0, 0, 100);
    let second = press(&mut ctl, 0, first + 500, 100);
    let out = ctl.poll(&idle(0), at(second + 1)).unwrap();
    assert_eq!(out.usb_port, UsbPort::Port1);

    ctl.poll(&idle(0), at(second + 60_000)).unwrap();
    assert_eq!(ctl.store().storage().writes, 0);
}

#[test]
fn relay_transition_switches_led_to_relay_feedback() {
    let mut ctl = controller();

    let out = ctl.poll(&idle(3500), at(0)).unwrap();
    assert_eq!(out.relay, RelayState::Low);
    let out = ctl.poll(&idle(3500), at(500)).unwrap();
    assert_eq!(out.relay, RelayState::Low);

    // Dwell satisfied: relay goes high and the LED mirrors it on the
    // same cycle.
    let out = ctl.poll(&idle(3500), at(501)).unwrap();
    assert_eq!(out.relay, RelayState::High);
    assert_eq!(out.led, INTENSITY_FULL);

    // Mid-band sample holds the state.
    let out = ctl.poll(&idle(2000), at(1000)).unwrap();
    assert_eq!(out.relay, RelayState::High);
    assert_eq!(out.led, INTENSITY_FULL);
}

#[test]
fn menu_round_trip_persists_adjusted_threshold() {
    let storage = MemStorage::with_blocks(UPPER_THRESHOLD_DEFAULT, 585, 500, 0);
    let (store, _) = ConfigStore::load(storage).unwrap();
    let mut ctl = Controller::new(store);

    // Short Up enters the upper-threshold editor.
    let mut t = press(&mut ctl, 1, 0, 100);
    // Two more short presses step the value.
    t = press(&mut ctl, 1, t + 500, 100);
    t = press(&mut ctl, 1, t + 500, 100);
    // Long Up commits and leaves the menu.
    t = press(&mut ctl, 1, t + 500, 1500);
    let _ = t;

    let expected = UPPER_THRESHOLD_DEFAULT + 2 * THRESHOLD_STEP;
    assert_eq!(ctl.store().settings().upper_threshold, expected);
    assert_eq!(ctl.store().storage().block(0), expected);
    assert_eq!(ctl.store().storage().writes, 1);
}

#[test]
fn adopt_sample_shortcut_uses_live_sensor_value() {
    let mut ctl = controller();

    // Enter the upper editor.
    let t = press(&mut ctl, 1, 0, 100);

    // Hold Up past the ceiling while the sensor reads 2500; the too-long
    // event fires during the hold and adopts the sample.
    let inputs = Inputs {
        up_pressed: true,
        sample: Some(2500),
        ..Inputs::default()
    };
    ctl.poll(&inputs, at(t + 1000)).unwrap();
    ctl.poll(&inputs, at(t + 5200)).unwrap();

    assert_eq!(ctl.store().settings().upper_threshold, 2500);
    assert_eq!(ctl.store().storage().block(0), 2500);

    ctl.poll(&idle(2500), at(t + 6000)).unwrap();
}

#[test]
fn failed_conversions_retain_last_sample_and_count() {
    let mut ctl = controller();

    ctl.poll(&idle(3500), at(0)).unwrap();
    // Conversions fail; the last sample keeps feeding the filter.
    let lost = Inputs {
        sample: None,
        ..Inputs::default()
    };
    ctl.poll(&lost, at(200)).unwrap();
    ctl.poll(&lost, at(400)).unwrap();
    let out = ctl.poll(&lost, at(501)).unwrap();
    assert_eq!(ctl.invalid_samples(), 3);
    assert_eq!(out.relay, RelayState::High);
}

#[test]
fn relay_transition_during_edit_leaves_menu_feedback_alone() {
    let mut ctl = controller();

    // Enter the upper editor; the LED fades while editing.
    let t = press(&mut ctl, 1, 0, 100);

    // Drive the relay high while the menu is open.
    ctl.poll(&idle(3500), at(t + 100)).unwrap();
    let out = ctl.poll(&idle(3500), at(t + 601)).unwrap();
    assert_eq!(out.relay, RelayState::High);
    // Fade output is still ramping, not pinned to the relay level.
    assert_ne!(out.led, INTENSITY_FULL);
}
