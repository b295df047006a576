//! Persisted configuration: tuning constants, load validation, and the
//! wear-limiting write policy.
//!
//! Four values survive power cycles, one 4-byte little-endian block each
//! behind an [`embedded_storage::Storage`] implementation (emulated EEPROM
//! on the real hardware):
//!
//! | Block | Field            | Valid range    | Default |
//! |-------|------------------|----------------|---------|
//! | 0     | upper threshold  | 0..=4095       | 3510    |
//! | 1     | lower threshold  | 0..=4095       | 585     |
//! | 2     | latch time (ms)  | 0..=60000      | 500     |
//! | 3     | USB port         | 0 or 1         | Port1   |
//!
//! # Write policy
//!
//! Thresholds and the latch time change only on an explicit commit in the
//! setup menu, so those writes are synchronous. The USB port can flip on
//! every button press, so its write is coalesced: the store arms a settle
//! timer when the port diverges from the last written value, disarms it if
//! the port reverts, and writes the settled value once the window elapses
//! uninterrupted. Rapid toggling therefore costs zero intermediate writes.
//!
//! # Load validation
//!
//! Each field is validated independently at load time; an out-of-range
//! value (a blank storage block reads as `0xFFFFFFFF`) falls back to its
//! compiled-in default and sets the field's flag in [`LoadReport`] so the
//! platform can show a startup error indication.

use embassy_time::{Duration, Instant};
use embedded_storage::Storage;

/// Full-scale sensor sample (12-bit conversion).
pub const SENSOR_MAX: u32 = 4095;

/// Threshold adjustment step; 35 steps span the full sensor range.
pub const THRESHOLD_STEP: u32 = SENSOR_MAX / 35;

/// Default upper threshold used when the persisted value is invalid.
pub const UPPER_THRESHOLD_DEFAULT: u32 = 3510;

/// Default lower threshold used when the persisted value is invalid.
pub const LOWER_THRESHOLD_DEFAULT: u32 = 585;

/// Longest configurable relay latch (dwell) time.
pub const LATCH_TIME_MAX: Duration = Duration::from_millis(60_000);

/// Latch time adjustment step.
pub const LATCH_TIME_STEP: Duration = Duration::from_millis(250);

/// Default latch time used when the persisted value is invalid.
pub const LATCH_TIME_DEFAULT: Duration = Duration::from_millis(500);

/// How long the USB port selection must stay unchanged before it is
/// written out.
pub const PORT_WRITE_SETTLE: Duration = Duration::from_millis(5_000);

/// Which of the two downstream USB ports is powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug-mode", derive(defmt::Format))]
pub enum UsbPort {
    /// First port (block value 0).
    #[default]
    Port1,
    /// Second port (block value 1).
    Port2,
}

impl UsbPort {
    /// The port that is not this one.
    pub fn other(self) -> Self {
        match self {
            UsbPort::Port1 => UsbPort::Port2,
            UsbPort::Port2 => UsbPort::Port1,
        }
    }

    fn from_block_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(UsbPort::Port1),
            1 => Some(UsbPort::Port2),
            _ => None,
        }
    }

    fn to_block_value(self) -> u32 {
        match self {
            UsbPort::Port1 => 0,
            UsbPort::Port2 => 1,
        }
    }
}

/// Storage block per persisted field; block offset is index * 4.
#[derive(Debug, Clone, Copy)]
enum Block {
    UpperThreshold = 0,
    LowerThreshold = 1,
    LatchTime = 2,
    UsbPort = 3,
}

impl Block {
    fn offset(self) -> u32 {
        self as u32 * 4
    }
}

/// The live, user-editable filter configuration.
///
/// Written only by the setup menu, read by the relay filter every cycle,
/// so a change (including a mid-dwell latch time edit) applies on the
/// very next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Sample level the relay-off state must exceed to start the dwell.
    pub upper_threshold: u32,
    /// Sample level the relay-on state must drop below to start the dwell.
    pub lower_threshold: u32,
    /// How long a threshold condition must hold before the relay switches.
    pub latch_time: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upper_threshold: UPPER_THRESHOLD_DEFAULT,
            lower_threshold: LOWER_THRESHOLD_DEFAULT,
            latch_time: LATCH_TIME_DEFAULT,
        }
    }
}

/// Per-field outcome of [`ConfigStore::load`].
///
/// A set flag means the persisted value was out of range and the default
/// was substituted. Fields are validated independently; one bad block
/// never disturbs the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Upper threshold fell back to [`UPPER_THRESHOLD_DEFAULT`].
    pub upper_threshold_fallback: bool,
    /// Lower threshold fell back to [`LOWER_THRESHOLD_DEFAULT`].
    pub lower_threshold_fallback: bool,
    /// Latch time fell back to [`LATCH_TIME_DEFAULT`].
    pub latch_time_fallback: bool,
    /// USB port fell back to [`UsbPort::Port1`].
    pub usb_port_fallback: bool,
}

impl LoadReport {
    /// True if any field required a fallback.
    pub fn any(&self) -> bool {
        self.upper_threshold_fallback
            || self.lower_threshold_fallback
            || self.latch_time_fallback
            || self.usb_port_fallback
    }
}

/// Owner of the persisted values and their write policy.
pub struct ConfigStore<S> {
    storage: S,
    settings: Settings,
    usb_port: UsbPort,
    /// Last port value actually written; the settle timer compares
    /// against this, not against the previous in-memory value.
    written_port: UsbPort,
    port_pending_since: Option<Instant>,
}

impl<S: Storage> ConfigStore<S> {
    /// Reads and validates all persisted fields.
    ///
    /// # Arguments
    ///
    /// * `storage` - non-volatile backing store, consumed by the store
    ///
    /// # Returns
    ///
    /// The initialized store plus a [`LoadReport`] naming every field
    /// that fell back to its default.
    ///
    /// # Errors
    ///
    /// Propagates storage read errors; validation itself never fails.
    pub fn load(mut storage: S) -> Result<(Self, LoadReport), S::Error> {
        let raw_upper = Self::read_block(&mut storage, Block::UpperThreshold)?;
        let raw_lower = Self::read_block(&mut storage, Block::LowerThreshold)?;
        let raw_latch = Self::read_block(&mut storage, Block::LatchTime)?;
        let raw_port = Self::read_block(&mut storage, Block::UsbPort)?;

        let mut report = LoadReport::default();

        let upper_threshold = if raw_upper > SENSOR_MAX {
            report.upper_threshold_fallback = true;
            UPPER_THRESHOLD_DEFAULT
        } else {
            raw_upper
        };
        let lower_threshold = if raw_lower > SENSOR_MAX {
            report.lower_threshold_fallback = true;
            LOWER_THRESHOLD_DEFAULT
        } else {
            raw_lower
        };
        let latch_time = if raw_latch as u64 > LATCH_TIME_MAX.as_millis() {
            report.latch_time_fallback = true;
            LATCH_TIME_DEFAULT
        } else {
            Duration::from_millis(raw_latch as u64)
        };
        let usb_port = match UsbPort::from_block_value(raw_port) {
            Some(port) => port,
            None => {
                report.usb_port_fallback = true;
                UsbPort::Port1
            }
        };

        #[cfg(feature = "debug-mode")]
        if report.any() {
            defmt::warn!(
                "config load fallback: upper={} lower={} latch={} port={}",
                report.upper_threshold_fallback,
                report.lower_threshold_fallback,
                report.latch_time_fallback,
                report.usb_port_fallback,
            );
        }

        Ok((
            Self {
                storage,
                settings: Settings {
                    upper_threshold,
                    lower_threshold,
                    latch_time,
                },
                usb_port,
                written_port: usb_port,
                port_pending_since: None,
            },
            report,
        ))
    }

    /// Live configuration values.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access for the setup menu's adjust/adopt operations.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Currently selected USB port.
    pub fn usb_port(&self) -> UsbPort {
        self.usb_port
    }

    /// Backing storage, for inspection.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Writes the current upper threshold synchronously.
    pub fn commit_upper_threshold(&mut self) -> Result<(), S::Error> {
        let value = self.settings.upper_threshold;
        self.write_block(Block::UpperThreshold, value)
    }

    /// Writes the current lower threshold synchronously.
    pub fn commit_lower_threshold(&mut self) -> Result<(), S::Error> {
        let value = self.settings.lower_threshold;
        self.write_block(Block::LowerThreshold, value)
    }

    /// Writes the current latch time (in milliseconds) synchronously.
    pub fn commit_latch_time(&mut self) -> Result<(), S::Error> {
        let value = self.settings.latch_time.as_millis() as u32;
        self.write_block(Block::LatchTime, value)
    }

    /// Records a new port selection and manages the settle timer.
    ///
    /// Selecting a port that differs from the last written value (re)arms
    /// the timer at `now`; reverting to the written value disarms it, so
    /// a toggle-and-back within the window costs no write at all.
    pub fn select_port(&mut self, port: UsbPort, now: Instant) {
        self.usb_port = port;
        if port == self.written_port {
            self.port_pending_since = None;
        } else {
            self.port_pending_since = Some(now);
        }
    }

    /// Performs the deferred port write once the settle window has
    /// elapsed without a reversal.
    ///
    /// # Returns
    ///
    /// `true` if a write happened this cycle.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<bool, S::Error> {
        let Some(since) = self.port_pending_since else {
            return Ok(false);
        };
        if now - since <= PORT_WRITE_SETTLE {
            return Ok(false);
        }
        self.port_pending_since = None;
        self.write_block(Block::UsbPort, self.usb_port.to_block_value())?;
        self.written_port = self.usb_port;

        #[cfg(feature = "debug-mode")]
        defmt::info!("usb port persisted: {}", self.written_port);

        Ok(true)
    }

    fn read_block(storage: &mut S, block: Block) -> Result<u32, S::Error> {
        let mut bytes = [0u8; 4];
        storage.read(block.offset(), &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_block(&mut self, block: Block, value: u32) -> Result<(), S::Error> {
        self.storage.write(block.offset(), &value.to_le_bytes())
    }
}
