//! Control core for a two-port USB selector with a sensor-driven relay.
//!
//! # Overview
//!
//! This crate implements the state machines behind a small USB switcher:
//! - Two downstream USB ports toggled by a front-panel button
//! - A relay following an analog sensor through configurable hysteresis
//!   thresholds and an anti-chatter dwell time
//! - A setup menu (Up/Down buttons) for editing the thresholds and dwell
//!   time at runtime, with the status LED as the only display
//! - Blinking and fading status LED patterns, including one-shot feedback
//!   bursts that resume the previous pattern
//! - Persisted configuration with load-time validation and a
//!   write-coalescing policy that protects the storage medium from rapid
//!   USB-port toggling
//!
//! Everything runs on a single cooperative poll loop: the platform calls
//! [`Controller::poll`] once per tick with the raw button levels, the
//! latest sensor sample, and the current time, and drives its outputs
//! from the returned levels. No component blocks, reads a clock, or
//! touches hardware; pins, PWM, the ADC, and the tick source stay on the
//! platform side, and non-volatile storage is reached through
//! [`embedded_storage::Storage`].
//!
//! # Module Organization
//!
//! - [`button`] - press debounce and duration classification
//! - [`relay`] - hysteresis filter with configurable dwell
//! - [`led`] - status LED pattern sequencer
//! - [`menu`] - button-driven configuration editor
//! - [`settings`] - persisted values, validation, write policy
//! - [`controller`] - the fixed-order per-cycle composition

#![cfg_attr(not(test), no_std)]

pub mod button;
pub mod controller;
pub mod led;
pub mod menu;
pub mod relay;
pub mod settings;

pub use button::{ButtonChannel, Press};
pub use controller::{Controller, Inputs, Outputs};
pub use led::{Intensity, LedSequencer, Pattern, PatternMode};
pub use menu::{MenuState, SetupMenu};
pub use relay::{RelayFilter, RelayState};
pub use settings::{ConfigStore, LoadReport, Settings, UsbPort};
