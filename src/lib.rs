//! # irnec
//!
//! A portable, no_std Rust driver for sending NEC infrared remote control
//! codes with an IR LED, compatible with the receivers found in most consumer
//! electronics.
//!
//! This driver implements a software NEC transmitter using:
//! - `embedded-hal` traits for the output pin and timing
//! - a PWM peripheral producing the 38 kHz carrier
//! - an optional background thread sending repeat frames while a key is held
//!
//! ## Crate features
//! | Feature         | Description |
//! |-----------------|-------------|
//! | `std` (default) | Disables `#![no_std]` and enables [`repeat`] (automatic repeat frames) |
//! | `defmt-0-3`     | Uses `defmt` logging |
//! | `log`           | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **8-bit and extended 16-bit addresses**, with the standard disambiguation rule
//! - **Raw code validation**: codes whose command inverse does not match are never sent
//! - **Auto-repeat** with synchronous cancellation (feature `std`)
//! - **Pulse schedules** for peripherals that generate the waveform themselves
//!
//! ## Usage
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! # use embedded_hal_mock::eh1::pwm::{Mock as Pwm, Transaction as PwmTransaction};
//! use irnec::carrier::SingleChannel;
//! use irnec::transmitter::{SenderConfig, Transmitter};
//!
//! # let pin = Pin::new(&[PinTransaction::set(PinState::Low)]);
//! # let mut expected = vec![PwmTransaction::max_duty_cycle(100)];
//! # for _ in 0..34 {
//! #     expected.push(PwmTransaction::set_duty_cycle(33));
//! #     expected.push(PwmTransaction::set_duty_cycle(0));
//! # }
//! # let pwm = Pwm::new(&expected);
//! # let delay = NoopDelay::new();
//! let mut ir = Transmitter::new(pin, SingleChannel::new(pwm), delay, SenderConfig::default());
//! ir.configure().unwrap();
//! ir.send(0x04, 0x08).unwrap();
//! # let (mut pin, carrier, _) = ir.release();
//! # pin.done();
//! # carrier.release().done();
//! ```
//!
//! ## Integration Notes
//!
//! - Timing is driven by the `DelayNs` implementation; it must be accurate to a few µs
//! - Every send blocks for the whole frame (about 68 ms for a data frame)
//! - The PWM channel given to [`carrier::SingleChannel`] must already run at 38 kHz
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

// Must come first so the logging macros are visible in every module
#[macro_use]
mod fmt;

pub use heapless;

pub mod carrier;
pub mod codec;
pub mod consts;
pub mod error;
pub mod pulse;
#[cfg(feature = "std")]
pub mod repeat;
pub mod transmitter;

pub use error::Error;
