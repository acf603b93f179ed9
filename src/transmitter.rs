//! Blocking NEC frame transmitter.
//!
//! This module provides the [`Transmitter`] struct, which owns the IR LED pin,
//! the carrier PWM and a delay source, and plays NEC frames on them. Every
//! call blocks until the last mark of the frame has been emitted.
//!
//! ## Example
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
//! # for _ in 0..2 {
//! #     expected.push(PwmTransaction::set_duty_cycle(33));
//! #     expected.push(PwmTransaction::set_duty_cycle(0));
//! # }
//! # let pwm = Pwm::new(&expected);
//! let mut ir = Transmitter::new(pin, SingleChannel::new(pwm), NoopDelay::new(), SenderConfig::default());
//! ir.configure().unwrap();
//! ir.send_repeat_frame().unwrap();
//! # let (mut pin, carrier, _) = ir.release();
//! # pin.done();
//! # carrier.release().done();
//! ```
//!
//! For automatic repeat frames while a key is held, see
//! [`crate::repeat::Sender`] (feature `std`).

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::carrier::Carrier;
use crate::codec::{decode_raw, split_address};
use crate::consts::{NEC_CARRIER_PERIOD_NS, NEC_DEFAULT_DUTY_CYCLE};
use crate::error::Error;
use crate::pulse::{Pulse, frame_pulses, repeat_pulses};

/// Configuration of a [`Transmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SenderConfig {
    /// Duty cycle (%) of the carrier while a mark is sent.
    ///
    /// Values outside `1..=100` fall back to 33 %.
    pub duty_cycle: u8,
}

impl SenderConfig {
    /// Duty cycle actually used, after falling back on out of range values.
    pub fn effective_duty_cycle(&self) -> u8 {
        if (1..=100).contains(&self.duty_cycle) {
            self.duty_cycle
        } else {
            NEC_DEFAULT_DUTY_CYCLE
        }
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            duty_cycle: NEC_DEFAULT_DUTY_CYCLE,
        }
    }
}

/// Sends NEC frames on an IR LED driven by a PWM carrier.
///
/// ## Type Parameters
///
/// - `P`: the IR LED pin, an [`OutputPin`]
/// - `C`: the [`Carrier`] modulating `P`
/// - `D`: a [`DelayNs`] used to time marks and spaces
///
/// ## Notes
///
/// - Timing precision is critical; the delay should be accurate to a few µs.
/// - The carrier is always left off between calls.
#[derive(Debug)]
pub struct Transmitter<P, C, D>
where
    P: OutputPin,
    C: Carrier<P>,
    D: DelayNs,
{
    pin: P,
    carrier: C,
    delay: D,
    duty_cycle: u8,
}

impl<P, C, D> Transmitter<P, C, D>
where
    P: OutputPin,
    C: Carrier<P>,
    D: DelayNs,
{
    /// Creates a new transmitter. Call [`configure`](Transmitter::configure) before sending.
    pub fn new(pin: P, carrier: C, delay: D, config: SenderConfig) -> Self {
        Self {
            pin,
            carrier,
            delay,
            duty_cycle: config.effective_duty_cycle(),
        }
    }

    /// Drives the pin low and sets the carrier to the NEC modulation frequency.
    pub fn configure(&mut self) -> Result<(), Error> {
        self.pin.set_low().map_err(Error::pin)?;
        self.carrier
            .configure(Duration::from_nanos(NEC_CARRIER_PERIOD_NS))
            .map_err(Error::carrier)?;
        debug!("configured, duty cycle {}%", self.duty_cycle);
        Ok(())
    }

    /// Carrier duty cycle (%) used for marks.
    pub fn duty_cycle(&self) -> u8 {
        self.duty_cycle
    }

    /// Sends `command` to `address`.
    ///
    /// Addresses up to `0xFF` are sent in the 8-bit form, larger ones as
    /// extended addresses. Returns the time taken to transmit.
    pub fn send(&mut self, address: u16, command: u8) -> Result<Duration, Error> {
        let (low, high) = split_address(address);
        self.send_bytes(low, high, command, !command)
    }

    /// Sends a raw 32-bit code, `{ address low, address high, cmd, !cmd }` from
    /// least to most significant byte.
    ///
    /// Codes failing the command inverse check are rejected with
    /// [`Error::Checksum`] before anything is transmitted.
    pub fn send_raw(&mut self, code: u32) -> Result<Duration, Error> {
        let (address, command) = check_raw(code)?;
        self.send(address, command)
    }

    /// Sends four bytes as a NEC data frame, without any validation.
    ///
    /// Returns the time taken to transmit.
    pub fn send_bytes(
        &mut self,
        addr_low: u8,
        addr_high: u8,
        cmd: u8,
        inv_cmd: u8,
    ) -> Result<Duration, Error> {
        let sent = self.play(&frame_pulses([addr_low, addr_high, cmd, inv_cmd]))?;
        debug!(
            "sent frame {:x} {:x} {:x} {:x} in {} us",
            addr_low,
            addr_high,
            cmd,
            inv_cmd,
            sent.as_micros() as u64
        );
        Ok(sent)
    }

    /// Sends a repeat frame, which receivers take as a repeat of the last command.
    ///
    /// The caller is responsible for the 108 ms repeat cadence. Returns the
    /// time taken to transmit.
    pub fn send_repeat_frame(&mut self) -> Result<Duration, Error> {
        let sent = self.play(&repeat_pulses())?;
        trace!("sent repeat frame");
        Ok(sent)
    }

    /// Gives back the pin, carrier and delay.
    pub fn release(self) -> (P, C, D) {
        (self.pin, self.carrier, self.delay)
    }

    fn play(&mut self, pulses: &[Pulse]) -> Result<Duration, Error> {
        let channel = self.carrier.channel(&self.pin).map_err(Error::carrier)?;
        let top = u64::from(self.carrier.top());
        let on = u32::try_from(top * u64::from(self.duty_cycle) / 100).unwrap_or(u32::MAX);

        let mut sent = Duration::ZERO;
        for pulse in pulses {
            self.mark(channel, on, pulse.mark)?;
            self.space(pulse.space);
            sent += pulse.duration();
        }
        Ok(sent)
    }

    /// On error the carrier gets one more attempt at being switched off; if
    /// that fails too it may be left running until the next successful mark.
    fn mark(&mut self, channel: C::Channel, on: u32, duration: Duration) -> Result<(), Error> {
        let result = match self.carrier.set(channel, on) {
            Ok(()) => {
                self.wait(duration);
                self.carrier.set(channel, 0)
            }
            Err(err) => Err(err),
        };
        result.map_err(|err| {
            if self.carrier.set(channel, 0).is_err() {
                warn!("carrier may still be on");
            }
            Error::carrier(err)
        })
    }

    // mark() always turns the carrier off, so a space only waits
    fn space(&mut self, duration: Duration) {
        if !duration.is_zero() {
            self.wait(duration);
        }
    }

    fn wait(&mut self, duration: Duration) {
        let ns = u32::try_from(duration.as_nanos()).unwrap_or(u32::MAX);
        self.delay.delay_ns(ns);
    }
}

/// Validates a raw code, returning its resolved address and command.
pub(crate) fn check_raw(code: u32) -> Result<(u16, u8), Error> {
    decode_raw(code).checked(code).inspect_err(|_| {
        warn!("rejected raw code {:#x}", code);
    })
}
