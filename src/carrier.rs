//! Carrier generator abstraction.
//!
//! NEC marks are not a steady level: the IR LED is switched at 38 kHz while
//! the mark lasts. That modulation is produced by a PWM peripheral, which
//! this crate drives through the [`Carrier`] trait.
//!
//! Most HALs expose PWM channels through [`embedded_hal::pwm::SetDutyCycle`]
//! with the frequency chosen when the channel is set up. [`SingleChannel`]
//! adapts such a channel; configure it for 38 kHz
//! ([`NEC_MODULATION_FREQUENCY`](crate::consts::NEC_MODULATION_FREQUENCY)) before
//! handing it over.

use core::time::Duration;

use embedded_hal::pwm::{self, SetDutyCycle};

/// A PWM peripheral able to modulate the carrier on the pin `P`.
pub trait Carrier<P> {
    /// Handle selecting the PWM output connected to a pin
    type Channel: Copy;
    /// Error reported by the peripheral
    type Error: pwm::Error;

    /// Sets the PWM period, one carrier cycle.
    fn configure(&mut self, period: Duration) -> Result<(), Self::Error>;

    /// Returns the channel driving `pin`.
    fn channel(&mut self, pin: &P) -> Result<Self::Channel, Self::Error>;

    /// Counter value corresponding to a 100 % duty cycle.
    fn top(&self) -> u32;

    /// Sets the compare value of `channel`, between `0` (off) and [`top`](Carrier::top).
    fn set(&mut self, channel: Self::Channel, value: u32) -> Result<(), Self::Error>;
}

/// [`Carrier`] for a single PWM channel whose frequency is fixed by the HAL.
///
/// The channel is used for whatever pin it is given, and
/// [`configure`](Carrier::configure) leaves the period untouched.
#[derive(Debug)]
pub struct SingleChannel<T> {
    pwm: T,
}

impl<T: SetDutyCycle> SingleChannel<T> {
    /// Wraps a PWM channel already running at the carrier frequency.
    pub fn new(pwm: T) -> Self {
        Self { pwm }
    }

    /// Gives the PWM channel back.
    pub fn release(self) -> T {
        self.pwm
    }
}

impl<P, T: SetDutyCycle> Carrier<P> for SingleChannel<T> {
    type Channel = ();
    type Error = T::Error;

    fn configure(&mut self, period: Duration) -> Result<(), Self::Error> {
        trace!("carrier period fixed by HAL, requested {} ns", period.as_nanos() as u64);
        Ok(())
    }

    fn channel(&mut self, _pin: &P) -> Result<Self::Channel, Self::Error> {
        Ok(())
    }

    fn top(&self) -> u32 {
        u32::from(self.pwm.max_duty_cycle())
    }

    fn set(&mut self, _channel: Self::Channel, value: u32) -> Result<(), Self::Error> {
        let duty = u16::try_from(value).unwrap_or(u16::MAX);
        self.pwm.set_duty_cycle(duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::pwm::{Mock as PwmMock, Transaction as PwmTransaction};

    #[test]
    fn test_single_channel_forwards_duty() {
        let pwm = PwmMock::new(&[
            PwmTransaction::max_duty_cycle(1000),
            PwmTransaction::set_duty_cycle(330),
            PwmTransaction::set_duty_cycle(0),
        ]);
        let mut carrier = SingleChannel::new(pwm);

        Carrier::<()>::configure(&mut carrier, Duration::from_nanos(26_315)).unwrap();
        Carrier::<()>::channel(&mut carrier, &()).unwrap();
        assert_eq!(Carrier::<()>::top(&carrier), 1000);
        Carrier::<()>::set(&mut carrier, (), 330).unwrap();
        Carrier::<()>::set(&mut carrier, (), 0).unwrap();

        carrier.release().done();
    }
}
