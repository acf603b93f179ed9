//! Automatic repeat frames while a key is held down.
//!
//! A NEC remote keeps sending repeat frames every 108 ms for as long as a key
//! stays pressed. [`Sender`] wraps a [`Transmitter`] and, when asked to, runs
//! that cadence on a background thread until it is stopped.
//!
//! ## State machine
//!
//! ```text
//!            start                    stop_repeat()
//!   Idle ──────────────▶ Repeating ─────────────────▶ Stopping
//!    ▲                                                   │
//!    └───────────── repeat thread observes the stop ─────┘
//! ```
//!
//! The transmitter is moved into the repeat thread and handed back when the
//! thread is joined, so the pin and carrier only ever have one user. Every
//! call that sends something first stops a running repeat and waits for the
//! thread to exit; once it returns, no further repeat frame can start. A raw
//! code that fails validation is rejected before that, and the repeat goes on.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::Mock as Pin;
//! # use embedded_hal_mock::eh1::pwm::{Mock as Pwm, Transaction as PwmTransaction};
//! use irnec::carrier::SingleChannel;
//! use irnec::repeat::{RepeatState, Sender};
//! use irnec::transmitter::SenderConfig;
//!
//! # let pin = Pin::new(&[]);
//! # let mut expected = vec![PwmTransaction::max_duty_cycle(100)];
//! # for _ in 0..34 {
//! #     expected.push(PwmTransaction::set_duty_cycle(33));
//! #     expected.push(PwmTransaction::set_duty_cycle(0));
//! # }
//! # let pwm = Pwm::new(&expected);
//! let mut remote = Sender::new(pin, SingleChannel::new(pwm), NoopDelay::new(), SenderConfig::default());
//! remote.send(0x04, 0x08, true).unwrap();
//! assert_eq!(remote.repeat_state(), RepeatState::Repeating);
//! // key released
//! remote.stop_repeat().unwrap();
//! assert_eq!(remote.repeat_state(), RepeatState::Idle);
//! # let (mut pin, carrier, _) = remote.release().unwrap();
//! # pin.done();
//! # carrier.release().done();
//! ```

use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::carrier::Carrier;
use crate::consts::NEC_REPEAT_PERIOD;
use crate::error::Error;
use crate::transmitter::{SenderConfig, Transmitter, check_raw};

/// Name given to the repeat thread.
pub const REPEAT_THREAD_NAME: &str = "nec-repeat";

/// Where a [`Sender`] stands with respect to automatic repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RepeatState {
    /// No repeat thread is running.
    #[default]
    Idle,
    /// A repeat frame is sent every 108 ms.
    Repeating,
    /// A stop was requested and the repeat thread is winding down.
    Stopping,
}

/// State shared between a [`Sender`] and its repeat thread.
#[derive(Debug, Default)]
struct Shared {
    state: Mutex<RepeatState>,
    changed: Condvar,
}

impl Shared {
    // The state is a plain enum, so a poisoned lock still holds a usable value
    fn lock(&self) -> MutexGuard<'_, RepeatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> RepeatState {
        *self.lock()
    }

    fn set(&self, state: RepeatState) {
        *self.lock() = state;
        self.changed.notify_all();
    }

    /// Moves `Repeating` to `Stopping`. Returns false if there was nothing to stop.
    fn request_stop(&self) -> bool {
        let mut state = self.lock();
        if *state != RepeatState::Repeating {
            return false;
        }
        *state = RepeatState::Stopping;
        drop(state);
        self.changed.notify_all();
        true
    }

    /// Sleeps for `timeout`, waking early on a stop request.
    ///
    /// Returns true if the repeat thread should exit.
    fn wait_for_stop(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |state| *state == RepeatState::Repeating)
            .unwrap_or_else(PoisonError::into_inner);
        *state != RepeatState::Repeating
    }
}

/// A running repeat thread and the handle to get the transmitter back from it.
#[derive(Debug)]
struct RepeatSession<T> {
    shared: Arc<Shared>,
    // None if the transmitter never reached the thread
    handle: JoinHandle<Option<T>>,
}

impl<P, C, D> RepeatSession<Transmitter<P, C, D>>
where
    P: OutputPin + Send + 'static,
    C: Carrier<P> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Spawns the repeat thread with `thread` and moves `transmitter` into it.
    ///
    /// The transmitter is only handed over once the thread exists, so it comes
    /// back with the error if spawning fails.
    fn start(
        thread: thread::Builder,
        transmitter: Transmitter<P, C, D>,
        first_wait: Duration,
    ) -> Result<Self, (Transmitter<P, C, D>, Error)> {
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);
        let (hand_over, receive) = mpsc::channel();
        let spawned = thread.spawn(move || {
            let transmitter = receive.recv().ok()?;
            Some(run_repeats(transmitter, &worker, first_wait))
        });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => return Err((transmitter, Error::Spawn(err.kind()))),
        };

        // Must be Repeating before the thread gets to its first wait
        shared.set(RepeatState::Repeating);
        if let Err(mpsc::SendError(transmitter)) = hand_over.send(transmitter) {
            return Err((transmitter, Error::Spawn(std::io::ErrorKind::BrokenPipe)));
        }
        debug!("repeating, first repeat in {} us", first_wait.as_micros() as u64);
        Ok(Self { shared, handle })
    }

    /// Stops the thread and waits for it to hand the transmitter back.
    fn stop(self) -> Result<Transmitter<P, C, D>, Error> {
        if self.shared.request_stop() {
            debug!("stopping repeats");
        }
        self.handle
            .join()
            .ok()
            .flatten()
            .ok_or(Error::TransmitterLost)
    }
}

fn run_repeats<P, C, D>(
    mut transmitter: Transmitter<P, C, D>,
    shared: &Shared,
    first_wait: Duration,
) -> Transmitter<P, C, D>
where
    P: OutputPin,
    C: Carrier<P>,
    D: DelayNs,
{
    let mut wait = first_wait;
    while !shared.wait_for_stop(wait) {
        match transmitter.send_repeat_frame() {
            Ok(sent) => wait = NEC_REPEAT_PERIOD.saturating_sub(sent),
            Err(err) => {
                warn!("repeat frame failed: {}", err);
                break;
            }
        }
    }
    shared.set(RepeatState::Idle);
    trace!("repeat thread exiting");
    transmitter
}

/// NEC sender with automatic repeats.
///
/// Wraps a [`Transmitter`] and adds [`send`](Sender::send) with auto-repeat.
/// All sending methods stop a running repeat first, so frames never overlap;
/// only a raw code rejected by [`send_raw`](Sender::send_raw) leaves it running.
/// Dropping the sender stops its repeat thread.
#[derive(Debug)]
pub struct Sender<P, C, D>
where
    P: OutputPin + Send + 'static,
    C: Carrier<P> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    // Exactly one of these is set, unless a repeat thread panicked
    transmitter: Option<Transmitter<P, C, D>>,
    session: Option<RepeatSession<Transmitter<P, C, D>>>,
}

impl<P, C, D> Sender<P, C, D>
where
    P: OutputPin + Send + 'static,
    C: Carrier<P> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Creates a new sender. Call [`configure`](Sender::configure) before sending.
    pub fn new(pin: P, carrier: C, delay: D, config: SenderConfig) -> Self {
        Self::from(Transmitter::new(pin, carrier, delay, config))
    }

    /// Drives the pin low and sets the carrier to the NEC modulation frequency.
    pub fn configure(&mut self) -> Result<(), Error> {
        self.idle_transmitter()?.configure()
    }

    /// Sends `command` to `address`.
    ///
    /// With `auto_repeat`, repeat frames follow every 108 ms until
    /// [`stop_repeat`](Sender::stop_repeat) or the next send. Returns the time
    /// taken to transmit the data frame.
    ///
    /// If the repeat thread cannot be started the data frame has still been
    /// sent, the sender stays [`Idle`](RepeatState::Idle) and
    /// [`Error::Spawn`] is returned.
    pub fn send(
        &mut self,
        address: u16,
        command: u8,
        auto_repeat: bool,
    ) -> Result<Duration, Error> {
        let sent = self.idle_transmitter()?.send(address, command)?;
        if auto_repeat {
            // The data frame already used part of the first repeat period
            self.start_repeat(NEC_REPEAT_PERIOD.saturating_sub(sent))?;
        }
        Ok(sent)
    }

    /// Sends a raw 32-bit code. See [`Transmitter::send_raw`].
    ///
    /// A code failing validation is rejected before a running repeat is
    /// stopped, so it does not interrupt a held key.
    pub fn send_raw(&mut self, code: u32) -> Result<Duration, Error> {
        let (address, command) = check_raw(code)?;
        self.idle_transmitter()?.send(address, command)
    }

    /// Sends four bytes as a NEC data frame. See [`Transmitter::send_bytes`].
    pub fn send_bytes(
        &mut self,
        addr_low: u8,
        addr_high: u8,
        cmd: u8,
        inv_cmd: u8,
    ) -> Result<Duration, Error> {
        self.idle_transmitter()?.send_bytes(addr_low, addr_high, cmd, inv_cmd)
    }

    /// Sends a single repeat frame by hand. See [`Transmitter::send_repeat_frame`].
    pub fn send_repeat_frame(&mut self) -> Result<Duration, Error> {
        self.idle_transmitter()?.send_repeat_frame()
    }

    /// Stops automatic repeats, returning once the repeat thread has exited.
    ///
    /// Does nothing if no repeat is running.
    pub fn stop_repeat(&mut self) -> Result<(), Error> {
        if let Some(session) = self.session.take() {
            self.transmitter = Some(session.stop()?);
        }
        Ok(())
    }

    /// Current repeat state.
    pub fn repeat_state(&self) -> RepeatState {
        self.session
            .as_ref()
            .map_or(RepeatState::Idle, |session| session.shared.state())
    }

    /// Stops automatic repeats and gives back the pin, carrier and delay.
    pub fn release(mut self) -> Result<(P, C, D), Error> {
        self.stop_repeat()?;
        self.transmitter
            .take()
            .map(Transmitter::release)
            .ok_or(Error::TransmitterLost)
    }

    fn idle_transmitter(&mut self) -> Result<&mut Transmitter<P, C, D>, Error> {
        self.stop_repeat()?;
        self.transmitter.as_mut().ok_or(Error::TransmitterLost)
    }

    fn start_repeat(&mut self, first_wait: Duration) -> Result<(), Error> {
        let transmitter = self.transmitter.take().ok_or(Error::TransmitterLost)?;
        let thread = thread::Builder::new().name(REPEAT_THREAD_NAME.into());
        match RepeatSession::start(thread, transmitter, first_wait) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err((transmitter, err)) => {
                warn!("no auto repeat: {}", err);
                self.transmitter = Some(transmitter);
                Err(err)
            }
        }
    }
}

impl<P, C, D> From<Transmitter<P, C, D>> for Sender<P, C, D>
where
    P: OutputPin + Send + 'static,
    C: Carrier<P> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn from(transmitter: Transmitter<P, C, D>) -> Self {
        Self {
            transmitter: Some(transmitter),
            session: None,
        }
    }
}

impl<P, C, D> Drop for Sender<P, C, D>
where
    P: OutputPin + Send + 'static,
    C: Carrier<P> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn drop(&mut self) {
        if let Err(err) = self.stop_repeat() {
            warn!("repeat thread lost on drop: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{NEC_LEAD_SPACE, NEC_REPEAT_SPACE};
    use crate::transmitter::tests::{Event, FakeCarrier, FakeDelay, FakePin, Log, fake_transmitter};
    use std::sync::atomic::Ordering;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::time::Instant;

    type FakeSender = Sender<FakePin, FakeCarrier, FakeDelay>;

    fn fake_sender() -> (FakeSender, Log) {
        let (transmitter, log) = fake_transmitter(false);
        (Sender::from(transmitter), log)
    }

    fn count_spaces(log: &Log, space: Duration) -> usize {
        let ns = space.as_nanos() as u32;
        log.lock()
            .unwrap()
            .iter()
            .filter(|event| **event == Event::Delay(ns))
            .count()
    }

    fn repeats(log: &Log) -> usize {
        count_spaces(log, NEC_REPEAT_SPACE)
    }

    fn frames(log: &Log) -> usize {
        count_spaces(log, NEC_LEAD_SPACE)
    }

    /// Polls `condition` for up to two seconds.
    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_send_without_repeat_stays_idle() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, false).unwrap();
        thread::sleep(Duration::from_millis(150));

        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        assert_eq!(frames(&log), 1);
        assert_eq!(repeats(&log), 0);
    }

    #[test]
    fn test_auto_repeat_sends_repeat_frames() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        assert_eq!(sender.repeat_state(), RepeatState::Repeating);
        assert!(eventually(|| repeats(&log) >= 2));

        sender.stop_repeat().unwrap();
        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        assert_eq!(frames(&log), 1);
    }

    #[test]
    fn test_first_repeat_waits_for_the_repeat_period() {
        let (transmitter, log) = fake_transmitter(true);
        let mut sender = Sender::from(transmitter);

        let start = Instant::now();
        let _ = sender.send(0x04, 0x08, true).unwrap();
        assert!(eventually(|| repeats(&log) >= 1));

        // Frame time plus the rest of the period, give or take scheduling
        assert!(start.elapsed() >= Duration::from_millis(100));
        sender.stop_repeat().unwrap();
    }

    #[test]
    fn test_stop_is_synchronous() {
        let seed: u64 = rand::random();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut pauses = vec![0, 1, 39, 40, 41, 136];
        pauses.extend((0..6).map(|_| rng.random_range(0..250u64)));

        let (mut sender, log) = fake_sender();
        for pause in pauses {
            let _ = sender.send(0x04, 0x08, true).unwrap();
            thread::sleep(Duration::from_millis(pause));
            sender.stop_repeat().unwrap();
            assert_eq!(sender.repeat_state(), RepeatState::Idle);

            let events = log.lock().unwrap().len();
            thread::sleep(Duration::from_millis(120));
            assert_eq!(
                log.lock().unwrap().len(),
                events,
                "repeat sent after stop (seed {seed}, pause {pause} ms)"
            );
        }
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut sender, log) = fake_sender();

        sender.stop_repeat().unwrap();
        sender.stop_repeat().unwrap();

        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_new_send_supersedes_repeat() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        assert!(eventually(|| repeats(&log) >= 1));
        let _ = sender.send(0x05, 0x09, false).unwrap();

        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        let events = log.lock().unwrap().len();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(log.lock().unwrap().len(), events);
        assert_eq!(frames(&log), 2);
    }

    #[test]
    fn test_restarting_repeat_keeps_one_thread() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        let _ = sender.send(0x04, 0x08, true).unwrap();
        assert_eq!(sender.repeat_state(), RepeatState::Repeating);
        assert!(eventually(|| repeats(&log) >= 1));

        sender.stop_repeat().unwrap();
        let stopped = repeats(&log);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(repeats(&log), stopped);
    }

    #[test]
    fn test_manual_repeat_frame_stops_auto_repeat() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        let sent = sender.send_repeat_frame().unwrap();

        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        assert_eq!(sent.as_micros(), 11_812);
        assert!(repeats(&log) >= 1);
    }

    #[test]
    fn test_send_raw_invalid_keeps_repeating() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        assert_eq!(
            sender.send_raw(0x01FFFF00),
            Err(Error::Checksum { code: 0x01FFFF00 })
        );
        assert_eq!(sender.repeat_state(), RepeatState::Repeating);

        let before = repeats(&log);
        assert!(eventually(|| repeats(&log) > before));
        sender.stop_repeat().unwrap();
        assert_eq!(frames(&log), 1);
    }

    #[test]
    fn test_send_raw_valid_supersedes_repeat() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        let _ = sender.send_raw(0xF708FB04).unwrap();

        assert_eq!(sender.repeat_state(), RepeatState::Idle);
        assert_eq!(frames(&log), 2);
    }

    #[test]
    fn test_carrier_error_ends_repeats() {
        let (transmitter, log) = fake_transmitter(false);
        let (pin, carrier, delay) = transmitter.release();
        let fail = Arc::clone(&carrier.fail);
        let mut sender = Sender::new(pin, carrier, delay, SenderConfig::default());

        let _ = sender.send(0x04, 0x08, true).unwrap();
        fail.store(true, Ordering::SeqCst);
        assert!(eventually(|| sender.repeat_state() == RepeatState::Idle));

        sender.stop_repeat().unwrap();
        fail.store(false, Ordering::SeqCst);
        let _ = sender.send(0x04, 0x08, false).unwrap();
        assert_eq!(frames(&log), 2);
    }

    #[test]
    fn test_drop_stops_repeat() {
        let (mut sender, log) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        drop(sender);

        let events = log.lock().unwrap().len();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(log.lock().unwrap().len(), events);
    }

    #[test]
    fn test_failed_spawn_keeps_transmitter() {
        let (transmitter, log) = fake_transmitter(false);
        let oversized = thread::Builder::new().stack_size(usize::MAX / 2);

        let Err((mut transmitter, err)) =
            RepeatSession::start(oversized, transmitter, Duration::ZERO)
        else {
            panic!("repeat thread started with an unallocatable stack");
        };

        assert!(matches!(err, Error::Spawn(_)));
        assert!(log.lock().unwrap().is_empty());
        let _ = transmitter.send(0x04, 0x08).unwrap();
        assert_eq!(frames(&log), 1);
    }

    #[test]
    fn test_repeat_thread_is_named() {
        let (transmitter, _) = fake_transmitter(false);
        let thread = thread::Builder::new().name(REPEAT_THREAD_NAME.into());

        let Ok(session) = RepeatSession::start(thread, transmitter, Duration::from_secs(1)) else {
            panic!("repeat thread did not start");
        };

        assert_eq!(session.handle.thread().name(), Some(REPEAT_THREAD_NAME));
        assert!(session.stop().is_ok());
    }

    #[test]
    fn test_release_returns_hardware() {
        let (mut sender, _) = fake_sender();

        let _ = sender.send(0x04, 0x08, true).unwrap();
        let (_, carrier, _) = sender.release().unwrap();

        assert_eq!(carrier.top, 1000);
    }
}
