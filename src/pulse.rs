//! Mark/space schedules for NEC frames.
//!
//! Every NEC frame is a run of carrier bursts (marks) separated by silences
//! (spaces). This module describes a frame as a list of [`Pulse`]s, each a
//! mark followed by a space, in the same way remote control peripherals such
//! as the ESP32 RMT take their pulse codes. A trailing space of zero length
//! means the frame ends on that mark.
//!
//! The schedules are pure data: [`Transmitter`](crate::transmitter::Transmitter)
//! plays them back on the hardware, and they can also be handed to a
//! peripheral that generates the waveform on its own.

use core::iter::once;
use core::time::Duration;

use heapless::Vec;

use crate::consts::{
    NEC_BIT_0_SPACE, NEC_BIT_1_SPACE, NEC_BIT_MARK, NEC_FRAME_PULSES, NEC_LEAD_MARK,
    NEC_LEAD_SPACE, NEC_REPEAT_PULSES, NEC_REPEAT_SPACE, NEC_TRAIL_MARK,
};

/// One carrier burst followed by a silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// How long the carrier is on
    pub mark: Duration,
    /// How long the carrier is off afterwards
    pub space: Duration,
}

impl Pulse {
    /// Creates a pulse from its mark and space lengths.
    pub const fn new(mark: Duration, space: Duration) -> Self {
        Self { mark, space }
    }

    /// Total length of the pulse.
    pub fn duration(&self) -> Duration {
        self.mark + self.space
    }
}

/// Pulses of a full data frame.
pub type FramePulses = Vec<Pulse, NEC_FRAME_PULSES>;

/// Pulses of a repeat frame.
pub type RepeatPulses = Vec<Pulse, NEC_REPEAT_PULSES>;

const LEAD: Pulse = Pulse::new(NEC_LEAD_MARK, NEC_LEAD_SPACE);
const REPEAT_LEAD: Pulse = Pulse::new(NEC_LEAD_MARK, NEC_REPEAT_SPACE);
const TRAIL: Pulse = Pulse::new(NEC_TRAIL_MARK, Duration::ZERO);
const BIT_0: Pulse = Pulse::new(NEC_BIT_MARK, NEC_BIT_0_SPACE);
const BIT_1: Pulse = Pulse::new(NEC_BIT_MARK, NEC_BIT_1_SPACE);

/// Builds the schedule of a data frame carrying `bytes`.
///
/// Bytes are sent in order, each one least significant bit first. The NEC
/// byte order is address low, address high, command, inverted command.
pub fn frame_pulses(bytes: [u8; 4]) -> FramePulses {
    let bits = bytes.into_iter().flat_map(|byte| {
        (0..8).map(move |bit| if byte & (1 << bit) == 0 { BIT_0 } else { BIT_1 })
    });
    once(LEAD).chain(bits).chain(once(TRAIL)).collect()
}

/// Builds the schedule of a repeat frame.
pub fn repeat_pulses() -> RepeatPulses {
    once(REPEAT_LEAD).chain(once(TRAIL)).collect()
}

/// Sums the length of every pulse in `pulses`.
pub fn total_duration(pulses: &[Pulse]) -> Duration {
    pulses.iter().map(Pulse::duration).sum()
}
