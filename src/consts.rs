//! Constants used across the NEC protocol implementation.
//!
//! Every interval of the NEC protocol is a whole multiple of a single timing
//! unit of 562.5 µs. The values below are taken from the published protocol
//! description and must match it exactly for third-party receivers to accept
//! the frames.
//!
//! ## Key Concepts
//!
//! - **Lead**: 9 ms mark followed by a 4.5 ms space, marking the start of a data frame.
//! - **Bits**: a 562.5 µs mark followed by a short (`0`) or long (`1`) space.
//! - **Trail**: a closing 562.5 µs mark after the last data bit.
//! - **Repeat**: lead mark, 2.25 ms space and trail mark, sent every 108 ms
//!   while a key is held down.
//!
//! References:
//! - <https://www.sbprojects.net/knowledge/ir/nec.php>
//! - <https://techdocs.altium.com/display/FPGA/NEC+Infrared+Transmission+Protocol>

use core::time::Duration;

/// NEC consumer IR is modulated at 38 kHz.
pub const NEC_MODULATION_FREQUENCY: u32 = 38_000;

/// Period (in nanoseconds) of one carrier cycle, `1 / NEC_MODULATION_FREQUENCY`.
pub const NEC_CARRIER_PERIOD_NS: u64 = 1_000_000_000 / NEC_MODULATION_FREQUENCY as u64;

/// Duty cycle (%) used for the carrier when none, or an out of range one, is configured.
pub const NEC_DEFAULT_DUTY_CYCLE: u8 = 33;

/// The base timing unit in nanoseconds (562.5 µs).
pub const NEC_UNIT_NS: u64 = 562_500;

/// The base timing unit (562.5 µs).
pub const NEC_UNIT: Duration = Duration::from_nanos(NEC_UNIT_NS);

/// Lead mark, 9 ms.
pub const NEC_LEAD_MARK: Duration = Duration::from_nanos(NEC_UNIT_NS * 16);

/// Lead space of a data frame, 4.5 ms.
pub const NEC_LEAD_SPACE: Duration = Duration::from_nanos(NEC_UNIT_NS * 8);

/// Space following the lead mark of a repeat frame, 2.25 ms.
pub const NEC_REPEAT_SPACE: Duration = Duration::from_nanos(NEC_UNIT_NS * 4);

/// Mark starting every data bit, 562.5 µs.
pub const NEC_BIT_MARK: Duration = NEC_UNIT;

/// Space encoding a logical `0`, 562.5 µs.
pub const NEC_BIT_0_SPACE: Duration = NEC_UNIT;

/// Space encoding a logical `1`, 1.6875 ms.
pub const NEC_BIT_1_SPACE: Duration = Duration::from_nanos(NEC_UNIT_NS * 3);

/// Mark closing a frame, 562.5 µs.
pub const NEC_TRAIL_MARK: Duration = NEC_UNIT;

/// Interval between the starts of consecutive frames while repeating, 108 ms.
pub const NEC_REPEAT_PERIOD: Duration = Duration::from_nanos(NEC_UNIT_NS * 192);

/// Number of data bits in a frame (address low, address high, command, inverted command).
pub const NEC_FRAME_BITS: usize = 32;

/// Number of mark/space pulses in a data frame: lead, one per bit, trail.
pub const NEC_FRAME_PULSES: usize = NEC_FRAME_BITS + 2;

/// Number of mark/space pulses in a repeat frame: lead, trail.
pub const NEC_REPEAT_PULSES: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_match_protocol() {
        assert_eq!(NEC_LEAD_MARK, Duration::from_millis(9));
        assert_eq!(NEC_LEAD_SPACE, Duration::from_micros(4_500));
        assert_eq!(NEC_REPEAT_SPACE, Duration::from_micros(2_250));
        assert_eq!(NEC_BIT_1_SPACE, Duration::from_nanos(1_687_500));
        assert_eq!(NEC_REPEAT_PERIOD, Duration::from_millis(108));
    }

    #[test]
    fn test_carrier_period() {
        // 26.3 µs per cycle at 38 kHz
        assert_eq!(NEC_CARRIER_PERIOD_NS, 26_315);
    }
}
