//! Logging shims.
//!
//! Forwards to `log` or `defmt` depending on the enabled feature. With neither
//! feature the arguments are still type checked but nothing is emitted.
//!
//! Declared first in `lib.rs` with `#[macro_use]` so every module sees the macros.

#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::trace!($($arg)+);
        #[cfg(all(feature = "defmt-0-3", not(feature = "log")))]
        ::defmt::trace!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        let _ = ($($arg)+,);
    };
}

macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::debug!($($arg)+);
        #[cfg(all(feature = "defmt-0-3", not(feature = "log")))]
        ::defmt::debug!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        let _ = ($($arg)+,);
    };
}

macro_rules! warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::warn!($($arg)+);
        #[cfg(all(feature = "defmt-0-3", not(feature = "log")))]
        ::defmt::warn!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        let _ = ($($arg)+,);
    };
}
