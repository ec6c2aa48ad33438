#![cfg_attr(not(feature = "std"), no_std)]
//! Hushtone Core — no_std-ready DSP primitives for the Hushtone sound engine.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` for math
//! - `fast-math`: polynomial sine for oscillators
//!
//! Modules
//! - [`dsp`]       : math backend, utils (clamp, frames/ms, smoothing coefficients)
//! - [`envelopes`] : percussive AR envelope, scheduled linear gain automation
//! - [`filters`]   : one-pole LP smoother, TPT SVF (LP/HP/BP)
//!
//! Nothing here allocates; every primitive is a small `Copy` struct ticked
//! one sample at a time.

pub mod dsp;
pub mod envelopes;
pub mod filters;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{bipolar, clamp, duration_frames, fast_sin, kill_denormals, lerp, ms_to_frames, TAU};
    pub use crate::envelopes::{ArExp, AutomationError, AutomationEvent, GainAutomation};
    pub use crate::filters::{OnePoleLP, SvfMode, SvfTpt, Q_BUTTERWORTH};
}
