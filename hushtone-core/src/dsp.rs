//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` sine for the oscillator hot path
//!
//! Conventions:
//! - Times are milliseconds or frames, frequencies are Hz, `sr` is the sample rate.
//! - All functions are `#[inline]` where useful to help the optimizer.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] pub(crate) fn m_tan(x: f32) -> f32 { libm::tanf(x) }
        #[inline] pub(crate) fn m_round(x: f32) -> f32 { libm::roundf(x) }
    } else {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_tan(x: f32) -> f32 { x.tan() }
        #[inline] pub(crate) fn m_round(x: f32) -> f32 { x.round() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x > -EPS_SMALL && x < EPS_SMALL { 0.0 } else { x }
}

/// Map a uniform sample in [0, 1) to a bipolar value in [-amp, amp).
#[inline]
pub fn bipolar(u: f32, amp: f32) -> f32 {
    (u * 2.0 - 1.0) * amp
}

/// Milliseconds to a whole number of frames (rounded to nearest).
#[inline]
pub fn ms_to_frames(ms: f32, sr: f32) -> u64 {
    let f = ms.max(0.0) * 0.001 * sr.max(1.0);
    m_round(f) as u64
}

/// Whole milliseconds to frames in integer arithmetic (rounded to nearest).
///
/// Exact for every `u32` duration at integer sample rates, where the `f32`
/// path of [`ms_to_frames`] drifts above 2^24 ms.
#[inline]
pub fn duration_frames(ms: u32, sr: f32) -> u64 {
    let sr = m_round(sr.max(1.0)) as u64;
    (u64::from(ms) * sr + 500) / 1_000
}

// --------------------------------- Fast trig -------------------------------------

/// Sine of any phase.
///
/// With `fast-math` the input is folded into [-π/2, π/2] (using
/// `sin(π - x) = sin(x)`) and fed to a 5th-order odd minimax polynomial,
/// max abs error ~1e-4. Otherwise the backend sine.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = m_round(xr / TAU);
            xr -= k * TAU;
            if xr > core::f32::consts::FRAC_PI_2 {
                xr = PI - xr;
            } else if xr < -core::f32::consts::FRAC_PI_2 {
                xr = -PI - xr;
            }

            let x2 = xr * xr;
            xr * (0.999_694_9 + x2 * (-0.165_670_0 + x2 * 0.007_513_4))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// `a = exp(-1/(tau * sr))`, used as `y += (x - y) * (1 - a)`.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// `exp(-2π fc / sr)`, the pole of an RC-style one-pole at cutoff `cut_hz`.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 0.0, 0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

/// TPT `g = tan(π fc / sr)` for state-variable filters. Cutoff is kept below Nyquist.
#[inline]
pub fn tpt_g(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 0.0, 0.49 * sr);
    m_tan(PI * (fc / sr))
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_both_sides() {
        assert_eq!(clamp(-2.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp(2.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(0.25, -1.0, 1.0), 0.25);
    }

    #[test]
    fn bipolar_covers_symmetric_range() {
        assert_eq!(bipolar(0.0, 0.2), -0.2);
        assert!((bipolar(0.5, 0.2)).abs() < 1e-7);
        assert!(bipolar(0.999_999, 0.2) < 0.2);
    }

    #[test]
    fn ms_to_frames_rounds() {
        assert_eq!(ms_to_frames(100.0, 48_000.0), 4_800);
        assert_eq!(ms_to_frames(2_000.0, 44_100.0), 88_200);
        assert_eq!(ms_to_frames(-5.0, 48_000.0), 0);
    }

    #[test]
    fn duration_frames_is_exact_for_long_durations() {
        assert_eq!(duration_frames(100, 48_000.0), 4_800);
        assert_eq!(duration_frames(1, 44_100.0), 44);
        assert_eq!(duration_frames(16_777_217, 48_000.0), 805_306_416);
        assert_eq!(duration_frames(u32::MAX, 48_000.0), u64::from(u32::MAX) * 48);
        assert_eq!(duration_frames(u32::MAX, 44_100.0), 189_408_057_710);
    }

    #[test]
    fn fast_sin_tracks_sin() {
        for i in 0..64 {
            let x = -10.0 + i as f32 * 0.31;
            assert!((fast_sin(x) - x.sin()).abs() < 2e-3, "x={x}");
        }
    }

    #[test]
    fn fast_sin_holds_near_the_period_edges() {
        // Includes ±π and the quarter points, where the fold matters.
        for i in 0..=512 {
            let x = -PI + i as f32 * (TAU / 512.0);
            assert!((fast_sin(x) - x.sin()).abs() < 2e-3, "x={x}");
        }
        for x in [PI, -PI, 0.75 * TAU, 3.0 * PI] {
            assert!((fast_sin(x) - x.sin()).abs() < 2e-3, "x={x}");
        }
    }

    #[test]
    fn tpt_g_stays_finite_near_nyquist() {
        assert!(tpt_g(30_000.0, 48_000.0).is_finite());
        assert!(tpt_g(800.0, 48_000.0) > 0.0);
    }
}
