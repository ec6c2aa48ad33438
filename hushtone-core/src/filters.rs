//! Filters: a one-pole low-pass smoother and a TPT state-variable filter.
//!
//! Contents
//! - `OnePoleLP`  : “RC-style” one-pole low-pass (slew for slow modulators)
//! - `SvfMode`    : LP/HP/BP taps of the SVF
//! - `SvfTpt`     : State-Variable Filter via Topology Preserving Transform
//!
//! `SvfTpt` uses the “g = tan(π fc / sr)” formulation with `R = 1/(2Q)` and is
//! what the texture graphs use for their low-pass, high-pass and band-pass stages.

use crate::dsp::{kill_denormals, one_pole_coeff_hz, tpt_g};
use core::fmt::Debug;

/// Butterworth Q, the default resonance of a graph filter.
pub const Q_BUTTERWORTH: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// One-pole low-pass `y += a * (x - y)` with `a = 1 - exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLP {
    a: f32,
    y: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleLP {
    /// Create a low-pass with cutoff `cut_hz` and sample rate `sr`.
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            a: 0.0,
            y: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    #[inline]
    fn update_coeffs(&mut self) {
        self.a = 1.0 - one_pole_coeff_hz(self.fc, self.sr);
    }

    /// Start the smoother at `y0` instead of ramping up from silence.
    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        self.y = kill_denormals(self.y);
        self.y
    }
}

/// SVF output tap selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SvfMode {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Topology-Preserving Transform SVF (State-Variable Filter).
///
/// - `g = tan(π fc / sr)`
/// - `R = 1 / (2Q)`
///
/// Follows the usual Zavalishin formulation; robust under cutoff modulation.
#[derive(Copy, Clone, Debug)]
pub struct SvfTpt {
    sr: f32,
    cut: f32,
    q: f32,
    g: f32,
    r: f32,
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfTpt {
    #[inline]
    pub fn new(cut_hz: f32, q: f32, sr: f32) -> Self {
        let mut s = Self {
            sr: sr.max(1.0),
            cut: cut_hz.max(0.0),
            q: q.max(1e-4),
            g: 0.0,
            r: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        s.recalc();
        s
    }

    /// Clear the integrator states.
    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    #[inline]
    fn recalc(&mut self) {
        self.g = tpt_g(self.cut, self.sr);
        self.r = 1.0 / (2.0 * self.q);
    }

    /// Process one sample and return the `(lp, bp, hp)` taps.
    #[inline]
    pub fn process_all(&mut self, x: f32) -> (f32, f32, f32) {
        // Solve the zero-delay feedback loop for the high-pass node first.
        let g = self.g;
        let hp = (x - (2.0 * self.r + g) * self.ic1eq - self.ic2eq) / (1.0 + 2.0 * self.r * g + g * g);
        let bp = g * hp + self.ic1eq;
        let lp = g * bp + self.ic2eq;

        self.ic1eq = kill_denormals(g * hp + bp);
        self.ic2eq = kill_denormals(g * bp + lp);

        (lp, bp, hp)
    }

    /// Process one sample, returning only the mode requested.
    #[inline]
    pub fn process(&mut self, x: f32, mode: SvfMode) -> f32 {
        let (lp, bp, hp) = self.process_all(x);
        match mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
            // Scale by 2R so the band-pass peak sits at unity gain.
            SvfMode::Bandpass => 2.0 * self.r * bp,
        }
    }
}

// ------------------------------------ Tests --------------------------------------
