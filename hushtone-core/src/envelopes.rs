//! Envelope generators and scheduled parameter automation.
//!
//! Provided:
//! - `ArExp`          : fast AR percussion envelope (exp attack/decay), used for
//!                      chirp and clink transients inside noise textures
//! - `GainAutomation` : sample-accurate timeline of set-value and **linear** ramp
//!                      events, evaluated per frame (fade-in/fade-out of tones)
//!
//! Both are `no_std` friendly and avoid heap allocations.

use core::fmt::{self, Debug};
use crate::dsp::{lerp, one_pole_coeff_ms};

// ------------------------------- AR (percussive) ---------------------------------

/// Exponential AR envelope for percussive sounds.
/// Attack and release are ms time constants (RC style). Calling `trigger()` restarts from zero.
#[derive(Copy, Clone, Debug)]
pub struct ArExp {
    atk_ms: f32,
    rel_ms: f32,
    sr:     f32,
    env:    f32,
    rising: bool,
    a_a:    f32,
    a_r:    f32,
}

impl ArExp {
    #[inline]
    pub fn new(atk_ms: f32, rel_ms: f32, sr: f32) -> Self {
        let mut s = Self {
            atk_ms: atk_ms.max(0.0),
            rel_ms: rel_ms.max(0.0),
            sr: sr.max(1.0),
            env: 0.0, rising: false,
            a_a: 0.0, a_r: 0.0,
        };
        s.recalc();
        s
    }

    #[inline] fn recalc(&mut self) {
        self.a_a = one_pole_coeff_ms(self.atk_ms, self.sr);
        self.a_r = one_pole_coeff_ms(self.rel_ms, self.sr);
    }

    /// Start from 0, go up, then decay.
    #[inline] pub fn trigger(&mut self) { self.env = 0.0; self.rising = true; }

    /// True while the envelope is still audible.
    #[inline] pub fn is_active(&self) -> bool { self.rising || self.env > 0.0 }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.rising {
            self.env += (1.0 - self.env) * (1.0 - self.a_a);
            if self.env >= 0.999 { self.rising = false; }
        } else {
            self.env += (0.0 - self.env) * (1.0 - self.a_r);
            if self.env <= 1e-5 { self.env = 0.0; }
        }
        self.env
    }

    #[inline] pub fn value(&self) -> f32 { self.env }
}

// ------------------------------- Gain automation ---------------------------------

/// Maximum number of scheduled events per automation timeline.
pub const MAX_AUTOMATION_EVENTS: usize = 8;

/// One scheduled change of a parameter. Frames are relative to the owner's start.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `frame`.
    SetValue { frame: u64, value: f32 },
    /// Ramp linearly from the previous event to `value`, arriving at `end_frame`.
    LinearRamp { end_frame: u64, value: f32 },
}

impl AutomationEvent {
    #[inline]
    pub fn frame(&self) -> u64 {
        match *self {
            AutomationEvent::SetValue { frame, .. } => frame,
            AutomationEvent::LinearRamp { end_frame, .. } => end_frame,
        }
    }
}

/// Scheduling failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AutomationError {
    /// The fixed event table is full.
    Full,
    /// The event lands before the last scheduled one.
    OutOfOrder { frame: u64, last: u64 },
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::Full => write!(f, "automation timeline is full ({MAX_AUTOMATION_EVENTS} events)"),
            AutomationError::OutOfOrder { frame, last } => {
                write!(f, "automation event at frame {frame} precedes last event at frame {last}")
            }
        }
    }
}

/// Timeline of automation events for a gain-like parameter.
///
/// Before the first event the parameter holds its initial value. A linear ramp
/// starts at the time and value of the event before it (or frame 0 and the
/// initial value), so `initial = 0` followed by a ramp to `0.3` at 100 ms is a
/// click-free fade-in.
#[derive(Copy, Clone, Debug)]
pub struct GainAutomation {
    initial: f32,
    events: [Option<AutomationEvent>; MAX_AUTOMATION_EVENTS],
    len: usize,
}

impl GainAutomation {
    /// A constant parameter at `initial` with no events.
    #[inline]
    pub fn new(initial: f32) -> Self {
        Self { initial, events: [None; MAX_AUTOMATION_EVENTS], len: 0 }
    }

    /// Scheduled events in time order.
    pub fn events(&self) -> impl Iterator<Item = &AutomationEvent> + '_ {
        self.events[..self.len].iter().flatten()
    }

    /// Frame of the last scheduled event, if any.
    #[inline]
    pub fn last_frame(&self) -> Option<u64> {
        if self.len == 0 { None } else { self.events[self.len - 1].map(|e| e.frame()) }
    }

    fn push(&mut self, ev: AutomationEvent) -> Result<(), AutomationError> {
        if let Some(last) = self.last_frame() {
            if ev.frame() < last {
                return Err(AutomationError::OutOfOrder { frame: ev.frame(), last });
            }
        }
        if self.len == MAX_AUTOMATION_EVENTS {
            return Err(AutomationError::Full);
        }
        self.events[self.len] = Some(ev);
        self.len += 1;
        Ok(())
    }

    /// Schedule an instantaneous change.
    #[inline]
    pub fn set_value_at(&mut self, value: f32, frame: u64) -> Result<(), AutomationError> {
        self.push(AutomationEvent::SetValue { frame, value })
    }

    /// Schedule a linear ramp ending at `end_frame`.
    #[inline]
    pub fn linear_ramp_to(&mut self, value: f32, end_frame: u64) -> Result<(), AutomationError> {
        self.push(AutomationEvent::LinearRamp { end_frame, value })
    }

    /// Parameter value at `frame`.
    pub fn value_at(&self, frame: u64) -> f32 {
        let mut t0 = 0u64;
        let mut v0 = self.initial;
        for ev in self.events() {
            match *ev {
                AutomationEvent::SetValue { frame: t, value } => {
                    if frame < t {
                        return v0;
                    }
                    t0 = t;
                    v0 = value;
                }
                AutomationEvent::LinearRamp { end_frame: t1, value: v1 } => {
                    if frame < t1 {
                        if frame <= t0 {
                            return v0;
                        }
                        let x = (frame - t0) as f32 / (t1 - t0) as f32;
                        return lerp(v0, v1, x);
                    }
                    t0 = t1;
                    v0 = v1;
                }
            }
        }
        v0
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ar_exp_triggers_and_dies() {
        let sr = 48000.0;
        let mut e = ArExp::new(1.0, 200.0, sr);
        e.trigger();
        let mut maxv = 0.0;
        for _ in 0..(sr as usize) {
            let v = e.next();
            if v > maxv { maxv = v; }
        }
        assert!(maxv > 0.8 && e.value() < 0.01);
    }

    #[test]
    fn constant_without_events() {
        let g = GainAutomation::new(0.2);
        assert_eq!(g.value_at(0), 0.2);
        assert_eq!(g.value_at(1_000_000), 0.2);
        assert_eq!(g.last_frame(), None);
    }

    #[test]
    fn fade_in_then_hold() {
        let mut g = GainAutomation::new(0.0);
        g.linear_ramp_to(0.3, 4_800).unwrap();
        assert_eq!(g.value_at(0), 0.0);
        assert!((g.value_at(2_400) - 0.15).abs() < 1e-6);
        assert!((g.value_at(4_800) - 0.3).abs() < 1e-6);
        assert!((g.value_at(96_000) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn symmetric_fade_out_ends_at_zero() {
        let mut g = GainAutomation::new(0.0);
        g.linear_ramp_to(0.3, 4_800).unwrap();
        g.set_value_at(0.3, 91_200).unwrap();
        g.linear_ramp_to(0.0, 96_000).unwrap();
        assert!((g.value_at(50_000) - 0.3).abs() < 1e-6);
        assert!((g.value_at(93_600) - 0.15).abs() < 1e-6);
        assert_eq!(g.value_at(96_000), 0.0);
    }

    #[test]
    fn set_value_waits_for_its_frame() {
        let mut g = GainAutomation::new(1.0);
        g.set_value_at(0.5, 100).unwrap();
        assert_eq!(g.value_at(99), 1.0);
        assert_eq!(g.value_at(100), 0.5);
    }

    #[test]
    fn rejects_out_of_order_and_overflow() {
        let mut g = GainAutomation::new(0.0);
        g.set_value_at(0.1, 50).unwrap();
        assert_eq!(
            g.linear_ramp_to(0.2, 10),
            Err(AutomationError::OutOfOrder { frame: 10, last: 50 })
        );
        for i in 1..MAX_AUTOMATION_EVENTS as u64 {
            g.set_value_at(0.1, 50 + i).unwrap();
        }
        assert_eq!(g.set_value_at(0.1, 1_000), Err(AutomationError::Full));
    }
}
