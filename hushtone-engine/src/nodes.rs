//! Building blocks (nodes) for sound graphs.
//!
//! Per-sample components, no locks, no allocation while rendering. Buffers are
//! allocated up front on the control thread when a graph is built.
//!
//! Contents:
//! - `Osc`              : sine oscillator with stable phase wrap
//! - `NoiseMod`         : slow random modulator with slewed steps (texture design)
//! - `OscillatorNode`   : scheduled sine source
//! - `BufferSourceNode` : scheduled noise-buffer source, optionally looping
//! - `ActiveNode`       : the generating node of a graph, one of the two above
//! - `FilterNode`       : SVF stage with a fixed mode and cutoff
//! - `GainNode`         : gain with scheduled automation
//!
//! Frequencies are **Hz**; frames count from the moment the graph is connected.

use core::fmt::Debug;

use hushtone_core::dsp::{fast_sin, TAU};
use hushtone_core::envelopes::GainAutomation;
use hushtone_core::filters::{OnePoleLP, SvfMode, SvfTpt, Q_BUTTERWORTH};
use rand::Rng;

use crate::error::NodeError;

/// Free-running sine oscillator.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32,   // [0,1)
    freq:  f32,   // Hz
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32) -> Self { Self { phase: 0.0, freq: freq_hz.max(0.0) } }
    #[inline] pub fn set_freq(&mut self, hz: f32) { self.freq = hz.max(0.0); }

    /// Hard-set phase in [0,1).
    #[inline] pub fn set_phase01(&mut self, p: f32) { self.phase = p.rem_euclid(1.0); }

    /// Advance one sample and return the oscillator sample in [-1, 1].
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        let s = fast_sin(TAU * self.phase);
        self.phase = (self.phase + self.freq / sr) % 1.0;
        s
    }
}

/// Slowly changing random modulator.
///
/// Every `period_s` seconds a new random target in [low, high] is drawn and
/// the output slews towards it through a one-pole low-pass.
#[derive(Copy, Clone, Debug)]
pub struct NoiseMod {
    low: f32,
    high: f32,
    period_s: f32,
    t: f32,
    target: f32,
    lp: OnePoleLP,
}

impl NoiseMod {
    /// `period_s`: how often to pick a new target
    /// `cut_hz`  : slew cutoff of the interpolator (smaller = slower)
    pub fn new<R: Rng + ?Sized>(low: f32, high: f32, period_s: f32, cut_hz: f32, sr: f32, rng: &mut R) -> Self {
        let mut s = Self {
            low, high, period_s: period_s.max(0.01),
            t: 0.0,
            target: low,
            lp: OnePoleLP::new(cut_hz.max(0.01), sr),
        };
        s.pick_target(rng);
        s.lp.reset(s.target);
        s
    }

    fn pick_target<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let u: f32 = rng.gen();
        self.target = self.low + (self.high - self.low) * u;
        self.t = 0.0;
    }

    /// Next value, updated once per sample. Stays within [low, high].
    #[inline]
    pub fn next<R: Rng + ?Sized>(&mut self, sr: f32, rng: &mut R) -> f32 {
        self.t += 1.0 / sr;
        if self.t >= self.period_s {
            self.pick_target(rng);
        }
        self.lp.process(self.target)
    }
}

/// Playback state of a generating node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    Playing,
    Finished,
}

/// Node types, as reported by [`Graph::topology`](crate::graph::Graph::topology).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Oscillator,
    BufferSource,
    Filter(SvfMode),
    Gain,
    Destination,
}

/// Sine source that optionally stops itself at `stop_at`.
#[derive(Clone, Debug)]
pub struct OscillatorNode {
    osc: Osc,
    sr: f32,
    frame: u64,
    stop_at: Option<u64>,
    state: NodeState,
}

impl OscillatorNode {
    pub fn new(freq_hz: f32, sr: f32) -> Self {
        Self { osc: Osc::new(freq_hz), sr: sr.max(1.0), frame: 0, stop_at: None, state: NodeState::Playing }
    }

    /// Schedule a stop at `frame` (relative to start).
    pub fn stop_at(mut self, frame: u64) -> Self {
        self.stop_at = Some(frame);
        self
    }

    pub fn scheduled_stop(&self) -> Option<u64> { self.stop_at }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.state == NodeState::Finished {
            return 0.0;
        }
        let s = self.osc.next(self.sr);
        self.frame += 1;
        if self.stop_at.is_some_and(|at| self.frame >= at) {
            self.state = NodeState::Finished;
        }
        s
    }
}

/// Noise-buffer source. Loops the buffer when `looping`, otherwise plays it once.
/// A scheduled stop wins over looping.
#[derive(Clone, Debug)]
pub struct BufferSourceNode {
    buffer: Vec<f32>,
    pos: usize,
    looping: bool,
    frame: u64,
    stop_at: Option<u64>,
    state: NodeState,
}

impl BufferSourceNode {
    pub fn new(buffer: Vec<f32>, looping: bool) -> Self {
        let state = if buffer.is_empty() { NodeState::Finished } else { NodeState::Playing };
        Self { buffer, pos: 0, looping, frame: 0, stop_at: None, state }
    }

    /// Schedule a stop at `frame` (relative to start).
    pub fn stop_at(mut self, frame: u64) -> Self {
        self.stop_at = Some(frame);
        self
    }

    pub fn is_looping(&self) -> bool { self.looping }
    pub fn buffer(&self) -> &[f32] { &self.buffer }
    pub fn scheduled_stop(&self) -> Option<u64> { self.stop_at }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.state == NodeState::Finished {
            return 0.0;
        }
        let s = self.buffer[self.pos];
        self.pos += 1;
        self.frame += 1;
        if self.pos >= self.buffer.len() {
            if self.looping {
                self.pos = 0;
            } else {
                self.state = NodeState::Finished;
            }
        }
        if self.stop_at.is_some_and(|at| self.frame >= at) {
            self.state = NodeState::Finished;
        }
        s
    }
}

/// The generating node of a graph.
#[derive(Clone, Debug)]
pub enum ActiveNode {
    Oscillator(OscillatorNode),
    BufferSource(BufferSourceNode),
}

impl ActiveNode {
    #[inline]
    pub fn next(&mut self) -> f32 {
        match self {
            ActiveNode::Oscillator(n) => n.next(),
            ActiveNode::BufferSource(n) => n.next(),
        }
    }

    pub fn state(&self) -> NodeState {
        match self {
            ActiveNode::Oscillator(n) => n.state,
            ActiveNode::BufferSource(n) => n.state,
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool { self.state() == NodeState::Finished }

    /// Halt the node now. Fails if it already stopped, on its own or otherwise.
    pub fn stop(&mut self) -> Result<(), NodeError> {
        let state = match self {
            ActiveNode::Oscillator(n) => &mut n.state,
            ActiveNode::BufferSource(n) => &mut n.state,
        };
        if *state == NodeState::Finished {
            return Err(NodeError::AlreadyStopped);
        }
        *state = NodeState::Finished;
        Ok(())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ActiveNode::Oscillator(_) => NodeKind::Oscillator,
            ActiveNode::BufferSource(_) => NodeKind::BufferSource,
        }
    }
}

/// Fixed-mode SVF stage.
#[derive(Copy, Clone, Debug)]
pub struct FilterNode {
    svf: SvfTpt,
    mode: SvfMode,
}

impl FilterNode {
    pub fn new(mode: SvfMode, cut_hz: f32, sr: f32) -> Self {
        Self { svf: SvfTpt::new(cut_hz, Q_BUTTERWORTH, sr), mode }
    }

    pub fn mode(&self) -> SvfMode { self.mode }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 { self.svf.process(x, self.mode) }
}

/// Gain stage driven by a [`GainAutomation`] timeline.
#[derive(Copy, Clone, Debug)]
pub struct GainNode {
    automation: GainAutomation,
}

impl GainNode {
    /// Constant gain.
    pub fn constant(gain: f32) -> Self { Self { automation: GainAutomation::new(gain) } }

    pub fn automated(automation: GainAutomation) -> Self { Self { automation } }

    #[inline]
    pub fn value_at(&self, frame: u64) -> f32 { self.automation.value_at(frame) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn osc_is_bounded_and_periodic() {
        let sr = 48_000.0;
        let mut osc = Osc::new(1_000.0);
        let first: Vec<f32> = (0..48).map(|_| osc.next(sr)).collect();
        let second: Vec<f32> = (0..48).map(|_| osc.next(sr)).collect();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-3);
            assert!(a.abs() <= 1.0);
        }
    }

    #[test]
    fn noise_mod_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut m = NoiseMod::new(0.2, 1.0, 0.05, 5.0, 48_000.0, &mut rng);
        for _ in 0..48_000 {
            let v = m.next(48_000.0, &mut rng);
            assert!((0.2 - 1e-4..=1.0 + 1e-4).contains(&v), "v={v}");
        }
    }

    #[test]
    fn one_shot_buffer_finishes_at_its_end() {
        let mut n = ActiveNode::BufferSource(BufferSourceNode::new(vec![0.1; 4], false));
        for _ in 0..3 {
            n.next();
            assert!(!n.is_finished());
        }
        n.next();
        assert!(n.is_finished());
        assert_eq!(n.next(), 0.0);
    }

    #[test]
    fn looping_buffer_wraps() {
        let mut n = BufferSourceNode::new(vec![0.1, 0.2, 0.3], true);
        let out: Vec<f32> = (0..7).map(|_| n.next()).collect();
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
        assert_eq!(n.state, NodeState::Playing);
    }

    #[test]
    fn scheduled_stop_overrides_loop() {
        let mut n = ActiveNode::BufferSource(BufferSourceNode::new(vec![0.1; 2], true).stop_at(5));
        for _ in 0..4 {
            n.next();
        }
        assert!(!n.is_finished());
        n.next();
        assert!(n.is_finished());
    }

    #[test]
    fn oscillator_stops_at_frame() {
        let mut n = ActiveNode::Oscillator(OscillatorNode::new(440.0, 48_000.0).stop_at(10));
        for _ in 0..10 {
            n.next();
        }
        assert!(n.is_finished());
    }

    #[test]
    fn double_stop_is_reported() {
        let mut n = ActiveNode::Oscillator(OscillatorNode::new(440.0, 48_000.0));
        assert_eq!(n.stop(), Ok(()));
        assert_eq!(n.stop(), Err(NodeError::AlreadyStopped));
    }

    #[test]
    fn empty_buffer_is_already_finished() {
        let n = ActiveNode::BufferSource(BufferSourceNode::new(Vec::new(), true));
        assert!(n.is_finished());
    }
}
