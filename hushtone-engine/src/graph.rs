//! Sound graphs: one generating node → optional filter → gain → output.
//!
//! A [`Graph`] is built on the control thread, moved to the render thread
//! through the context's command queue, and ticked there one sample at a time
//! with no allocation. Frames count from the moment it is connected.

use std::fmt;

use hushtone_core::dsp::{duration_frames, kill_denormals};
use hushtone_core::envelopes::GainAutomation;

use crate::error::{NodeError, Result};
use crate::nodes::{ActiveNode, FilterNode, GainNode, NodeKind, OscillatorNode};

/// Identity of one graph instance, unique per engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub u64);

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// A connected set of nodes realizing one sound.
#[derive(Clone, Debug)]
pub struct Graph {
    id: GraphId,
    source: ActiveNode,
    filter: Option<FilterNode>,
    gain: GainNode,
    frame: u64,
}

impl Graph {
    pub fn new(id: GraphId, source: ActiveNode, filter: Option<FilterNode>, gain: GainNode) -> Self {
        Self { id, source, filter, gain, frame: 0 }
    }

    /// Sine tone with a linear fade-in to `gain` over `fade_ms`.
    ///
    /// With a duration, the gain holds until `duration - fade` and ramps back to
    /// zero exactly at the duration, where the oscillator stops. Durations shorter
    /// than two fades split evenly between fade-in and fade-out.
    pub fn alarm_tone(
        id: GraphId,
        frequency_hz: f32,
        sr: f32,
        duration_ms: Option<u32>,
        gain: f32,
        fade_ms: u32,
    ) -> Result<Self> {
        let mut fade = duration_frames(fade_ms, sr);
        let mut osc = OscillatorNode::new(frequency_hz, sr);
        let mut automation = GainAutomation::new(0.0);

        match duration_ms.map(|d| duration_frames(d, sr)) {
            Some(end) => {
                fade = fade.min(end / 2);
                automation.linear_ramp_to(gain, fade)?;
                automation.set_value_at(gain, end - fade)?;
                automation.linear_ramp_to(0.0, end)?;
                osc = osc.stop_at(end);
            }
            None => automation.linear_ramp_to(gain, fade)?,
        }

        Ok(Self::new(id, ActiveNode::Oscillator(osc), None, GainNode::automated(automation)))
    }

    #[inline] pub fn id(&self) -> GraphId { self.id }
    #[inline] pub fn source(&self) -> &ActiveNode { &self.source }
    #[inline] pub fn filter(&self) -> Option<&FilterNode> { self.filter.as_ref() }
    #[inline] pub fn gain(&self) -> &GainNode { &self.gain }

    /// Frames rendered so far.
    #[inline] pub fn frame(&self) -> u64 { self.frame }

    /// True once the generating node has stopped; the graph should be retired.
    #[inline] pub fn is_finished(&self) -> bool { self.source.is_finished() }

    /// Halt the generating node now.
    #[inline] pub fn stop(&mut self) -> std::result::Result<(), NodeError> { self.source.stop() }

    /// Render one mono sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let x = self.source.next();
        let y = match self.filter.as_mut() {
            Some(f) => f.process(x),
            None => x,
        };
        let g = self.gain.value_at(self.frame);
        self.frame += 1;
        kill_denormals(y * g)
    }

    /// Node chain from source to destination.
    pub fn topology(&self) -> Vec<NodeKind> {
        let mut nodes = vec![self.source.kind()];
        if let Some(f) = &self.filter {
            nodes.push(NodeKind::Filter(f.mode()));
        }
        nodes.push(NodeKind::Gain);
        nodes.push(NodeKind::Destination);
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;

    #[test]
    fn unbounded_tone_fades_in_and_holds() {
        let g = Graph::alarm_tone(GraphId(1), 880.0, SR, None, 0.3, 100).unwrap();
        let gain = g.gain();
        assert_eq!(gain.value_at(0), 0.0);
        assert!((gain.value_at(2_400) - 0.15).abs() < 1e-6);
        assert!((gain.value_at(4_800) - 0.3).abs() < 1e-6);
        assert!((gain.value_at(10 * 48_000) - 0.3).abs() < 1e-6);
        assert!(!g.is_finished());
        assert_eq!(g.topology(), vec![NodeKind::Oscillator, NodeKind::Gain, NodeKind::Destination]);
    }

    #[test]
    fn bounded_tone_fades_out_and_stops_on_the_boundary() {
        let mut g = Graph::alarm_tone(GraphId(2), 440.0, SR, Some(1_000), 0.3, 100).unwrap();
        let end = 48_000u64;
        assert!((g.gain().value_at(end - 4_800) - 0.3).abs() < 1e-6);
        assert!((g.gain().value_at(end - 2_400) - 0.15).abs() < 1e-6);
        assert_eq!(g.gain().value_at(end), 0.0);

        for _ in 0..end - 1 {
            g.next();
        }
        assert!(!g.is_finished());
        g.next();
        assert!(g.is_finished());
    }

    #[test]
    fn short_tone_splits_fades() {
        let g = Graph::alarm_tone(GraphId(3), 440.0, SR, Some(100), 0.3, 100).unwrap();
        // 100 ms total: 50 ms up, 50 ms down.
        assert!((g.gain().value_at(2_400) - 0.3).abs() < 1e-6);
        assert_eq!(g.gain().value_at(4_800), 0.0);
    }

    #[test]
    fn longest_tone_ends_on_an_exact_frame() {
        let g = Graph::alarm_tone(GraphId(6), 440.0, SR, Some(u32::MAX), 0.3, 100).unwrap();
        let end = u64::from(u32::MAX) * 48;
        match g.source() {
            ActiveNode::Oscillator(osc) => assert_eq!(osc.scheduled_stop(), Some(end)),
            other => panic!("unexpected source {other:?}"),
        }
        assert!((g.gain().value_at(end - 4_800) - 0.3).abs() < 1e-6);
        assert!((g.gain().value_at(end - 2_400) - 0.15).abs() < 1e-6);
        assert_eq!(g.gain().value_at(end), 0.0);
    }

    #[test]
    fn rendered_tone_starts_silent() {
        let mut g = Graph::alarm_tone(GraphId(4), 1_000.0, SR, None, 0.3, 100).unwrap();
        let head: Vec<f32> = (0..48).map(|_| g.next()).collect();
        let peak = head.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        // 1 ms into a 100 ms ramp the gain is at most 1% of target.
        assert!(peak <= 0.3 * 0.01 + 1e-6, "peak={peak}");
    }

    #[test]
    fn stop_is_reported_once() {
        let mut g = Graph::alarm_tone(GraphId(5), 440.0, SR, None, 0.3, 100).unwrap();
        assert!(g.stop().is_ok());
        assert!(g.is_finished());
        assert_eq!(g.stop(), Err(NodeError::AlreadyStopped));
    }
}
