//! Ambient textures synthesized into noise buffers.
//!
//! Each texture is one noise recipe plus a fixed filter and gain:
//!
//! | kind          | buffer                                     | filter          | gain |
//! |---------------|--------------------------------------------|-----------------|------|
//! | `ocean`       | noise ×0.2 under one slow swell per buffer | low-pass 800 Hz | 0.3  |
//! | `rain`        | noise ×0.15                                | high-pass 1 kHz | 0.2  |
//! | `forest`      | gated rustle bursts ×0.05 + chirps ×0.08   | none            | 0.25 |
//! | `cafe`        | noise ×0.1 + rare clinks up to 0.4         | band-pass 1.5 k | 0.2  |
//! | `white-noise` | noise ×0.1                                 | none            | 0.1  |
//!
//! Buffers are filled on the control thread once per play request. Chirps and
//! clinks are stochastic: each sample triggers one with probability 1/10 000.

use hushtone_core::dsp::{bipolar, duration_frames, ms_to_frames};
use hushtone_core::envelopes::ArExp;
use hushtone_core::filters::SvfMode;
use rand::Rng;

use crate::graph::{Graph, GraphId};
use crate::nodes::{ActiveNode, BufferSourceNode, FilterNode, GainNode, NoiseMod, Osc};

/// Per-sample probability of a chirp or clink.
pub const TRANSIENT_PROBABILITY: f32 = 1.0e-4;

/// Synthesis algorithm of an ambient texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureKind {
    Ocean,
    Rain,
    Forest,
    Cafe,
    WhiteNoise,
}

impl TextureKind {
    pub const ALL: [TextureKind; 5] = [
        TextureKind::Ocean,
        TextureKind::Rain,
        TextureKind::Forest,
        TextureKind::Cafe,
        TextureKind::WhiteNoise,
    ];

    /// Parse a kind tag. `None` for tags without a recipe.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ocean" | "tidal" | "waves" => Some(TextureKind::Ocean),
            "rain" => Some(TextureKind::Rain),
            "forest" => Some(TextureKind::Forest),
            "cafe" | "coffee" => Some(TextureKind::Cafe),
            "white-noise" | "white" | "noise" => Some(TextureKind::WhiteNoise),
            _ => None,
        }
    }

    /// Parse a kind tag, falling back to white noise.
    pub fn resolve(tag: &str) -> Self {
        Self::from_tag(tag).unwrap_or_else(|| {
            tracing::warn!(kind = tag, "unknown texture kind, falling back to white noise");
            TextureKind::WhiteNoise
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            TextureKind::Ocean => "ocean",
            TextureKind::Rain => "rain",
            TextureKind::Forest => "forest",
            TextureKind::Cafe => "cafe",
            TextureKind::WhiteNoise => "white-noise",
        }
    }

    /// Filter stage, if the texture has one.
    pub fn filter(self) -> Option<(SvfMode, f32)> {
        match self {
            TextureKind::Ocean => Some((SvfMode::Lowpass, 800.0)),
            TextureKind::Rain => Some((SvfMode::Highpass, 1_000.0)),
            TextureKind::Cafe => Some((SvfMode::Bandpass, 1_500.0)),
            TextureKind::Forest | TextureKind::WhiteNoise => None,
        }
    }

    /// Output gain of the graph.
    pub fn gain(self) -> f32 {
        match self {
            TextureKind::Ocean => 0.3,
            TextureKind::Rain => 0.2,
            TextureKind::Forest => 0.25,
            TextureKind::Cafe => 0.2,
            TextureKind::WhiteNoise => 0.1,
        }
    }

    /// Amplitude of the raw noise bed.
    pub fn noise_amplitude(self) -> f32 {
        match self {
            TextureKind::Ocean => 0.2,
            TextureKind::Rain => 0.15,
            TextureKind::Forest => 0.05,
            TextureKind::Cafe | TextureKind::WhiteNoise => 0.1,
        }
    }

    /// Largest absolute sample the buffer can hold.
    pub fn peak_amplitude(self) -> f32 {
        match self {
            TextureKind::Forest => 0.05 + Transient::CHIRP_AMP,
            TextureKind::Cafe => 0.1 + Transient::CLINK_AMP_MAX,
            other => other.noise_amplitude(),
        }
    }

    /// Fill a fresh buffer of `frames` samples.
    pub fn synthesize<R: Rng + ?Sized>(self, frames: usize, sr: f32, rng: &mut R) -> Vec<f32> {
        let amp = self.noise_amplitude();
        let mut buf = Vec::with_capacity(frames);
        match self {
            TextureKind::WhiteNoise | TextureKind::Rain => {
                buf.extend((0..frames).map(|_| bipolar(rng.gen(), amp)));
            }
            TextureKind::Ocean => {
                // One swell per buffer, 0.3..1.0, so the loop point is seamless.
                let mut swell = Osc::new(sr / frames.max(1) as f32);
                swell.set_phase01(0.75);
                for _ in 0..frames {
                    let env = 0.65 + 0.35 * swell.next(sr);
                    buf.push(bipolar(rng.gen(), amp) * env);
                }
            }
            TextureKind::Forest => {
                let mut rustle = Rustle::new(amp, sr, rng);
                let mut chirp = Transient::chirp(sr);
                for _ in 0..frames {
                    buf.push(rustle.next(sr, rng) + chirp.next(sr, rng));
                }
            }
            TextureKind::Cafe => {
                let mut clink = Transient::clink(sr);
                for _ in 0..frames {
                    buf.push(bipolar(rng.gen(), amp) + clink.next(sr, rng));
                }
            }
        }
        buf
    }
}

/// Leaf rustle: noise bursts that sound only while a slow random level sits
/// above [`Rustle::GATE`], so the bed is silent most of the time.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Rustle {
    level: NoiseMod,
    amp: f32,
}

impl Rustle {
    pub(crate) const GATE: f32 = 0.7;

    pub(crate) fn new<R: Rng + ?Sized>(amp: f32, sr: f32, rng: &mut R) -> Self {
        Self { level: NoiseMod::new(0.0, 1.0, 0.4, 2.0, sr, rng), amp }
    }

    pub(crate) fn next<R: Rng + ?Sized>(&mut self, sr: f32, rng: &mut R) -> f32 {
        let open = (self.level.next(sr, rng) - Self::GATE) / (1.0 - Self::GATE);
        if open <= 0.0 {
            return 0.0;
        }
        bipolar(rng.gen(), self.amp) * open
    }
}

/// Sparse sine transient (bird chirp or cup clink) fired at random.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Transient {
    osc: Osc,
    env: ArExp,
    freq_lo: f32,
    freq_hi: f32,
    /// Pitch change per second while sounding, as a ratio of the start pitch.
    glide: f32,
    start_freq: f32,
    amp_lo: f32,
    amp_hi: f32,
    amp: f32,
    age_s: f32,
    pub(crate) triggers: usize,
}

impl Transient {
    pub(crate) const CHIRP_AMP: f32 = 0.08;
    pub(crate) const CLINK_AMP_MAX: f32 = 0.4;

    pub(crate) fn chirp(sr: f32) -> Self {
        Self::new(ArExp::new(3.0, 35.0, sr), 2_500.0, 4_500.0, 4.0, Self::CHIRP_AMP, Self::CHIRP_AMP)
    }

    pub(crate) fn clink(sr: f32) -> Self {
        Self::new(ArExp::new(0.3, 20.0, sr), 3_000.0, 5_000.0, 0.0, 0.2, Self::CLINK_AMP_MAX)
    }

    fn new(env: ArExp, freq_lo: f32, freq_hi: f32, glide: f32, amp_lo: f32, amp_hi: f32) -> Self {
        Self {
            osc: Osc::new(freq_lo),
            env,
            freq_lo,
            freq_hi,
            glide,
            start_freq: freq_lo,
            amp_lo,
            amp_hi,
            amp: 0.0,
            age_s: 0.0,
            triggers: 0,
        }
    }

    pub(crate) fn next<R: Rng + ?Sized>(&mut self, sr: f32, rng: &mut R) -> f32 {
        if !self.env.is_active() && rng.gen::<f32>() < TRANSIENT_PROBABILITY {
            self.start_freq = rng.gen_range(self.freq_lo..self.freq_hi);
            self.amp = if self.amp_hi > self.amp_lo { rng.gen_range(self.amp_lo..self.amp_hi) } else { self.amp_lo };
            self.osc = Osc::new(self.start_freq);
            self.age_s = 0.0;
            self.env.trigger();
            self.triggers += 1;
        }
        if !self.env.is_active() {
            return 0.0;
        }
        self.age_s += 1.0 / sr;
        if self.glide != 0.0 {
            self.osc.set_freq(self.start_freq * (1.0 + self.glide * self.age_s));
        }
        // Envelope stays in [0, 1], so the transient never exceeds `amp`.
        self.osc.next(sr) * self.env.next() * self.amp
    }
}

/// Build the graph for an ambient texture.
///
/// - The synthesized buffer holds at most `buffer_seconds`; shorter durations
///   get a buffer of exactly their length.
/// - Without a duration the source loops only when `looping` is set.
/// - With a duration the source stops itself at that offset, looping the
///   buffer when the duration outlasts it.
pub fn texture_graph<R: Rng + ?Sized>(
    id: GraphId,
    kind: TextureKind,
    sr: f32,
    looping: bool,
    duration_ms: Option<u32>,
    buffer_seconds: f32,
    rng: &mut R,
) -> Graph {
    let max_frames = ms_to_frames(buffer_seconds * 1_000.0, sr).max(1);
    let end = duration_ms.map(|d| duration_frames(d, sr).max(1));
    let frames = end.map_or(max_frames, |end| end.min(max_frames));

    let buffer = kind.synthesize(frames as usize, sr, rng);
    let source = match end {
        Some(end) => BufferSourceNode::new(buffer, end > frames).stop_at(end),
        None => BufferSourceNode::new(buffer, looping),
    };
    let filter = kind.filter().map(|(mode, cut)| FilterNode::new(mode, cut, sr));
    Graph::new(id, ActiveNode::BufferSource(source), filter, GainNode::constant(kind.gain()))
}

/// Root-mean-square level of a buffer.
pub fn rms(buf: &[f32]) -> f32 {
    if buf.is_empty() {
        return 0.0;
    }
    (buf.iter().map(|s| s * s).sum::<f32>() / buf.len() as f32).sqrt()
}
