//! The sound engine: ambient textures, alarm tones, stop.
//!
//! One engine per host, built at the composition root and passed by reference.
//! It owns the synthesis context and guarantees that at most one graph is
//! connected to the output: every play request stops the previous graph first,
//! and the render thread applies that stop before it connects the new one.
//!
//! ```no_run
//! use hushtone_engine::{catalog, EngineConfig, SoundEngine};
//!
//! # fn main() -> hushtone_engine::Result<()> {
//! let mut engine = SoundEngine::realtime(EngineConfig::default())?;
//! engine.play_ambient(catalog::lookup("rain")?, true, None)?;
//! // ...
//! engine.play_alarm_tone(catalog::lookup("classic")?, Some(2_000))?;
//! engine.stop();
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::backend::{OutputBackend, StreamSpec};
use crate::catalog::{SoundDefinition, Synthesis};
use crate::config::EngineConfig;
use crate::context::{ContextState, SynthesisContext};
use crate::error::{EngineError, Result};
use crate::graph::{Graph, GraphId};
use crate::render::Notice;
use crate::textures::{texture_graph, TextureKind};

/// Lifecycle events kept for observers.
const EVENT_LOG_CAPACITY: usize = 128;

/// Whether a graph is playing, and which.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackState {
    Idle,
    Playing {
        id: GraphId,
        /// Id of the sound definition being played.
        sound: Cow<'static, str>,
    },
}

/// Graph lifecycle, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphEvent {
    /// Handed to the render thread.
    Connected { id: GraphId },
    /// First sample rendered at context frame `frame`.
    Started { id: GraphId, frame: u64 },
    /// Halted by `stop` or by a newer graph.
    Stopped { id: GraphId, frame: u64 },
    /// Finished on its own (duration elapsed or one-shot buffer exhausted).
    Ended { id: GraphId, frame: u64 },
    /// A stop raced with natural completion and found nothing to stop.
    StopIgnored { id: GraphId },
}

impl GraphEvent {
    pub fn id(&self) -> GraphId {
        match *self {
            GraphEvent::Connected { id }
            | GraphEvent::Started { id, .. }
            | GraphEvent::Stopped { id, .. }
            | GraphEvent::Ended { id, .. }
            | GraphEvent::StopIgnored { id } => id,
        }
    }
}

#[derive(Debug)]
struct ActiveGraph {
    id: GraphId,
    sound: Cow<'static, str>,
}

/// Plays synthesized ambient textures and alarm tones, one at a time.
pub struct SoundEngine {
    config: EngineConfig,
    context: SynthesisContext,
    rng: StdRng,
    next_id: u64,
    active: Option<ActiveGraph>,
    looping: bool,
    events: VecDeque<GraphEvent>,
}

impl SoundEngine {
    /// Engine over any output backend. The context is created on the first play.
    pub fn new(config: EngineConfig, backend: Box<dyn OutputBackend>) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let context = SynthesisContext::new(backend, config.master_gain);
        Ok(Self {
            config,
            context,
            rng,
            next_id: 1,
            active: None,
            looping: false,
            events: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        })
    }

    /// Engine on the configured (or default) audio device.
    #[cfg(feature = "realtime")]
    pub fn realtime(config: EngineConfig) -> Result<Self> {
        let backend = crate::cpal_backend::CpalBackend::new(&config);
        Self::new(config, Box::new(backend))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Play an ambient texture, replacing whatever is playing.
    ///
    /// The source loops only when `looping` is set and no duration is given.
    /// With a duration, playback ends by itself at that offset.
    pub fn play_ambient(&mut self, sound: &SoundDefinition, looping: bool, duration_ms: Option<u32>) -> Result<()> {
        let Synthesis::Texture { kind } = &sound.synthesis else {
            return Err(EngineError::NotATexture(sound.id.to_string()));
        };
        self.stop();
        let spec = self.context.ensure_running()?;

        let id = self.allocate_id();
        let kind = TextureKind::resolve(kind);
        let graph = texture_graph(
            id,
            kind,
            spec.sample_rate_f32(),
            looping,
            duration_ms,
            self.config.buffer_seconds,
            &mut self.rng,
        );
        self.connect(graph, sound)?;
        self.looping = looping && duration_ms.is_none();
        tracing::debug!(%id, sound = %sound.id, kind = kind.tag(), looping = self.looping, ?duration_ms, "ambient started");
        Ok(())
    }

    /// Play an alarm tone with a short fade-in, replacing whatever is playing.
    ///
    /// With a duration the tone fades out and stops exactly at its end;
    /// without one it plays until stopped.
    pub fn play_alarm_tone(&mut self, sound: &SoundDefinition, duration_ms: Option<u32>) -> Result<()> {
        let Synthesis::Tone { frequency_hz } = sound.synthesis else {
            return Err(EngineError::NotATone(sound.id.to_string()));
        };
        self.stop();
        let spec: StreamSpec = self.context.ensure_running()?;

        let id = self.allocate_id();
        let graph = Graph::alarm_tone(
            id,
            frequency_hz,
            spec.sample_rate_f32(),
            duration_ms,
            self.config.alarm_gain,
            self.config.fade_ms,
        )?;
        self.connect(graph, sound)?;
        tracing::debug!(%id, sound = %sound.id, frequency_hz, ?duration_ms, "alarm tone started");
        Ok(())
    }

    /// Stop the active graph, if any. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        self.looping = false;
        self.pump();
        let Some(active) = self.active.take() else {
            return;
        };
        match self.context.stop(active.id) {
            Ok(()) => tracing::debug!(id = %active.id, "stop requested"),
            // The renderer still replaces the graph on the next connect.
            Err(err) => tracing::warn!(id = %active.id, error = %err, "stop could not be queued"),
        }
    }

    /// Current playback state, after applying render-thread notifications.
    pub fn state(&mut self) -> PlaybackState {
        self.pump();
        match &self.active {
            Some(a) => PlaybackState::Playing { id: a.id, sound: a.sound.clone() },
            None => PlaybackState::Idle,
        }
    }

    pub fn is_playing(&mut self) -> bool {
        self.pump();
        self.active.is_some()
    }

    /// True while an ambient texture loops with no end in sight.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Graphs this engine considers active: 0 or 1.
    pub fn active_graph_count(&mut self) -> usize {
        self.pump();
        usize::from(self.active.is_some())
    }

    /// Graphs the render thread has connected right now: 0 or 1.
    pub fn connected_graph_count(&self) -> usize {
        self.context.connected()
    }

    /// Drain the lifecycle event log.
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        self.pump();
        self.events.drain(..).collect()
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    /// Pause the output, as a host going to the background would. The next
    /// play request resumes it.
    pub fn suspend_context(&mut self) -> Result<()> {
        self.context.suspend()
    }

    /// Frames the output has rendered since the context was created.
    pub fn frames_rendered(&self) -> u64 {
        self.context.frames_rendered()
    }

    /// Output sample rate, once the context exists.
    pub fn sample_rate(&self) -> Option<u32> {
        self.context.spec().map(|s| s.sample_rate)
    }

    fn allocate_id(&mut self) -> GraphId {
        let id = GraphId(self.next_id);
        self.next_id += 1;
        id
    }

    fn connect(&mut self, graph: Graph, sound: &SoundDefinition) -> Result<()> {
        let id = graph.id();
        self.context.connect(graph)?;
        self.record(GraphEvent::Connected { id });
        self.active = Some(ActiveGraph { id, sound: sound.id.clone() });
        Ok(())
    }

    /// Apply render notifications. Retired graphs are dropped here, off the audio thread.
    fn pump(&mut self) {
        while let Some(notice) = self.context.poll() {
            let event = match notice {
                Notice::Started { id, frame } => GraphEvent::Started { id, frame },
                Notice::Stopped { id, frame, graph } => {
                    drop(graph);
                    self.retire(id);
                    GraphEvent::Stopped { id, frame }
                }
                Notice::Ended { id, frame, graph } => {
                    drop(graph);
                    if self.retire(id) {
                        tracing::debug!(%id, frame, "graph ended");
                    }
                    GraphEvent::Ended { id, frame }
                }
                Notice::StopIgnored { id, reason } => {
                    tracing::debug!(%id, %reason, "stop raced natural completion; ignored");
                    GraphEvent::StopIgnored { id }
                }
            };
            self.record(event);
        }
    }

    fn retire(&mut self, id: GraphId) -> bool {
        if self.active.as_ref().is_some_and(|a| a.id == id) {
            self.active = None;
            self.looping = false;
            true
        } else {
            false
        }
    }

    fn record(&mut self, event: GraphEvent) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}
