//! Output backends: where the renderer's samples go.
//!
//! A backend opens an output (reporting its sample rate and channel count),
//! takes ownership of the [`Renderer`], and can be paused and resumed. The
//! realtime implementation lives in [`cpal_backend`](crate::cpal_backend);
//! [`OfflineBackend`] has no device and is pumped by hand through an
//! [`OfflineTap`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::error::{EngineError, Result};
use crate::render::Renderer;

/// Frames rendered per block by the offline tap.
pub const OFFLINE_BLOCK_FRAMES: usize = 128;

/// Negotiated stream format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamSpec {
    #[inline] pub fn sample_rate_f32(&self) -> f32 { self.sample_rate as f32 }
}

/// An audio output the synthesis context can render into.
///
/// Not `Send`: realtime streams are tied to the thread that built them.
pub trait OutputBackend {
    /// Human-readable backend/device name, for logs.
    fn name(&self) -> &str;

    /// Acquire the output and report its format. Called once, before `start`.
    fn open(&mut self) -> Result<StreamSpec>;

    /// Hand the renderer to the output and begin pulling samples.
    fn start(&mut self, renderer: Renderer) -> Result<()>;

    /// Pause the output. The renderer keeps its state.
    fn suspend(&mut self) -> Result<()>;

    /// Resume after [`suspend`](Self::suspend).
    fn resume(&mut self) -> Result<()>;

    fn is_suspended(&self) -> bool;
}

#[derive(Default)]
struct TapState {
    renderer: Option<Renderer>,
    suspended: bool,
}

/// Handle that pumps an [`OfflineBackend`]'s renderer.
///
/// Clones share the same renderer. While the backend is suspended, or before
/// the engine starts it, rendering yields silence and the clock stands still.
#[derive(Clone)]
pub struct OfflineTap {
    state: Arc<Mutex<TapState>>,
    spec: StreamSpec,
}

impl OfflineTap {
    fn lock(&self) -> MutexGuard<'_, TapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn spec(&self) -> StreamSpec { self.spec }

    /// True once the engine has started the backend.
    pub fn is_attached(&self) -> bool {
        self.lock().renderer.is_some()
    }

    /// Render `frames` interleaved frames in blocks of [`OFFLINE_BLOCK_FRAMES`].
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * usize::from(self.spec.channels)];
        self.render_into(&mut out);
        out
    }

    /// Render whole interleaved frames into `out` and return how many.
    ///
    /// Meant for a host's audio callback: never allocates and never waits on
    /// the lock. If the control side holds it, or the backend is suspended or
    /// not started yet, `out` gets silence and the clock does not move.
    pub fn render_into(&self, out: &mut [f32]) -> usize {
        let channels = usize::from(self.spec.channels);
        let frames = out.len() / channels;
        let out = &mut out[..frames * channels];

        let mut guard = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                out.fill(0.0);
                return frames;
            }
        };
        let state = &mut *guard;
        match state.renderer.as_mut() {
            Some(renderer) if !state.suspended => {
                for block in out.chunks_mut(OFFLINE_BLOCK_FRAMES * channels) {
                    renderer.process(block);
                }
            }
            _ => out.fill(0.0),
        }
        frames
    }

    /// Render `ms` milliseconds of audio.
    pub fn render_ms(&self, ms: u32) -> Vec<f32> {
        let frames = u64::from(ms) * u64::from(self.spec.sample_rate) / 1_000;
        self.render(frames as usize)
    }
}

/// Device-less backend driven through an [`OfflineTap`].
pub struct OfflineBackend {
    tap: OfflineTap,
    fail_open: Option<String>,
    start_suspended: bool,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            tap: OfflineTap {
                state: Arc::new(Mutex::new(TapState::default())),
                spec: StreamSpec { sample_rate, channels: channels.max(1) },
            },
            fail_open: None,
            start_suspended: false,
        }
    }

    /// Refuse to open, as a platform without audio would.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.fail_open = Some(reason.into());
        self
    }

    /// Start in the suspended state, as a host with an autoplay policy would.
    pub fn starting_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    pub fn tap(&self) -> OfflineTap {
        self.tap.clone()
    }
}

impl OutputBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn open(&mut self) -> Result<StreamSpec> {
        match &self.fail_open {
            Some(reason) => Err(EngineError::context_unavailable(reason)),
            None => Ok(self.tap.spec),
        }
    }

    fn start(&mut self, renderer: Renderer) -> Result<()> {
        let mut state = self.tap.lock();
        state.renderer = Some(renderer);
        state.suspended = self.start_suspended;
        Ok(())
    }

    fn suspend(&mut self) -> Result<()> {
        self.tap.lock().suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.tap.lock().suspended = false;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.tap.lock().suspended
    }
}
