//! Control-thread half of the synthesis context.
//!
//! Created lazily on first use, then shared for the engine's lifetime. Every
//! backend failure while creating or resuming surfaces as
//! [`EngineError::ContextUnavailable`]; the backend is kept so a later call can
//! try again.

use crate::backend::{OutputBackend, StreamSpec};
use crate::error::{EngineError, Result};
use crate::graph::{Graph, GraphId};
use crate::render::{self, Command, ControlLink, Notice};

/// Lifecycle of the shared context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// No output opened yet.
    Uninitialized,
    Running,
    /// Output paused by the host; resumed on the next play request.
    Suspended,
}

/// Owns the output backend and the control ends of the render queues.
pub struct SynthesisContext {
    backend: Box<dyn OutputBackend>,
    master_gain: f32,
    link: Option<(ControlLink, StreamSpec)>,
}

impl SynthesisContext {
    pub fn new(backend: Box<dyn OutputBackend>, master_gain: f32) -> Self {
        Self { backend, master_gain, link: None }
    }

    pub fn state(&self) -> ContextState {
        match self.link {
            None => ContextState::Uninitialized,
            Some(_) if self.backend.is_suspended() => ContextState::Suspended,
            Some(_) => ContextState::Running,
        }
    }

    /// Stream format, once the context exists.
    pub fn spec(&self) -> Option<StreamSpec> {
        self.link.as_ref().map(|(_, spec)| *spec)
    }

    /// Create the context if needed and resume it if suspended.
    pub fn ensure_running(&mut self) -> Result<StreamSpec> {
        if let Some((_, spec)) = &self.link {
            let spec = *spec;
            if self.backend.is_suspended() {
                self.backend.resume().map_err(EngineError::into_context_unavailable)?;
                tracing::debug!(backend = self.backend.name(), "context resumed");
            }
            return Ok(spec);
        }

        let spec = self.backend.open().map_err(EngineError::into_context_unavailable)?;
        let (link, renderer) = render::link(spec.channels, self.master_gain);
        self.backend.start(renderer).map_err(EngineError::into_context_unavailable)?;
        if self.backend.is_suspended() {
            self.backend.resume().map_err(EngineError::into_context_unavailable)?;
        }
        tracing::info!(
            backend = self.backend.name(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "synthesis context created"
        );
        self.link = Some((link, spec));
        Ok(spec)
    }

    /// Pause output. No-op before the context exists.
    pub fn suspend(&mut self) -> Result<()> {
        if self.link.is_some() && !self.backend.is_suspended() {
            self.backend.suspend()?;
            tracing::debug!(backend = self.backend.name(), "context suspended");
        }
        Ok(())
    }

    pub fn connect(&mut self, graph: Graph) -> Result<()> {
        self.send(Command::Connect(Box::new(graph)))
    }

    pub fn stop(&mut self, id: GraphId) -> Result<()> {
        self.send(Command::Stop(id))
    }

    fn send(&mut self, cmd: Command) -> Result<()> {
        let (link, _) = self
            .link
            .as_mut()
            .ok_or_else(|| EngineError::context_unavailable("context not created"))?;
        link.commands.push(cmd).map_err(|_| EngineError::Backpressure)
    }

    /// Pop the next render notification, if any.
    pub fn poll(&mut self) -> Option<Notice> {
        self.link.as_mut().and_then(|(link, _)| link.notices.pop().ok())
    }

    /// Frames rendered so far (0 before creation).
    pub fn frames_rendered(&self) -> u64 {
        self.link.as_ref().map_or(0, |(link, _)| link.shared.frames())
    }

    /// Graphs connected to the output right now, as seen by the render thread.
    pub fn connected(&self) -> usize {
        self.link.as_ref().map_or(0, |(link, _)| link.shared.connected())
    }
}
