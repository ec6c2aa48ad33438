//! Render-thread half of the synthesis context.
//!
//! The [`Renderer`] owns the connected graph slot and is moved into the audio
//! callback. The control side talks to it over two lock-free SPSC queues:
//!
//! ```text
//!  control thread                         audio thread
//!  ──────────────                         ────────────
//!  Command::Stop(id)      ──commands──▶   applied at the next block boundary,
//!  Command::Connect(graph)                in FIFO order
//!                         ◀──notices───   Started / Stopped / Ended / StopIgnored
//!                                         (retired graphs ride along so the audio
//!                                          thread never frees a buffer)
//! ```
//!
//! The audio thread never allocates, frees, locks or logs.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::NodeError;
use crate::graph::{Graph, GraphId};

/// Capacity of both queues.
pub const QUEUE_CAPACITY: usize = 256;

/// Control → render.
#[derive(Debug)]
pub enum Command {
    /// Connect a graph to the output. Replaces (and stops) anything connected.
    Connect(Box<Graph>),
    /// Stop the graph with this id, if it is still connected.
    Stop(GraphId),
}

/// Render → control.
#[derive(Debug)]
pub enum Notice {
    /// The graph produces its first sample at context frame `frame`.
    Started { id: GraphId, frame: u64 },
    /// Halted by a stop command or replaced by a newer graph.
    Stopped { id: GraphId, frame: u64, graph: Box<Graph> },
    /// The generating node finished on its own.
    Ended { id: GraphId, frame: u64, graph: Box<Graph> },
    /// A stop arrived for a graph that had already stopped or left the output.
    StopIgnored { id: GraphId, reason: NodeError },
}

/// Counters the render thread publishes for the control side.
#[derive(Debug, Default)]
pub struct RenderShared {
    frames: AtomicU64,
    connected: AtomicUsize,
}

impl RenderShared {
    /// Frames rendered since the context started.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Graphs currently connected to the output (0 or 1).
    pub fn connected(&self) -> usize {
        self.connected.load(Ordering::Acquire)
    }
}

/// Control-side ends of the queues.
pub struct ControlLink {
    pub commands: rtrb::Producer<Command>,
    pub notices: rtrb::Consumer<Notice>,
    pub shared: Arc<RenderShared>,
}

/// Build a connected control/render pair.
pub fn link(channels: u16, master_gain: f32) -> (ControlLink, Renderer) {
    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(QUEUE_CAPACITY);
    let (notice_tx, notice_rx) = rtrb::RingBuffer::<Notice>::new(QUEUE_CAPACITY);
    let shared = Arc::new(RenderShared::default());

    let control = ControlLink {
        commands: command_tx,
        notices: notice_rx,
        shared: Arc::clone(&shared),
    };
    let renderer = Renderer {
        commands: command_rx,
        notices: notice_tx,
        shared,
        slot: None,
        clock: 0,
        channels: usize::from(channels.max(1)),
        master_gain,
    };
    (control, renderer)
}

/// Audio-thread state: the single output slot and the frame clock.
pub struct Renderer {
    commands: rtrb::Consumer<Command>,
    notices: rtrb::Producer<Notice>,
    shared: Arc<RenderShared>,
    slot: Option<Box<Graph>>,
    clock: u64,
    channels: usize,
    master_gain: f32,
}

impl Renderer {
    /// Apply pending commands. Call once per block, before rendering it.
    pub fn begin_block(&mut self) {
        while let Ok(cmd) = self.commands.pop() {
            match cmd {
                Command::Connect(graph) => {
                    if let Some(mut old) = self.slot.take() {
                        // Should not happen through the engine; keep the single-slot rule anyway.
                        let _ = old.stop();
                        self.notify(Notice::Stopped { id: old.id(), frame: self.clock, graph: old });
                    }
                    let id = graph.id();
                    self.slot = Some(graph);
                    self.notify(Notice::Started { id, frame: self.clock });
                }
                Command::Stop(id) => self.stop(id),
            }
        }
        self.publish();
    }

    fn stop(&mut self, id: GraphId) {
        match self.slot.take() {
            Some(mut graph) if graph.id() == id => match graph.stop() {
                Ok(()) => self.notify(Notice::Stopped { id, frame: self.clock, graph }),
                Err(reason) => {
                    self.notify(Notice::StopIgnored { id, reason });
                    self.notify(Notice::Ended { id, frame: self.clock, graph });
                }
            },
            other => {
                self.slot = other;
                self.notify(Notice::StopIgnored { id, reason: NodeError::AlreadyStopped });
            }
        }
    }

    /// Render one mono sample (before master gain) and retire the graph if it
    /// finished on this sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut finished = false;
        let s = match self.slot.as_mut() {
            Some(graph) => {
                let s = graph.next();
                finished = graph.is_finished();
                s
            }
            None => 0.0,
        };
        self.clock += 1;
        if finished {
            if let Some(graph) = self.slot.take() {
                self.notify(Notice::Ended { id: graph.id(), frame: self.clock, graph });
            }
        }
        (s * self.master_gain).clamp(-1.0, 1.0)
    }

    /// Publish counters. Call once per block, after rendering it.
    pub fn end_block(&mut self) {
        self.publish();
    }

    /// Fill an interleaved f32 block, duplicating the mono signal to every channel.
    pub fn process(&mut self, out: &mut [f32]) {
        self.begin_block();
        for frame in out.chunks_mut(self.channels) {
            let s = self.next_sample();
            frame.fill(s);
        }
        self.end_block();
    }

    fn publish(&self) {
        self.shared.frames.store(self.clock, Ordering::Release);
        self.shared.connected.store(usize::from(self.slot.is_some()), Ordering::Release);
    }

    fn notify(&mut self, notice: Notice) {
        // A full queue means the control side stopped listening; dropping the
        // notice (and any graph in it) here is the only option left.
        let _ = self.notices.push(notice);
    }
}
