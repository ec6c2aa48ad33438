//! Hushtone engine: synthesized ambient textures and alarm tones.
//!
//! Crate layout:
//! - [`catalog`]  : the built-in sounds and their definitions
//! - [`nodes`]    : oscillators, noise-buffer sources, filter and gain stages
//! - [`graph`]    : one sound as source → [filter] → gain → output
//! - [`textures`] : noise recipes for the ambient textures
//! - [`render`]   : audio-thread renderer and its command/notification queues
//! - [`context`]  : control-thread half of the synthesis context
//! - [`backend`]  : output backends (offline; CPAL under `realtime`)
//! - [`engine`]   : [`SoundEngine`], the public entry point
//!
//! The render thread never allocates, frees, locks or logs. Buffers are
//! synthesized on the control thread per play request and travel to the
//! renderer inside the graph.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod context;
#[cfg(feature = "realtime")]
pub mod cpal_backend;
pub mod engine;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod render;
pub mod textures;

pub use backend::{OfflineBackend, OfflineTap, OutputBackend, StreamSpec};
pub use catalog::{SoundCategory, SoundDefinition, Synthesis};
pub use config::EngineConfig;
pub use context::ContextState;
#[cfg(feature = "realtime")]
pub use cpal_backend::CpalBackend;
pub use engine::{GraphEvent, PlaybackState, SoundEngine};
pub use error::{EngineError, NodeError, Result};
pub use graph::GraphId;
pub use textures::TextureKind;
