//! The fixed catalog of sounds: ambient textures and alarm tones.
//!
//! Definitions are immutable descriptors. Texture kinds are kept as raw tags so
//! a host can hand the engine a definition it built itself; tags the engine does
//! not know fall back to white noise at play time.

use std::borrow::Cow;
use std::fmt;

use crate::error::{EngineError, Result};

/// How a sound is synthesized.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    /// Noise-buffer texture selected by a kind tag (`ocean`, `rain`, ...).
    Texture {
        /// Synthesis algorithm tag.
        kind: Cow<'static, str>,
    },
    /// Single sine tone.
    Tone {
        /// Target frequency in Hz.
        frequency_hz: f32,
    },
}

/// Which picker a sound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCategory {
    Ambient,
    Alarm,
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundCategory::Ambient => f.pad("ambient"),
            SoundCategory::Alarm => f.pad("alarm"),
        }
    }
}

/// Identity, display label and synthesis parameters of one sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundDefinition {
    pub id: Cow<'static, str>,
    pub label: Cow<'static, str>,
    pub synthesis: Synthesis,
}

impl SoundDefinition {
    /// An ambient texture definition.
    pub fn texture(
        id: impl Into<Cow<'static, str>>,
        label: impl Into<Cow<'static, str>>,
        kind: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            synthesis: Synthesis::Texture { kind: kind.into() },
        }
    }

    /// An alarm tone definition.
    pub fn tone(
        id: impl Into<Cow<'static, str>>,
        label: impl Into<Cow<'static, str>>,
        frequency_hz: f32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            synthesis: Synthesis::Tone { frequency_hz },
        }
    }

    pub fn category(&self) -> SoundCategory {
        match self.synthesis {
            Synthesis::Texture { .. } => SoundCategory::Ambient,
            Synthesis::Tone { .. } => SoundCategory::Alarm,
        }
    }
}

const fn texture(id: &'static str, label: &'static str, kind: &'static str) -> SoundDefinition {
    SoundDefinition {
        id: Cow::Borrowed(id),
        label: Cow::Borrowed(label),
        synthesis: Synthesis::Texture { kind: Cow::Borrowed(kind) },
    }
}

const fn tone(id: &'static str, label: &'static str, frequency_hz: f32) -> SoundDefinition {
    SoundDefinition {
        id: Cow::Borrowed(id),
        label: Cow::Borrowed(label),
        synthesis: Synthesis::Tone { frequency_hz },
    }
}

/// Focus-mode backgrounds.
pub static AMBIENT_SOUNDS: [SoundDefinition; 5] = [
    texture("ocean", "Ocean Waves", "ocean"),
    texture("rain", "Rainfall", "rain"),
    texture("forest", "Forest", "forest"),
    texture("cafe", "Coffee Shop", "cafe"),
    texture("white-noise", "White Noise", "white-noise"),
];

/// Alarm tones, low to high.
pub static ALARM_TONES: [SoundDefinition; 5] = [
    tone("gentle", "Gentle", 440.0),
    tone("chime", "Chime", 523.25),
    tone("bright", "Bright", 659.25),
    tone("classic", "Classic", 880.0),
    tone("digital", "Digital", 1000.0),
];

/// Every built-in sound, ambient first.
pub fn all() -> impl Iterator<Item = &'static SoundDefinition> {
    AMBIENT_SOUNDS.iter().chain(ALARM_TONES.iter())
}

/// Look up a built-in sound by id.
pub fn find(id: &str) -> Option<&'static SoundDefinition> {
    all().find(|s| s.id == id)
}

/// Like [`find`], but an unknown id is an error.
pub fn lookup(id: &str) -> Result<&'static SoundDefinition> {
    find(id).ok_or_else(|| EngineError::UnknownSound(id.to_string()))
}
