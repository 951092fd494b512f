//! Synth configuration.
//!
//! Every field has a default that reproduces the reference voice: a sine
//! chord stamped at `[0, 4, 5, 9]` semitones, 200 ms decay time constant,
//! 0.001 audibility floor, 0.8 output headroom and no voice removal.
//!
//! ```toml
//! waveform = "triangle"
//! chord_offsets = [0, 7]
//! decay_rate = 3.0
//!
//! [removal]
//! on_note_off = true
//! ```

use std::path::Path;

use chordbell_core::envelopes::{DEFAULT_AUDIBILITY_FLOOR, DEFAULT_DECAY_RATE};
use chordbell_core::waveforms::Waveform;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Most offsets a single Note-On may stamp.
pub const MAX_CHORD_OFFSETS: usize = 16;

/// When voices leave the table. Both off keeps every voice forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalPolicy {
    /// Note-Off removes the struck note's whole stamp.
    pub on_note_off: bool,
    /// Voices are dropped once their level falls under the audibility floor.
    pub on_decayed: bool,
}

impl RemovalPolicy {
    /// Reference behavior: nothing is ever removed.
    pub const RETAIN: Self = Self { on_note_off: false, on_decayed: false };
    pub const ALL: Self = Self { on_note_off: true, on_decayed: true };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    pub waveform: Waveform,
    /// Semitone offsets stamped for every Note-On, relative to the struck key.
    pub chord_offsets: Vec<i16>,
    /// Envelope decay rate in 1/s.
    pub decay_rate: f64,
    /// Linear level below which a voice is inaudible.
    pub audibility_floor: f64,
    /// Scale applied to the summed voices.
    pub headroom: f64,
    pub removal: RemovalPolicy,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            chord_offsets: Self::DEFAULT_CHORD.to_vec(),
            decay_rate: DEFAULT_DECAY_RATE,
            audibility_floor: DEFAULT_AUDIBILITY_FLOOR,
            headroom: Self::DEFAULT_HEADROOM,
            removal: RemovalPolicy::RETAIN,
        }
    }
}

impl SynthConfig {
    /// Root, major third, fourth, major sixth.
    pub const DEFAULT_CHORD: [i16; 4] = [0, 4, 5, 9];
    pub const DEFAULT_HEADROOM: f64 = 0.8;

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_chord(mut self, offsets: impl Into<Vec<i16>>) -> Self {
        self.chord_offsets = offsets.into();
        self
    }

    pub fn with_removal(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub fn with_decay_rate(mut self, rate: f64) -> Self {
        self.decay_rate = rate;
        self
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), waveform = %config.waveform, "loaded synth config");
        Ok(config)
    }

    /// Parse and validate TOML text. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chord_offsets.is_empty() {
            return Err(ConfigError::invalid("chord_offsets", "at least one offset is required"));
        }
        if self.chord_offsets.len() > MAX_CHORD_OFFSETS {
            return Err(ConfigError::invalid(
                "chord_offsets",
                format!("at most {MAX_CHORD_OFFSETS} offsets, got {}", self.chord_offsets.len()),
            ));
        }
        if let Some(bad) = self.chord_offsets.iter().find(|o| !(-127..=127).contains(*o)) {
            return Err(ConfigError::invalid("chord_offsets", format!("offset {bad} outside -127..=127")));
        }
        if !self.decay_rate.is_finite() || self.decay_rate <= 0.0 {
            return Err(ConfigError::invalid(
                "decay_rate",
                format!("must be finite and positive, got {}", self.decay_rate),
            ));
        }
        if !(self.audibility_floor > 0.0 && self.audibility_floor < 1.0) {
            return Err(ConfigError::invalid(
                "audibility_floor",
                format!("must lie in (0, 1), got {}", self.audibility_floor),
            ));
        }
        if !self.headroom.is_finite() || self.headroom < 0.0 {
            return Err(ConfigError::invalid(
                "headroom",
                format!("must be finite and non-negative, got {}", self.headroom),
            ));
        }
        Ok(())
    }
}
