//! Chordbell Engine: block renderer + voice table + host glue.
//!
//! Crate layout:
//! - [`graph`]  : `Generator` trait and `Engine<G>` block driver
//! - [`block`]  : per-call audio/MIDI context
//! - [`voices`] : fixed-capacity voice table
//! - [`synth`]  : the chord-stamping decaying synth (`ChordSynth`)
//! - [`config`] : `SynthConfig`, TOML loading and validation
//! - [`error`]  : `EngineError`, `ConfigError`
//! - [`host`]   : planar buffer bridge and host note encoding
//!
//! The engine avoids heap allocations on the audio thread: the voice table is
//! allocated once when the synth is built.

pub mod block;
pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod synth;
pub mod voices;

pub use block::{Block, MidiOut};
pub use config::{RemovalPolicy, SynthConfig};
pub use error::{ConfigError, EngineError};
pub use graph::{Engine, EngineState, Generator, STATUS_CONTINUE};
pub use host::{HostNoteEvent, HostNoteKind, MidiWriter, PlanarBridge};
pub use synth::ChordSynth;
pub use voices::{Voice, VoiceState, VoiceTable};

pub use chordbell_core;
pub use chordbell_core::midi::MidiEvent;
pub use chordbell_core::waveforms::Waveform;

/// Engine running the default chord synth.
pub type ChordEngine = Engine<ChordSynth>;

impl Engine<ChordSynth> {
    /// `Engine::new(ChordSynth::new(config)?)`.
    pub fn with_config(config: &SynthConfig) -> Result<Self, ConfigError> {
        Ok(Engine::new(ChordSynth::new(config)?))
    }
}
