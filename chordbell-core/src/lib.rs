#![cfg_attr(not(feature = "std"), no_std)]
//! Chordbell Core: no_std-ready building blocks for the chordbell synth.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` as math backend
//! - `serde`    : derive `Serialize`/`Deserialize` for [`waveforms::Waveform`]
//!
//! Modules
//! - [`dsp`]       : math backend, pitch/velocity/phase helpers
//! - [`waveforms`] : sine, sawtooth, triangle, square + the `Waveform` selector
//! - [`envelopes`] : fixed-rate exponential decay
//! - [`midi`]      : 7-byte MIDI wire records
//!
//! Design
//! - No heap allocations; everything is a pure function or a `Copy` value
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod envelopes;
pub mod midi;
pub mod waveforms;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{note_to_freq, phase_at, velocity_to_gain, TAU};
    pub use crate::envelopes::ExpDecay;
    pub use crate::midi::{events, MidiEvent, MidiEvents, MidiKind, EVENT_LEN};
    pub use crate::waveforms::{sawtooth, sine, square, triangle, Waveform};
}
