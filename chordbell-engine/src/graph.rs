//! Block-driven synthesis core.
//!
//! This module defines the [`Generator`] trait and a lightweight [`Engine<G>`]
//! wrapper that owns a generator, tracks sample rate and elapsed time, and
//! turns one host call into:
//!
//! 1. validation of the block configuration,
//! 2. MIDI decode into generator events,
//! 3. `frames` calls to [`Generator::next`] producing a **mono** sample each,
//! 4. fan-out of every mono sample into all channel regions.
//!
//! Design goals
//! - No heap work per block once the generator is built
//! - SR changes picked up lazily from each block
//! - Generic over the generator type, so voices can be swapped without trait objects

use chordbell_core::midi::{self, MidiEvent};

use crate::block::{Block, MidiOut};
use crate::error::EngineError;

/// Status returned for every successfully rendered block.
pub const STATUS_CONTINUE: i32 = 100;

/// Anything that turns MIDI events into one mono sample at a time.
pub trait Generator {
    /// Called when the sample rate reported by the host changes.
    fn set_sample_rate(&mut self, sr: f64);

    /// Drop all sounding state.
    fn reset(&mut self);

    /// Apply one decoded event. Called for every complete record, in arrival
    /// order, before the block renders.
    fn handle_event(&mut self, event: MidiEvent);

    /// Produce the mono sample for block-local `index`.
    fn next(&mut self, index: usize) -> f32;

    /// Called once after the last sample of a block.
    fn end_block(&mut self, _frames: usize) {}

    /// Chance to rewrite the block's outgoing MIDI. Leaves it untouched by default.
    fn route_midi(&mut self, _midi: &mut MidiOut<'_>) {}

    /// `true` while the generator holds no sounding state at all.
    fn is_idle(&self) -> bool;

    /// Host GUI hook. The engine never calls this on its own.
    fn gui(&mut self) {}
}

/// Coarse engine state, derived from the generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Sounding,
}

/// Realtime engine that owns a generator.
///
/// Lifecycle: [`Engine::new`] → repeated [`Engine::render`] → [`Engine::shutdown`].
/// [`Engine::reset`] returns to `Idle` at any point.
pub struct Engine<G: Generator> {
    sr: f64,
    time: u64,
    gen: G,
}

impl<G: Generator> Engine<G> {
    /// Construct with an already-configured generator. The sample rate is
    /// taken from the first block.
    pub fn new(gen: G) -> Self {
        tracing::info!("engine initialized");
        Self { sr: 0.0, time: 0, gen }
    }

    /// Render one block in place and return [`STATUS_CONTINUE`].
    ///
    /// Configuration errors leave the block untouched. A trailing partial MIDI
    /// record is skipped.
    pub fn render(&mut self, block: &mut Block<'_>) -> Result<i32, EngineError> {
        let channels = block.channels();
        if channels == 0 {
            tracing::error!("render called with zero channels");
            return Err(EngineError::ZeroChannels);
        }
        let sr = block.sample_rate();
        if !sr.is_finite() || sr <= 0.0 {
            tracing::error!(sample_rate = sr, "render called with invalid sample rate");
            return Err(EngineError::InvalidSampleRate(sr));
        }

        let sr = f64::from(sr);
        if sr != self.sr {
            tracing::debug!(from = self.sr, to = sr, "sample rate changed");
            self.sr = sr;
            self.gen.set_sample_rate(sr);
        }

        let events = midi::events(block.midi());
        let trailing = events.remainder().len();
        if trailing != 0 {
            tracing::warn!(trailing, "ignoring partial MIDI record");
        }
        for event in events {
            tracing::trace!(?event, "midi");
            self.gen.handle_event(event);
        }

        let frames = block.frames();
        for index in 0..frames {
            let s = self.gen.next(index);
            block.write_frame(frames, index, s);
        }
        self.gen.end_block(frames);
        self.gen.route_midi(block.midi_out_mut());

        self.time = self.time.saturating_add(frames as u64);
        Ok(STATUS_CONTINUE)
    }

    /// Back to `Idle`: voices cleared, clock rewound.
    pub fn reset(&mut self) {
        tracing::info!(elapsed = self.time, "engine reset");
        self.time = 0;
        self.gen.reset();
    }

    /// Stop the engine and hand back the generator.
    pub fn shutdown(self) -> G {
        tracing::info!(elapsed = self.time, "engine shut down");
        self.gen
    }

    /// Forward the host's GUI callback.
    #[inline]
    pub fn gui(&mut self) {
        self.gen.gui();
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        if self.gen.is_idle() { EngineState::Idle } else { EngineState::Sounding }
    }

    /// Last sample rate seen, 0 before the first block.
    #[inline] pub fn sample_rate(&self) -> f64 { self.sr }

    /// Samples per channel rendered since creation or the last reset.
    #[inline] pub fn time(&self) -> u64 { self.time }

    #[inline] pub fn generator(&self) -> &G { &self.gen }

    /// Mutable access for live tweaks between blocks.
    #[inline] pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits the block index as the sample and records what it saw.
    #[derive(Default)]
    struct Recorder {
        sr: f64,
        events: Vec<MidiEvent>,
        blocks: usize,
        resets: usize,
    }

    impl Generator for Recorder {
        fn set_sample_rate(&mut self, sr: f64) { self.sr = sr; }
        fn reset(&mut self) { self.resets += 1; self.events.clear(); }
        fn handle_event(&mut self, event: MidiEvent) { self.events.push(event); }
        fn next(&mut self, index: usize) -> f32 { index as f32 }
        fn end_block(&mut self, _frames: usize) { self.blocks += 1; }
        fn is_idle(&self) -> bool { self.events.is_empty() }
    }

    #[test]
    fn renders_index_into_every_channel() {
        let mut engine = Engine::new(Recorder::default());
        let mut buf = [9.0f32; 6];
        let mut block = Block::new(&mut buf, 2, 48_000.0, &[]);
        assert_eq!(engine.render(&mut block), Ok(STATUS_CONTINUE));
        assert_eq!(buf, [0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(engine.time(), 3);
        assert_eq!(engine.sample_rate(), 48_000.0);
        assert_eq!(engine.generator().sr, 48_000.0);
    }

    #[test]
    fn rejects_bad_configuration_without_touching_audio() {
        let mut engine = Engine::new(Recorder::default());
        let mut buf = [9.0f32; 4];
        for (channels, sr, expected) in [
            (0, 48_000.0, EngineError::ZeroChannels),
            (1, 0.0, EngineError::InvalidSampleRate(0.0)),
            (1, -44_100.0, EngineError::InvalidSampleRate(-44_100.0)),
        ] {
            let mut block = Block::new(&mut buf, channels, sr, &[]);
            assert_eq!(engine.render(&mut block), Err(expected));
        }
        let mut block = Block::new(&mut buf, 1, f32::NAN, &[]);
        assert!(matches!(engine.render(&mut block), Err(EngineError::InvalidSampleRate(_))));
        assert_eq!(buf, [9.0; 4]);
        assert_eq!(engine.generator().blocks, 0);
    }

    #[test]
    fn decodes_complete_records_only() {
        let mut midi = MidiEvent::note_on(0, 0, 60, 100).encode().to_vec();
        midi.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut engine = Engine::new(Recorder::default());
        let mut buf = [0.0f32; 4];
        let mut block = Block::new(&mut buf, 1, 48_000.0, &midi);
        assert!(engine.render(&mut block).is_ok());
        assert_eq!(engine.generator().events.len(), 1);
        assert_eq!(engine.generator().events[0].note, 60);
    }

    #[test]
    fn reset_rewinds_clock_and_idles() {
        let midi = MidiEvent::note_on(0, 0, 60, 100).encode();
        let mut engine = Engine::new(Recorder::default());
        let mut buf = [0.0f32; 4];
        let mut block = Block::new(&mut buf, 1, 48_000.0, &midi);
        engine.render(&mut block).unwrap();
        assert_eq!(engine.state(), EngineState::Sounding);
        engine.reset();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.time(), 0);
        assert_eq!(engine.shutdown().resets, 1);
    }

    #[test]
    fn empty_buffer_still_consumes_events() {
        let midi = MidiEvent::note_on(0, 0, 60, 100).encode();
        let mut engine = Engine::new(Recorder::default());
        let mut buf: [f32; 0] = [];
        let mut block = Block::new(&mut buf, 2, 48_000.0, &midi);
        assert_eq!(engine.render(&mut block), Ok(STATUS_CONTINUE));
        assert_eq!(engine.generator().events.len(), 1);
        assert_eq!(engine.time(), 0);
    }

    /// Answers every block with a single fixed record.
    struct Echo;

    const ANSWER: [u8; 7] = [0, 0, 0, 3, 0x91, 72, 90];

    impl Generator for Echo {
        fn set_sample_rate(&mut self, _sr: f64) {}
        fn reset(&mut self) {}
        fn handle_event(&mut self, _event: MidiEvent) {}
        fn next(&mut self, _index: usize) -> f32 { 0.0 }
        fn route_midi(&mut self, midi: &mut MidiOut<'_>) { midi.replace(ANSWER.to_vec()); }
        fn is_idle(&self) -> bool { true }
    }

    #[test]
    fn generator_can_replace_block_midi() {
        let input = MidiEvent::note_on(0, 0, 60, 100).encode();
        let mut engine = Engine::new(Echo);
        let mut buf = [0.0f32; 4];
        let mut block = Block::new(&mut buf, 2, 48_000.0, &input);
        assert_eq!(engine.render(&mut block), Ok(STATUS_CONTINUE));
        let out = block.into_midi();
        assert!(out.is_replaced());
        assert_eq!(out.bytes(), &ANSWER);
    }
}
