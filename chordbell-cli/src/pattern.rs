//! Random note pattern that feeds the engine wire records block by block.

use chordbell_engine::{MidiEvent, MidiWriter};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// C minor pentatonic around middle C.
const SCALE: [u8; 10] = [48, 51, 53, 55, 58, 60, 63, 65, 67, 70];

/// One note per step. Each new note releases the previous one.
pub struct NotePattern {
    rng: StdRng,
    step: u64,
    // samples until the next step, relative to the current block start
    countdown: u64,
    held: Option<u8>,
    writer: MidiWriter,
}

impl NotePattern {
    pub fn new(seed: u64, bpm: f32, sample_rate: u32) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 90.0 };
        let step = ((f64::from(sample_rate) * 60.0 / f64::from(bpm)) as u64).max(1);
        Self { rng: StdRng::seed_from_u64(seed), step, countdown: 0, held: None, writer: MidiWriter::with_capacity(16) }
    }

    /// Samples between notes.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Records for the next `frames` samples, block-local times.
    pub fn next_block(&mut self, frames: usize) -> &[u8] {
        self.writer.clear();
        let frames = frames as u64;
        while self.countdown < frames {
            let t = self.countdown as u32;
            if let Some(prev) = self.held.take() {
                self.writer.push_event(&MidiEvent::note_off(t, 0, prev, 64));
            }
            let note = SCALE.choose(&mut self.rng).copied().unwrap_or(60);
            let velocity = self.rng.gen_range(60..=120);
            self.writer.push_event(&MidiEvent::note_on(t, 0, note, velocity));
            tracing::trace!(note, velocity, at = t, "pattern note");
            self.held = Some(note);
            self.countdown += self.step;
        }
        self.countdown -= frames;
        self.writer.as_bytes()
    }
}
