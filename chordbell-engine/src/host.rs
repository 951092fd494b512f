//! Host-side glue.
//!
//! Plugin hosts hand over audio as one slice per channel and notes as typed
//! events with a normalized velocity. This module turns both into what the
//! [`Engine`] consumes:
//!
//! - [`HostNoteEvent`] → 7-byte wire record (velocity `round(v * 127)`, clamped to `1..=127`)
//! - [`MidiWriter`]    : reusable buffer of encoded records
//! - [`PlanarBridge`]  : `[[L…], [R…]]` → `[L…, R…]` → engine → back, plus the
//!   block's outgoing MIDI
//!
//! Buffers are sized up front; a well-behaved host never makes the bridge allocate.

use chordbell_core::midi::{MidiEvent, EVENT_LEN};

use crate::error::EngineError;
use crate::graph::{Engine, Generator};
use crate::Block;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostNoteKind {
    NoteOn,
    NoteOff,
}

/// A note event as hosts usually report it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HostNoteEvent {
    /// Sample offset inside the block.
    pub timing: u32,
    pub channel: u8,
    pub note: u8,
    /// Normalized `0.0..=1.0`.
    pub velocity: f32,
    pub kind: HostNoteKind,
}

impl HostNoteEvent {
    pub fn note_on(timing: u32, channel: u8, note: u8, velocity: f32) -> Self {
        Self { timing, channel, note, velocity, kind: HostNoteKind::NoteOn }
    }

    pub fn note_off(timing: u32, channel: u8, note: u8, velocity: f32) -> Self {
        Self { timing, channel, note, velocity, kind: HostNoteKind::NoteOff }
    }

    pub fn to_midi(&self) -> MidiEvent {
        let velocity = encode_velocity(self.velocity);
        match self.kind {
            HostNoteKind::NoteOn => MidiEvent::note_on(self.timing, self.channel, self.note, velocity),
            HostNoteKind::NoteOff => MidiEvent::note_off(self.timing, self.channel, self.note, velocity),
        }
    }
}

/// Normalized velocity → MIDI byte. Never yields 0, so a Note-On stays a Note-On.
#[inline]
pub fn encode_velocity(v: f32) -> u8 {
    if v.is_nan() {
        return 1;
    }
    (v * 127.0).round().clamp(1.0, 127.0) as u8
}

// -------------------------------- Event writer ------------------------------------

/// Growable byte buffer of wire records, cleared and refilled every block.
#[derive(Clone, Debug, Default)]
pub struct MidiWriter {
    buf: Vec<u8>,
}

impl MidiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for `events` records before the first reallocation.
    pub fn with_capacity(events: usize) -> Self {
        Self { buf: Vec::with_capacity(events * EVENT_LEN) }
    }

    #[inline]
    pub fn push(&mut self, event: &HostNoteEvent) {
        self.push_event(&event.to_midi());
    }

    #[inline]
    pub fn push_event(&mut self, event: &MidiEvent) {
        self.buf.extend_from_slice(&event.encode());
    }

    pub fn extend<'e>(&mut self, events: impl IntoIterator<Item = &'e HostNoteEvent>) {
        for e in events {
            self.push(e);
        }
    }

    #[inline] pub fn clear(&mut self) { self.buf.clear(); }
    #[inline] pub fn as_bytes(&self) -> &[u8] { &self.buf }
    /// Number of records written.
    #[inline] pub fn len(&self) -> usize { self.buf.len() / EVENT_LEN }
    #[inline] pub fn is_empty(&self) -> bool { self.buf.is_empty() }
}

// -------------------------------- Planar bridge -----------------------------------

/// Drives an [`Engine`] from planar host buffers.
pub struct PlanarBridge<G: Generator> {
    engine: Engine<G>,
    scratch: Vec<f32>,
    writer: MidiWriter,
    midi_out: Vec<u8>,
}

impl<G: Generator> PlanarBridge<G> {
    /// Scratch space covers `max_channels * max_frames` samples.
    pub fn new(engine: Engine<G>, max_channels: usize, max_frames: usize) -> Self {
        let samples = max_channels.saturating_mul(max_frames);
        tracing::debug!(max_channels, max_frames, "planar bridge allocated");
        Self {
            engine,
            scratch: vec![0.0; samples],
            writer: MidiWriter::with_capacity(256),
            midi_out: Vec::with_capacity(256 * EVENT_LEN),
        }
    }

    /// Run one block. `planes` is rewritten in place; the block's outgoing MIDI
    /// is available from [`PlanarBridge::midi_out`] afterwards.
    pub fn process(
        &mut self,
        planes: &mut [&mut [f32]],
        sample_rate: f32,
        events: &[HostNoteEvent],
    ) -> Result<i32, EngineError> {
        let total: usize = planes.iter().map(|p| p.len()).sum();
        if total > self.scratch.len() {
            tracing::warn!(needed = total, have = self.scratch.len(), "block larger than planned, growing scratch");
            self.scratch.resize(total, 0.0);
        }

        let mut offset = 0;
        for plane in planes.iter() {
            self.scratch[offset..offset + plane.len()].copy_from_slice(plane);
            offset += plane.len();
        }

        self.writer.clear();
        self.writer.extend(events);

        let mut block = Block::new(&mut self.scratch[..total], planes.len(), sample_rate, self.writer.as_bytes());
        let status = self.engine.render(&mut block)?;
        self.midi_out.clear();
        self.midi_out.extend_from_slice(block.midi());

        let mut offset = 0;
        for plane in planes.iter_mut() {
            let len = plane.len();
            plane.copy_from_slice(&self.scratch[offset..offset + len]);
            offset += len;
        }
        Ok(status)
    }

    /// Outgoing MIDI of the last processed block.
    #[inline] pub fn midi_out(&self) -> &[u8] { &self.midi_out }
    #[inline] pub fn engine(&self) -> &Engine<G> { &self.engine }
    #[inline] pub fn engine_mut(&mut self) -> &mut Engine<G> { &mut self.engine }

    pub fn into_engine(self) -> Engine<G> {
        self.engine
    }
}
