//! Per-call block context.
//!
//! A [`Block`] bundles what the host hands over for one processing call:
//!
//! - the sample buffer, **channel-major** (`[L, L, …, L, R, R, …, R]`); channel
//!   `c` owns `[c * frames, (c + 1) * frames)`
//! - the channel count
//! - the sample rate in Hz
//! - the MIDI event buffer, which doubles as the block's MIDI output
//!
//! Nothing here outlives the call.

use std::borrow::Cow;

/// The block's MIDI stream. Starts out as the incoming events and passes
/// through unchanged unless someone replaces it.
#[derive(Clone, Debug)]
pub struct MidiOut<'a> {
    bytes: Cow<'a, [u8]>,
    replaced: bool,
}

impl<'a> MidiOut<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Self { bytes: Cow::Borrowed(input), replaced: false }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reassign the outgoing stream for this block.
    pub fn replace(&mut self, bytes: impl Into<Cow<'a, [u8]>>) {
        self.bytes = bytes.into();
        self.replaced = true;
    }

    #[inline]
    pub fn is_replaced(&self) -> bool {
        self.replaced
    }

    #[inline]
    pub fn into_bytes(self) -> Cow<'a, [u8]> {
        self.bytes
    }
}

/// One processing call's worth of audio and MIDI.
#[derive(Debug)]
pub struct Block<'a> {
    audio: &'a mut [f32],
    channels: usize,
    sample_rate: f32,
    midi: MidiOut<'a>,
}

impl<'a> Block<'a> {
    pub fn new(audio: &'a mut [f32], channels: usize, sample_rate: f32, midi: &'a [u8]) -> Self {
        Self { audio, channels, sample_rate, midi: MidiOut::new(midi) }
    }

    #[inline] pub fn channels(&self) -> usize { self.channels }
    #[inline] pub fn sample_rate(&self) -> f32 { self.sample_rate }

    /// Samples per channel (`len / channels`). Zero when there are no channels.
    #[inline]
    pub fn frames(&self) -> usize {
        self.audio.len().checked_div(self.channels).unwrap_or(0)
    }

    #[inline] pub fn audio(&self) -> &[f32] { &*self.audio }
    #[inline] pub fn audio_mut(&mut self) -> &mut [f32] { &mut *self.audio }

    /// Region owned by channel `c`, or `None` past the last channel.
    pub fn channel(&self, c: usize) -> Option<&[f32]> {
        let frames = self.frames();
        if c >= self.channels {
            return None;
        }
        self.audio.get(c * frames..(c + 1) * frames)
    }

    /// Incoming (or, once replaced, outgoing) MIDI bytes.
    #[inline] pub fn midi(&self) -> &[u8] { self.midi.bytes() }
    #[inline] pub fn midi_out(&self) -> &MidiOut<'a> { &self.midi }
    #[inline] pub fn midi_out_mut(&mut self) -> &mut MidiOut<'a> { &mut self.midi }

    /// Finish the block and hand back its MIDI output.
    #[inline]
    pub fn into_midi(self) -> MidiOut<'a> {
        self.midi
    }

    /// Write `value` at `index` of every channel.
    #[inline]
    pub(crate) fn write_frame(&mut self, frames: usize, index: usize, value: f32) {
        for c in 0..self.channels {
            if let Some(s) = self.audio.get_mut(c * frames + index) {
                *s = value;
            }
        }
    }
}
