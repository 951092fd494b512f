//! 7-byte MIDI wire records.
//!
//! Layout of one record:
//!
//! ```text
//! byte 0..4 : onset time, u32 big-endian (sample index within the block)
//! byte 4    : high nibble = event type (0x9 Note-On, 0x8 Note-Off)
//!             low nibble  = channel (0-15)
//! byte 5    : note number
//! byte 6    : velocity
//! ```
//!
//! A block's event buffer is a flat run of such records in arrival order.
//! Decoding walks complete records only; a trailing partial record is exposed
//! through [`MidiEvents::remainder`] and never read.

/// Bytes per record.
pub const EVENT_LEN: usize = 7;

const NOTE_OFF: u8 = 0x8;
const NOTE_ON: u8 = 0x9;

/// Event type from the high nibble of byte 4.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MidiKind {
    NoteOn,
    NoteOff,
    /// Any other status nibble; carried through, never acted on.
    Other(u8),
}

impl MidiKind {
    #[inline]
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0f {
            NOTE_ON => Self::NoteOn,
            NOTE_OFF => Self::NoteOff,
            other => Self::Other(other),
        }
    }

    #[inline]
    pub fn nibble(self) -> u8 {
        match self {
            Self::NoteOn => NOTE_ON,
            Self::NoteOff => NOTE_OFF,
            Self::Other(n) => n & 0x0f,
        }
    }
}

/// One decoded record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MidiEvent {
    pub time: u32,
    pub kind: MidiKind,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl MidiEvent {
    #[inline]
    pub fn note_on(time: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self { time, kind: MidiKind::NoteOn, channel: channel & 0x0f, note, velocity }
    }

    #[inline]
    pub fn note_off(time: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self { time, kind: MidiKind::NoteOff, channel: channel & 0x0f, note, velocity }
    }

    /// Decode one record. Bytes past the seventh are ignored.
    ///
    /// Returns `None` if `bytes` is shorter than [`EVENT_LEN`].
    #[inline]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let rec = bytes.get(..EVENT_LEN)?;
        let status = rec[4];
        Some(Self {
            time: u32::from_be_bytes([rec[0], rec[1], rec[2], rec[3]]),
            kind: MidiKind::from_nibble(status >> 4),
            channel: status & 0x0f,
            note: rec[5],
            velocity: rec[6],
        })
    }

    #[inline]
    pub fn encode(&self) -> [u8; EVENT_LEN] {
        let t = self.time.to_be_bytes();
        [
            t[0],
            t[1],
            t[2],
            t[3],
            (self.kind.nibble() << 4) | (self.channel & 0x0f),
            self.note,
            self.velocity,
        ]
    }
}

// ---------------------------------- Iteration -------------------------------------

/// Iterator over the complete records of an event buffer.
#[derive(Clone, Debug)]
pub struct MidiEvents<'a> {
    chunks: core::slice::ChunksExact<'a, u8>,
}

impl<'a> MidiEvents<'a> {
    /// Bytes after the last complete record (empty for well-formed buffers).
    #[inline]
    pub fn remainder(&self) -> &'a [u8] {
        self.chunks.remainder()
    }
}

impl Iterator for MidiEvents<'_> {
    type Item = MidiEvent;

    #[inline]
    fn next(&mut self) -> Option<MidiEvent> {
        self.chunks.next().and_then(MidiEvent::decode)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for MidiEvents<'_> {}

/// Walk the complete records of `buf`.
#[inline]
pub fn events(buf: &[u8]) -> MidiEvents<'_> {
    MidiEvents { chunks: buf.chunks_exact(EVENT_LEN) }
}

// ------------------------------------ Tests --------------------------------------
