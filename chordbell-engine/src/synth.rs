//! Chord-stamping decaying synth.
//!
//! Every Note-On stamps one voice per configured chord offset (`note + offset`),
//! each restarting its own exponential decay. The mono output is the sum of all
//! audible voices, scaled by the configured headroom.
//!
//! Per sample, for each voice:
//! - not started yet (`onset > index`): skipped, counter untouched
//! - level under the audibility floor: marked `Decayed`, contributes nothing
//! - otherwise: `shape(2π f n / sr) * level`
//!
//! and the counter advances for every voice that was visited.

use chordbell_core::dsp::{note_to_freq, phase_at};
use chordbell_core::envelopes::ExpDecay;
use chordbell_core::midi::{MidiEvent, MidiKind};
use chordbell_core::waveforms::Waveform;

use crate::config::{RemovalPolicy, SynthConfig};
use crate::error::ConfigError;
use crate::graph::Generator;
use crate::voices::{Voice, VoiceTable};

/// `note + offset` as a table key, if it lands in `0..=255`.
#[inline]
fn companion(note: u8, offset: i16) -> Option<u8> {
    u8::try_from(i16::from(note).checked_add(offset)?).ok()
}

#[derive(Clone, Debug)]
pub struct ChordSynth {
    waveform: Waveform,
    offsets: Vec<i16>,
    env: ExpDecay,
    headroom: f64,
    removal: RemovalPolicy,
    sr: f64,
    voices: VoiceTable,
}

impl ChordSynth {
    /// Build from a validated copy of `config`. The sample rate arrives with
    /// the first block.
    pub fn new(config: &SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            waveform = %config.waveform,
            offsets = ?config.chord_offsets,
            decay_rate = config.decay_rate,
            "chord synth configured"
        );
        Ok(Self {
            waveform: config.waveform,
            offsets: config.chord_offsets.clone(),
            env: ExpDecay::new(config.decay_rate, config.audibility_floor),
            headroom: config.headroom,
            removal: config.removal,
            sr: 0.0,
            voices: VoiceTable::new(),
        })
    }

    #[inline] pub fn waveform(&self) -> Waveform { self.waveform }
    #[inline] pub fn chord_offsets(&self) -> &[i16] { &self.offsets }
    #[inline] pub fn envelope(&self) -> &ExpDecay { &self.env }
    #[inline] pub fn removal(&self) -> RemovalPolicy { self.removal }
    #[inline] pub fn voices(&self) -> &VoiceTable { &self.voices }

    /// Switch shapes on the fly; sounding voices keep their phase.
    #[inline]
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Keys stamped by a Note-On on `note`. Keys outside `0..=255` are dropped.
    pub fn stamp(&self, note: u8) -> impl Iterator<Item = u8> + '_ {
        self.offsets.iter().filter_map(move |&off| companion(note, off))
    }

    fn note_on(&mut self, ev: MidiEvent) {
        for &off in &self.offsets {
            match companion(ev.note, off) {
                Some(key) => {
                    self.voices.insert(Voice::new(key, ev.time, ev.velocity));
                }
                None => tracing::trace!(note = ev.note, offset = off, "companion key out of range"),
            }
        }
    }

    fn note_off(&mut self, ev: MidiEvent) {
        if !self.removal.on_note_off {
            return;
        }
        for &off in &self.offsets {
            let Some(key) = companion(ev.note, off) else {
                continue;
            };
            if let Some(voice) = self.voices.get_mut(key) {
                voice.schedule_release(ev.time);
            }
        }
    }
}

impl Generator for ChordSynth {
    fn set_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
    }

    fn reset(&mut self) {
        self.voices.clear();
    }

    fn handle_event(&mut self, event: MidiEvent) {
        match event.kind {
            MidiKind::NoteOn => self.note_on(event),
            MidiKind::NoteOff => self.note_off(event),
            MidiKind::Other(_) => {}
        }
    }

    fn next(&mut self, index: usize) -> f32 {
        let Self { waveform, env, headroom, removal, sr, voices, .. } = self;
        let (waveform, env, sr, drop_decayed) = (*waveform, *env, *sr, removal.on_decayed);
        debug_assert!(sr > 0.0, "next() called before set_sample_rate()");
        if !(sr > 0.0) {
            return 0.0;
        }
        let mut val = 0.0_f64;

        voices.retain_mut(|v| {
            if v.release().is_some_and(|r| r as usize <= index) {
                return false;
            }
            if v.onset() as usize > index {
                return true;
            }
            // the level depends on the current rate, so a decayed voice can come back
            let level = env.level(v.velocity(), v.elapsed(), sr);
            let keep = if env.is_audible(level) {
                v.mark_active();
                let phase = phase_at(v.elapsed(), note_to_freq(v.key()), sr);
                val += waveform.sample(phase) * level;
                true
            } else {
                v.mark_decayed();
                !drop_decayed
            };
            v.advance();
            keep
        });

        (val * *headroom) as f32
    }

    fn end_block(&mut self, frames: usize) {
        let frames = u32::try_from(frames).unwrap_or(u32::MAX);
        self.voices.for_each_mut(|v| v.carry(frames));
    }

    fn is_idle(&self) -> bool {
        self.voices.is_empty()
    }
}
