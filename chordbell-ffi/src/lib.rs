//! C ABI wrapper for the chordbell engine.
//!
//! Exposes a small set of functions to create/destroy an engine, render one
//! channel-major f32 block with its MIDI records, and read the block's MIDI
//! output back.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `ChordbellEngine` (heap-allocated; you own/delete it).
//! - Render returns `100` on success, a negative code otherwise.
//! - MIDI records are 7 bytes: `[time u32 BE][type << 4 | channel][note][velocity]`.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from the same audio thread.

use std::ffi::{c_char, CStr};
use std::ptr;

use chordbell_engine::{Block, ChordEngine, SynthConfig, Waveform, STATUS_CONTINUE};

/// Block rendered.
pub const CHORDBELL_OK: i32 = STATUS_CONTINUE;
/// `channels == 0`.
pub const CHORDBELL_ERR_ZERO_CHANNELS: i32 = -1;
/// Sample rate zero, negative or not finite.
pub const CHORDBELL_ERR_SAMPLE_RATE: i32 = -2;
/// A required pointer was null.
pub const CHORDBELL_ERR_NULL: i32 = -3;
/// Argument out of range (e.g. unknown waveform index).
pub const CHORDBELL_ERR_ARGUMENT: i32 = -4;

/// Opaque engine wrapper we hand to C.
///
/// Besides the engine it keeps the last block's outgoing MIDI so the host can
/// read it after `chordbell_render` returns.
pub struct ChordbellEngine {
    inner: ChordEngine,
    midi_out: Vec<u8>,
}

impl ChordbellEngine {
    fn new(config: &SynthConfig) -> Option<Self> {
        match ChordEngine::with_config(config) {
            Ok(inner) => Some(Self { inner, midi_out: Vec::with_capacity(1024) }),
            Err(e) => {
                tracing::error!(error = %e, "rejected synth config");
                None
            }
        }
    }
}

fn into_handle(engine: Option<ChordbellEngine>) -> *mut ChordbellEngine {
    engine.map_or(ptr::null_mut(), |e| Box::into_raw(Box::new(e)))
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine with the default chord voice. The sample rate is taken
/// from every `chordbell_render` call.
#[no_mangle]
pub extern "C" fn chordbell_create() -> *mut ChordbellEngine {
    into_handle(ChordbellEngine::new(&SynthConfig::default()))
}

/// Create an engine from TOML configuration text. Returns null if the text
/// does not parse or fails validation.
///
/// # Safety
/// `toml` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn chordbell_create_from_toml(toml: *const c_char) -> *mut ChordbellEngine {
    if toml.is_null() {
        return ptr::null_mut();
    }
    let text = match unsafe { CStr::from_ptr(toml) }.to_str() {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "config text is not UTF-8");
            return ptr::null_mut();
        }
    };
    match SynthConfig::from_toml_str(text) {
        Ok(config) => into_handle(ChordbellEngine::new(&config)),
        Err(e) => {
            tracing::error!(error = %e, "invalid synth config");
            ptr::null_mut()
        }
    }
}

/// Destroy an engine previously returned by one of the create functions.
///
/// # Safety
/// `engine` must be null or a live handle; it is invalid afterwards.
#[no_mangle]
pub unsafe extern "C" fn chordbell_destroy(engine: *mut ChordbellEngine) {
    if !engine.is_null() {
        let e = unsafe { Box::from_raw(engine) };
        let _ = e.inner.shutdown();
    }
}

/// Drop all voices and rewind the engine clock.
///
/// # Safety
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn chordbell_reset(engine: *mut ChordbellEngine) {
    if let Some(e) = unsafe { engine.as_mut() } {
        e.inner.reset();
        e.midi_out.clear();
    }
}

// --- Rendering -------------------------------------------------------------------

/// Render one block in place.
///
/// `audio` holds `len` samples, channel-major: all of channel 0, then all of
/// channel 1, and so on. `midi` holds `midi_len` bytes of 7-byte records; a
/// trailing partial record is ignored. On error the buffer is left untouched.
///
/// # Safety
/// `engine` must be a live handle. `audio` must be valid for `len` writes
/// (may be null when `len == 0`), and `midi` valid for `midi_len` reads (may be
/// null when `midi_len == 0`). The two buffers must not overlap.
#[no_mangle]
pub unsafe extern "C" fn chordbell_render(
    engine: *mut ChordbellEngine,
    audio: *mut f32,
    len: usize,
    channels: u32,
    sample_rate: f32,
    midi: *const u8,
    midi_len: usize,
) -> i32 {
    let Some(e) = (unsafe { engine.as_mut() }) else {
        return CHORDBELL_ERR_NULL;
    };
    if (audio.is_null() && len != 0) || (midi.is_null() && midi_len != 0) {
        return CHORDBELL_ERR_NULL;
    }
    let audio: &mut [f32] = if len == 0 { &mut [] } else { unsafe { std::slice::from_raw_parts_mut(audio, len) } };
    let midi: &[u8] = if midi_len == 0 { &[] } else { unsafe { std::slice::from_raw_parts(midi, midi_len) } };

    let mut block = Block::new(audio, channels as usize, sample_rate, midi);
    match e.inner.render(&mut block) {
        Ok(status) => {
            e.midi_out.clear();
            e.midi_out.extend_from_slice(block.midi());
            status
        }
        Err(err) => err.status_code(),
    }
}

/// Outgoing MIDI of the last rendered block. Writes the byte count to
/// `out_len` and returns a pointer valid until the next call on this handle.
///
/// # Safety
/// `engine` must be a live handle; `out_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn chordbell_midi_out(engine: *const ChordbellEngine, out_len: *mut usize) -> *const u8 {
    let Some(e) = (unsafe { engine.as_ref() }) else {
        return ptr::null();
    };
    if let Some(len) = unsafe { out_len.as_mut() } {
        *len = e.midi_out.len();
    }
    e.midi_out.as_ptr()
}

// --- Parameters / hooks -----------------------------------------------------------

/// Select the waveform: 0 sine, 1 sawtooth, 2 triangle, 3 square.
///
/// # Safety
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn chordbell_set_waveform(engine: *mut ChordbellEngine, index: u32) -> i32 {
    let Some(e) = (unsafe { engine.as_mut() }) else {
        return CHORDBELL_ERR_NULL;
    };
    match Waveform::ALL.get(index as usize) {
        Some(&w) => {
            e.inner.generator_mut().set_waveform(w);
            CHORDBELL_OK
        }
        None => CHORDBELL_ERR_ARGUMENT,
    }
}

/// Number of voices currently held (active or decayed).
///
/// # Safety
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn chordbell_voice_count(engine: *const ChordbellEngine) -> u32 {
    unsafe { engine.as_ref() }.map_or(0, |e| e.inner.generator().voices().len() as u32)
}

/// GUI callback for hosts that expose one. Currently does nothing.
///
/// # Safety
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn chordbell_gui(engine: *mut ChordbellEngine) {
    if let Some(e) = unsafe { engine.as_mut() } {
        e.inner.gui();
    }
}
