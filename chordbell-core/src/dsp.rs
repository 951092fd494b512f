//! Scalar math helpers shared by the generators and the envelope.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Side-effect free helpers that are easy to test
//!
//! Everything here works in `f64`. Voice phase is derived from a sample
//! counter that can run for minutes, so single precision would smear the
//! pitch of long-held notes.

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    if #[cfg(feature = "no-std")] {
        #[inline] fn m_exp(x: f64) -> f64 { libm::exp(x) }
        #[inline] fn m_exp2(x: f64) -> f64 { libm::exp2(x) }
        #[inline] fn m_ln(x: f64) -> f64 { libm::log(x) }
        #[inline] fn m_floor(x: f64) -> f64 { libm::floor(x) }
    } else {
        #[inline] fn m_exp(x: f64) -> f64 { x.exp() }
        #[inline] fn m_exp2(x: f64) -> f64 { x.exp2() }
        #[inline] fn m_ln(x: f64) -> f64 { x.ln() }
        #[inline] fn m_floor(x: f64) -> f64 { x.floor() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π
pub const TAU: f64 = core::f64::consts::TAU;

/// Reference pitch of A4 in Hz.
pub const A4_HZ: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_NOTE: f64 = 69.0;

/// Largest MIDI velocity; velocities are normalized against it.
pub const VELOCITY_MAX: f64 = 127.0;

// --------------------------------- Pitch / gain -----------------------------------

/// 12-TET pitch: `440 * 2^((note - 69) / 12)`.
///
/// Accepts the full `u8` range; keys above 127 give a very high but finite
/// frequency.
#[inline]
pub fn note_to_freq(note: u8) -> f64 {
    A4_HZ * m_exp2((f64::from(note) - A4_NOTE) / 12.0)
}

/// Linear gain for a velocity byte, `velocity / 127`.
#[inline]
pub fn velocity_to_gain(velocity: u8) -> f64 {
    f64::from(velocity) / VELOCITY_MAX
}

/// Phase in radians after `elapsed` samples of a tone at `freq_hz`.
#[inline]
pub fn phase_at(elapsed: u64, freq_hz: f64, sr: f64) -> f64 {
    TAU * freq_hz * (elapsed as f64) / sr
}

/// `exp(x)` through the selected backend.
#[inline]
pub fn exp(x: f64) -> f64 {
    m_exp(x)
}

#[inline]
pub fn ln(x: f64) -> f64 {
    m_ln(x)
}

#[inline]
pub fn floor(x: f64) -> f64 {
    m_floor(x)
}

// --------------------------------- Tests (std only) ------------------------------
