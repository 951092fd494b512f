//! Exponential decay envelope.
//!
//! Every voice follows the same fixed law:
//!
//! ```text
//! level(n) = (velocity / 127) * exp(-rate * n / sr)
//! ```
//!
//! where `n` is the number of samples rendered since onset. With the default
//! rate of 5 the level falls to `1/e` after 200 ms. Once the level drops under
//! `floor` the voice counts as inaudible.
//!
//! The level is a pure function of the counter; the envelope keeps no state.

use crate::dsp::{exp, floor, ln, velocity_to_gain};

/// Default decay rate (1/s); time constant `1/rate` = 200 ms.
pub const DEFAULT_DECAY_RATE: f64 = 5.0;

/// Default level under which a voice is treated as silent.
pub const DEFAULT_AUDIBILITY_FLOOR: f64 = 0.001;

/// Fixed-rate exponential decay with an audibility threshold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExpDecay {
    rate: f64,
    floor: f64,
}

impl Default for ExpDecay {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_RATE, DEFAULT_AUDIBILITY_FLOOR)
    }
}

impl ExpDecay {
    /// `rate` in 1/s, `floor` as a linear level. Callers validate the values;
    /// a non-positive rate simply never decays.
    #[inline]
    pub const fn new(rate: f64, floor: f64) -> Self {
        Self { rate, floor }
    }

    #[inline] pub fn rate(&self) -> f64 { self.rate }
    #[inline] pub fn floor(&self) -> f64 { self.floor }

    /// Seconds to fall to `1/e` of the onset level.
    #[inline]
    pub fn time_constant_secs(&self) -> f64 {
        1.0 / self.rate
    }

    /// Level after `elapsed` samples for a note struck at `velocity`.
    #[inline]
    pub fn level(&self, velocity: u8, elapsed: u64, sr: f64) -> f64 {
        velocity_to_gain(velocity) * exp(-self.rate * (elapsed as f64) / sr)
    }

    #[inline]
    pub fn is_audible(&self, level: f64) -> bool {
        level >= self.floor
    }

    /// First counter value at which a voice of `velocity` becomes inaudible,
    /// or `None` if it never reaches the floor (silent from the start counts
    /// as `Some(0)`).
    pub fn samples_until_silent(&self, velocity: u8, sr: f64) -> Option<u64> {
        let gain = velocity_to_gain(velocity);
        if gain < self.floor {
            return Some(0);
        }
        if self.rate <= 0.0 {
            return None;
        }
        // gain * exp(-rate * n / sr) < floor  <=>  n > ln(gain / floor) * sr / rate
        let n = ln(gain / self.floor) * sr / self.rate;
        Some(floor(n) as u64 + 1)
    }
}

// ------------------------------------ Tests --------------------------------------
