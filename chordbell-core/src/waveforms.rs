//! Waveform generators.
//!
//! Each generator maps a phase in **radians** to a value in **[-1, 1]**. They
//! are plain functions: no state, no allocation, safe to call from any thread.
//!
//! Shapes (period 2π):
//! - `sine`     : `sin(p)`
//! - `sawtooth` : rising ramp from -1, drops back at every multiple of 2π
//! - `triangle` : double-speed saw folded by an alternating sign
//! - `square`   : +1 on the first half-period, -1 on the second
//!
//! The functions are generic over [`num_traits::Float`] so hosts can drive
//! them in `f32` while the engine keeps its phase in `f64`.

use core::fmt;
use core::str::FromStr;

use num_traits::{Float, FloatConst};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[inline]
fn two_pi<T: Float + FloatConst>() -> T {
    T::PI() + T::PI()
}

/// `sin(p)`
#[inline]
pub fn sine<T: Float>(phase: T) -> T {
    phase.sin()
}

/// `2 * (x - floor(x)) - 1` with `x = p / 2π`.
#[inline]
pub fn sawtooth<T: Float + FloatConst>(phase: T) -> T {
    let x = phase / two_pi::<T>();
    let two = T::one() + T::one();
    two * (x - x.floor()) - T::one()
}

/// `sawtooth(2p)`, sign flipped on every odd period of `p`.
#[inline]
pub fn triangle<T: Float + FloatConst>(phase: T) -> T {
    let two = T::one() + T::one();
    let period = (phase / two_pi::<T>()).floor();
    let sign = if period % two == T::zero() { T::one() } else { -T::one() };
    sawtooth(two * phase) * sign
}

/// +1 while `p mod 2π < π`, else -1. Negative phases wrap the same way.
#[inline]
pub fn square<T: Float + FloatConst>(phase: T) -> T {
    let tau = two_pi::<T>();
    let mut r = phase % tau;
    if r < T::zero() {
        r = r + tau;
    }
    if r < T::PI() { T::one() } else { -T::one() }
}

// ------------------------------------ Selector ------------------------------------

/// Which generator an engine runs. Resolved once when the engine is built.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "sin"))]
    Sine,
    #[cfg_attr(feature = "serde", serde(alias = "saw"))]
    Sawtooth,
    #[cfg_attr(feature = "serde", serde(alias = "tri"))]
    Triangle,
    #[cfg_attr(feature = "serde", serde(alias = "sqr"))]
    Square,
}

impl Waveform {
    /// Every selectable shape, in display order.
    pub const ALL: [Waveform; 4] = [Self::Sine, Self::Sawtooth, Self::Triangle, Self::Square];

    /// Evaluate the selected shape at `phase` radians.
    #[inline]
    pub fn sample<T: Float + FloatConst>(self, phase: T) -> T {
        match self {
            Self::Sine => sine(phase),
            Self::Sawtooth => sawtooth(phase),
            Self::Triangle => triangle(phase),
            Self::Square => square(phase),
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Sawtooth => "sawtooth",
            Self::Triangle => "triangle",
            Self::Square => "square",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`Waveform::from_str`] for names it does not know.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownWaveform;

impl fmt::Display for UnknownWaveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown waveform (expected sine, sawtooth, triangle or square)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownWaveform {}

impl FromStr for Waveform {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is = |name: &str| s.eq_ignore_ascii_case(name);
        if is("sine") || is("sin") {
            Ok(Self::Sine)
        } else if is("sawtooth") || is("saw") {
            Ok(Self::Sawtooth)
        } else if is("triangle") || is("tri") {
            Ok(Self::Triangle)
        } else if is("square") || is("sqr") {
            Ok(Self::Square)
        } else {
            Err(UnknownWaveform)
        }
    }
}

// ------------------------------------ Tests --------------------------------------
