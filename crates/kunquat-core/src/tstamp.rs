//! Tempo-aware musical timestamps.
//!
//! A [`Tstamp`] is a rational musical-time value: a whole number of beats
//! plus a remainder over a fixed, highly composite denominator. Using an
//! exact remainder instead of a float keeps positions like a third of a
//! beat, a seventh of a beat, or a 32nd note exact across arbitrarily many
//! additions — the values a tracker actually schedules against.
//!
//! # Example
//!
//! ```rust
//! use kunquat_core::Tstamp;
//!
//! let a = Tstamp::new(1, Tstamp::BEAT / 3);
//! let b = Tstamp::new(0, Tstamp::BEAT / 3);
//! let sum = a + b;
//! assert_eq!(sum, Tstamp::new(1, 2 * (Tstamp::BEAT / 3)));
//! ```

use core::cmp::Ordering;
use core::ops::{Add, Sub};

/// `BEAT = 2^6 * 3^3 * 5^3 * 7 = 1_512_000`.
///
/// Divisible exactly by every integer from 1 to 10, by 12, 14, 15, 16, 20,
/// 21, 24, 25, 27, 32, 35 and more — the set of subdivisions tracker
/// patterns actually use (triplets, quintuplets, septuplets, dotted notes).
const BEAT_DENOMINATOR: i64 = 1_512_000;

/// An exact rational musical-time position: `beats + rem / BEAT`.
///
/// Ordered lexicographically by `(beats, rem)`. Closed under addition and
/// subtraction (subtraction borrows across the beat boundary rather than
/// producing a negative `rem`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tstamp {
    beats: i64,
    /// Always in `0..BEAT`.
    rem: i64,
}

impl Tstamp {
    /// The fixed sub-beat denominator. `rem` is always in `0..BEAT`.
    pub const BEAT: i64 = BEAT_DENOMINATOR;

    /// The zero timestamp.
    pub const ZERO: Tstamp = Tstamp { beats: 0, rem: 0 };

    /// Creates a timestamp from a beat count and a sub-beat remainder.
    ///
    /// `rem` may be outside `0..BEAT` (including negative); it is
    /// normalised into range, carrying into `beats`.
    pub fn new(beats: i64, rem: i64) -> Self {
        let mut t = Tstamp { beats, rem };
        t.normalize();
        t
    }

    fn normalize(&mut self) {
        if self.rem >= Self::BEAT {
            self.beats += self.rem / Self::BEAT;
            self.rem %= Self::BEAT;
        } else if self.rem < 0 {
            // div_euclid/rem_euclid give us a remainder in 0..BEAT even for
            // negative input, carrying the deficit into `beats`.
            let carry = self.rem.div_euclid(Self::BEAT);
            self.beats += carry;
            self.rem -= carry * Self::BEAT;
        }
    }

    /// The whole-beat component.
    pub fn beats(self) -> i64 {
        self.beats
    }

    /// The sub-beat remainder, always in `0..BEAT`.
    pub fn rem(self) -> i64 {
        self.rem
    }

    /// Returns this timestamp as a lossy `f64` beat count.
    pub fn as_f64_beats(self) -> f64 {
        self.beats as f64 + self.rem as f64 / Self::BEAT as f64
    }

    /// Converts a frame count into a musical-time length.
    ///
    /// Truncates toward zero — appropriate for advancing a playback
    /// position without overshooting it.
    pub fn from_frames(frames: i64, tempo: f64, sample_rate: f64) -> Tstamp {
        let beats_f = frames as f64 * tempo / (sample_rate * 60.0);
        Self::from_f64_beats_trunc(beats_f)
    }

    /// Converts a frame count into a musical-time length, rounding the
    /// fractional beat component up.
    ///
    /// Used for computing an upper bound on slice length so a render never
    /// produces fewer frames than the caller needs.
    pub fn from_frames_ceil(frames: i64, tempo: f64, sample_rate: f64) -> Tstamp {
        let beats_f = frames as f64 * tempo / (sample_rate * 60.0);
        let whole = beats_f.trunc() as i64;
        let frac = beats_f - whole as f64;
        let rem = (frac * Self::BEAT as f64).ceil() as i64;
        Tstamp::new(whole, rem)
    }

    fn from_f64_beats_trunc(beats_f: f64) -> Tstamp {
        let whole = beats_f.trunc() as i64;
        let frac = beats_f - whole as f64;
        let rem = (frac * Self::BEAT as f64).trunc() as i64;
        Tstamp::new(whole, rem)
    }

    /// Converts this musical-time position into an audio-frame count.
    ///
    /// Truncates toward zero, matching `from_frames`'s rounding so that
    /// round-tripping a position loses at most one frame (see
    /// `to_frames`/`from_frames` round-trip tests).
    pub fn to_frames(self, tempo: f64, sample_rate: f64) -> i64 {
        let frames_f = self.as_f64_beats() * sample_rate * 60.0 / tempo;
        frames_f.trunc() as i64
    }

    /// Converts this musical-time position into an audio-frame count,
    /// rounding up.
    ///
    /// Used when the caller needs an upper bound — e.g. sizing a buffer
    /// that must not be overrun.
    pub fn to_frames_ceil(self, tempo: f64, sample_rate: f64) -> i64 {
        let frames_f = self.as_f64_beats() * sample_rate * 60.0 / tempo;
        frames_f.ceil() as i64
    }

    /// Returns `self + other`.
    pub fn add(self, other: Tstamp) -> Tstamp {
        Tstamp::new(self.beats + other.beats, self.rem + other.rem)
    }

    /// Returns `self - other`.
    pub fn sub(self, other: Tstamp) -> Tstamp {
        Tstamp::new(self.beats - other.beats, self.rem - other.rem)
    }

    /// Returns `true` if this timestamp is exactly zero.
    pub fn is_zero(self) -> bool {
        self.beats == 0 && self.rem == 0
    }

    /// Compares two timestamps lexicographically by `(beats, rem)`.
    pub fn compare(self, other: Tstamp) -> Ordering {
        self.cmp(&other)
    }
}

impl Add for Tstamp {
    type Output = Tstamp;
    fn add(self, rhs: Tstamp) -> Tstamp {
        Tstamp::add(self, rhs)
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;
    fn sub(self, rhs: Tstamp) -> Tstamp {
        Tstamp::sub(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_carries_into_beats() {
        let a = Tstamp::new(0, Tstamp::BEAT - 1);
        let b = Tstamp::new(0, 2);
        assert_eq!(a + b, Tstamp::new(1, 1));
    }

    #[test]
    fn sub_borrows_across_beat() {
        let a = Tstamp::new(1, 0);
        let b = Tstamp::new(0, 1);
        assert_eq!(a - b, Tstamp::new(0, Tstamp::BEAT - 1));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = Tstamp::new(1, 0);
        let b = Tstamp::new(0, Tstamp::BEAT - 1);
        assert!(a > b);
    }

    #[test]
    fn frames_round_trip_loses_at_most_one_frame() {
        for &rate in &[8000.0_f64, 44100.0, 48000.0, 96000.0] {
            for &tempo in &[60.0_f64, 90.0, 120.0, 174.0] {
                for frames in [0_i64, 1, 7, 100, 4096, 44100] {
                    let t = Tstamp::from_frames(frames, tempo, rate);
                    let back = t.to_frames(tempo, rate);
                    assert!(
                        (frames - back).abs() <= 1,
                        "rate={rate} tempo={tempo} frames={frames} back={back}"
                    );
                }
            }
        }
    }

    #[test]
    fn cumulative_drift_bounded_by_one_frame() {
        let rate = 44100.0;
        let tempo = 128.3;
        let a = Tstamp::from_frames(17, tempo, rate);
        let b = Tstamp::from_frames(23, tempo, rate);
        let sum = a.to_frames(tempo, rate) + b.to_frames(tempo, rate);
        let combined = (a + b).to_frames(tempo, rate);
        assert!(sum <= combined + 1);
    }

    #[test]
    fn ceil_never_undershoots_floor() {
        let rate = 48000.0;
        let tempo = 120.0;
        let t = Tstamp::new(3, 12345);
        assert!(t.to_frames_ceil(tempo, rate) >= t.to_frames(tempo, rate));
    }

    #[test]
    fn zero_is_zero() {
        assert!(Tstamp::ZERO.is_zero());
        assert!(!Tstamp::new(0, 1).is_zero());
    }
}
