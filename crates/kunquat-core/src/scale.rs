//! Note/octave/modifier to pitch mapping with retuning.
//!
//! Grounded in the note/octave/modifier rational-or-cents table design: a
//! [`Scale`] stores a reference pitch, an octave ratio and up to
//! [`Scale::MAX_NOTES`] notes / [`Scale::MAX_MODS`] modifiers, each
//! expressed as either an exact rational ratio or a cents offset.

use libm::exp2;

/// Maximum number of distinct notes a [`Scale`] can hold.
pub const MAX_NOTES: usize = 96;
/// Maximum number of distinct modifiers a [`Scale`] can hold.
pub const MAX_MODS: usize = 16;

/// A pitch ratio expressed either as an exact rational or as a cents
/// offset from unity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ratio {
    /// An exact `numerator / denominator` ratio.
    Rational { numerator: i64, denominator: i64 },
    /// A cents offset; `1200` cents is one octave.
    Cents(f64),
}

impl Ratio {
    /// Converts this ratio to a floating-point multiplicative factor.
    pub fn as_factor(self) -> f64 {
        match self {
            Ratio::Rational {
                numerator,
                denominator,
            } => numerator as f64 / denominator as f64,
            Ratio::Cents(cents) => exp2(cents / 1200.0),
        }
    }
}

/// A note/octave/modifier tuning table.
///
/// `pitch(note, modifier, octave)` = `reference_pitch * octave_factor(octave)
/// * note_ratio * modifier_ratio`.
#[derive(Clone, Debug)]
pub struct Scale {
    reference_pitch: f64,
    /// The ratio between adjacent octaves (2.0 for a standard equal-tempered
    /// octave, but retunable).
    octave_ratio: Ratio,
    /// Index of the octave containing the reference pitch.
    reference_octave: i32,
    notes: heapless_vec::FixedVec<Ratio, MAX_NOTES>,
    mods: heapless_vec::FixedVec<Ratio, MAX_MODS>,
}

/// A tiny fixed-capacity vector, avoiding a `no_std` allocation for
/// scale tables whose size is bounded by [`MAX_NOTES`]/[`MAX_MODS`].
mod heapless_vec {
    #[derive(Clone, Debug)]
    pub struct FixedVec<T, const N: usize> {
        items: [Option<T>; N],
        len: usize,
    }

    impl<T: Copy, const N: usize> FixedVec<T, N> {
        pub fn new() -> Self {
            Self {
                items: [None; N],
                len: 0,
            }
        }

        pub fn push(&mut self, value: T) -> Result<(), ()> {
            if self.len >= N {
                return Err(());
            }
            self.items[self.len] = Some(value);
            self.len += 1;
            Ok(())
        }

        pub fn get(&self, idx: usize) -> Option<T> {
            if idx < self.len {
                self.items[idx]
            } else {
                None
            }
        }

        pub fn set(&mut self, idx: usize, value: T) -> Result<(), ()> {
            if idx >= self.len {
                return Err(());
            }
            self.items[idx] = Some(value);
            Ok(())
        }

        pub fn len(&self) -> usize {
            self.len
        }
    }
}

/// Errors raised while building or retuning a [`Scale`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScaleError {
    /// The note table is already at [`MAX_NOTES`] capacity.
    #[error("scale already holds the maximum of {0} notes")]
    TooManyNotes(usize),
    /// The modifier table is already at [`MAX_MODS`] capacity.
    #[error("scale already holds the maximum of {0} modifiers")]
    TooManyMods(usize),
    /// `retune` or `pitch` was given a note index outside the populated
    /// range.
    #[error("note index {0} out of range")]
    InvalidNote(usize),
}

impl Scale {
    /// Creates an empty scale with the given reference pitch (Hz), octave
    /// ratio and the octave index that reference pitch belongs to.
    pub fn new(reference_pitch: f64, octave_ratio: Ratio, reference_octave: i32) -> Self {
        Self {
            reference_pitch,
            octave_ratio,
            reference_octave,
            notes: heapless_vec::FixedVec::new(),
            mods: heapless_vec::FixedVec::new(),
        }
    }

    /// Appends a note ratio to the table.
    pub fn add_note(&mut self, ratio: Ratio) -> Result<usize, ScaleError> {
        self.notes
            .push(ratio)
            .map_err(|()| ScaleError::TooManyNotes(MAX_NOTES))?;
        Ok(self.notes.len() - 1)
    }

    /// Appends a modifier ratio to the table.
    pub fn add_mod(&mut self, ratio: Ratio) -> Result<usize, ScaleError> {
        self.mods
            .push(ratio)
            .map_err(|()| ScaleError::TooManyMods(MAX_MODS))?;
        Ok(self.mods.len() - 1)
    }

    /// The multiplicative factor for octave `octave`, relative to
    /// `reference_octave`.
    pub fn octave_factor(&self, octave: i32) -> f64 {
        let steps = octave - self.reference_octave;
        self.octave_ratio.as_factor().powi(steps)
    }

    /// Computes `pitch(note, modifier, octave)` in Hz.
    ///
    /// `modifier` is `None` for an unmodified note.
    pub fn pitch(
        &self,
        note: usize,
        modifier: Option<usize>,
        octave: i32,
    ) -> Result<f64, ScaleError> {
        let note_ratio = self
            .notes
            .get(note)
            .ok_or(ScaleError::InvalidNote(note))?
            .as_factor();
        let mod_ratio = match modifier {
            Some(idx) => self
                .mods
                .get(idx)
                .ok_or(ScaleError::InvalidNote(idx))?
                .as_factor(),
            None => 1.0,
        };
        Ok(self.reference_pitch * self.octave_factor(octave) * note_ratio * mod_ratio)
    }

    /// Retunes the scale relative to a new reference note: every note and
    /// modifier ratio is rescaled so that `fixed_note` keeps its current
    /// pitch, while `new_reference_note`'s ratio becomes the new unity
    /// point.
    ///
    /// Returns the drift ratio: `new_reference_pitch / original_reference_pitch`,
    /// which accumulates across successive retunes and lets a caller bound
    /// cumulative pitch drift.
    pub fn retune(
        &mut self,
        new_reference_note: usize,
        fixed_note: usize,
    ) -> Result<f64, ScaleError> {
        let new_ref_ratio = self
            .notes
            .get(new_reference_note)
            .ok_or(ScaleError::InvalidNote(new_reference_note))?
            .as_factor();
        let fixed_ratio = self
            .notes
            .get(fixed_note)
            .ok_or(ScaleError::InvalidNote(fixed_note))?
            .as_factor();

        // The new reference pitch is the fixed note's absolute pitch,
        // recomputed so that fixed_note's ratio relative to the new
        // reference stays consistent.
        let old_reference_pitch = self.reference_pitch;
        let new_reference_pitch = old_reference_pitch * fixed_ratio / new_ref_ratio;

        for idx in 0..self.notes.len() {
            if let Some(ratio) = self.notes.get(idx) {
                let rescaled = ratio.as_factor() / new_ref_ratio;
                let _ = self.notes.set(idx, Ratio::Rational {
                    numerator: (rescaled * 1_000_000.0).round() as i64,
                    denominator: 1_000_000,
                });
            }
        }

        self.reference_pitch = new_reference_pitch;
        Ok(new_reference_pitch / old_reference_pitch)
    }

    /// The current reference pitch in Hz.
    pub fn reference_pitch(&self) -> f64 {
        self.reference_pitch
    }

    /// Finds the `(note, modifier, octave)` triple that reproduces `pitch`,
    /// searching octaves in `octave_range`. Returns the first exact match
    /// (within floating-point tolerance), preferring an unmodified note
    /// over a modified one at the same octave.
    pub fn locate(
        &self,
        pitch: f64,
        octave_range: core::ops::RangeInclusive<i32>,
    ) -> Option<(usize, Option<usize>, i32)> {
        let close_enough = |p: f64| (p - pitch).abs() <= p.abs() * 1e-6 + 1e-9;
        for octave in octave_range {
            for note in 0..self.notes.len() {
                if let Ok(p) = self.pitch(note, None, octave) {
                    if close_enough(p) {
                        return Some((note, None, octave));
                    }
                }
                for modifier in 0..self.mods.len() {
                    if let Ok(p) = self.pitch(note, Some(modifier), octave) {
                        if close_enough(p) {
                            return Some((note, Some(modifier), octave));
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal_tempered_12tet(reference_pitch: f64) -> Scale {
        let mut scale = Scale::new(reference_pitch, Ratio::Cents(1200.0), 4);
        for i in 0..12 {
            scale
                .add_note(Ratio::Cents(i as f64 * 100.0))
                .expect("within capacity");
        }
        scale
    }

    #[test]
    fn pitch_matches_reference_at_note_zero() {
        let scale = equal_tempered_12tet(440.0);
        let p = scale.pitch(0, None, 4).unwrap();
        assert!((p - 440.0).abs() < 1e-9);
    }

    #[test]
    fn octave_up_doubles_pitch() {
        let scale = equal_tempered_12tet(440.0);
        let p0 = scale.pitch(0, None, 4).unwrap();
        let p1 = scale.pitch(0, None, 5).unwrap();
        assert!((p1 / p0 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn semitone_matches_equal_temperament() {
        let scale = equal_tempered_12tet(440.0);
        let a = scale.pitch(0, None, 4).unwrap();
        let a_sharp = scale.pitch(1, None, 4).unwrap();
        let expected = a * 2f64.powf(1.0 / 12.0);
        assert!((a_sharp - expected).abs() < 1e-6);
    }

    #[test]
    fn invalid_note_index_errors() {
        let scale = equal_tempered_12tet(440.0);
        assert!(scale.pitch(99, None, 4).is_err());
    }

    #[test]
    fn retune_keeps_fixed_note_pitch_unchanged() {
        let mut scale = equal_tempered_12tet(440.0);
        let fixed_note = 0;
        let before = scale.pitch(fixed_note, None, 4).unwrap();
        scale.retune(3, fixed_note).unwrap();
        let after = scale.pitch(fixed_note, None, 4).unwrap();
        assert!((before - after).abs() < 1e-3);
    }

    #[test]
    fn pitch_note_octave_round_trip_matches_exactly() {
        let scale = equal_tempered_12tet(440.0);
        for octave in 2..=6 {
            for note in 0..12 {
                let pitch = scale.pitch(note, None, octave).unwrap();
                let (found_note, found_mod, found_octave) =
                    scale.locate(pitch, 2..=6).expect("declared tuning pitch must resolve");
                assert_eq!(found_note, note);
                assert_eq!(found_mod, None);
                assert_eq!(found_octave, octave);
            }
        }
    }
}
