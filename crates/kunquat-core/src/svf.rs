//! State-variable filter used for the voice renderer's filter stage.
//!
//! A Chamberlin-topology SVF producing lowpass, highpass, bandpass and
//! notch outputs simultaneously. Stable across the cutoff sweeps
//! autowah/lowpass modulation drives it through, which is why a filter
//! stage crossfades between two filter instances on a coefficient jump
//! rather than mutating one filter's coefficients discontinuously (see
//! [`FilterCrossfade`]).

use core::f32::consts::PI;
use libm::tanf;

/// Subnormal floats slow feedback loops by up to two orders of magnitude
/// on common architectures; flush anything below this threshold to zero.
#[inline(always)]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

/// Which of the SVF's simultaneous outputs [`StateVariableFilter::process`]
/// returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfOutput {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// A state-variable (Chamberlin) filter.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    ic1eq: f32,
    ic2eq: f32,
    g: f32,
    k: f32,
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    output_type: SvfOutput,
}

impl StateVariableFilter {
    /// Creates a filter at `sample_rate` Hz with a default 1 kHz cutoff and
    /// Butterworth-ish resonance.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.707,
            output_type: SvfOutput::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Sets the cutoff frequency, clamped to `[20 Hz, 0.49 * sample_rate]`
    /// (below Nyquist, per the clamp the renderer's filter stage requires).
    /// At sample rates below ~40.8 Hz the Nyquist ceiling falls under
    /// 20 Hz, so the lower bound is itself clamped under the ceiling to
    /// keep `min <= max` for every supported sample rate.
    pub fn set_cutoff(&mut self, freq: f32) {
        let nyquist = self.sample_rate * 0.49;
        let lo = 20.0_f32.min(nyquist);
        self.cutoff = freq.clamp(lo, nyquist);
        self.update_coefficients();
    }

    /// The current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Sets resonance (Q), clamped to `[0.5, 20.0]`.
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 20.0);
        self.update_coefficients();
    }

    /// The current resonance (Q).
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Selects which output `process` returns.
    pub fn set_output_type(&mut self, output_type: SvfOutput) {
        self.output_type = output_type;
    }

    fn update_coefficients(&mut self) {
        self.g = tanf(PI * self.cutoff / self.sample_rate);
        self.k = 1.0 / self.resonance;
    }

    /// Processes one sample, returning `(lowpass, highpass, bandpass, notch)`.
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        let lp = v2;
        let bp = v1;
        let hp = input - self.k * v1 - v2;
        let notch = lp + hp;

        (lp, hp, bp, notch)
    }

    /// Processes one sample, returning the output selected by
    /// `set_output_type`.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let (lp, hp, bp, notch) = self.process_all(input);
        match self.output_type {
            SvfOutput::Lowpass => lp,
            SvfOutput::Highpass => hp,
            SvfOutput::Bandpass => bp,
            SvfOutput::Notch => notch,
        }
    }

    /// Resets filter state to silence, keeping coefficients.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Updates the sample rate and recomputes coefficients for the current
    /// cutoff/resonance.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }
}

/// How large a cutoff change must be before the filter stage swaps to a
/// freshly-coefficiented filter instead of mutating the live one: roughly
/// one 48th of an octave (`2^(1/48)`).
pub const CUTOFF_CHANGE_THRESHOLD_RATIO: f32 = 1.014_545_4;

/// Number of frames a [`FilterCrossfade`] takes to fully swap to the new
/// filter.
pub const CROSSFADE_FRAMES: u32 = 200;

/// Crossfades between an old and a new [`StateVariableFilter`] instance
/// over [`CROSSFADE_FRAMES`], avoiding the click a discontinuous
/// coefficient jump would produce.
///
/// A new crossfade is started whenever the target cutoff moves by more
/// than [`CUTOFF_CHANGE_THRESHOLD_RATIO`] or the resonance changes at all;
/// smaller cutoff nudges mutate the active filter's coefficients in place.
#[derive(Debug, Clone)]
pub struct FilterCrossfade {
    old: StateVariableFilter,
    new: StateVariableFilter,
    frames_remaining: u32,
}

impl FilterCrossfade {
    /// Creates a crossfade with both filters identical, no fade in
    /// progress.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            old: StateVariableFilter::new(sample_rate),
            new: StateVariableFilter::new(sample_rate),
            frames_remaining: 0,
        }
    }

    /// Whether the active filter's cutoff/resonance should move this
    /// request to a fresh crossfade rather than an in-place coefficient
    /// update.
    pub fn needs_crossfade(&self, new_cutoff: f32, new_resonance: f32) -> bool {
        let current = if self.frames_remaining > 0 {
            &self.new
        } else {
            &self.old
        };
        let ratio = (new_cutoff / current.cutoff()).max(current.cutoff() / new_cutoff);
        ratio > CUTOFF_CHANGE_THRESHOLD_RATIO || new_resonance != current.resonance()
    }

    /// Starts a crossfade to a filter with the given cutoff/resonance,
    /// seeded from the currently active filter's state so the swap is
    /// continuous.
    pub fn start_crossfade(&mut self, cutoff: f32, resonance: f32, output_type: SvfOutput) {
        let active = if self.frames_remaining > 0 {
            self.new.clone()
        } else {
            self.old.clone()
        };
        self.old = active;
        self.new = self.old.clone();
        self.new.set_cutoff(cutoff);
        self.new.set_resonance(resonance);
        self.new.set_output_type(output_type);
        self.frames_remaining = CROSSFADE_FRAMES;
    }

    /// Processes one sample through the crossfade, linearly blending old
    /// and new filter outputs while a fade is in progress.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.frames_remaining == 0 {
            return self.old.process(input);
        }
        let t = 1.0 - self.frames_remaining as f32 / CROSSFADE_FRAMES as f32;
        let old_out = self.old.process(input);
        let new_out = self.new.process(input);
        self.frames_remaining -= 1;
        if self.frames_remaining == 0 {
            self.old = self.new.clone();
        }
        old_out + (new_out - old_out) * t
    }

    /// Whether a crossfade is currently in progress.
    pub fn is_fading(&self) -> bool {
        self.frames_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1000.0);
        svf.set_output_type(SvfOutput::Lowpass);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = svf.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.05);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1000.0);
        svf.set_output_type(SvfOutput::Highpass);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = svf.process(1.0);
        }
        assert!(output.abs() < 0.1);
    }

    #[test]
    fn crossfade_completes_after_fixed_frame_count() {
        let mut fx = FilterCrossfade::new(48000.0);
        fx.start_crossfade(4000.0, 2.0, SvfOutput::Lowpass);
        for _ in 0..CROSSFADE_FRAMES {
            fx.process(0.0);
        }
        assert!(!fx.is_fading());
    }

    #[test]
    fn small_cutoff_nudge_does_not_need_crossfade() {
        let fx = FilterCrossfade::new(48000.0);
        assert!(!fx.needs_crossfade(1000.01, 0.707));
    }

    #[test]
    fn set_cutoff_does_not_panic_when_nyquist_is_below_twenty_hz() {
        // At an 8 Hz sample rate (the end-to-end scenario rate), Nyquist
        // is 3.92 Hz, below the usual 20 Hz floor; clamp must not panic.
        let mut svf = StateVariableFilter::new(8.0);
        svf.set_cutoff(1000.0);
        assert!(svf.cutoff() <= 8.0 * 0.49);
        assert!(svf.cutoff() > 0.0);
    }

    #[test]
    fn large_cutoff_jump_needs_crossfade() {
        let fx = FilterCrossfade::new(48000.0);
        assert!(fx.needs_crossfade(4000.0, 0.707));
    }
}
