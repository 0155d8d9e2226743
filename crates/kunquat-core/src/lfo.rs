//! Sinusoidal LFO with independently sliding speed/depth and a depth-delay
//! ramp, used for vibrato, tremolo and autowah modulation.
//!
//! Generalises a phase-accumulation oscillator by fixing the waveform to a
//! sine (the only shape the modulation stages in §4.3 need) and replacing
//! a plain `[-1, 1]` output with a multiplicative factor scaled either in
//! decibels or cents, so a caller can multiply it directly onto a pitch or
//! force value.

use libm::sinf;

use crate::slider::Slider;

/// The unit an [`Lfo`]'s depth is expressed in, controlling how `step()`
/// scales its sine output into a multiplicative factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthUnit {
    /// `exp2(sin(phase) * depth / 6)` — decibel-scaled, for force/filter
    /// modulation.
    Decibels,
    /// `exp2(sin(phase) * depth / 1200)` — cents-scaled, for pitch
    /// modulation (vibrato).
    Cents,
}

/// A sinusoidal low-frequency oscillator producing a multiplicative
/// modulation factor.
///
/// Speed and depth each slide independently via a [`Slider`]; depth
/// additionally ramps from 0 to its target over a configurable
/// depth-delay length before the depth slider takes over, so a vibrato
/// fades in rather than snapping to full swing.
#[derive(Clone, Debug)]
pub struct Lfo {
    phase: f32,
    sample_rate: f32,
    speed: Slider,
    depth: Slider,
    depth_delay: Slider,
    delay_active: bool,
    unit: DepthUnit,
}

impl Lfo {
    /// Creates an LFO at `sample_rate` Hz, starting at `speed_hz` with zero
    /// depth.
    pub fn new(sample_rate: f32, speed_hz: f32, unit: DepthUnit) -> Self {
        let mut speed = Slider::new(sample_rate);
        speed.set_immediate(speed_hz);
        Self {
            phase: 0.0,
            sample_rate,
            speed,
            depth: Slider::new(sample_rate),
            depth_delay: Slider::new(sample_rate),
            delay_active: false,
            unit,
        }
    }

    /// Slides the oscillator frequency to `speed_hz` over `frames`.
    pub fn slide_speed(&mut self, speed_hz: f32, frames: u32) {
        self.speed.slide_to(speed_hz, frames);
    }

    /// Slides the modulation depth to `target` over `frames`.
    ///
    /// `target` is in the unit selected at construction (dB or cents).
    pub fn slide_depth(&mut self, target: f32, frames: u32) {
        self.depth.slide_to(target, frames);
    }

    /// Starts a depth-delay ramp: depth rises from 0 to `target` linearly
    /// over `delay_frames`, after which `slide_depth` calls resume normal
    /// control.
    pub fn start_depth_delay(&mut self, target: f32, delay_frames: u32) {
        self.depth.set_immediate(0.0);
        self.depth_delay.set_immediate(0.0);
        self.depth_delay.slide_to(target, delay_frames);
        self.delay_active = true;
    }

    /// Resets phase to zero without touching speed/depth sliders.
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Current phase in radians, always in `[0, 2*PI)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advances the oscillator by one sample and returns the next
    /// multiplicative modulation factor.
    #[inline]
    pub fn step(&mut self) -> f32 {
        let speed_hz = self.speed.step();
        let depth = if self.delay_active {
            let d = self.depth_delay.step();
            if self.depth_delay.is_done() {
                self.delay_active = false;
                self.depth.set_immediate(d);
            }
            d
        } else {
            self.depth.step()
        };

        let raw = sinf(self.phase);
        let phase_inc = 2.0 * core::f32::consts::PI * speed_hz / self.sample_rate;
        self.phase += phase_inc;
        if self.phase >= 2.0 * core::f32::consts::PI {
            self.phase -= 2.0 * core::f32::consts::PI;
        } else if self.phase < 0.0 {
            self.phase += 2.0 * core::f32::consts::PI;
        }

        let exponent = match self.unit {
            DepthUnit::Decibels => raw * depth / 6.0,
            DepthUnit::Cents => raw * depth / 1200.0,
        };
        libm::exp2f(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_depth_is_unity() {
        let mut lfo = Lfo::new(48000.0, 5.0, DepthUnit::Cents);
        for _ in 0..100 {
            assert!((lfo.step() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn phase_wraps_within_2pi() {
        let mut lfo = Lfo::new(48000.0, 1000.0, DepthUnit::Cents);
        for _ in 0..10_000 {
            lfo.step();
            assert!(lfo.phase() >= 0.0 && lfo.phase() < 2.0 * core::f32::consts::PI);
        }
    }

    #[test]
    fn depth_delay_ramps_from_zero() {
        let mut lfo = Lfo::new(48000.0, 1.0, DepthUnit::Decibels);
        lfo.start_depth_delay(6.0, 480);
        // At the very first frame, depth should be essentially zero -> unity factor.
        let first = lfo.step();
        assert!((first - 1.0).abs() < 0.01);
    }

    #[test]
    fn decibel_depth_produces_larger_swing_than_cents() {
        let mut db_lfo = Lfo::new(48000.0, 5.0, DepthUnit::Decibels);
        db_lfo.slide_depth(6.0, 0);
        let mut cents_lfo = Lfo::new(48000.0, 5.0, DepthUnit::Cents);
        cents_lfo.slide_depth(6.0, 0);
        // advance to peak
        let mut db_peak = 0.0_f32;
        let mut cents_peak = 0.0_f32;
        for _ in 0..2000 {
            db_peak = db_peak.max(db_lfo.step());
            cents_peak = cents_peak.max(cents_lfo.step());
        }
        assert!(db_peak > cents_peak);
    }
}
