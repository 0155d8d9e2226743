//! The per-voice sample-playback renderer: pitch, force, filter, sample
//! and panning stages run in sequence for every rendered frame block.
//!
//! Grounded in the oscillator/filter/envelope triple a voice owns, with
//! the oscillator replaced by sample playback (`sample::SampleCursor`) and
//! the filter stage's coefficient jump smoothed by
//! `kunquat_core::svf::FilterCrossfade`.

use kunquat_core::{DepthUnit, Envelope, EnvelopeState, FilterCrossfade, Lfo, Slider, SvfOutput};

use crate::sample::{Sample, SampleCursor};

/// Max number of tones in an arpeggio cycle.
pub const MAX_ARPEGGIO_TONES: usize = 8;

/// A fixed-length cycle of pitch offsets (in cents) applied to a voice's
/// base pitch at a fixed beat length.
#[derive(Clone, Debug)]
pub struct Arpeggio {
    tones: Vec<f64>,
    frames_per_tone: u32,
    frame_counter: u32,
    index: usize,
}

impl Arpeggio {
    /// Creates an arpeggio cycling through `tones` (cents offsets),
    /// holding each for `frames_per_tone` frames.
    ///
    /// # Panics
    ///
    /// Panics if `tones` is empty or longer than [`MAX_ARPEGGIO_TONES`].
    pub fn new(tones: Vec<f64>, frames_per_tone: u32) -> Self {
        assert!(!tones.is_empty() && tones.len() <= MAX_ARPEGGIO_TONES);
        Self {
            tones,
            frames_per_tone: frames_per_tone.max(1),
            frame_counter: 0,
            index: 0,
        }
    }

    /// Advances one frame and returns the current cents offset.
    pub fn step(&mut self) -> f64 {
        let offset = self.tones[self.index];
        self.frame_counter += 1;
        if self.frame_counter >= self.frames_per_tone {
            self.frame_counter = 0;
            self.index = (self.index + 1) % self.tones.len();
        }
        offset
    }
}

/// Frames a linear release ramp takes once no release envelope is active.
pub const RELEASE_RAMP_FRAMES: u32 = 200;

/// A single rendering voice: the full pitch/force/filter/sample/pan chain.
pub struct Voice {
    sample_rate: f64,

    pub note_on: bool,
    pub sustain_pedal: f32,
    pub global_force: f32,

    pitch_slider: Slider,
    vibrato: Lfo,
    arpeggio: Option<Arpeggio>,
    center_pitch: f64,
    force_scale_exponent: f64,

    force_slider: Slider,
    tremolo: Lfo,
    force_envelope: Option<Envelope>,
    force_envelope_state: EnvelopeState,

    release_envelope: Option<Envelope>,
    release_envelope_state: EnvelopeState,
    release_age: f64,

    lowpass_slider: Slider,
    autowah: Lfo,
    filter_envelope: Option<Envelope>,
    filter_envelope_state: EnvelopeState,
    filter: FilterCrossfade,

    cursor: SampleCursor,
    release_ramp_frames_remaining: u32,

    pan_slider: Slider,
    pan_envelope: Option<Envelope>,
    pan_envelope_state: EnvelopeState,

    /// Frames elapsed since `note_on`; the x coordinate fed to the force
    /// and filter envelopes (pan shares it too, for a pitch->pan sweep
    /// that tracks note age the same way force does).
    age: f64,

    finished: bool,
}

impl Voice {
    /// Creates a silent, inactive voice at `sample_rate` Hz.
    pub fn new(sample_rate: f64) -> Self {
        let sr32 = sample_rate as f32;
        Self {
            sample_rate,
            note_on: false,
            sustain_pedal: 0.0,
            global_force: 1.0,
            pitch_slider: Slider::new(sr32),
            vibrato: Lfo::new(sr32, 5.0, DepthUnit::Cents),
            arpeggio: None,
            center_pitch: 440.0,
            force_scale_exponent: 0.0,
            force_slider: Slider::new(sr32),
            tremolo: Lfo::new(sr32, 5.0, DepthUnit::Decibels),
            force_envelope: None,
            force_envelope_state: EnvelopeState::new(),
            release_envelope: None,
            release_envelope_state: EnvelopeState::new(),
            release_age: 0.0,
            lowpass_slider: Slider::new(sr32),
            autowah: Lfo::new(sr32, 1.0, DepthUnit::Cents),
            filter_envelope: None,
            filter_envelope_state: EnvelopeState::new(),
            filter: FilterCrossfade::new(sr32),
            cursor: SampleCursor::new(),
            release_ramp_frames_remaining: 0,
            pan_slider: Slider::new(sr32),
            pan_envelope: None,
            pan_envelope_state: EnvelopeState::new(),
            age: 0.0,
            finished: false,
        }
    }

    /// Resets the voice to a fresh, non-finished, silent state, ready to be
    /// reclaimed by [`crate::pool::VoicePool::acquire`].
    pub fn reset(&mut self) {
        *self = Voice::new(self.sample_rate);
    }

    /// Triggers a new note at `base_pitch` Hz.
    pub fn note_on(&mut self, base_pitch: f64) {
        self.note_on = true;
        self.finished = false;
        self.cursor = SampleCursor::new();
        self.force_envelope_state = EnvelopeState::new();
        self.filter_envelope_state = EnvelopeState::new();
        self.pan_envelope_state = EnvelopeState::new();
        self.release_envelope_state = EnvelopeState::new();
        self.release_ramp_frames_remaining = 0;
        self.release_age = 0.0;
        self.age = 0.0;
        self.pitch_slider.set_immediate(base_pitch as f32);
    }

    /// Releases the note. If no release envelope is configured, starts the
    /// fixed-length linear release ramp immediately.
    pub fn note_off(&mut self) {
        self.note_on = false;
        self.release_age = 0.0;
        if self.release_envelope.is_none() {
            self.release_ramp_frames_remaining = RELEASE_RAMP_FRAMES;
        }
    }

    /// Whether the voice has finished and should be returned to the pool.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Renders `[start, stop)` frames into `out_left`/`out_right`,
    /// accumulating (summing) into whatever they already hold.
    pub fn render(
        &mut self,
        sample: &Sample,
        start: usize,
        stop: usize,
        out_left: &mut [f32],
        out_right: &mut [f32],
    ) {
        debug_assert_eq!(out_left.len(), out_right.len());
        let nframes = stop.saturating_sub(start).min(out_left.len());

        for i in 0..nframes {
            if self.finished {
                break;
            }

            let pitch = self.pitch_stage();
            let Some(force) = self.force_stage(pitch) else {
                self.finished = true;
                break;
            };
            let cutoff = self.filter_stage();
            let played = self.sample_stage(sample, pitch, force, cutoff);
            let (left, right) = self.pan_stage(played);

            out_left[i] += left;
            out_right[i] += right;

            self.age += 1.0;
        }
    }

    fn pitch_stage(&mut self) -> f64 {
        let slid = self.pitch_slider.step() as f64;
        let vibrato_factor = self.vibrato.step() as f64;
        let arp_cents = self.arpeggio.as_mut().map_or(0.0, Arpeggio::step);
        let arp_factor = libm::exp2(arp_cents / 1200.0);
        slid * vibrato_factor * arp_factor
    }

    /// Returns `None` once the voice should be marked finished: a force
    /// envelope that ends at a zero-y terminal node, or a release envelope
    /// (or, absent one, the linear release ramp) that completes.
    fn force_stage(&mut self, pitch: f64) -> Option<f32> {
        let slid = self.force_slider.step();
        let tremolo_factor = self.tremolo.step();
        let mut force = slid * self.global_force * tremolo_factor;

        if let Some(env) = &self.force_envelope {
            let pitch_ratio = (pitch / self.center_pitch).max(1e-9);
            let scale = libm::pow(pitch_ratio, self.force_scale_exponent);
            let env_value = self.force_envelope_state.step(env, self.age);
            force *= (env_value * scale) as f32;
            if self.force_envelope_state.is_finished() && env_value <= 0.0 {
                return None;
            }
        }

        if !self.note_on {
            let sustain = 1.0 - self.sustain_pedal.clamp(0.0, 1.0);
            if let Some(env) = &self.release_envelope {
                let release_value = self.release_envelope_state.step(env, self.release_age);
                self.release_age += 1.0;
                force *= (release_value as f32) * sustain + (1.0 - sustain);
                if self.release_envelope_state.is_finished() && release_value <= 0.0 {
                    return None;
                }
            } else {
                if self.release_ramp_frames_remaining == 0 {
                    return None;
                }
                let gain = self.release_ramp_frames_remaining as f32 / RELEASE_RAMP_FRAMES as f32;
                self.release_ramp_frames_remaining -= 1;
                force *= gain;
            }
        }

        Some(force)
    }

    fn filter_stage(&mut self) -> f32 {
        let lowpass = self.lowpass_slider.step();
        let autowah_factor = self.autowah.step();
        let mut cutoff = lowpass * autowah_factor;

        if let Some(env) = &self.filter_envelope {
            let env_value = self.filter_envelope_state.step(env, self.age);
            cutoff *= env_value as f32;
        }

        let nyquist = self.sample_rate as f32 * 0.49;
        let lo = 20.0_f32.min(nyquist);
        cutoff = cutoff.clamp(lo, nyquist);

        if self.filter.needs_crossfade(cutoff, 0.707) {
            self.filter
                .start_crossfade(cutoff, 0.707, SvfOutput::Lowpass);
        }
        cutoff
    }

    fn sample_stage(&mut self, sample: &Sample, pitch: f64, force: f32, _cutoff: f32) -> f32 {
        let step = pitch * sample.mid_freq / (sample.middle_tone * self.sample_rate);
        let raw = self.cursor.step(sample, step) * force;
        if self.cursor.is_finished() {
            self.finished = true;
        }
        self.filter.process(raw)
    }

    fn pan_stage(&mut self, input: f32) -> (f32, f32) {
        let base_pan = self.pan_slider.step();
        let mut pan = base_pan;
        if let Some(env) = &self.pan_envelope {
            let separation = 1.0 - base_pan.clamp(-1.0, 1.0).abs();
            pan += self.pan_envelope_state.step(env, self.age) as f32 * separation;
        }
        pan = pan.clamp(-1.0, 1.0);
        (input * (1.0 - pan), input * (1.0 + pan))
    }

    /// Sets this voice's force immediately, cancelling any force slide
    /// (the `v.v` voice-scope event).
    pub fn set_force_immediate(&mut self, value: f32) {
        self.force_slider.set_immediate(value);
    }

    /// Slides this voice's force to `value` over `frames` samples (the
    /// `v/v` voice-scope event).
    pub fn slide_force_to(&mut self, value: f32, frames: u32) {
        self.force_slider.slide_to(value, frames);
    }

    /// Sets the sustain pedal amount honoured during release (the `v.r`
    /// voice-scope event).
    pub fn set_sustain_pedal(&mut self, value: f32) {
        self.sustain_pedal = value.clamp(0.0, 1.0);
    }

    /// Sets this voice's lowpass cutoff immediately (the `v.f` voice-scope
    /// event).
    pub fn set_filter_cutoff_immediate(&mut self, value: f32) {
        self.lowpass_slider.set_immediate(value);
    }

    /// Sets the sample rate, propagating it to every slider/LFO/filter.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        let sr32 = sample_rate as f32;
        self.pitch_slider.set_sample_rate(sr32);
        self.force_slider.set_sample_rate(sr32);
        self.lowpass_slider.set_sample_rate(sr32);
        self.pan_slider.set_sample_rate(sr32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sample() -> Sample {
        let data: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        Sample::new(data, 44100.0, 440.0)
    }

    #[test]
    fn fresh_voice_renders_without_panic() {
        let mut voice = Voice::new(48000.0);
        voice.note_on(440.0);
        let sample = test_sample();
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        voice.render(&sample, 0, 64, &mut left, &mut right);
        assert!(left.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn render_at_eight_hertz_sample_rate_does_not_panic() {
        // Nyquist at 8 Hz is 3.92 Hz, below the usual 20 Hz cutoff floor;
        // the filter stage's clamp must not panic on `min > max`.
        let mut voice = Voice::new(8.0);
        voice.note_on(1.0);
        let sample = test_sample();
        let mut left = vec![0.0; 40];
        let mut right = vec![0.0; 40];
        voice.render(&sample, 0, 40, &mut left, &mut right);
        assert!(left.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn note_off_without_release_envelope_finishes_after_ramp() {
        let mut voice = Voice::new(48000.0);
        voice.note_on(440.0);
        voice.note_off();
        let sample = test_sample();
        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];
        voice.render(&sample, 0, 512, &mut left, &mut right);
        assert!(voice.is_finished());
    }

    #[test]
    fn arpeggio_cycles_through_tones() {
        let mut arp = Arpeggio::new(vec![0.0, 400.0, 700.0], 2);
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(arp.step());
        }
        assert_eq!(seen, vec![0.0, 0.0, 400.0, 400.0, 700.0, 700.0]);
    }

    #[test]
    fn pan_stage_balances_hard_left_and_right() {
        let mut voice = Voice::new(48000.0);
        voice.pan_slider.set_immediate(-1.0);
        let (l, r) = voice.pan_stage(1.0);
        assert!((l - 2.0).abs() < 1e-6);
        assert!(r.abs() < 1e-6);
    }

    #[test]
    fn pan_envelope_is_scaled_by_separation_from_base_pan() {
        use kunquat_core::EnvelopeNode;

        // A flat envelope always contributing +1.0: narrowed to the
        // `1 - |base_pan|` separation left at the base pan position.
        let flat_env = Envelope::new(vec![
            EnvelopeNode { x: 0.0, y: 1.0 },
            EnvelopeNode { x: 1.0, y: 1.0 },
        ]);

        let mut centered = Voice::new(48000.0);
        centered.pan_envelope = Some(flat_env.clone());
        let (l, _r) = centered.pan_stage(1.0);
        // base pan 0 => separation 1.0 => full envelope swing applied.
        assert!((l - 0.0).abs() < 1e-6, "left={l}");

        let mut half_panned = Voice::new(48000.0);
        half_panned.pan_slider.set_immediate(0.5);
        half_panned.pan_envelope = Some(flat_env);
        let (l, _r) = half_panned.pan_stage(1.0);
        // base pan 0.5 => separation 0.5 => envelope adds only 0.5,
        // landing at pan 1.0 (hard right): left = input * (1 - 1.0) = 0.
        assert!((l - 0.0).abs() < 1e-6, "left={l}");
    }
}
