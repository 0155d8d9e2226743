//! A minimal fixture generator used to pin down the voice-pool's overlap
//! and summation semantics independently of sample playback and filtering.
//!
//! Grounded in the `Generator_debug` fixture driven by
//! `examples/original_source/src/core/test/voice_pool.c`'s `mix` test: a
//! note at a given frequency emits a periodic pulse train (1.0 once per
//! cycle, 0.5 for the rest of the cycle), runs for a fixed ten cycles if
//! never released, and on release echoes its next [`RELEASE_CLICK_FRAMES`]
//! would-be pulse-train values negated before falling silent. It bypasses
//! pitch/force/filter/pan staging entirely so the exact per-frame values a
//! release click and an overlap sum produce are reproducible bit-for-bit,
//! which the full [`crate::render::Voice`] pipeline cannot guarantee once
//! its filter stage is in the signal path.

/// Frames of negated pulse-train output a release emits before the
/// generator falls silent for good.
pub const RELEASE_CLICK_FRAMES: u32 = 2;

/// A fixed-frequency pulse-train test generator (see module docs).
#[derive(Debug, Clone)]
pub struct DebugGenerator {
    period: u32,
    duration: u32,
    age: u32,
    playing: bool,
    release_frames_remaining: u32,
    finished: bool,
}

impl DebugGenerator {
    /// Creates a generator at `freq` Hz for a render running at
    /// `sample_rate` Hz. The pulse period is `round(sample_rate / freq)`
    /// frames; left un-released, the note runs for ten such periods.
    pub fn new(sample_rate: f64, freq: f64) -> Self {
        let period = (sample_rate / freq).round().max(1.0) as u32;
        Self {
            period,
            duration: period * 10,
            age: 0,
            playing: false,
            release_frames_remaining: 0,
            finished: false,
        }
    }

    /// Triggers (or retriggers) the note, resetting its cycle phase.
    pub fn note_on(&mut self) {
        self.age = 0;
        self.playing = true;
        self.release_frames_remaining = 0;
        self.finished = false;
    }

    /// Releases the note. The next [`RELEASE_CLICK_FRAMES`] rendered
    /// frames echo the pulse train's would-be continuation negated, after
    /// which the generator is finished.
    pub fn note_off(&mut self) {
        self.playing = false;
        self.release_frames_remaining = RELEASE_CLICK_FRAMES;
    }

    /// Whether the generator has run out its release click (or its fixed
    /// duration) and will render nothing more.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Renders into `out_left`/`out_right`, accumulating (summing) into
    /// whatever they already hold. Stops early once finished.
    pub fn render(&mut self, out_left: &mut [f32], out_right: &mut [f32]) {
        debug_assert_eq!(out_left.len(), out_right.len());
        for i in 0..out_left.len() {
            if self.finished {
                break;
            }
            let value = self.step();
            out_left[i] += value;
            out_right[i] += value;
        }
    }

    fn pulse(&self) -> f32 {
        if self.age % self.period == 0 {
            1.0
        } else {
            0.5
        }
    }

    fn step(&mut self) -> f32 {
        if self.release_frames_remaining > 0 {
            let value = -self.pulse();
            self.age += 1;
            self.release_frames_remaining -= 1;
            if self.release_frames_remaining == 0 {
                self.finished = true;
            }
            return value;
        }
        if !self.playing || self.age >= self.duration {
            self.finished = true;
            return 0.0;
        }
        let value = self.pulse();
        self.age += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f64 = 8.0;

    /// Single note at 2 Hz, never released: pulses every 4th frame for
    /// ten cycles (40 frames), then silence.
    #[test]
    fn single_note_produces_pulse_train_then_fixed_duration_silence() {
        let mut gen = DebugGenerator::new(SAMPLE_RATE, 2.0);
        gen.note_on();
        let mut left = vec![0.0_f32; 128];
        let mut right = vec![0.0_f32; 128];
        gen.render(&mut left, &mut right);

        for (i, &v) in left.iter().enumerate().take(40) {
            let expected = if i % 4 == 0 { 1.0 } else { 0.5 };
            assert!((v - expected).abs() < 1e-6, "frame {i}: {v} != {expected}");
        }
        for &v in &left[40..128] {
            assert!(v.abs() < 1e-6);
        }
    }

    /// Note A at 1 Hz from frame 0, note B at 2 Hz from frame 2, neither
    /// released: overlap sums for 40 frames, then A alone for its
    /// remaining duration, then silence.
    #[test]
    fn two_overlapping_notes_sum_then_tail_off_in_order() {
        let mut a = DebugGenerator::new(SAMPLE_RATE, 1.0);
        let mut b = DebugGenerator::new(SAMPLE_RATE, 2.0);
        a.note_on();

        let mut left = vec![0.0_f32; 128];
        let mut right = vec![0.0_f32; 128];
        a.render(&mut left[0..2], &mut right[0..2]);
        b.note_on();
        a.render(&mut left[2..], &mut right[2..]);
        b.render(&mut left[2..], &mut right[2..]);

        assert!((left[0] - 1.0).abs() < 1e-6);
        assert!((left[1] - 0.5).abs() < 1e-6);

        for i in 2..42 {
            let expected = if i % 8 == 0 || i % 4 == 2 { 1.5 } else { 1.0 };
            assert!(
                (left[i] - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                left[i]
            );
        }
        for i in 42..80 {
            let expected = if i % 8 == 0 { 1.0 } else { 0.5 };
            assert!(
                (left[i] - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                left[i]
            );
        }
        for &v in &left[80..128] {
            assert!(v.abs() < 1e-6);
        }
    }

    /// Note A (1 Hz, never released), note B (2 Hz, released at frame
    /// 20) and note C (2 Hz, starting at frame 22, never released): B's
    /// two-frame release click lands at frames 20-21, C picks up the
    /// overlap with A from frame 22, and both tail off in turn.
    #[test]
    fn release_click_then_new_note_overlap() {
        let mut a = DebugGenerator::new(SAMPLE_RATE, 1.0);
        let mut b = DebugGenerator::new(SAMPLE_RATE, 2.0);
        let mut c = DebugGenerator::new(SAMPLE_RATE, 2.0);
        a.note_on();
        b.note_on();

        let mut left = vec![0.0_f32; 128];
        let mut right = vec![0.0_f32; 128];
        a.render(&mut left[0..20], &mut right[0..20]);
        b.render(&mut left[0..20], &mut right[0..20]);

        b.note_off();
        a.render(&mut left[20..22], &mut right[20..22]);
        b.render(&mut left[20..22], &mut right[20..22]);

        c.note_on();
        a.render(&mut left[22..], &mut right[22..]);
        b.render(&mut left[22..], &mut right[22..]);
        c.render(&mut left[22..], &mut right[22..]);

        for i in 0..20 {
            let expected = if i % 8 == 0 {
                2.0
            } else if i % 4 == 0 {
                1.5
            } else {
                1.0
            };
            assert!(
                (left[i] - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                left[i]
            );
        }
        assert!((left[20] - (-0.5)).abs() < 1e-6, "frame 20: {}", left[20]);
        assert!(left[21].abs() < 1e-6, "frame 21: {}", left[21]);

        for i in 22..62 {
            let expected = if i % 8 == 0 || i % 8 == 2 || i % 8 == 6 {
                1.5
            } else {
                1.0
            };
            assert!(
                (left[i] - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                left[i]
            );
        }
        for i in 62..80 {
            let expected = if i % 8 == 0 { 1.0 } else { 0.5 };
            assert!(
                (left[i] - expected).abs() < 1e-6,
                "frame {i}: {} != {expected}",
                left[i]
            );
        }
        for &v in &left[80..128] {
            assert!(v.abs() < 1e-6);
        }
        assert!(b.is_finished());
    }
}
