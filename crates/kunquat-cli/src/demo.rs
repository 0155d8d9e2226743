//! Builds a tiny self-contained section sequence so `kunquat-player` has
//! something to mix without an on-disk song/pattern loader, which this
//! workspace doesn't implement.
//!
//! Grounded in `kunquat_player::pattern`'s own test fixture (`test_source`/
//! `OneSample`): a single decaying sine-ish sample played by one note-on
//! per section, no note-off.

use kunquat_core::Tstamp;
use kunquat_event::Value;
use kunquat_player::{Event, Pattern};
use kunquat_voice::{LoopMode, Sample};

/// A short single-cycle sample, looped, used as the demo instrument.
pub fn demo_sample() -> Sample {
    let data: Vec<f32> = (0..64)
        .map(|i| (i as f32 / 64.0 * std::f32::consts::TAU).sin())
        .collect();
    let mut sample = Sample::new(data, 440.0, 440.0);
    sample.set_loop(LoopMode::Unidirectional, 0, 63);
    sample
}

/// A four-beat section with a single note-on at its first row, on the
/// channel count given.
pub fn demo_section(channel_count: usize) -> Pattern {
    let mut pattern = Pattern::new(Tstamp::new(4, 0), channel_count);
    pattern.channels[0].insert(Tstamp::ZERO, Event::new("n+", Value::Float(440.0)));
    pattern
}

/// A two-section demo song, reused by `kunquat-player --demo`.
pub fn demo_sections(channel_count: usize) -> Vec<Pattern> {
    vec![demo_section(channel_count), demo_section(channel_count)]
}
