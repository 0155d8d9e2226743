//! Pattern playback: the per-slice loop that processes global events,
//! schedules channel voices, mixes and advances the transport.
//!
//! Grounded in `Pattern.c`'s `Pattern_mix` (§4.12): each call to
//! [`pattern_mix`] advances at most `nframes`, stopping early at a global
//! event, a pattern-delay expiry, or the pattern's end so the caller can
//! react (apply a jump, advance section).

use std::cmp::Ordering;

use kunquat_core::Tstamp;
use kunquat_event::Bind;
use kunquat_voice::{ProcessorId, Voice, VoicePool};

use crate::channel::Channel;
use crate::column::Column;
use crate::handler::{EventHandler, ParamSink};
use crate::master::{JumpTarget, MasterParams, PlaybackMode};

/// A fixed-length block: one global column plus one column per channel.
pub struct Pattern {
    pub length: Tstamp,
    pub global: Column,
    pub channels: Vec<Column>,
}

impl Pattern {
    pub fn new(length: Tstamp, channel_count: usize) -> Self {
        Self {
            length,
            global: Column::new(),
            channels: (0..channel_count).map(|_| Column::new()).collect(),
        }
    }
}

/// Everything a run of [`pattern_mix`] needs beyond the pattern data: live
/// channel state, the master transport, the voice pool and the bind map
/// an [`EventHandler`] dispatches cascades through.
pub struct PlayState<'a, const N: usize> {
    pub master: MasterParams,
    pub channels: Vec<Channel>,
    pub pool: VoicePool<N>,
    pub sample_rate: f64,
    bind: &'a Bind,
    sink: &'a mut dyn ParamSink,
}

impl<'a, const N: usize> PlayState<'a, N> {
    pub fn new(
        channel_count: u32,
        sample_rate: f64,
        tempo: f64,
        bind: &'a Bind,
        sink: &'a mut dyn ParamSink,
    ) -> Self {
        Self {
            master: MasterParams::new(tempo),
            channels: (0..channel_count)
                .map(|id| Channel::new(id, bind.create_cache()))
                .collect(),
            pool: VoicePool::new(sample_rate),
            sample_rate,
            bind,
            sink,
        }
    }

    /// Resumes a transport/channel/pool triple an embedder kept between
    /// `mix` calls (a fresh [`PlayState::new`] would reset note state on
    /// every call), borrowing this call's bind map and parameter sink.
    pub fn resume(
        master: MasterParams,
        channels: Vec<Channel>,
        pool: VoicePool<N>,
        sample_rate: f64,
        bind: &'a Bind,
        sink: &'a mut dyn ParamSink,
    ) -> Self {
        Self {
            master,
            channels,
            pool,
            sample_rate,
            bind,
            sink,
        }
    }

    /// Splits back into the owned transport/channel/pool triple, dropping
    /// the borrowed bind map and sink so the caller can keep them across
    /// the next `mix` call.
    pub fn into_parts(self) -> (MasterParams, Vec<Channel>, VoicePool<N>) {
        (self.master, self.channels, self.pool)
    }

    fn handler(&mut self) -> EventHandler<'_, N> {
        EventHandler::new(
            &mut self.channels,
            &mut self.master,
            &mut self.pool,
            self.bind,
            self.sink,
        )
    }
}

/// Resolves the sample a voice should be rendered against, keyed by the
/// voice's target processor (not its channel — several channels can share
/// one instrument, and a channel's instrument can change between notes).
/// An embedder supplies this; a fixed single-sample instrument is the
/// degenerate case most unit tests use.
pub trait SampleSource {
    fn sample_for(&self, processor: ProcessorId) -> &kunquat_voice::Sample;
}

/// Mixes up to `nframes` of `pattern` into `out_left`/`out_right`
/// (summed into whatever they already hold), advancing `state`'s
/// transport as it goes.
///
/// Returns the number of frames actually produced. This is less than
/// `nframes` exactly when the pattern ran out (the caller advances
/// section) or a jump fired (the caller re-enters at the new position).
pub fn pattern_mix<const N: usize>(
    pattern: &Pattern,
    nframes: usize,
    state: &mut PlayState<'_, N>,
    samples: &dyn SampleSource,
    out_left: &mut [f32],
    out_right: &mut [f32],
) -> usize {
    let mut produced = 0usize;

    while produced < nframes {
        if state.master.mode == PlaybackMode::Stop {
            break;
        }
        if state.master.position.row.compare(pattern.length) != Ordering::Less {
            break;
        }

        if state.master.delay_left.is_zero() {
            process_global_events(pattern, state);
        }

        if let Some(jump) = state.master.jump.take() {
            apply_jump(state, jump);
            break;
        }
        if state.master.position.row.compare(pattern.length) != Ordering::Less {
            break;
        }

        let slice_frames = compute_slice_frames(pattern, state, nframes - produced);
        if slice_frames == 0 {
            break;
        }

        schedule_channel_events(pattern, state, slice_frames);

        let out_l = &mut out_left[produced..produced + slice_frames];
        let out_r = &mut out_right[produced..produced + slice_frames];
        mix_voices(state, slice_frames, samples, out_l, out_r);
        apply_global_volume(state.master.global_volume, out_l, out_r);

        let slice_tstamp = Tstamp::from_frames(
            slice_frames as i64,
            state.master.tempo,
            state.sample_rate,
        );
        state.master.position.row = state.master.position.row + slice_tstamp;
        state.master.advance_slides(slice_tstamp);
        if !state.master.delay_left.is_zero() {
            state.master.delay_left = if state.master.delay_left.compare(slice_tstamp) == Ordering::Greater {
                state.master.delay_left - slice_tstamp
            } else {
                Tstamp::ZERO
            };
        }

        produced += slice_frames;
    }

    produced
}

/// Dispatches every global event at the current row through the event
/// handler, which mutates `state.master` (tempo/volume/jump/delay) as a
/// side effect of `trigger`.
fn process_global_events<const N: usize>(pattern: &Pattern, state: &mut PlayState<'_, N>) {
    let row = state.master.position.row;
    let iter = pattern.global.iter_from(row);
    let events: Vec<_> = iter
        .take_while(|(pos, _)| *pos == row)
        .map(|(_, ev)| (ev.name.clone(), ev.value.clone()))
        .collect();
    for (name, value) in events {
        let _ = state.handler().trigger(0, &name, value);
    }
}

fn apply_jump<const N: usize>(state: &mut PlayState<'_, N>, jump: JumpTarget) {
    if jump.subsong >= 0 {
        state.master.position.subsong = jump.subsong;
    }
    if jump.section >= 0 {
        state.master.position.section = jump.section;
    }
    state.master.position.row = jump.row;
}

/// The slice length (in frames) for the next mix step: the minimum of
/// frames remaining in this call, frames until the pattern ends, frames
/// until the next global event and frames until a pending delay expires.
fn compute_slice_frames<const N: usize>(
    pattern: &Pattern,
    state: &PlayState<'_, N>,
    frames_left_in_call: usize,
) -> usize {
    let tempo = state.master.tempo;
    let sr = state.sample_rate;
    let row = state.master.position.row;

    let mut horizon = frames_left_in_call as i64;

    let to_pattern_end = (pattern.length - row).to_frames_ceil(tempo, sr);
    horizon = horizon.min(to_pattern_end.max(0));

    if let Some(next) = pattern.global.next_pos_from(row) {
        if next.compare(row) == Ordering::Greater {
            horizon = horizon.min((next - row).to_frames_ceil(tempo, sr).max(0));
        }
    }

    if !state.master.delay_left.is_zero() {
        horizon = horizon.min(state.master.delay_left.to_frames_ceil(tempo, sr).max(0));
    }

    horizon.max(0) as usize
}

/// Replays every channel-column event in `[row, row + slice)` by
/// triggering it on its channel, matching §4.12 step 4's
/// `channel.set_voices(...)` contract at row granularity.
fn schedule_channel_events<const N: usize>(
    pattern: &Pattern,
    state: &mut PlayState<'_, N>,
    slice_frames: usize,
) {
    let start = state.master.position.row;
    let end = start
        + Tstamp::from_frames(slice_frames as i64, state.master.tempo, state.sample_rate);

    for (channel_index, column) in pattern.channels.iter().enumerate() {
        let events: Vec<_> = column
            .iter_from(start)
            .take_while(|(pos, _)| pos.compare(end) == Ordering::Less)
            .map(|(_, ev)| (ev.name.clone(), ev.value.clone()))
            .collect();
        for (name, value) in events {
            let _ = state.handler().trigger(channel_index, &name, value);
        }
    }
}

/// `VoicePool::mix` threads a single mono `out` buffer through its
/// `render_one` callback; voices render in stereo, so the callback here
/// writes into the captured `out_left`/`out_right` slices directly and
/// leaves the pool's own scratch buffer unused.
fn mix_voices<const N: usize>(
    state: &mut PlayState<'_, N>,
    slice_frames: usize,
    samples: &dyn SampleSource,
    out_left: &mut [f32],
    out_right: &mut [f32],
) {
    let tempo = state.master.tempo;
    let sample_rate = state.sample_rate;
    let mut scratch = vec![0.0_f32; slice_frames];
    state.pool.mix(
        slice_frames,
        0,
        sample_rate,
        tempo,
        &mut scratch,
        |voice: &mut Voice, nframes, offset, _sr, _tempo, _scratch, _channel, processor| {
            let sample = samples.sample_for(processor);
            voice.render(sample, offset, offset + nframes, out_left, out_right);
            voice.is_finished()
        },
    );
}

fn apply_global_volume(gain: f64, out_left: &mut [f32], out_right: &mut [f32]) {
    let gain = gain as f32;
    for s in out_left.iter_mut() {
        *s *= gain;
    }
    for s in out_right.iter_mut() {
        *s *= gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kunquat_event::Value;
    use kunquat_voice::{LoopMode, Sample};

    struct OneSample(Sample);

    impl SampleSource for OneSample {
        fn sample_for(&self, _processor: ProcessorId) -> &Sample {
            &self.0
        }
    }

    fn test_source() -> OneSample {
        let data: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut sample = Sample::new(data, 44100.0, 440.0);
        sample.loop_mode = LoopMode::None;
        OneSample(sample)
    }

    struct NoopSink;
    impl ParamSink for NoopSink {
        fn set_param(&mut self, _device: &str, _path: &str, _value: &Value) {}
    }

    #[test]
    fn pattern_mix_advances_position_by_slice_length() {
        let pattern = Pattern::new(Tstamp::new(4, 0), 1);
        let bind = Bind::new(Vec::new()).unwrap();
        let mut sink = NoopSink;
        let mut state: PlayState<'_, 8> = PlayState::new(1, 48000.0, 120.0, &bind, &mut sink);
        let source = test_source();
        let mut left = vec![0.0_f32; 256];
        let mut right = vec![0.0_f32; 256];

        let produced = pattern_mix(&pattern, 256, &mut state, &source, &mut left, &mut right);

        assert_eq!(produced, 256);
        assert!(state.master.position.row.compare(Tstamp::ZERO) == Ordering::Greater);
    }

    #[test]
    fn pattern_mix_stops_at_pattern_end() {
        let pattern = Pattern::new(Tstamp::new(0, 1), 1);
        let bind = Bind::new(Vec::new()).unwrap();
        let mut sink = NoopSink;
        let mut state: PlayState<'_, 8> = PlayState::new(1, 48000.0, 120.0, &bind, &mut sink);
        let source = test_source();
        let mut left = vec![0.0_f32; 4096];
        let mut right = vec![0.0_f32; 4096];

        let produced = pattern_mix(&pattern, 4096, &mut state, &source, &mut left, &mut right);

        assert!(produced < 4096);
    }

    #[test]
    fn note_on_event_in_channel_column_acquires_a_voice() {
        let mut pattern = Pattern::new(Tstamp::new(4, 0), 1);
        pattern.channels[0].insert(
            Tstamp::ZERO,
            crate::column::Event::new("n+", Value::Float(440.0)),
        );
        let bind = Bind::new(Vec::new()).unwrap();
        let mut sink = NoopSink;
        let mut state: PlayState<'_, 8> = PlayState::new(1, 48000.0, 120.0, &bind, &mut sink);
        let source = test_source();
        let mut left = vec![0.0_f32; 256];
        let mut right = vec![0.0_f32; 256];

        pattern_mix(&pattern, 256, &mut state, &source, &mut left, &mut right);

        assert!(state.channels[0].active_voice.is_some());
    }

    #[test]
    fn stop_mode_produces_nothing() {
        let pattern = Pattern::new(Tstamp::new(4, 0), 1);
        let bind = Bind::new(Vec::new()).unwrap();
        let mut sink = NoopSink;
        let mut state: PlayState<'_, 8> = PlayState::new(1, 48000.0, 120.0, &bind, &mut sink);
        state.master.stop();
        let source = test_source();
        let mut left = vec![0.0_f32; 256];
        let mut right = vec![0.0_f32; 256];

        let produced = pattern_mix(&pattern, 256, &mut state, &source, &mut left, &mut right);

        assert_eq!(produced, 0);
    }
}
