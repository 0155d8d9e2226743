//! The `kunquat-player` binary's embeddable runtime facade: a safe
//! `Engine` handle exposing a `new_handle`/`mix`/`get_buffer` style API to
//! embedders, wiring `kunquat-player`'s pattern mixer through a
//! `kunquat-graph` device graph to a `kunquat-voice` sample source and a
//! `kunquat-config` project.
//!
//! Resolving a loaded project's `p_connections.json` into the full
//! multi-device topology it describes requires an on-disk path-to-port
//! validator this workspace doesn't implement; `Engine` instead builds a
//! fixed, minimal graph of its own — one source device carrying the
//! pattern mixer's rendered block, feeding directly into a stereo master
//! — and runs every block through it via
//! [`kunquat_graph::ProcessingGraph::compile`]/`run_schedule`, the same
//! two-phase contract a fully resolved project graph would use.

pub mod demo;
pub mod error;

use std::any::Any;

use kunquat_core::{BufferPool, Tstamp, WorkBuffer};
use kunquat_event::Bind;
use kunquat_graph::{CompiledSchedule, DeviceBehavior, DeviceId, DeviceStates, PortAddr, ProcessingGraph};
use kunquat_player::{pattern_mix, Channel, MasterParams, PlaybackMode, Pattern, PlayState, SampleSource};
use kunquat_voice::{ProcessorId, Sample, VoicePool};

pub use error::EngineError;

/// The voice-pool capacity every `kunquat-player` handle is built with,
/// a small fixed array rather than a runtime-configurable size.
pub const VOICE_POOL_SIZE: usize = 256;

/// Wraps a single [`kunquat_voice::Sample`] so every channel renders
/// against the same debug instrument, a "debug generator" fixture for
/// end-to-end scenarios.
struct SingleSample(Sample);

impl SampleSource for SingleSample {
    fn sample_for(&self, _processor: ProcessorId) -> &Sample {
        &self.0
    }
}

/// A leaf graph device with no recv ports that carries one pre-rendered
/// stereo block into the device graph: `Engine` hands it each round's
/// pattern-mixed audio via [`Self::set_block`] before
/// `ProcessingGraph::run_schedule`, so the final mix still passes through
/// the graph's buffer accumulation and `DeviceBehavior::process_signal`
/// dispatch rather than being copied to the output directly.
struct InstrumentSource {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl InstrumentSource {
    fn new() -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    fn set_block(&mut self, left: &[f32], right: &[f32]) {
        self.left.clear();
        self.left.extend_from_slice(left);
        self.right.clear();
        self.right.extend_from_slice(right);
    }
}

impl DeviceBehavior for InstrumentSource {
    fn process_signal(
        &mut self,
        start: usize,
        stop: usize,
        _inputs: &[WorkBuffer],
        outputs: &mut [WorkBuffer],
        _sample_rate: f64,
        _tempo: f64,
    ) {
        let len = stop - start;
        outputs[0].samples_mut()[..len].copy_from_slice(&self.left[..len]);
        outputs[0].mark_non_constant();
        outputs[0].mark_valid();
        outputs[1].samples_mut()[..len].copy_from_slice(&self.right[..len]);
        outputs[1].mark_non_constant();
        outputs[1].mark_valid();
    }

    fn recv_port_count(&self) -> usize {
        0
    }

    fn send_port_count(&self) -> usize {
        2
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A safe embedding of the runtime's abstract handle API: `new_handle`,
/// `set_position`, `get_duration`, `mix`, `get_buffer`, `get_clipped`,
/// `get_min_amplitude`/`get_max_amplitude` and `del_handle` (the last is
/// just `Drop`, since there is no out-of-process handle to release).
pub struct Engine {
    sample_rate: f64,
    master: MasterParams,
    channels: Vec<Channel>,
    pool: VoicePool<VOICE_POOL_SIZE>,
    bind: Bind,
    sink: kunquat_player::NullSink,
    sample: SingleSample,
    /// One pattern per section, indexed by `master.position.section`.
    /// Song-sequencing data (which subsong plays which sections) is part
    /// of the on-disk loader this workspace doesn't implement; an embedder
    /// supplies the flattened section list directly.
    sections: Vec<Pattern>,
    left: Vec<f32>,
    right: Vec<f32>,
    clipped: [bool; 2],
    min_amplitude: [f32; 2],
    max_amplitude: [f32; 2],
    /// The device graph every mixed block is routed through before
    /// reaching `get_buffer`: one `InstrumentSource` feeding a stereo
    /// master.
    graph: ProcessingGraph,
    schedule: kunquat_graph::CompiledSchedule,
    states: DeviceStates,
    buf_pool: BufferPool,
    instrument: DeviceId,
}

impl Engine {
    /// Opens a new handle: loads `bind` and seeds a `channel_count`-channel
    /// transport at `tempo`/`sample_rate`, ready to mix `sections` once set
    /// with [`Engine::set_sections`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Argument`] if `channel_count` is zero.
    pub fn new(
        channel_count: u32,
        sample_rate: f64,
        tempo: f64,
        bind: Bind,
        sample: Sample,
    ) -> Result<Self, EngineError> {
        if channel_count == 0 {
            return Err(EngineError::Argument("channel_count must be nonzero".into()));
        }
        let channels = (0..channel_count)
            .map(|id| Channel::new(id, bind.create_cache()))
            .collect();

        let mut graph = ProcessingGraph::new(sample_rate, 1, tempo);
        let instrument = graph.add_processor(Box::new(InstrumentSource::new()));
        let master = graph
            .add_master_with_channels(2)
            .expect("freshly built graph has no master yet");
        graph
            .connect(PortAddr::send(instrument, 0), PortAddr::recv(master, 0))
            .expect("instrument source's left port connects to the master's left port");
        graph
            .connect(PortAddr::send(instrument, 1), PortAddr::recv(master, 1))
            .expect("instrument source's right port connects to the master's right port");
        let schedule = graph
            .compile()
            .expect("a two-device instrument-to-master chain always compiles");

        let mut states = DeviceStates::new(4);
        states.insert(instrument);
        states.insert(master);
        states.set_audio_rate(sample_rate);
        states.set_tempo(tempo);

        let buf_pool = BufferPool::new(schedule.buffer_count(), 1);

        Ok(Self {
            sample_rate,
            master: MasterParams::new(tempo),
            channels,
            pool: VoicePool::new(sample_rate),
            bind,
            sink: kunquat_player::NullSink,
            sample: SingleSample(sample),
            sections: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            clipped: [false; 2],
            min_amplitude: [0.0; 2],
            max_amplitude: [0.0; 2],
            graph,
            schedule,
            states,
            buf_pool,
            instrument,
        })
    }

    /// Sets the flattened section/pattern sequence this handle mixes.
    pub fn set_sections(&mut self, sections: Vec<Pattern>) {
        self.sections = sections;
    }

    /// Total musical-time duration of the loaded section sequence, the
    /// sum of every section pattern's length.
    pub fn get_duration(&self) -> Tstamp {
        self.sections
            .iter()
            .fold(Tstamp::ZERO, |acc, p| acc + p.length)
    }

    /// Seeks to `section`'s start and starts song playback. `subsong` is
    /// recorded on the position but does not (yet) select among multiple
    /// song sequences, since only one flattened section list is loaded at
    /// a time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Argument`] if `section` is out of range for
    /// the loaded sequence.
    pub fn set_position(&mut self, subsong: i16, section: u16) -> Result<(), EngineError> {
        if section as usize >= self.sections.len() {
            return Err(EngineError::Argument(format!(
                "section {section} out of range (have {})",
                self.sections.len()
            )));
        }
        self.master.position.subsong = subsong;
        self.master.position.section = section as i16;
        self.master.position.pattern = section;
        self.master.position.row = Tstamp::ZERO;
        self.master.mode = PlaybackMode::PlaySong;
        Ok(())
    }

    /// Mixes up to `nframes` of audio, returning the number of frames
    /// actually produced (less than `nframes` at the end of the loaded
    /// sequence).
    ///
    /// Advances through [`Engine::set_sections`]' list one pattern at a
    /// time: when [`pattern_mix`] falls short of `nframes` because the
    /// current section ended (and no jump was pending), the next section
    /// is mixed into the remainder of the same call.
    pub fn mix(&mut self, nframes: usize) -> usize {
        self.left.clear();
        self.left.resize(nframes, 0.0);
        self.right.clear();
        self.right.resize(nframes, 0.0);

        let mut produced = 0usize;
        while produced < nframes {
            if self.master.mode == PlaybackMode::Stop {
                break;
            }
            let Some(pattern) = self.sections.get(self.master.position.section as usize) else {
                self.master.stop();
                break;
            };

            let master = core::mem::take(&mut self.master);
            let channels = core::mem::take(&mut self.channels);
            let pool = core::mem::replace(&mut self.pool, VoicePool::new(self.sample_rate));
            let mut state = PlayState::resume(master, channels, pool, self.sample_rate, &self.bind, &mut self.sink);

            let this_round = pattern_mix(
                pattern,
                nframes - produced,
                &mut state,
                &self.sample,
                &mut self.left[produced..],
                &mut self.right[produced..],
            );

            let (mut master, channels, pool) = state.into_parts();
            let ran_out_of_section = master.position.row.compare(pattern.length) != core::cmp::Ordering::Less
                && master.jump.is_none();
            if ran_out_of_section {
                let next = master.position.section as usize + 1;
                if next >= self.sections.len() {
                    master.stop();
                } else {
                    master.position.section = next as i16;
                    master.position.row = Tstamp::ZERO;
                }
            }
            self.master = master;
            self.channels = channels;
            self.pool = pool;

            if this_round > 0 {
                self.run_through_graph(produced, this_round);
            }

            produced += this_round;
            if this_round == 0 && !ran_out_of_section {
                // No progress and no section advance: avoid spinning
                // (e.g. a pattern of zero length with no jump).
                break;
            }
        }

        self.track_amplitude(0, &self.left[..produced]);
        self.track_amplitude(1, &self.right[..produced]);
        produced
    }

    /// Routes `self.left`/`self.right`'s `[offset, offset+len)` slice
    /// through the device graph: writes it into the `InstrumentSource`,
    /// runs the compiled schedule, and overwrites the same slice with the
    /// stereo master's recv buffers.
    fn run_through_graph(&mut self, offset: usize, len: usize) {
        self.graph.set_tempo(self.master.tempo);
        self.states.set_tempo(self.master.tempo);

        if self.buf_pool.block_size() != len {
            self.buf_pool.resize_all(len);
            self.graph.set_block_size(len);
            self.states.set_buffer_size(len);
        }
        self.buf_pool.reset_all_for_block();

        if let Some(behavior) = self.graph.processor_mut(self.instrument) {
            if let Some(src) = behavior.as_any_mut().downcast_mut::<InstrumentSource>() {
                src.set_block(&self.left[offset..offset + len], &self.right[offset..offset + len]);
            }
        }

        self.graph.run_schedule(&self.schedule, &mut self.buf_pool, 0, len);

        let master_bufs = self.schedule.master_input_bufs();
        let left_buf = master_bufs[0];
        let right_buf = master_bufs[1];
        self.left[offset..offset + len].copy_from_slice(self.buf_pool.get(left_buf).samples());
        self.right[offset..offset + len].copy_from_slice(self.buf_pool.get(right_buf).samples());
    }

    fn track_amplitude(&mut self, channel: usize, samples: &[f32]) {
        for &s in samples {
            if s > 1.0 || s < -1.0 {
                self.clipped[channel] = true;
            }
            self.min_amplitude[channel] = self.min_amplitude[channel].min(s);
            self.max_amplitude[channel] = self.max_amplitude[channel].max(s);
        }
    }

    /// The most recently mixed block for `channel` (0 = left, 1 = right).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Argument`] if `channel` is neither 0 nor 1.
    pub fn get_buffer(&self, channel: usize) -> Result<&[f32], EngineError> {
        match channel {
            0 => Ok(&self.left),
            1 => Ok(&self.right),
            _ => Err(EngineError::Argument(format!("channel {channel} out of range"))),
        }
    }

    /// Whether any sample mixed on `channel` since the last call to
    /// [`Engine::mix`] exceeded `[-1.0, 1.0]`.
    pub fn get_clipped(&self, channel: usize) -> bool {
        self.clipped.get(channel).copied().unwrap_or(false)
    }

    /// The minimum sample value mixed on `channel` during the most recent
    /// [`Engine::mix`] call.
    pub fn get_min_amplitude(&self, channel: usize) -> f32 {
        self.min_amplitude.get(channel).copied().unwrap_or(0.0)
    }

    /// The maximum sample value mixed on `channel` during the most recent
    /// [`Engine::mix`] call.
    pub fn get_max_amplitude(&self, channel: usize) -> f32 {
        self.max_amplitude.get(channel).copied().unwrap_or(0.0)
    }

    /// Whether the transport is still producing audio.
    pub fn is_playing(&self) -> bool {
        self.master.mode != PlaybackMode::Stop
    }

    /// Flips the transport to `Stop`. In-flight voices are left to finish
    /// their release on subsequent `mix` calls rather than being cleared
    /// here.
    pub fn stop(&mut self) {
        self.master.stop();
    }
}

// `del_handle` has no counterpart to call explicitly: dropping `Engine`
// releases everything it owns.
