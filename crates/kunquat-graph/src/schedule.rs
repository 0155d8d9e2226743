//! The compiled, immutable render plan produced by
//! [`crate::graph::ProcessingGraph::compile`].
//!
//! A [`CompiledSchedule`] is an `Arc`-shared snapshot the audio thread reads
//! while the mutation thread is free to build the next topology; swapping
//! schedules is a single pointer store, and a short crossfade at the swap
//! point keeps the transition click-free (see `crate::graph::ProcessingGraph::compile`
//! doc comment for the handoff protocol).

/// One step of a compiled render plan.
#[derive(Clone, Debug)]
pub enum ProcessStep {
    /// Zero a physical buffer slot before any writer accumulates into it.
    ClearBuffer { buffer_idx: usize },
    /// Mix a send-port buffer into a recv-port buffer (summation).
    AccumulateBuffer { source_buf: usize, dest_buf: usize },
    /// Run one device's `process_signal` over its recv/send buffer slots.
    ProcessDevice {
        node_idx: usize,
        input_bufs: Vec<usize>,
        output_bufs: Vec<usize>,
    },
    /// Apply a fixed-length compensation delay before a merge, so parallel
    /// paths with different latencies line up at the recv port.
    DelayCompensate {
        buffer_idx: usize,
        delay_line_idx: usize,
    },
}

/// An immutable, linear render plan: a flat list of [`ProcessStep`]s plus
/// the buffer/delay-line counts needed to run it.
#[derive(Clone, Debug)]
pub struct CompiledSchedule {
    pub(crate) steps: Vec<ProcessStep>,
    pub(crate) buffer_count: usize,
    pub(crate) delay_sample_counts: Vec<usize>,
    pub(crate) total_latency: usize,
    pub(crate) master_input_bufs: Vec<usize>,
}

impl CompiledSchedule {
    /// Number of steps in the plan.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of physical buffer slots the plan needs.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// The plan's steps, in execution order.
    pub fn steps(&self) -> &[ProcessStep] {
        &self.steps
    }

    /// Number of compensation delay lines the plan needs.
    pub fn delay_line_count(&self) -> usize {
        self.delay_sample_counts.len()
    }

    /// Delay-line lengths, indexed by `delay_line_idx`.
    pub fn delay_sample_counts(&self) -> &[usize] {
        &self.delay_sample_counts
    }

    /// The graph's total end-to-end latency in frames (master recv path).
    pub fn total_latency(&self) -> usize {
        self.total_latency
    }

    /// The master device's recv-port buffer indices, one per output
    /// channel, in port order. An embedder reads these after
    /// `ProcessingGraph::run_schedule` to collect the final mix.
    pub fn master_input_bufs(&self) -> &[usize] {
        &self.master_input_bufs
    }
}

