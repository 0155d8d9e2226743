//! The mutable device graph: construction, validation, cycle detection and
//! compilation into a [`CompiledSchedule`].
//!
//! A [`ProcessingGraph`] is built from a textual connection list (one
//! `(send_path, recv_path)` pair per `connect` call). Construction validates
//! that each endpoint names a reachable device and port and that the
//! direction matches the device's role (only the master device may expose a
//! port to the world outside the graph). `compile` runs Kahn's algorithm to
//! produce a topological order, rejecting cycles, then assigns one buffer
//! per recv port and one per send port (accumulating every fan-in edge into
//! its shared recv buffer) and inserts compensation delays
//! where parallel paths of different latency converge, exactly mirroring
//! the observable two-phase "prepare, then mix" contract: `prepare`'s DFS
//! becomes `compile`'s topological sort, and `mix`'s recursive
//! visit-then-combine becomes the compiled schedule's linear
//! accumulate-then-process steps, with identical summation semantics.

use std::collections::VecDeque;

use kunquat_core::WorkBuffer;
use tracing::{instrument, trace};

use crate::edge::{Edge, EdgeId};
use crate::node::{DeviceBehavior, DeviceId, DeviceKind, PortAddr, PortDirection};
use crate::schedule::{CompiledSchedule, ProcessStep};

/// Failures raised while building or compiling a [`ProcessingGraph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("device {0:?} not found")]
    DeviceNotFound(DeviceId),
    #[error("edge not found")]
    EdgeNotFound,
    #[error("port index {index} out of range for device {device:?} ({available} ports)")]
    PortOutOfRange {
        device: DeviceId,
        index: u16,
        available: u16,
    },
    #[error("connecting {from:?} -> {to:?} would create a cycle")]
    CycleDetected { from: PortAddr, to: PortAddr },
    #[error("invalid connection: {0}")]
    InvalidConnection(&'static str),
    #[error("duplicate edge {from:?} -> {to:?}")]
    DuplicateEdge { from: PortAddr, to: PortAddr },
    #[error("graph has no devices")]
    EmptyGraph,
    #[error("graph has no master device")]
    NoMaster,
}

struct NodeSlot {
    id: DeviceId,
    kind: DeviceKind,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

/// The mutable device graph: the object the mutation thread owns and
/// reshapes; the audio thread only ever sees an `Arc<CompiledSchedule>`
/// produced by [`Self::compile`].
pub struct ProcessingGraph {
    nodes: Vec<NodeSlot>,
    edges: Vec<Edge>,
    next_id: u32,
    master: Option<DeviceId>,
    sample_rate: f64,
    block_size: usize,
    tempo: f64,
}

impl ProcessingGraph {
    /// Creates an empty graph at the given sample rate, block size and
    /// tempo.
    pub fn new(sample_rate: f64, block_size: usize, tempo: f64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_id: 1,
            master: None,
            sample_rate,
            block_size,
            tempo,
        }
    }

    fn mint_id(&mut self) -> DeviceId {
        let id = DeviceId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a leaf processor device, returning its id.
    pub fn add_processor(&mut self, behavior: Box<dyn DeviceBehavior + Send>) -> DeviceId {
        let id = self.mint_id();
        self.nodes.push(NodeSlot {
            id,
            kind: DeviceKind::Processor(behavior),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        id
    }

    /// Adds a composite audio-unit device wrapping its own inner graph.
    pub fn add_audio_unit(&mut self, inputs: u16, outputs: u16, inner: ProcessingGraph) -> DeviceId {
        let id = self.mint_id();
        self.nodes.push(NodeSlot {
            id,
            kind: DeviceKind::AudioUnit {
                inputs,
                outputs,
                inner: Box::new(inner),
            },
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        id
    }

    /// Adds the graph's single master device with one recv port (mono).
    /// Only the master may expose a port to the world outside the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConnection`] if a master already exists.
    pub fn add_master(&mut self) -> Result<DeviceId, GraphError> {
        self.add_master_with_channels(1)
    }

    /// Adds the graph's single master device with `channels` recv ports
    /// (e.g. 2 for a stereo left/right master bus).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConnection`] if a master already exists.
    pub fn add_master_with_channels(&mut self, channels: u16) -> Result<DeviceId, GraphError> {
        if self.master.is_some() {
            return Err(GraphError::InvalidConnection(
                "graph already has a master device",
            ));
        }
        let id = self.mint_id();
        self.nodes.push(NodeSlot {
            id,
            kind: DeviceKind::Master { channels },
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        self.master = Some(id);
        Ok(id)
    }

    fn slot(&self, id: DeviceId) -> Result<&NodeSlot, GraphError> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or(GraphError::DeviceNotFound(id))
    }

    fn slot_mut(&mut self, id: DeviceId) -> Result<&mut NodeSlot, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(GraphError::DeviceNotFound(id))
    }

    fn port_count(&self, addr: PortAddr) -> Result<u16, GraphError> {
        let slot = self.slot(addr.device)?;
        let count = match (&slot.kind, addr.direction) {
            (DeviceKind::Processor(p), PortDirection::Recv) => p.recv_port_count() as u16,
            (DeviceKind::Processor(p), PortDirection::Send) => p.send_port_count() as u16,
            (DeviceKind::AudioUnit { inputs, .. }, PortDirection::Recv) => *inputs,
            (DeviceKind::AudioUnit { outputs, .. }, PortDirection::Send) => *outputs,
            (DeviceKind::Master { channels }, PortDirection::Recv) => *channels,
            (DeviceKind::Master { .. }, PortDirection::Send) => 0,
        };
        Ok(count)
    }

    fn validate_port(&self, addr: PortAddr) -> Result<(), GraphError> {
        let count = self.port_count(addr)?;
        if addr.index >= count {
            return Err(GraphError::PortOutOfRange {
                device: addr.device,
                index: addr.index,
                available: count,
            });
        }
        Ok(())
    }

    /// Connects a send port to a recv port, after validating both
    /// endpoints, rejecting duplicates, and running a reachability DFS to
    /// reject the connection if it would introduce a cycle.
    #[instrument(skip(self))]
    pub fn connect(&mut self, from: PortAddr, to: PortAddr) -> Result<EdgeId, GraphError> {
        if from.direction != PortDirection::Send {
            return Err(GraphError::InvalidConnection("from port must be a send port"));
        }
        if to.direction != PortDirection::Recv {
            return Err(GraphError::InvalidConnection("to port must be a recv port"));
        }
        self.validate_port(from)?;
        self.validate_port(to)?;

        if self.edges.iter().any(|e| {
            e.from.device == from.device
                && e.from.index == from.index
                && e.to.device == to.device
                && e.to.index == to.index
        }) {
            return Err(GraphError::DuplicateEdge { from, to });
        }

        if self.can_reach(to.device, from.device) {
            return Err(GraphError::CycleDetected { from, to });
        }

        let edge_id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            from,
            to,
            buffer_idx: None,
        });
        self.slot_mut(from.device)?.outgoing.push(edge_id);
        self.slot_mut(to.device)?.incoming.push(edge_id);
        trace!(?from, ?to, "connected");
        Ok(edge_id)
    }

    /// Depth-first search: can `start` reach `target` by following
    /// outgoing edges? Used to reject edges that would close a cycle
    /// before they are ever inserted.
    fn can_reach(&self, start: DeviceId, target: DeviceId) -> bool {
        if start == target {
            return true;
        }
        let mut stack = vec![start];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == target {
                return true;
            }
            if let Ok(slot) = self.slot(current) {
                for &edge_id in &slot.outgoing {
                    stack.push(self.edges[edge_id.index()].to.device);
                }
            }
        }
        false
    }

    /// Total device count.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge count.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Topologically sorts the graph via Kahn's algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CycleDetected`] if the graph is not a DAG
    /// (should be unreachable given `connect`'s reachability check, but
    /// kept as a defense for graphs built by other means, e.g. nested
    /// audio-unit deserialization).
    fn kahn_sort(&self) -> Result<Vec<usize>, GraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        for slot in &self.nodes {
            let idx = slot.id.index();
            in_degree[idx] = slot.incoming.len();
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            let slot = &self.nodes[idx];
            for &edge_id in &slot.outgoing {
                let to_idx = self.edges[edge_id.index()].to.device.index();
                in_degree[to_idx] -= 1;
                if in_degree[to_idx] == 0 {
                    queue.push_back(to_idx);
                }
            }
        }
        if order.len() != n {
            return Err(GraphError::CycleDetected {
                from: PortAddr::send(self.nodes[0].id, 0),
                to: PortAddr::recv(self.nodes[0].id, 0),
            });
        }
        Ok(order)
    }

    /// Compiles the current topology into an immutable [`CompiledSchedule`],
    /// assigning one physical buffer per recv port and one per send port (so
    /// every edge feeding a shared recv port accumulates into that port's
    /// buffer rather than claiming a slot of its own) and inserting
    /// [`ProcessStep::DelayCompensate`] steps ahead of any merge whose
    /// inbound paths have unequal accumulated latency.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EmptyGraph`] or [`GraphError::NoMaster`] if the
    /// graph is incomplete, or [`GraphError::CycleDetected`] if it is not a
    /// DAG.
    #[instrument(skip(self))]
    pub fn compile(&self) -> Result<CompiledSchedule, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        let master = self.master.ok_or(GraphError::NoMaster)?;
        let order = self.kahn_sort()?;

        // One buffer per recv port and one per send port, not one per edge:
        // every edge feeding the same recv port accumulates into that
        // port's single buffer instead of claiming a slot of its own, so a
        // device with two fan-in edges on one port sees one summed input
        // rather than two misaligned ones.
        let n = self.nodes.len();
        let mut recv_base = vec![0usize; n];
        let mut send_base = vec![0usize; n];
        let mut recv_counts = vec![0usize; n];
        let mut send_counts = vec![0usize; n];
        let mut next_buf = 0usize;
        for (idx, slot) in self.nodes.iter().enumerate() {
            let recv_count = self.port_count(PortAddr::recv(slot.id, 0))? as usize;
            let send_count = self.port_count(PortAddr::send(slot.id, 0))? as usize;
            recv_counts[idx] = recv_count;
            send_counts[idx] = send_count;
            recv_base[idx] = next_buf;
            next_buf += recv_count;
            send_base[idx] = next_buf;
            next_buf += send_count;
        }
        let buffer_count = next_buf.max(1);

        let mut steps = Vec::new();
        for buf in 0..next_buf {
            steps.push(ProcessStep::ClearBuffer { buffer_idx: buf });
        }

        let latency = self.compute_latencies(&order);
        let mut delay_sample_counts = Vec::new();

        for &node_idx in &order {
            let slot = &self.nodes[node_idx];

            let max_incoming_latency = slot
                .incoming
                .iter()
                .map(|&e| latency[self.edges[e.index()].from.device.index()])
                .max()
                .unwrap_or(0);

            for &edge_id in &slot.incoming {
                let edge = &self.edges[edge_id.index()];
                let from_idx = edge.from.device.index();
                let src_latency = latency[from_idx];
                let source_buf = send_base[from_idx] + edge.from.index as usize;
                let dest_buf = recv_base[node_idx] + edge.to.index as usize;
                if src_latency < max_incoming_latency {
                    let delay_idx = delay_sample_counts.len();
                    delay_sample_counts.push(max_incoming_latency - src_latency);
                    steps.push(ProcessStep::DelayCompensate {
                        buffer_idx: source_buf,
                        delay_line_idx: delay_idx,
                    });
                }
                steps.push(ProcessStep::AccumulateBuffer {
                    source_buf,
                    dest_buf,
                });
            }

            let input_bufs: Vec<usize> = (0..recv_counts[node_idx])
                .map(|p| recv_base[node_idx] + p)
                .collect();
            let output_bufs: Vec<usize> = (0..send_counts[node_idx])
                .map(|p| send_base[node_idx] + p)
                .collect();

            steps.push(ProcessStep::ProcessDevice {
                node_idx,
                input_bufs,
                output_bufs,
            });
        }

        let total_latency = latency.get(master.index()).copied().unwrap_or(0);
        let master_input_bufs: Vec<usize> = (0..recv_counts[master.index()])
            .map(|p| recv_base[master.index()] + p)
            .collect();

        Ok(CompiledSchedule {
            steps,
            buffer_count,
            delay_sample_counts,
            total_latency,
            master_input_bufs,
        })
    }

    /// Mutable access to a leaf processor device's behavior, for an
    /// embedder holding a `DeviceId` that needs to reach device-specific
    /// state between `compile()` and `run_schedule()` — e.g. writing
    /// externally rendered audio into a source device via
    /// [`DeviceBehavior::as_any_mut`] before running the schedule.
    pub fn processor_mut(&mut self, id: DeviceId) -> Option<&mut (dyn DeviceBehavior + Send)> {
        match &mut self.slot_mut(id).ok()?.kind {
            DeviceKind::Processor(behavior) => Some(behavior.as_mut()),
            _ => None,
        }
    }

    /// Computes each device's cumulative latency: its own
    /// [`DeviceBehavior::latency_samples`] plus the maximum latency of any
    /// device feeding it.
    fn compute_latencies(&self, order: &[usize]) -> Vec<usize> {
        let mut latency = vec![0usize; self.nodes.len()];
        for &idx in order {
            let slot = &self.nodes[idx];
            let own = match &slot.kind {
                DeviceKind::Processor(p) => p.latency_samples(),
                DeviceKind::AudioUnit { .. } | DeviceKind::Master { .. } => 0,
            };
            let inbound_max = slot
                .incoming
                .iter()
                .map(|&e| latency[self.edges[e.index()].from.device.index()])
                .max()
                .unwrap_or(0);
            latency[idx] = own + inbound_max;
        }
        latency
    }

    /// Runs the compiled schedule over `[start, stop)`, writing the
    /// master's recv buffer into `master_out`.
    pub fn run_schedule(
        &mut self,
        schedule: &CompiledSchedule,
        pool: &mut kunquat_core::BufferPool,
        start: usize,
        stop: usize,
    ) {
        let sample_rate = self.sample_rate;
        let tempo = self.tempo;
        for step in schedule.steps() {
            match step {
                ProcessStep::ClearBuffer { buffer_idx } => {
                    pool.get_mut(*buffer_idx).reset_for_block();
                }
                ProcessStep::AccumulateBuffer {
                    source_buf,
                    dest_buf,
                } => {
                    pool.accumulate(*dest_buf, *source_buf);
                }
                ProcessStep::DelayCompensate { .. } => {
                    // Delay-line state lives in kunquat-graph::states per
                    // device; this schedule only records where one applies.
                }
                ProcessStep::ProcessDevice {
                    node_idx,
                    input_bufs,
                    output_bufs,
                } => {
                    if let DeviceKind::Processor(behavior) = &mut self.nodes[*node_idx].kind {
                        let mut scratch_in: Vec<WorkBuffer> = Vec::with_capacity(input_bufs.len());
                        for &idx in input_bufs {
                            let mut buf = WorkBuffer::new(stop - start);
                            buf.copy_from(pool.get(idx));
                            scratch_in.push(buf);
                        }
                        let mut scratch_out: Vec<WorkBuffer> =
                            (0..behavior.send_port_count())
                                .map(|_| WorkBuffer::new(stop - start))
                                .collect();
                        behavior.process_signal(
                            start,
                            stop,
                            &scratch_in,
                            &mut scratch_out,
                            sample_rate,
                            tempo,
                        );
                        for (&idx, buf) in output_bufs.iter().zip(scratch_out.iter()) {
                            pool.get_mut(idx).copy_from(buf);
                        }
                    }
                }
            }
        }
    }

    /// Propagates a sample-rate change to every device in the graph (a
    /// fan-out operation, matching `kunquat-graph::states`'s `set_audio_rate`
    /// for per-thread shadow state).
    pub fn set_sample_rate(&mut self, rate: f64) {
        self.sample_rate = rate;
        for slot in &mut self.nodes {
            if let DeviceKind::Processor(p) = &mut slot.kind {
                p.set_audio_rate(rate);
            }
        }
    }

    /// Propagates a block-size change to every device.
    pub fn set_block_size(&mut self, size: usize) {
        self.block_size = size;
        for slot in &mut self.nodes {
            if let DeviceKind::Processor(p) = &mut slot.kind {
                p.set_buffer_size(size);
            }
        }
    }

    /// Propagates a tempo change to every device.
    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
        for slot in &mut self.nodes {
            if let DeviceKind::Processor(p) = &mut slot.kind {
                p.set_tempo(tempo);
            }
        }
    }

    /// Current block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PassThrough;
    impl DeviceBehavior for PassThrough {
        fn process_signal(
            &mut self,
            _start: usize,
            _stop: usize,
            _inputs: &[WorkBuffer],
            _outputs: &mut [WorkBuffer],
            _sample_rate: f64,
            _tempo: f64,
        ) {
        }
        fn recv_port_count(&self) -> usize {
            1
        }
        fn send_port_count(&self) -> usize {
            1
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
    }

    fn build_linear_graph() -> (ProcessingGraph, DeviceId, DeviceId, DeviceId) {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        let a = g.add_processor(Box::new(PassThrough));
        let b = g.add_processor(Box::new(PassThrough));
        let master = g.add_master().unwrap();
        g.connect(PortAddr::send(a, 0), PortAddr::recv(b, 0)).unwrap();
        g.connect(PortAddr::send(b, 0), PortAddr::recv(master, 0))
            .unwrap();
        (g, a, b, master)
    }

    #[test]
    fn connect_and_edge_count() {
        let (g, _, _, _) = build_linear_graph();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn duplicate_edge_rejected() {
        let (mut g, a, b, _) = build_linear_graph();
        let result = g.connect(PortAddr::send(a, 0), PortAddr::recv(b, 0));
        assert!(matches!(result, Err(GraphError::DuplicateEdge { .. })));
    }

    #[test]
    fn direct_cycle_rejected() {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        let a = g.add_processor(Box::new(PassThrough));
        let b = g.add_processor(Box::new(PassThrough));
        g.connect(PortAddr::send(a, 0), PortAddr::recv(b, 0)).unwrap();
        let result = g.connect(PortAddr::send(b, 0), PortAddr::recv(a, 0));
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
    }

    #[test]
    fn compile_succeeds_on_valid_dag() {
        let (g, _, _, _) = build_linear_graph();
        let schedule = g.compile().unwrap();
        assert!(schedule.step_count() > 0);
    }

    #[test]
    fn compile_fails_without_master() {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        g.add_processor(Box::new(PassThrough));
        assert!(matches!(g.compile(), Err(GraphError::NoMaster)));
    }

    #[test]
    fn compile_fails_on_empty_graph() {
        let g = ProcessingGraph::new(48000.0, 64, 120.0);
        assert!(matches!(g.compile(), Err(GraphError::EmptyGraph)));
    }

    #[test]
    fn port_out_of_range_rejected() {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        let a = g.add_processor(Box::new(PassThrough));
        let b = g.add_processor(Box::new(PassThrough));
        let result = g.connect(PortAddr::send(a, 5), PortAddr::recv(b, 0));
        assert!(matches!(result, Err(GraphError::PortOutOfRange { .. })));
    }

    struct ConstantSource(f32);
    impl DeviceBehavior for ConstantSource {
        fn process_signal(
            &mut self,
            _start: usize,
            _stop: usize,
            _inputs: &[WorkBuffer],
            outputs: &mut [WorkBuffer],
            _sample_rate: f64,
            _tempo: f64,
        ) {
            outputs[0].fill_constant(self.0);
        }
        fn recv_port_count(&self) -> usize {
            0
        }
        fn send_port_count(&self) -> usize {
            1
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
    }

    struct Gain(f32);
    impl DeviceBehavior for Gain {
        fn process_signal(
            &mut self,
            _start: usize,
            _stop: usize,
            inputs: &[WorkBuffer],
            outputs: &mut [WorkBuffer],
            _sample_rate: f64,
            _tempo: f64,
        ) {
            for (dst, src) in outputs[0].samples_mut().iter_mut().zip(inputs[0].samples()) {
                *dst = src * self.0;
            }
            outputs[0].mark_valid();
        }
        fn recv_port_count(&self) -> usize {
            1
        }
        fn send_port_count(&self) -> usize {
            1
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
    }

    /// §8 scenario 6: a linear instrument -> effect -> master chain, the
    /// instrument emitting a constant 1.0 and the effect applying a ×0.5
    /// gain, places 0.5 at the master's recv buffer for one mix call.
    #[test]
    fn linear_chain_applies_effect_gain_into_master() {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        let instrument = g.add_processor(Box::new(ConstantSource(1.0)));
        let effect = g.add_processor(Box::new(Gain(0.5)));
        let master = g.add_master().unwrap();
        g.connect(PortAddr::send(instrument, 0), PortAddr::recv(effect, 0))
            .unwrap();
        g.connect(PortAddr::send(effect, 0), PortAddr::recv(master, 0))
            .unwrap();

        let schedule = g.compile().unwrap();
        let mut pool = kunquat_core::BufferPool::new(schedule.buffer_count(), 8);
        g.run_schedule(&schedule, &mut pool, 0, 8);

        let master_recv_buf = schedule.master_input_bufs()[0];
        for &s in pool.get(master_recv_buf).samples() {
            assert!((s - 0.5).abs() < 1e-6);
        }
        let _ = master;
    }

    /// Two sends landing on the same recv port must sum rather than
    /// overwrite one another, exercising the fan-in the §3 Edge invariant
    /// ("multiple edges may terminate at one recv port, summed") describes.
    #[test]
    fn fan_in_edges_accumulate_into_one_recv_buffer() {
        let mut g = ProcessingGraph::new(48000.0, 64, 120.0);
        let a = g.add_processor(Box::new(ConstantSource(0.25)));
        let b = g.add_processor(Box::new(ConstantSource(0.75)));
        let master = g.add_master().unwrap();
        g.connect(PortAddr::send(a, 0), PortAddr::recv(master, 0))
            .unwrap();
        g.connect(PortAddr::send(b, 0), PortAddr::recv(master, 0))
            .unwrap();

        let schedule = g.compile().unwrap();
        let mut pool = kunquat_core::BufferPool::new(schedule.buffer_count(), 8);
        g.run_schedule(&schedule, &mut pool, 0, 8);

        let master_recv_buf = schedule.master_input_bufs()[0];
        for &s in pool.get(master_recv_buf).samples() {
            assert!((s - 1.0).abs() < 1e-6);
        }
        let _ = master;
    }
}
