//! Device identity and the device/processor/audio-unit variant.

use core::any::Any;
use core::num::NonZeroU32;

/// A device identity, minted by a per-engine counter (never a process-global
/// counter) and threaded through every public graph operation via
/// [`crate::graph::ProcessingGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(NonZeroU32);

impl DeviceId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        DeviceId(NonZeroU32::new(raw).expect("device id counter starts at 1"))
    }

    /// The raw index this id was minted from, used to index `nodes`.
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The raw device-id integer. Lets another crate (e.g. a voice pool
    /// tagging which processor a voice targets) carry this identity
    /// without depending on how `ProcessingGraph` mints it.
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

/// Which direction a port faces on a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Receives audio from connected senders.
    Recv,
    /// Sends audio to connected receivers.
    Send,
}

/// A fully-qualified port address: a device id, a direction and a port
/// index within that direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortAddr {
    pub device: DeviceId,
    pub direction: PortDirection,
    pub index: u16,
}

impl PortAddr {
    pub fn recv(device: DeviceId, index: u16) -> Self {
        PortAddr {
            device,
            direction: PortDirection::Recv,
            index,
        }
    }

    pub fn send(device: DeviceId, index: u16) -> Self {
        PortAddr {
            device,
            direction: PortDirection::Send,
            index,
        }
    }
}

/// The capability every device kind shares: reacting to rate/block-size/
/// tempo changes and rendering one block of audio.
///
/// Per-type state lives inside each [`DeviceKind`] variant rather than a
/// side table keyed by a type tag, so `process_signal` can borrow its own
/// state directly.
pub trait DeviceBehavior: Any {
    /// Renders `[start, stop)` frames, reading `inputs` (one work buffer per
    /// recv port) and writing `outputs` (one per send port).
    fn process_signal(
        &mut self,
        start: usize,
        stop: usize,
        inputs: &[kunquat_core::WorkBuffer],
        outputs: &mut [kunquat_core::WorkBuffer],
        sample_rate: f64,
        tempo: f64,
    );

    /// Number of recv ports this device exposes.
    fn recv_port_count(&self) -> usize;

    /// Number of send ports this device exposes.
    fn send_port_count(&self) -> usize;

    /// Downcasting hook so an embedder holding a `DeviceId` can reach a
    /// concrete device behind `ProcessingGraph::processor_mut` — e.g. to
    /// feed externally-rendered audio (a voice pool's mix) into a source
    /// device before running the schedule.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Reacts to an audio rate change.
    fn set_audio_rate(&mut self, _rate: f64) {}

    /// Reacts to a block-size change.
    fn set_buffer_size(&mut self, _size: usize) {}

    /// Reacts to a tempo change.
    fn set_tempo(&mut self, _tempo: f64) {}

    /// Fixed processing latency this device introduces, in frames. Used by
    /// the graph compiler to insert latency-compensation delays on shorter
    /// parallel paths.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// The tagged variant every graph node's behavior is stored as: a tagged
/// `enum` rather than an inheritance hierarchy, per this workspace's
/// preference for flat dispatch over a v-table of type-erased callbacks,
/// with a nested subgraph carried directly inside the `AudioUnit` variant
/// instead of a side table.
pub enum DeviceKind {
    /// A leaf signal processor (generator, DSP/effect).
    Processor(Box<dyn DeviceBehavior + Send>),
    /// A composite device wrapping its own inner [`crate::graph::ProcessingGraph`],
    /// exposing `inputs`/`outputs` ports to the outer graph.
    AudioUnit {
        inputs: u16,
        outputs: u16,
        inner: Box<crate::graph::ProcessingGraph>,
    },
    /// The graph's single sink: the only device allowed to send audio
    /// outside the graph. `channels` is its recv port count (one per
    /// output channel, e.g. 2 for stereo).
    Master { channels: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_index_is_zero_based() {
        let id = DeviceId::from_raw(1);
        assert_eq!(id.index(), 0);
        let id2 = DeviceId::from_raw(5);
        assert_eq!(id2.index(), 4);
    }
}
