//! The Kunquat device graph: construction from a connection list, cycle
//! rejection, compilation into a buffer-assigned linear render plan, and
//! the per-device state registry the compiled plan runs against.
//!
//! Two-object split, generalised from a fixed stereo effect-chain DAG to
//! an arbitrary multi-port device graph: a mutable [`graph::ProcessingGraph`]
//! owns topology and is reshaped by the mutation thread; a compiled
//! [`schedule::CompiledSchedule`] is the immutable, `Arc`-shareable plan the
//! audio thread actually runs.

pub mod edge;
pub mod graph;
pub mod node;
pub mod schedule;
pub mod states;

pub use edge::{Edge, EdgeId};
pub use graph::{GraphError, ProcessingGraph};
pub use node::{DeviceBehavior, DeviceId, DeviceKind, PortAddr, PortDirection};
pub use schedule::{CompiledSchedule, ProcessStep};
pub use states::{DeviceStates, SharedState, ThreadState, MAX_THREADS};
