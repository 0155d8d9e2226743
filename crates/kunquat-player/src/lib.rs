//! The pattern/column player: per-channel playback state, the master
//! transport, the column/pattern mixing loop and event dispatch that ties
//! them together.

pub mod channel;
pub mod column;
pub mod handler;
pub mod master;
pub mod pattern;

pub use channel::Channel;
pub use column::{Column, ColumnIter, Event};
pub use handler::{DispatchError, EventHandler, NullSink, ParamSink};
pub use master::{JumpTarget, MasterParams, PlaybackMode, Position, TempoSlide, VolumeSlide};
pub use pattern::{pattern_mix, PlayState, Pattern, SampleSource};
