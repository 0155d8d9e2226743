//! Voice pool and the per-voice render pipeline: pitch, force, filter,
//! sample playback and pan stages driven from one acquired [`Voice`] per
//! active note.

pub mod debug_gen;
pub mod pool;
pub mod render;
pub mod sample;

pub use debug_gen::{DebugGenerator, RELEASE_CLICK_FRAMES};
pub use pool::{Priority, ProcessorId, VoiceId, VoicePool};
pub use render::{Arpeggio, Voice, MAX_ARPEGGIO_TONES, RELEASE_RAMP_FRAMES};
pub use sample::{LoopMode, Sample, SampleCursor};
