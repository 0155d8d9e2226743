//! Core primitives shared across the Kunquat workspace: exact musical-time
//! timestamps, work buffers, envelope/LFO/slider modulation primitives,
//! note/octave/modifier scales, a state-variable filter and the shared
//! error type.
//!
//! `no_std`-compatible (enable the `std` feature, on by default, to pull in
//! `thiserror`'s `std::error::Error` impl and heap-backed collections via
//! `alloc`).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod buffer;
pub mod envelope;
pub mod error;
pub mod lfo;
pub mod scale;
pub mod slider;
pub mod svf;
pub mod tstamp;

pub use buffer::{BufferPool, ConstantRegion, WorkBuffer};
pub use envelope::{Envelope, EnvelopeNode, EnvelopeState};
pub use error::{KunquatError, Result};
pub use lfo::{DepthUnit, Lfo};
pub use scale::{Ratio, Scale, ScaleError, MAX_MODS, MAX_NOTES};
pub use slider::Slider;
pub use svf::{FilterCrossfade, StateVariableFilter, SvfOutput};
pub use tstamp::Tstamp;
