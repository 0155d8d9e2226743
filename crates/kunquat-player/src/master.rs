//! Playback-wide state: current position, pending jump, tempo/tempo-slide,
//! global volume/its slide, pattern-delay counters and playback mode.
//!
//! Grounded in `Pattern.c`'s `Playdata` fields (`pos`, `jump`,
//! `jump_subsong`/`jump_section`/`jump_position`, `tempo`, `volume_slide`,
//! `delay_left`, `delay_event_index`).

use kunquat_core::Tstamp;

/// Playback mode, per §3's Master params.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    #[default]
    Stop,
    /// Mixing exactly one externally-triggered event, no transport
    /// advance.
    PlayEvent,
    /// Looping the current pattern only.
    PlayPattern,
    /// Playing the full subsong sequence.
    PlaySong,
}

/// A playback position: subsong, section within it, the pattern that
/// section names, and a row offset into that pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub subsong: i16,
    pub section: i16,
    pub pattern: u16,
    pub row: Tstamp,
}

/// A pending jump target. `subsong`/`section` of `-1` mean "keep current",
/// matching `Playdata`'s `jump_subsong < 0` sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JumpTarget {
    pub subsong: i16,
    pub section: i16,
    pub row: Tstamp,
}

/// A linear-in-dB tempo slide over a fixed musical-time length.
#[derive(Clone, Copy, Debug)]
pub struct TempoSlide {
    target: f64,
    start: f64,
    length: Tstamp,
    elapsed: Tstamp,
}

impl TempoSlide {
    /// Starts a slide from `start` to `target` over `length` of musical
    /// time.
    pub fn new(start: f64, target: f64, length: Tstamp) -> Self {
        Self {
            target,
            start,
            length,
            elapsed: Tstamp::ZERO,
        }
    }

    /// Advances the slide by `dt` of musical time, returning the new tempo.
    ///
    /// Linear in log2 space (dB-style), matching §4.12's "linear in dB
    /// over a Tstamp length" tempo-slide contract.
    pub fn advance(&mut self, dt: Tstamp) -> f64 {
        self.elapsed = self.elapsed + dt;
        if self.elapsed.compare(self.length) != std::cmp::Ordering::Less {
            return self.target;
        }
        let frac = if self.length.is_zero() {
            1.0
        } else {
            self.elapsed.as_f64_beats() / self.length.as_f64_beats().max(1e-12)
        };
        let log_start = libm::log2(self.start);
        let log_target = libm::log2(self.target);
        libm::exp2(log_start + (log_target - log_start) * frac)
    }

    /// Whether the slide has reached its target musical-time length.
    pub fn is_done(&self) -> bool {
        self.elapsed.compare(self.length) != std::cmp::Ordering::Less
    }
}

/// A linear-in-dB global-volume slide, identical in shape to
/// [`TempoSlide`] but kept as a distinct type since it slides a gain
/// rather than a tempo.
pub type VolumeSlide = TempoSlide;

/// Playback-wide transport state (§3's Master params).
pub struct MasterParams {
    pub position: Position,
    pub jump: Option<JumpTarget>,
    pub tempo: f64,
    pub tempo_slide: Option<TempoSlide>,
    pub global_volume: f64,
    pub volume_slide: Option<VolumeSlide>,
    /// Remaining musical time a pattern-delay event is holding global
    /// event processing for.
    pub delay_left: Tstamp,
    /// Index into the current position's global-event-at-this-row list
    /// already processed before the active delay, persisted across the
    /// delay so resumption does not re-dispatch them (§9's
    /// `delay_event_index` resolution).
    pub delay_resume_index: Option<usize>,
    pub mode: PlaybackMode,
}

impl Default for MasterParams {
    fn default() -> Self {
        Self {
            position: Position::default(),
            jump: None,
            tempo: 120.0,
            tempo_slide: None,
            global_volume: 1.0,
            volume_slide: None,
            delay_left: Tstamp::ZERO,
            delay_resume_index: None,
            mode: PlaybackMode::Stop,
        }
    }
}

impl MasterParams {
    pub fn new(tempo: f64) -> Self {
        Self {
            tempo,
            ..Default::default()
        }
    }

    /// Advances tempo/volume slides by `dt` of musical time.
    pub fn advance_slides(&mut self, dt: Tstamp) {
        if let Some(slide) = &mut self.tempo_slide {
            self.tempo = slide.advance(dt);
            if slide.is_done() {
                self.tempo_slide = None;
            }
        }
        if let Some(slide) = &mut self.volume_slide {
            self.global_volume = slide.advance(dt);
            if slide.is_done() {
                self.volume_slide = None;
            }
        }
    }

    /// Requests a transport stop; in-flight voices continue to their
    /// release unless explicitly cleared elsewhere (§5's cancellation
    /// contract).
    pub fn stop(&mut self) {
        self.mode = PlaybackMode::Stop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_slide_reaches_target_exactly() {
        let slide = TempoSlide::new(120.0, 180.0, Tstamp::new(4, 0));
        let mut params = MasterParams::new(120.0);
        params.tempo_slide = Some(slide);
        for _ in 0..4 {
            params.advance_slides(Tstamp::new(1, 0));
        }
        assert!((params.tempo - 180.0).abs() < 1e-9);
        assert!(params.tempo_slide.is_none());
    }

    #[test]
    fn tempo_slide_is_monotonic_between_endpoints() {
        let mut slide = TempoSlide::new(100.0, 200.0, Tstamp::new(10, 0));
        let mut last = 100.0;
        for _ in 0..10 {
            let next = slide.advance(Tstamp::new(1, 0));
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn stop_sets_mode() {
        let mut params = MasterParams::new(120.0);
        params.mode = PlaybackMode::PlaySong;
        params.stop();
        assert_eq!(params.mode, PlaybackMode::Stop);
    }
}
