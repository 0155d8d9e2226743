//! Per-channel playback state: the active instrument/generator/effect/DSP
//! pointers, the active-parameter-name registers typed setters resolve
//! against, this channel's event cache and RNG, and note-on/off dispatch
//! into the voice pool.
//!
//! Grounded in `Event_handler.c`'s `channels[index]->instrument`/
//! `->generator`/`->effect`/`->dsp`/`->event_cache`/`->rand` field
//! accesses (the `player/Channel.h` it `#include`s is not itself present
//! in the retrieved source set), generalised from a handful of named
//! `Instrument*`/`Generator*` pointers to `DeviceId` options addressed
//! through [`kunquat_graph`].

use std::collections::HashMap;

use kunquat_event::{EventCache, Rng};
use kunquat_graph::DeviceId;
use kunquat_voice::{Priority, ProcessorId, VoiceId, VoicePool};

/// One channel's playback-scoped state (§3's `Channel`).
pub struct Channel {
    pub id: u32,
    pub current_instrument: Option<DeviceId>,
    pub current_generator: Option<DeviceId>,
    pub current_effect: Option<DeviceId>,
    pub current_dsp: Option<DeviceId>,
    /// The voice most recently acquired on this channel, the target of a
    /// subsequent voice-scope event until the next note-on.
    pub active_voice: Option<VoiceId>,
    /// Active-parameter-name registers a typed setter (`c.i`/`c.g`/...)
    /// resolves a generic parameter path against, keyed by register name
    /// (e.g. `"instrument"`, `"generator"`).
    active_names: HashMap<String, String>,
    pub cache: EventCache,
    pub rng: Rng,
}

impl Channel {
    /// Creates a channel at `id` with no active devices, seeding its RNG
    /// from `id` so distinct channels draw independent (but reproducible)
    /// sequences.
    pub fn new(id: u32, cache: EventCache) -> Self {
        Self {
            id,
            current_instrument: None,
            current_generator: None,
            current_effect: None,
            current_dsp: None,
            active_voice: None,
            active_names: HashMap::new(),
            cache,
            rng: Rng::new(u64::from(id) ^ 0x1234_5678),
        }
    }

    /// Sets an active-parameter-name register.
    pub fn set_active_name(&mut self, register: &str, value: impl Into<String>) {
        self.active_names.insert(register.to_string(), value.into());
    }

    /// Reads an active-parameter-name register.
    pub fn active_name(&self, register: &str) -> Option<&str> {
        self.active_names.get(register).map(String::as_str)
    }

    /// Triggers a note at `pitch` Hz, acquiring a voice for `self.id` from
    /// `pool` at `priority`, targeting this channel's current instrument
    /// (or the no-target sentinel if none is set). The voice becomes this
    /// channel's active voice.
    ///
    /// Returns `None` if the pool has no free or stealable voice.
    pub fn note_on<const N: usize>(
        &mut self,
        pool: &mut VoicePool<N>,
        pitch: f64,
        priority: Priority,
    ) -> Option<VoiceId> {
        let target_processor = self
            .current_instrument
            .map(|id| ProcessorId(id.raw()))
            .unwrap_or_default();
        let id = pool.acquire(self.id, target_processor, priority)?;
        if let Some(voice) = pool.lookup_mut(id) {
            voice.note_on(pitch);
        }
        self.active_voice = Some(id);
        Some(id)
    }

    /// Releases this channel's active voice, if any and still live.
    pub fn note_off<const N: usize>(&mut self, pool: &mut VoicePool<N>) {
        if let Some(id) = self.active_voice {
            if let Some(voice) = pool.lookup_mut(id) {
                voice.note_off();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_name_round_trips() {
        let mut ch = Channel::new(0, EventCache::new());
        ch.set_active_name("instrument", "lead");
        assert_eq!(ch.active_name("instrument"), Some("lead"));
        assert_eq!(ch.active_name("effect"), None);
    }

    #[test]
    fn note_on_acquires_and_tracks_active_voice() {
        let mut pool: VoicePool<256> = VoicePool::new(48000.0);
        let mut ch = Channel::new(0, EventCache::new());
        let id = ch.note_on(&mut pool, 440.0, Priority::Foreground).unwrap();
        assert_eq!(ch.active_voice, Some(id));
    }

    #[test]
    fn note_off_releases_active_voice() {
        let mut pool: VoicePool<256> = VoicePool::new(48000.0);
        let mut ch = Channel::new(0, EventCache::new());
        ch.note_on(&mut pool, 440.0, Priority::Foreground).unwrap();
        ch.note_off(&mut pool);
        let id = ch.active_voice.unwrap();
        assert!(!pool.lookup(id).unwrap().note_on);
    }

    #[test]
    fn distinct_channels_seed_distinct_rngs() {
        let mut a = Channel::new(0, EventCache::new());
        let mut b = Channel::new(1, EventCache::new());
        assert_ne!(a.rng.next_u64(), b.rng.next_u64());
    }
}
