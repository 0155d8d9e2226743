//! Per-device state registry: one shared immutable state per device plus
//! up to [`MAX_THREADS`] per-thread scratch states, keyed by [`DeviceId`]
//! in a small power-of-two bucket hash table with chaining.
//!
//! `sonido-core`'s graph does not need this layer because its effects own
//! their state in-place inside the node; Kunquat's device graph separates
//! "shared immutable config" from "per-thread render scratch" because the
//! same compiled schedule can be rendered by more than one worker thread
//! concurrently (see §5 of the concurrency model), and each thread needs
//! its own mutable scratch without locking.

use crate::node::DeviceId;

/// Upper bound on concurrent render worker threads sharing one
/// [`DeviceStates`] registry.
pub const MAX_THREADS: usize = 8;

/// Shared, read-mostly per-device state: cached cutoff tables, sample
/// references, anything every thread reads but none mutate per-block.
#[derive(Default, Clone)]
pub struct SharedState {
    pub audio_rate: f64,
    pub buffer_size: usize,
    pub tempo: f64,
}

/// Per-thread mutable scratch state for one device: filter/envelope/slider
/// instances a single worker thread advances while rendering a block.
#[derive(Default, Clone)]
pub struct ThreadState {
    pub active: bool,
}

struct Entry {
    id: DeviceId,
    shared: SharedState,
    threads: Vec<ThreadState>,
}

/// Hash table of per-device states, chaining on a small power-of-two
/// bucket count (grown by doubling as entries are added, matching a
/// conventional open-chaining hash map without pulling in a dependency for
/// it).
pub struct DeviceStates {
    buckets: Vec<Vec<Entry>>,
    thread_count: usize,
    len: usize,
}

fn bucket_index(id: DeviceId, bucket_count: usize) -> usize {
    // DeviceId wraps a NonZeroU32; a cheap multiplicative hash spreads
    // sequential ids across buckets instead of clustering them in one.
    let raw = id.index() as u64;
    ((raw.wrapping_mul(0x9E37_79B9_7F4A_7C15)) as usize) & (bucket_count - 1)
}

impl DeviceStates {
    /// Creates an empty registry with `initial_buckets` buckets (rounded up
    /// to the next power of two) and one render thread.
    pub fn new(initial_buckets: usize) -> Self {
        let bucket_count = initial_buckets.max(1).next_power_of_two();
        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            thread_count: 1,
            len: 0,
        }
    }

    fn maybe_grow(&mut self) {
        // Keep the average chain length under 2 entries.
        if self.len > self.buckets.len() * 2 {
            let new_count = self.buckets.len() * 2;
            let mut new_buckets: Vec<Vec<Entry>> =
                (0..new_count).map(|_| Vec::new()).collect();
            for bucket in self.buckets.drain(..) {
                for entry in bucket {
                    let idx = bucket_index(entry.id, new_count);
                    new_buckets[idx].push(entry);
                }
            }
            self.buckets = new_buckets;
        }
    }

    /// Inserts a fresh entry for `id`, with `thread_count()` per-thread
    /// scratch slots. No-op if an entry already exists.
    pub fn insert(&mut self, id: DeviceId) {
        let idx = bucket_index(id, self.buckets.len());
        if self.buckets[idx].iter().any(|e| e.id == id) {
            return;
        }
        self.buckets[idx].push(Entry {
            id,
            shared: SharedState::default(),
            threads: vec![ThreadState::default(); self.thread_count],
        });
        self.len += 1;
        self.maybe_grow();
    }

    /// Removes the entry for `id`, if present.
    pub fn remove(&mut self, id: DeviceId) {
        let idx = bucket_index(id, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        if let Some(pos) = bucket.iter().position(|e| e.id == id) {
            bucket.remove(pos);
            self.len -= 1;
        }
    }

    fn entry(&self, id: DeviceId) -> Option<&Entry> {
        let idx = bucket_index(id, self.buckets.len());
        self.buckets[idx].iter().find(|e| e.id == id)
    }

    fn entry_mut(&mut self, id: DeviceId) -> Option<&mut Entry> {
        let idx = bucket_index(id, self.buckets.len());
        self.buckets[idx].iter_mut().find(|e| e.id == id)
    }

    /// Shared state for `id`, if an entry exists.
    pub fn shared(&self, id: DeviceId) -> Option<&SharedState> {
        self.entry(id).map(|e| &e.shared)
    }

    /// Mutable shared state for `id`, if an entry exists.
    pub fn shared_mut(&mut self, id: DeviceId) -> Option<&mut SharedState> {
        self.entry_mut(id).map(|e| &mut e.shared)
    }

    /// Per-thread scratch state for `id`/`thread_idx`, if both exist.
    pub fn thread_state(&self, id: DeviceId, thread_idx: usize) -> Option<&ThreadState> {
        self.entry(id).and_then(|e| e.threads.get(thread_idx))
    }

    /// Mutable per-thread scratch state for `id`/`thread_idx`, if both
    /// exist.
    pub fn thread_state_mut(
        &mut self,
        id: DeviceId,
        thread_idx: usize,
    ) -> Option<&mut ThreadState> {
        self.entry_mut(id).and_then(|e| e.threads.get_mut(thread_idx))
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the registry holds no devices.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets the number of render worker threads, reallocating every
    /// device's per-thread scratch state array as needed. Clamped to
    /// [`MAX_THREADS`].
    pub fn set_thread_count(&mut self, count: usize) {
        let count = count.clamp(1, MAX_THREADS);
        self.thread_count = count;
        for bucket in &mut self.buckets {
            for entry in bucket.iter_mut() {
                entry.threads.resize(count, ThreadState::default());
            }
        }
    }

    /// Current render worker thread count.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Fan-out: applies a new audio rate to every registered device's
    /// shared state.
    pub fn set_audio_rate(&mut self, rate: f64) {
        for bucket in &mut self.buckets {
            for entry in bucket.iter_mut() {
                entry.shared.audio_rate = rate;
            }
        }
    }

    /// Fan-out: applies a new buffer size to every registered device's
    /// shared state.
    pub fn set_buffer_size(&mut self, size: usize) {
        for bucket in &mut self.buckets {
            for entry in bucket.iter_mut() {
                entry.shared.buffer_size = size;
            }
        }
    }

    /// Fan-out: applies a new tempo to every registered device's shared
    /// state.
    pub fn set_tempo(&mut self, tempo: f64) {
        for bucket in &mut self.buckets {
            for entry in bucket.iter_mut() {
                entry.shared.tempo = tempo;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_round_trips() {
        let mut states = DeviceStates::new(4);
        let id = DeviceId::from_raw(1);
        states.insert(id);
        assert!(states.shared(id).is_some());
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn remove_drops_entry() {
        let mut states = DeviceStates::new(4);
        let id = DeviceId::from_raw(1);
        states.insert(id);
        states.remove(id);
        assert!(states.shared(id).is_none());
        assert_eq!(states.len(), 0);
    }

    #[test]
    fn grows_past_initial_bucket_count() {
        let mut states = DeviceStates::new(2);
        for i in 1..=20u32 {
            states.insert(DeviceId::from_raw(i));
        }
        assert_eq!(states.len(), 20);
        for i in 1..=20u32 {
            assert!(states.shared(DeviceId::from_raw(i)).is_some());
        }
    }

    #[test]
    fn set_audio_rate_fans_out_to_every_device() {
        let mut states = DeviceStates::new(4);
        let a = DeviceId::from_raw(1);
        let b = DeviceId::from_raw(2);
        states.insert(a);
        states.insert(b);
        states.set_audio_rate(96000.0);
        assert_eq!(states.shared(a).unwrap().audio_rate, 96000.0);
        assert_eq!(states.shared(b).unwrap().audio_rate, 96000.0);
    }

    #[test]
    fn set_thread_count_resizes_existing_entries() {
        let mut states = DeviceStates::new(4);
        let id = DeviceId::from_raw(1);
        states.insert(id);
        states.set_thread_count(4);
        assert!(states.thread_state(id, 3).is_some());
        assert!(states.thread_state(id, 4).is_none());
    }

    #[test]
    fn thread_count_clamped_to_max() {
        let mut states = DeviceStates::new(4);
        states.set_thread_count(1000);
        assert_eq!(states.thread_count(), MAX_THREADS);
    }
}
