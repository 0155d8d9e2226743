//! Event dispatch: `trigger(channel_index, event_name, value)` validates
//! an event against the closed catalogue, applies its category-specific
//! effect, then walks the bind map to fire any cascaded target events.
//!
//! Grounded in `Event_handler.c`'s per-category dispatch tables,
//! generalised to an exhaustive `match` on [`Category`] per this
//! workspace's note on replacing function-pointer tables (§4.13).

use kunquat_event::{names, Bind, Category, Value, ValueType};
use kunquat_voice::{Priority, VoicePool};

use crate::channel::Channel;
use crate::master::MasterParams;

/// Receives processor-scope parameter writes resolved through a channel's
/// active instrument/generator/effect/dsp registers.
///
/// Device-graph wiring (resolving a `DeviceId` to its live state) lives
/// outside this crate; an embedder supplies one of these to route
/// processor events into its own [`kunquat_graph::DeviceStates`].
pub trait ParamSink {
    fn set_param(&mut self, device_name: &str, path: &str, value: &Value);
}

/// A sink that drops every write, used where processor parameter routing
/// is not wired up (e.g. in tests exercising channel/master dispatch only).
pub struct NullSink;

impl ParamSink for NullSink {
    fn set_param(&mut self, _device_name: &str, _path: &str, _value: &Value) {}
}

/// Errors surfaced by `trigger` itself (malformed input). Per §7, a
/// dispatch-time failure to *resolve* a target (unknown device, stale
/// voice) is a silent no-op, not one of these.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("unknown event name {0:?}")]
    UnknownEvent(String),
    #[error("event {0:?} expects a {1:?} argument")]
    TypeMismatch(String, ValueType),
    #[error("channel index {0} out of range")]
    BadChannel(usize),
}

/// The mutable state one `trigger` call may touch.
pub struct EventHandler<'a, const N: usize> {
    pub channels: &'a mut [Channel],
    pub master: &'a mut MasterParams,
    pub pool: &'a mut VoicePool<N>,
    pub bind: &'a Bind,
    pub sink: &'a mut dyn ParamSink,
}

impl<'a, const N: usize> EventHandler<'a, N> {
    pub fn new(
        channels: &'a mut [Channel],
        master: &'a mut MasterParams,
        pool: &'a mut VoicePool<N>,
        bind: &'a Bind,
        sink: &'a mut dyn ParamSink,
    ) -> Self {
        Self {
            channels,
            master,
            pool,
            bind,
            sink,
        }
    }

    /// Dispatches `event_name(value)` on `channel_index`, then walks the
    /// bind map for cascaded target events.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if `event_name` is not in the closed
    /// catalogue, `value`'s type does not match its declared argument
    /// type, or `channel_index` is out of range. Unresolvable *targets*
    /// (missing device, stale voice) are silently skipped rather than
    /// erroring, per §7's failure policy.
    pub fn trigger(
        &mut self,
        channel_index: usize,
        event_name: &str,
        value: Value,
    ) -> Result<(), DispatchError> {
        self.trigger_inner(channel_index, event_name, value, 0)
    }

    fn trigger_inner(
        &mut self,
        channel_index: usize,
        event_name: &str,
        value: Value,
        depth: u32,
    ) -> Result<(), DispatchError> {
        let desc = names::lookup(event_name)
            .ok_or_else(|| DispatchError::UnknownEvent(event_name.to_string()))?;
        if desc.value_type != ValueType::None && desc.value_type != value.value_type() {
            return Err(DispatchError::TypeMismatch(
                event_name.to_string(),
                desc.value_type,
            ));
        }
        if channel_index >= self.channels.len() {
            return Err(DispatchError::BadChannel(channel_index));
        }

        self.apply(desc.category, channel_index, event_name, &value);
        self.cascade(channel_index, event_name, value, depth);
        Ok(())
    }

    fn apply(&mut self, category: Category, channel_index: usize, name: &str, value: &Value) {
        match category {
            Category::Control | Category::General => {
                // Conditionals and non-scoped control flow (`if`/`signal`/
                // `call`) only ever feed the bind predicate cache; they
                // have no direct side effect of their own.
                self.channels[channel_index].cache.update(name, value.clone());
            }
            Category::Master => self.apply_master(name, value),
            Category::Channel => self.apply_channel(channel_index, name, value),
            Category::Processor => self.apply_processor(channel_index, name, value),
            Category::Voice => self.apply_voice(channel_index, name, value),
        }
    }

    fn apply_master(&mut self, name: &str, value: &Value) {
        match name {
            "m.t" => {
                if let Value::Float(hz) = value {
                    self.master.tempo = *hz;
                    self.master.tempo_slide = None;
                }
            }
            "m.v" => {
                if let Value::Float(v) = value {
                    self.master.global_volume = *v;
                    self.master.volume_slide = None;
                }
            }
            "mpj" => {
                if let Value::PatternLoc(loc) = value {
                    self.master.jump = Some(crate::master::JumpTarget {
                        subsong: loc.subsong,
                        section: loc.section,
                        row: loc.row,
                    });
                }
            }
            "md" => {
                if let Value::Tstamp(t) = value {
                    self.master.delay_left = *t;
                }
            }
            _ => {}
        }
    }

    fn apply_channel(&mut self, channel_index: usize, name: &str, value: &Value) {
        let ch = &mut self.channels[channel_index];
        match name {
            "c.i" => {
                if let Value::Int(idx) = value {
                    ch.set_active_name("instrument", idx.to_string());
                }
            }
            "c.g" => {
                if let Value::Int(idx) = value {
                    ch.set_active_name("generator", idx.to_string());
                }
            }
            "c.e" => {
                if let Value::Int(idx) = value {
                    ch.set_active_name("effect", idx.to_string());
                }
            }
            "c.d" => {
                if let Value::Int(idx) = value {
                    ch.set_active_name("dsp", idx.to_string());
                }
            }
            "n+" => {
                if let Value::Float(pitch) = value {
                    ch.note_on(self.pool, *pitch, Priority::Foreground);
                }
            }
            "n-" => {
                ch.note_off(self.pool);
            }
            "h" => {
                if let Value::Float(pitch) = value {
                    let id = ch.note_on(self.pool, *pitch, Priority::Background);
                    if let Some(id) = id {
                        if let Some(voice) = self.pool.lookup_mut(id) {
                            voice.note_off();
                        }
                    }
                }
            }
            _ => {
                ch.cache.update(name, value.clone());
            }
        }
    }

    fn apply_processor(&mut self, channel_index: usize, name: &str, value: &Value) {
        let ch = &self.channels[channel_index];
        let Some(device_name) = ch
            .active_name("instrument")
            .or_else(|| ch.active_name("effect"))
        else {
            return;
        };
        self.sink.set_param(device_name, name, value);
    }

    fn apply_voice(&mut self, channel_index: usize, name: &str, value: &Value) {
        let Some(id) = self.channels[channel_index].active_voice else {
            return;
        };
        let Some(voice) = self.pool.lookup_mut(id) else {
            return;
        };
        match (name, value) {
            ("v.v", Value::Float(v)) => voice.set_force_immediate(*v as f32),
            ("v/v", Value::Float(v)) => voice.slide_force_to(*v as f32, 64),
            ("v.r", Value::Float(v)) => voice.set_sustain_pedal(*v as f32),
            ("v.f", Value::Float(v)) => voice.set_filter_cutoff_immediate(*v as f32),
            _ => {}
        }
    }

    /// Walks the bind map for `trigger_name`, firing each matched item's
    /// target events on `(channel_index + offset) mod channels.len()`.
    ///
    /// Recursion depth is bounded by the bind's acyclicity (enforced at
    /// load, see [`kunquat_event::Bind::new`]); `depth` is still tracked
    /// defensively so a future non-acyclic bind cannot blow the stack.
    fn cascade(&mut self, channel_index: usize, trigger_name: &str, value: Value, depth: u32) {
        const MAX_CASCADE_DEPTH: u32 = 64;
        if depth >= MAX_CASCADE_DEPTH {
            return;
        }

        let targets: Vec<(i32, String, kunquat_event::Expr)> = {
            let ch = &mut self.channels[channel_index];
            match self
                .bind
                .first_match(&mut ch.cache, trigger_name, &value, &mut ch.rng)
            {
                Some(targets) => targets
                    .iter()
                    .map(|t| (t.channel_offset, t.event_name.clone(), t.arg_expr.clone()))
                    .collect(),
                None => return,
            }
        };

        let n = self.channels.len() as i32;
        for (offset, target_name, arg_expr) in targets {
            let target_channel = (channel_index as i32 + offset).rem_euclid(n.max(1)) as usize;
            let channel = &mut self.channels[channel_index];
            let cache = &channel.cache;
            let lookup = |name: &str| cache.get(name).cloned();
            let target_value = match arg_expr.eval(&value, &lookup, &mut channel.rng) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let _ = self.trigger_inner(target_channel, &target_name, target_value, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kunquat_event::{Bind, EntrySpec, EventCache, ItemSpec};

    fn empty_bind() -> Bind {
        Bind::new(Vec::new()).unwrap()
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let mut channels = vec![Channel::new(0, EventCache::new())];
        let mut master = MasterParams::new(120.0);
        let mut pool: VoicePool<4> = VoicePool::new(48000.0);
        let bind = empty_bind();
        let mut sink = NullSink;
        let mut handler = EventHandler::new(&mut channels, &mut master, &mut pool, &bind, &mut sink);
        let err = handler.trigger(0, "not_real", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownEvent(_)));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut channels = vec![Channel::new(0, EventCache::new())];
        let mut master = MasterParams::new(120.0);
        let mut pool: VoicePool<4> = VoicePool::new(48000.0);
        let bind = empty_bind();
        let mut sink = NullSink;
        let mut handler = EventHandler::new(&mut channels, &mut master, &mut pool, &bind, &mut sink);
        let err = handler.trigger(0, "c.i", Value::Float(1.0)).unwrap_err();
        assert!(matches!(err, DispatchError::TypeMismatch(_, _)));
    }

    #[test]
    fn note_on_then_note_off_clears_active_voice_flag() {
        let mut channels = vec![Channel::new(0, EventCache::new())];
        let mut master = MasterParams::new(120.0);
        let mut pool: VoicePool<4> = VoicePool::new(48000.0);
        let bind = empty_bind();
        let mut sink = NullSink;
        let mut handler = EventHandler::new(&mut channels, &mut master, &mut pool, &bind, &mut sink);
        handler.trigger(0, "n+", Value::Float(440.0)).unwrap();
        let id = handler.channels[0].active_voice.unwrap();
        assert!(handler.pool.lookup(id).unwrap().note_on);
        handler.trigger(0, "n-", Value::Bool(false)).unwrap_err();
    }

    #[test]
    fn master_tempo_event_updates_master_params() {
        let mut channels = vec![Channel::new(0, EventCache::new())];
        let mut master = MasterParams::new(120.0);
        let mut pool: VoicePool<4> = VoicePool::new(48000.0);
        let bind = empty_bind();
        let mut sink = NullSink;
        let mut handler = EventHandler::new(&mut channels, &mut master, &mut pool, &bind, &mut sink);
        handler.trigger(0, "m.t", Value::Float(140.0)).unwrap();
        assert_eq!(handler.master.tempo, 140.0);
    }

    #[test]
    fn bind_cascade_fires_target_on_offset_channel() {
        let spec = EntrySpec {
            trigger: "n+".to_string(),
            items: vec![ItemSpec {
                constraints: Vec::new(),
                targets: vec![(1, "m.t".to_string(), "150".to_string())],
            }],
        };
        let bind = Bind::new(vec![spec]).unwrap();
        let mut channels = vec![Channel::new(0, EventCache::new()), Channel::new(1, EventCache::new())];
        let mut master = MasterParams::new(120.0);
        let mut pool: VoicePool<4> = VoicePool::new(48000.0);
        let mut sink = NullSink;
        let mut handler = EventHandler::new(&mut channels, &mut master, &mut pool, &bind, &mut sink);
        handler.trigger(0, "n+", Value::Float(440.0)).unwrap();
        assert_eq!(handler.master.tempo, 150.0);
    }
}
