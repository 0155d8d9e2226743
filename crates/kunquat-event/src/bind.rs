//! The bind map: a declarative trigger-to-cascade table gated by
//! predicates, plus its load-time three-colour-DFS cycle rejection.
//!
//! Grounded directly in `init/Bind.c`'s `Cblist`/`Cblist_item`/`Constraint`/
//! `Target_event` chain and its `SOURCE_STATE_NEW`/`REACHED`/`VISITED`
//! cycle check. The teacher's singly-linked `Cblist_item` chains become
//! plain `Vec`s here — an Item's target list never needs identity or
//! in-place splicing once built, so a `Vec` is the idiomatic stand-in for
//! the arena-of-indices pattern this crate otherwise prefers for
//! cyclic/self-referential structures.
//!
//! Per §9's open question, this module implements the newer `Bind`
//! signature exactly; the deprecated parallel `Call_map` implementation is
//! not modeled.

use std::collections::HashMap;

use crate::cache::EventCache;
use crate::expr::{Expr, ExprError};
use crate::rng::Rng;
use crate::value::Value;

/// Maximum channel count a bind's channel offset wraps against (§4.10,
/// §4.13: "modulo MAX_CHANNELS").
pub const MAX_CHANNELS: i32 = 64;

/// A failure while building a [`Bind`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("Bind contains a cycle")]
    Cycle,
    #[error("invalid predicate expression: {0}")]
    BadExpr(#[from] ExprError),
}

/// One predicate constraint: an event name to read from the cache and an
/// expression over its (and other) cached values.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub event_name: String,
    pub expr: Expr,
}

/// One cascade target: a channel offset (applied modulo [`MAX_CHANNELS`]
/// at dispatch time) and the event to emit, whose argument is computed by
/// evaluating `arg_expr` against the triggering value.
#[derive(Clone, Debug)]
pub struct TargetEvent {
    pub channel_offset: i32,
    pub event_name: String,
    pub arg_expr: Expr,
}

/// One bind item: a conjunction of constraints gating a list of cascade
/// targets.
#[derive(Clone, Debug, Default)]
pub struct Item {
    pub constraints: Vec<Constraint>,
    pub targets: Vec<TargetEvent>,
}

/// A single entry in an unparsed bind specification: fed to [`Bind::new`].
pub struct EntrySpec {
    pub trigger: String,
    pub items: Vec<ItemSpec>,
}

/// An unparsed bind item: string expressions, parsed during construction.
pub struct ItemSpec {
    pub constraints: Vec<(String, String)>,
    pub targets: Vec<(i32, String, String)>,
}

/// The bind map: for each distinct trigger event name, an ordered list of
/// items.
pub struct Bind {
    entries: HashMap<String, Vec<Item>>,
}

impl Bind {
    /// Builds a bind map from `specs`, parsing every constraint and target
    /// argument expression and rejecting the whole map if any trigger can
    /// reach itself through a chain of targets.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::BadExpr`] if any expression fails to parse, or
    /// [`BindError::Cycle`] if the trigger/target graph has a cycle.
    pub fn new(specs: Vec<EntrySpec>) -> Result<Bind, BindError> {
        let mut entries: HashMap<String, Vec<Item>> = HashMap::new();
        for spec in specs {
            let mut items = Vec::with_capacity(spec.items.len());
            for item_spec in spec.items {
                let mut constraints = Vec::with_capacity(item_spec.constraints.len());
                for (event_name, expr_src) in item_spec.constraints {
                    constraints.push(Constraint {
                        event_name,
                        expr: Expr::parse(&expr_src)?,
                    });
                }
                let mut targets = Vec::with_capacity(item_spec.targets.len());
                for (channel_offset, event_name, arg_src) in item_spec.targets {
                    targets.push(TargetEvent {
                        channel_offset,
                        event_name,
                        arg_expr: Expr::parse(&arg_src)?,
                    });
                }
                items.push(Item {
                    constraints,
                    targets,
                });
            }
            entries.entry(spec.trigger).or_default().extend(items);
        }

        let bind = Bind { entries };
        if bind.is_cyclic() {
            return Err(BindError::Cycle);
        }
        Ok(bind)
    }

    /// Walks every item once, pre-registering each constraint's event name
    /// in a fresh [`EventCache`] so dispatch-time lookups never need to
    /// grow the cache's backing map.
    pub fn create_cache(&self) -> EventCache {
        let mut cache = EventCache::new();
        for items in self.entries.values() {
            for item in items {
                for constraint in &item.constraints {
                    cache.register(&constraint.event_name);
                }
            }
        }
        cache
    }

    /// Updates `cache` with `(trigger_name -> value)`, then returns the
    /// target list of the first item whose constraints all evaluate true
    /// against the cache (and `value` as `$`).
    pub fn first_match(
        &self,
        cache: &mut EventCache,
        trigger_name: &str,
        value: &Value,
        rng: &mut Rng,
    ) -> Option<&[TargetEvent]> {
        cache.update(trigger_name, value.clone());

        let items = self.entries.get(trigger_name)?;
        let lookup = |name: &str| cache.get(name).cloned();

        'items: for item in items {
            for constraint in &item.constraints {
                let matched = constraint
                    .expr
                    .eval(value, &lookup, rng)
                    .ok()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if !matched {
                    continue 'items;
                }
            }
            return Some(&item.targets);
        }
        None
    }

    /// Three-colour DFS over the graph whose edges go from each trigger to
    /// every target event name any of its items reference, exactly
    /// mirroring `Bind_is_cyclic`/`Bind_dfs`.
    fn is_cyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            New,
            Reached,
            Visited,
        }

        fn dfs(bind: &Bind, name: &str, state: &mut HashMap<String, State>) -> bool {
            match state.get(name) {
                Some(State::Visited) => return false,
                Some(State::Reached) => return true,
                Some(State::New) | None => {}
            }
            state.insert(name.to_string(), State::Reached);

            if let Some(items) = bind.entries.get(name) {
                for item in items {
                    for target in &item.targets {
                        if dfs(bind, &target.event_name, state) {
                            return true;
                        }
                    }
                }
            }

            state.insert(name.to_string(), State::Visited);
            false
        }

        let mut state: HashMap<String, State> = HashMap::new();
        for name in self.entries.keys() {
            state.entry(name.clone()).or_insert(State::New);
        }
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in names {
            if state.get(&name).copied() == Some(State::New) {
                if dfs(self, &name, &mut state) {
                    return true;
                }
            }
        }
        false
    }

    /// Number of distinct trigger names bound.
    pub fn trigger_count(&self) -> usize {
        self.entries.len()
    }
}
