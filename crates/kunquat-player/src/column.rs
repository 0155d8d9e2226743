//! A musical-time-ordered event column: a `BTreeMap<Tstamp, Vec<Event>>`
//! wrapped with a version counter, the Rust stand-in for `Column.c`'s
//! `AAtree` of per-timestamp event lists plus its `Column_iter` version
//! check.
//!
//! Within one Tstamp bucket, insertion order is preserved (a stable
//! `Vec`, matching `Event_list`'s FIFO order).

use std::collections::BTreeMap;

use kunquat_core::Tstamp;
use kunquat_event::Value;

/// A single scheduled event: a catalogue name plus its argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub value: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Event {
            name: name.into(),
            value,
        }
    }
}

/// A time-ordered multiset of events: one [`Column`] per channel, plus one
/// for the pattern's global events.
///
/// `version` increments on every mutation; an [`ColumnIter`] built before
/// the last mutation is invalidated (checked on first use, matching
/// `Column_iter`'s stored version field).
#[derive(Default)]
pub struct Column {
    buckets: BTreeMap<Tstamp, Vec<Event>>,
    version: u64,
}

impl Column {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `event` at `pos`, appended after any existing events already
    /// scheduled at that exact position.
    pub fn insert(&mut self, pos: Tstamp, event: Event) {
        self.buckets.entry(pos).or_default().push(event);
        self.version += 1;
    }

    /// Removes every event at `pos`.
    pub fn clear_at(&mut self, pos: Tstamp) {
        if self.buckets.remove(&pos).is_some() {
            self.version += 1;
        }
    }

    /// Removes all events.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.version += 1;
    }

    /// The column's current version, bumped by every mutating call.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the column holds no events.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// An iterator starting at the first bucket whose position is
    /// `>= from`, snapshotting the current version.
    pub fn iter_from(&self, from: Tstamp) -> ColumnIter<'_> {
        ColumnIter {
            version: self.version,
            inner: self.buckets.range(from..),
            current: None,
        }
    }

    /// The position of the first bucket `>= from`, if any.
    pub fn next_pos_from(&self, from: Tstamp) -> Option<Tstamp> {
        self.buckets.range(from..).next().map(|(pos, _)| *pos)
    }
}

/// An iterator over `(Tstamp, &Event)` pairs in position order, ties
/// broken by insertion order within a bucket.
///
/// Panics on first use if the column has been mutated since the iterator
/// was created (`Column_iter`'s version-mismatch assertion).
pub struct ColumnIter<'a> {
    version: u64,
    inner: std::collections::btree_map::Range<'a, Tstamp, Vec<Event>>,
    current: Option<(Tstamp, std::slice::Iter<'a, Event>)>,
}

impl<'a> ColumnIter<'a> {
    /// Validates the iterator against `column`'s current version.
    ///
    /// # Panics
    ///
    /// Panics if `column` has been mutated since this iterator was built.
    pub fn assert_valid(&self, column: &Column) {
        assert_eq!(
            self.version,
            column.version(),
            "column iterator used after mutation"
        );
    }
}

impl<'a> Iterator for ColumnIter<'a> {
    type Item = (Tstamp, &'a Event);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((pos, iter)) = &mut self.current {
                if let Some(event) = iter.next() {
                    return Some((*pos, event));
                }
                self.current = None;
            }
            let (pos, events) = self.inner.next()?;
            self.current = Some((*pos, events.iter()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(name: &str) -> Event {
        Event::new(name, Value::Bool(true))
    }

    #[test]
    fn insertion_order_preserved_within_a_bucket() {
        let mut col = Column::new();
        let pos = Tstamp::new(1, 0);
        col.insert(pos, ev("a"));
        col.insert(pos, ev("b"));
        col.insert(pos, ev("c"));
        let names: Vec<&str> = col
            .iter_from(Tstamp::ZERO)
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn iteration_is_in_tstamp_order() {
        let mut col = Column::new();
        col.insert(Tstamp::new(2, 0), ev("late"));
        col.insert(Tstamp::new(0, 0), ev("early"));
        col.insert(Tstamp::new(1, 0), ev("mid"));
        let names: Vec<&str> = col
            .iter_from(Tstamp::ZERO)
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["early", "mid", "late"]);
    }

    #[test]
    fn iter_from_skips_earlier_positions() {
        let mut col = Column::new();
        col.insert(Tstamp::new(0, 0), ev("early"));
        col.insert(Tstamp::new(2, 0), ev("late"));
        let names: Vec<&str> = col
            .iter_from(Tstamp::new(1, 0))
            .map(|(_, e)| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["late"]);
    }

    #[test]
    fn mutation_bumps_version() {
        let mut col = Column::new();
        let v0 = col.version();
        col.insert(Tstamp::ZERO, ev("a"));
        assert!(col.version() > v0);
    }

    #[test]
    #[should_panic(expected = "used after mutation")]
    fn iterator_invalidated_by_mutation() {
        let mut col = Column::new();
        col.insert(Tstamp::ZERO, ev("a"));
        let iter = col.iter_from(Tstamp::ZERO);
        col.insert(Tstamp::new(1, 0), ev("b"));
        iter.assert_valid(&col);
    }
}
