//! The typed value an event argument, a cache slot or an expression
//! evaluates to.
//!
//! Grounded in `Event_handler.c`'s pervasive `Value*` argument passing
//! (the `Value.h` tagged union it `#include`s is not itself present in
//! the retrieved source set), generalised to an exhaustive Rust `enum`
//! per the workspace's REDESIGN FLAGS preference for tagged variants over
//! a type tag plus untagged union.

use kunquat_core::Tstamp;

/// The closed set of parameter types an event argument or cache value can
/// carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No argument.
    None,
    Bool,
    Int,
    Float,
    Tstamp,
    String,
    /// A real number used by expressions not tied to a fixed-point value
    /// type (distinguished from `Float` per §4.9's parameter-type tag
    /// list).
    Real,
    /// A playback position: `(subsong, section, pattern, row Tstamp)`.
    PatternLoc,
    /// A realtime duration in nanoseconds.
    Realtime,
}

/// A playback location: subsong, section index and a row position within
/// the section's pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternLoc {
    pub subsong: i16,
    pub section: i16,
    pub row: Tstamp,
}

/// A typed runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Tstamp(Tstamp),
    String(String),
    Real(f64),
    PatternLoc(PatternLoc),
    /// Nanoseconds.
    Realtime(i64),
}

impl Value {
    /// The parameter-type tag this value carries.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Tstamp(_) => ValueType::Tstamp,
            Value::String(_) => ValueType::String,
            Value::Real(_) => ValueType::Real,
            Value::PatternLoc(_) => ValueType::PatternLoc,
            Value::Realtime(_) => ValueType::Realtime,
        }
    }

    /// Interprets the value as an `f64`, for numeric conversion rules
    /// shared by the expression evaluator and the control-var converter
    /// (§4.11): bool maps to 0/1, tstamp to its beat count, int/float/real
    /// pass through.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) | Value::Real(f) => Some(*f),
            Value::Tstamp(t) => Some(t.as_f64_beats()),
            Value::Realtime(ns) => Some(*ns as f64),
            Value::String(_) | Value::PatternLoc(_) => None,
        }
    }

    /// Interprets the value as a `bool`: zero/non-zero for numeric types,
    /// identity for `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => self.as_f64().map(|f| f != 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_converts_to_zero_or_one() {
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Bool(false).as_f64(), Some(0.0));
    }

    #[test]
    fn tstamp_converts_to_beat_count() {
        let v = Value::Tstamp(Tstamp::new(2, 0));
        assert_eq!(v.as_f64(), Some(2.0));
    }

    #[test]
    fn string_has_no_numeric_conversion() {
        assert_eq!(Value::String("x".into()).as_f64(), None);
    }
}
