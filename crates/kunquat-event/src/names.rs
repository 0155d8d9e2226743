//! The closed event taxonomy: category/kind split read from the
//! category-indexed dispatch tables in `Event_handler.c` (`ch_process`,
//! `master_process`, `generator_process`, … each sized `Event_*_STOP`),
//! generalised to an exhaustive Rust `match` per this workspace's
//! REDESIGN FLAGS note on callback tables.
//!
//! Every event name in the catalogue maps to a [`Category`] and a
//! [`ValueType`] it requires. Names outside the catalogue fail to parse
//! (a format error at load, not a dispatch-time failure).

use crate::value::ValueType;

/// The six event categories §4.9 groups names into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Conditionals evaluated against the environment (`#if`-style).
    Control,
    /// Non-scoped control flow: `if`/`else`/`end_if`, `signal`, `call`.
    General,
    /// Playback-wide parameters: tempo, volume, jump, pattern delay.
    Master,
    /// Per-channel parameters and note triggers.
    Channel,
    /// Per-processor (generator/DSP/effect) parameter sets.
    Processor,
    /// Voice-scoped variants of a subset of channel/processor events,
    /// applying to one already-acquired voice rather than the channel's
    /// next note.
    Voice,
}

/// One entry in the closed event catalogue: a name, its category and the
/// argument type it requires.
#[derive(Clone, Copy, Debug)]
pub struct EventDescriptor {
    pub name: &'static str,
    pub category: Category,
    pub value_type: ValueType,
}

macro_rules! catalogue {
    ($( $name:literal => $category:ident, $vt:ident );* $(;)?) => {
        &[
            $( EventDescriptor { name: $name, category: Category::$category, value_type: ValueType::$vt } ),*
        ]
    };
}

/// The full closed catalogue of event names.
///
/// Grounded in `events/Event_*_decl.h`'s per-category name lists; kept as
/// a flat table (rather than per-category tables chained by a v-table of
/// function pointers) so lookup is a single linear scan at load time
/// (names are resolved once into an [`EventKind`] index, never per-frame).
pub const CATALOGUE: &[EventDescriptor] = catalogue! {
    // Control
    "Ic" => Control, Bool;
    "Iand" => Control, Bool;
    "Ior" => Control, Bool;
    "Inot" => Control, Bool;
    "I=" => Control, Bool;
    "I!=" => Control, Bool;
    "I>" => Control, Bool;
    "I<" => Control, Bool;

    // General
    "?" => General, Bool;
    "?!" => General, None;
    "?[" => General, None;
    "]" => General, None;
    "sig" => General, String;
    "call" => General, String;

    // Master
    "mpa" => Master, Float;
    "mpan" => Master, Float;
    "m.t" => Master, Float;
    "m/t" => Master, Float;
    "m/=t" => Master, Float;
    "m.v" => Master, Float;
    "m/v" => Master, Float;
    "m/=v" => Master, Float;
    "mpj" => Master, PatternLoc;
    "md" => Master, Tstamp;

    // Channel
    "c.i" => Channel, Int;
    "c.g" => Channel, Int;
    "c.e" => Channel, Int;
    "c.d" => Channel, Int;
    "n+" => Channel, Float;
    "n-" => Channel, None;
    "h" => Channel, Float;
    "c.v" => Channel, Float;
    "c/v" => Channel, Float;
    "c/=v" => Channel, Float;
    "c.r" => Channel, Float;
    "c.Ap" => Channel, Float;
    "c.Af" => Channel, Float;

    // Processor
    "p.b" => Processor, Bool;
    "p.i" => Processor, Int;
    "p.f" => Processor, Float;
    "p.t" => Processor, Tstamp;

    // Voice-scope
    "v.v" => Voice, Float;
    "v/v" => Voice, Float;
    "v.r" => Voice, Float;
    "v.f" => Voice, Float;
};

/// Looks up an event by name in the closed catalogue.
pub fn lookup(name: &str) -> Option<&'static EventDescriptor> {
    CATALOGUE.iter().find(|d| d.name == name)
}

/// Validates that `value`'s type matches the declared parameter type for
/// `name`, returning the descriptor on success.
///
/// # Errors
///
/// Returns `Err` with a message if the name is not in the catalogue or the
/// value's type does not match.
pub fn validate<'a>(
    name: &str,
    value_type: ValueType,
) -> Result<&'static EventDescriptor, &'static str> {
    let desc = lookup(name).ok_or("unknown event name")?;
    if desc.value_type != value_type && desc.value_type != ValueType::None {
        return Err("argument type mismatch");
    }
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_event_resolves_category_and_type() {
        let d = lookup("c.i").unwrap();
        assert_eq!(d.category, Category::Channel);
        assert_eq!(d.value_type, ValueType::Int);
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        assert!(lookup("not_a_real_event").is_none());
    }

    #[test]
    fn validate_rejects_type_mismatch() {
        assert!(validate("c.i", ValueType::Float).is_err());
        assert!(validate("c.i", ValueType::Int).is_ok());
    }
}
