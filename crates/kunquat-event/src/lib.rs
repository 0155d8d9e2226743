//! The Kunquat event system: the closed event-name catalogue, the
//! per-channel event cache, the declarative bind map and control-variable
//! bindings, and the small expression evaluator both bind predicates and
//! control-var targets share.

pub mod bind;
pub mod cache;
pub mod control_var;
pub mod expr;
pub mod names;
pub mod rng;
pub mod value;

pub use bind::{Bind, BindError, Constraint, EntrySpec, Item, ItemSpec, TargetEvent, MAX_CHANNELS};
pub use cache::EventCache;
pub use control_var::{Binding, ControlVar, ControlVarIter, SetOperation, TargetDevice, VarType};
pub use expr::{Expr, ExprError};
pub use names::{lookup, validate, Category, EventDescriptor, CATALOGUE};
pub use rng::Rng;
pub use value::{PatternLoc, Value, ValueType};
