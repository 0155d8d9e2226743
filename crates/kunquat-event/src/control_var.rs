//! Per-audio-unit control-variable bindings (§4.11): a typed variable
//! whose value fans out to a list of target-device parameter expressions.
//!
//! Grounded in `init/devices/Au_control_vars.c`'s `Var_entry`/`Bind_entry`
//! chain and `Au_control_var_iter`, generalised from a `Target_dev_type`
//! enum (`TARGET_DEV_AU`/`TARGET_DEV_PROC`) plus a raw index into a small
//! `TargetDevice` enum.

use crate::expr::{Expr, ExprError};
use crate::rng::Rng;
use crate::value::{Value, ValueType};

/// A control-variable's declared type, per §3's `Au_control_var`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarType {
    Bool,
    Int,
    Float,
    Tstamp,
}

/// Which device a binding's target parameter lives on, generalised from
/// `TARGET_DEV_AU`/`TARGET_DEV_PROC`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDevice {
    /// A sub-audio-unit, addressed by its index within the parent.
    AudioUnit(u16),
    /// A processor (generator/DSP), addressed by its index.
    Processor(u16),
}

/// One target binding: a device, a parameter path on it, the value type it
/// expects, and the expression (over `$`, the new control-var value) that
/// produces the value to set.
#[derive(Clone, Debug)]
pub struct Binding {
    pub target_device: TargetDevice,
    pub target_param_path: String,
    pub target_type: ValueType,
    pub expr: Expr,
}

/// A concrete parameter write a [`ControlVar`]'s evaluation yields.
#[derive(Clone, Debug, PartialEq)]
pub struct SetOperation {
    pub target_device: TargetDevice,
    pub target_param_path: String,
    pub value: Value,
}

/// A single control-variable declaration: type, initial value and its
/// target bindings.
pub struct ControlVar {
    pub name: String,
    pub var_type: VarType,
    pub initial: Value,
    pub bindings: Vec<Binding>,
}

/// Converts `value` to `target_type` following §4.11's conversion rules:
/// numeric types interconvert via identity/truncation/widening, bool maps
/// to 0/1, tstamp arithmetic is honoured by keeping `Value::Tstamp` as-is
/// when the target is `Tstamp`.
fn convert(value: Value, target_type: ValueType) -> Result<Value, ExprError> {
    match target_type {
        ValueType::Bool => Ok(Value::Bool(value.as_bool().ok_or_else(|| {
            ExprError::TypeError("cannot convert to bool".into())
        })?)),
        ValueType::Int => Ok(Value::Int(value.as_f64().ok_or_else(|| {
            ExprError::TypeError("cannot convert to int".into())
        })? as i64)),
        ValueType::Float | ValueType::Real => Ok(Value::Float(value.as_f64().ok_or_else(
            || ExprError::TypeError("cannot convert to float".into()),
        )?)),
        ValueType::Tstamp => match value {
            Value::Tstamp(t) => Ok(Value::Tstamp(t)),
            other => Err(ExprError::TypeError(format!(
                "cannot convert {other:?} to tstamp"
            ))),
        },
        ValueType::String | ValueType::PatternLoc | ValueType::Realtime | ValueType::None => {
            Err(ExprError::TypeError(
                "control-var targets do not support this type".into(),
            ))
        }
    }
}

impl ControlVar {
    /// Creates a new control-variable declaration.
    pub fn new(name: impl Into<String>, var_type: VarType, initial: Value) -> Self {
        Self {
            name: name.into(),
            var_type,
            initial,
            bindings: Vec::new(),
        }
    }

    /// Adds a target binding.
    pub fn bind(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Walks every binding for a new value, yielding one [`SetOperation`]
    /// per binding. Independent of any other concurrent evaluation — the
    /// value is consumed by reference and no iterator state is shared, so
    /// multiple walks for distinct updates can run interleaved.
    pub fn evaluate(
        &self,
        new_value: &Value,
        rng: &mut Rng,
    ) -> Result<Vec<SetOperation>, ExprError> {
        let no_vars = |_: &str| None;
        let mut ops = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let raw = binding.expr.eval(new_value, &no_vars, rng)?;
            let converted = convert(raw, binding.target_type)?;
            ops.push(SetOperation {
                target_device: binding.target_device,
                target_param_path: binding.target_param_path.clone(),
                value: converted,
            });
        }
        Ok(ops)
    }

    /// A streaming iterator over the same walk `evaluate` performs eagerly,
    /// grounded in `Au_control_var_iter`'s step-by-step binding walk.
    pub fn iter_ops<'a>(&'a self, new_value: &'a Value, rng: &'a mut Rng) -> ControlVarIter<'a> {
        ControlVarIter {
            bindings: self.bindings.iter(),
            new_value,
            rng,
        }
    }
}

/// A streaming walk over one [`ControlVar`]'s bindings for a single new
/// value.
pub struct ControlVarIter<'a> {
    bindings: std::slice::Iter<'a, Binding>,
    new_value: &'a Value,
    rng: &'a mut Rng,
}

impl<'a> Iterator for ControlVarIter<'a> {
    type Item = Result<SetOperation, ExprError>;

    fn next(&mut self) -> Option<Self::Item> {
        let binding = self.bindings.next()?;
        let no_vars = |_: &str| None;
        let result = binding
            .expr
            .eval(self.new_value, &no_vars, self.rng)
            .and_then(|raw| convert(raw, binding.target_type))
            .map(|value| SetOperation {
                target_device: binding.target_device,
                target_param_path: binding.target_param_path.clone(),
                value,
            });
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_var() -> ControlVar {
        let mut cv = ControlVar::new("vibrato_depth", VarType::Float, Value::Float(0.0));
        cv.bind(Binding {
            target_device: TargetDevice::Processor(0),
            target_param_path: "p_f_depth.json".to_string(),
            target_type: ValueType::Float,
            expr: Expr::parse("$ * 2").unwrap(),
        });
        cv.bind(Binding {
            target_device: TargetDevice::AudioUnit(1),
            target_param_path: "p_b_enabled.json".to_string(),
            target_type: ValueType::Bool,
            expr: Expr::parse("$ > 0").unwrap(),
        });
        cv
    }

    #[test]
    fn evaluate_yields_one_set_op_per_binding() {
        let cv = make_var();
        let mut rng = Rng::new(1);
        let ops = cv.evaluate(&Value::Float(0.25), &mut rng).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].value, Value::Float(0.5));
        assert_eq!(ops[1].value, Value::Bool(true));
    }

    #[test]
    fn iterator_and_eager_evaluate_agree() {
        let cv = make_var();
        let mut rng_a = Rng::new(1);
        let eager = cv.evaluate(&Value::Float(0.25), &mut rng_a).unwrap();

        let mut rng_b = Rng::new(1);
        let input = Value::Float(0.25);
        let streamed: Vec<SetOperation> = cv
            .iter_ops(&input, &mut rng_b)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(eager, streamed);
    }

    #[test]
    fn independent_walks_do_not_interfere() {
        let cv = make_var();
        let mut rng1 = Rng::new(1);
        let mut rng2 = Rng::new(2);
        let a = cv.evaluate(&Value::Float(1.0), &mut rng1).unwrap();
        let b = cv.evaluate(&Value::Float(2.0), &mut rng2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn bool_target_converts_from_numeric() {
        let mut cv = ControlVar::new("gate", VarType::Bool, Value::Bool(false));
        cv.bind(Binding {
            target_device: TargetDevice::Processor(2),
            target_param_path: "p_b_x.json".to_string(),
            target_type: ValueType::Bool,
            expr: Expr::parse("$").unwrap(),
        });
        let mut rng = Rng::new(1);
        let ops = cv.evaluate(&Value::Int(0), &mut rng).unwrap();
        assert_eq!(ops[0].value, Value::Bool(false));
    }
}
