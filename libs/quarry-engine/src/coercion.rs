//! Coercion rules.
//!
//! Pure functions deciding which conversion path applies to a
//! `(value, target)` pair, plus the numeric widening/narrowing table used by
//! both the conversion engine and the standard backend.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use quarry_api::value::{Value, ValueType};

/// Conversion path for a `(value, target)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPath {
    /// `Null` converts to `Null` for every target.
    Null,
    /// Value already has the exact target type.
    Identity,
    /// Numeric value, numeric/bool/string target, handled by [`coerce_number`].
    Numeric,
    /// Everything else goes to the generic backend.
    Backend,
}

/// Exact runtime-type equality. `Null` never matches.
pub fn is_same_class(value: &Value, target: &ValueType) -> bool {
    value.value_type().as_ref() == Some(target)
}

/// Whether the numeric table has a rule for `target`.
pub fn is_numeric_target(target: &ValueType) -> bool {
    target.is_numeric() || matches!(target, ValueType::Bool | ValueType::String)
}

pub fn resolve(value: &Value, target: &ValueType) -> CoercionPath {
    if value.is_null() {
        CoercionPath::Null
    } else if is_same_class(value, target) {
        CoercionPath::Identity
    } else if value.is_numeric() && is_numeric_target(target) {
        CoercionPath::Numeric
    } else {
        CoercionPath::Backend
    }
}

// ---------------------------------------------------------------------------
// Numeric table
// ---------------------------------------------------------------------------

/// Numeric source view: every numeric `Value` collapses into one of three
/// exact representations before the target rule is applied.
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
    /// Kept narrow so decimal conversion uses the f32's own shortest text.
    Single(f32),
    Dec(Decimal),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        let n = match value {
            Value::I8(v) => Self::Int(i64::from(*v)),
            Value::I16(v) => Self::Int(i64::from(*v)),
            Value::I32(v) => Self::Int(i64::from(*v)),
            Value::I64(v) => Self::Int(*v),
            Value::F32(v) => Self::Single(*v),
            Value::F64(v) => Self::Float(*v),
            Value::Decimal(v) => Self::Dec(*v),
            _ => return None,
        };
        Some(n)
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(v) => v == 0,
            Self::Float(v) => v == 0.0,
            Self::Single(v) => v == 0.0,
            Self::Dec(v) => v.is_zero(),
        }
    }

    /// Integral value, truncating toward zero.
    fn to_i64(self) -> Result<i64, String> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Float(v) => {
                if !v.is_finite() {
                    return Err(format!("{v} is not a finite number"));
                }
                let t = v.trunc();
                // i64::MAX is not exactly representable; 2^63 is the first
                // value out of range.
                if t < -9_223_372_036_854_775_808.0 || t >= 9_223_372_036_854_775_808.0 {
                    return Err("out of range for a 64-bit integer".into());
                }
                Ok(t as i64)
            }
            Self::Single(v) => Self::Float(f64::from(v)).to_i64(),
            Self::Dec(v) => v
                .trunc()
                .to_i64()
                .ok_or_else(|| "out of range for a 64-bit integer".to_string()),
        }
    }

    fn to_f64(self) -> Result<f64, String> {
        match self {
            Self::Int(v) => Ok(v as f64),
            Self::Float(v) => Ok(v),
            Self::Single(v) => Ok(f64::from(v)),
            Self::Dec(v) => v
                .to_f64()
                .ok_or_else(|| "not representable as a double".to_string()),
        }
    }

    fn to_decimal(self) -> Result<Decimal, String> {
        match self {
            Self::Int(v) => Ok(Decimal::from(v)),
            Self::Float(v) if !v.is_finite() => Err(format!("{v} is not a finite number")),
            Self::Single(v) if !v.is_finite() => Err(format!("{v} is not a finite number")),
            Self::Float(v) => shortest_decimal(&v.to_string(), &format!("{v:e}")),
            Self::Single(v) => shortest_decimal(&v.to_string(), &format!("{v:e}")),
            Self::Dec(v) => Ok(v),
        }
    }
}

/// Shortest round-trip text keeps 0.1 as 0.1 rather than its binary
/// expansion. Very large or small values only parse in scientific form.
fn shortest_decimal(plain: &str, scientific: &str) -> Result<Decimal, String> {
    Decimal::from_str_exact(plain)
        .or_else(|_| Decimal::from_scientific(scientific))
        .map_err(|e| e.to_string())
}

fn narrow<T: TryFrom<i64>>(v: i64, target: &ValueType) -> Result<T, String> {
    T::try_from(v).map_err(|_| format!("{v} is out of range for {target}"))
}

/// Apply the numeric target table to a numeric value.
///
/// - integer targets: checked; floats and decimals truncate toward zero;
/// - floating targets: `F64 → F32` rejects finite values that overflow;
/// - `Decimal`: exact for integers, shortest decimal form for floats;
/// - `Bool`: zero is `false`, anything else `true`;
/// - `String`: canonical textual form.
///
/// Returns the failure reason when no rule applies.
pub fn coerce_number(value: &Value, target: &ValueType) -> Result<Value, String> {
    let n = Number::of(value).ok_or_else(|| "value is not numeric".to_string())?;

    let out = match target {
        ValueType::I8 => Value::I8(narrow(n.to_i64()?, target)?),
        ValueType::I16 => Value::I16(narrow(n.to_i64()?, target)?),
        ValueType::I32 => Value::I32(narrow(n.to_i64()?, target)?),
        ValueType::I64 => Value::I64(n.to_i64()?),
        ValueType::F32 => {
            let v = n.to_f64()?;
            let narrowed = v as f32;
            if v.is_finite() && narrowed.is_infinite() {
                return Err(format!("{v} is out of range for f32"));
            }
            Value::F32(narrowed)
        }
        ValueType::F64 => Value::F64(n.to_f64()?),
        ValueType::Decimal => Value::Decimal(n.to_decimal()?),
        ValueType::Bool => Value::Bool(!n.is_zero()),
        ValueType::String => Value::String(value.to_string()),
        other => return Err(format!("no numeric conversion to {other}")),
    };
    Ok(out)
}
