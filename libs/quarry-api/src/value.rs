use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// In-memory target type of a conversion.
///
/// Families:
/// - integer: `I8`, `I16`, `I32`, `I64`
/// - floating: `F32`, `F64`
/// - numeric: integer + floating + `Decimal`
/// - temporal: `Date`, `Time`, `Timestamp`, `TimestampTz`
///
/// `Other` names a type the engine only knows by name (a custom numeric
/// type, an application enum, ...). No built-in rule converts into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Other(String),
}

impl ValueType {
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || *self == Self::Decimal
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp | Self::TimestampTz)
    }

    /// Canonical name, accepted back by [`ValueType::from_name`].
    pub fn name(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Other(name) => name,
        }
    }

    /// Resolve a type name. Accepts Rust-style, SQL-style and the usual
    /// long-form aliases (case-insensitive). Unknown names become `Other`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Self::Bool,
            "i8" | "byte" | "tinyint" => Self::I8,
            "i16" | "short" | "smallint" => Self::I16,
            "i32" | "int" | "integer" => Self::I32,
            "i64" | "long" | "bigint" => Self::I64,
            "f32" | "float" | "real" => Self::F32,
            "f64" | "double" => Self::F64,
            "decimal" | "bigdecimal" | "numeric" => Self::Decimal,
            "string" | "str" | "text" | "varchar" => Self::String,
            "bytes" | "binary" | "blob" => Self::Bytes,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" => Self::Timestamp,
            "timestamptz" | "timestamp_tz" | "datetimeoffset" => Self::TimestampTz,
            _ => Self::Other(name.trim().to_string()),
        }
    }
}

impl FromStr for ValueType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamically typed in-memory value: what gets bound to, or read from,
/// a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Timestamp without timezone.
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone offset.
    TimestampTz(DateTime<FixedOffset>),
}

impl Value {
    /// Exact runtime type. `None` only for `Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        let t = match self {
            Self::Null => return None,
            Self::Bool(_) => ValueType::Bool,
            Self::I8(_) => ValueType::I8,
            Self::I16(_) => ValueType::I16,
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::Decimal(_) => ValueType::Decimal,
            Self::String(_) => ValueType::String,
            Self::Bytes(_) => ValueType::Bytes,
            Self::Date(_) => ValueType::Date,
            Self::Time(_) => ValueType::Time,
            Self::Timestamp(_) => ValueType::Timestamp,
            Self::TimestampTz(_) => ValueType::TimestampTz,
        };
        Some(t)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::I8(_)
                | Self::I16(_)
                | Self::I32(_)
                | Self::I64(_)
                | Self::F32(_)
                | Self::F64(_)
                | Self::Decimal(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::TimestampTz(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_resolve_aliases() {
        assert_eq!(ValueType::from_name("Integer"), ValueType::I32);
        assert_eq!(ValueType::from_name(" bigdecimal "), ValueType::Decimal);
        assert_eq!(ValueType::from_name("datetime"), ValueType::Timestamp);
        assert_eq!(
            ValueType::from_name("app.Money"),
            ValueType::Other("app.Money".into())
        );
    }

    #[test]
    fn canonical_names_round_trip() {
        for t in [
            ValueType::Bool,
            ValueType::I16,
            ValueType::F64,
            ValueType::Decimal,
            ValueType::Bytes,
            ValueType::TimestampTz,
        ] {
            assert_eq!(ValueType::from_name(t.name()), t);
        }
    }

    #[test]
    fn null_has_no_runtime_type() {
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(Value::from(7i64).value_type(), Some(ValueType::I64));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn families() {
        assert!(ValueType::I8.is_integer());
        assert!(ValueType::Decimal.is_numeric());
        assert!(!ValueType::Decimal.is_floating());
        assert!(ValueType::Time.is_temporal());
        assert!(!ValueType::String.is_numeric());
    }
}
