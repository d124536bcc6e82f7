//! Storage-engine column types.
//!
//! Metadata providers that read column types as declared text (catalog
//! queries, DDL) map them with [`SqlType::from_declared`] or build columns
//! directly through `ColumnDetail::declared`.

use std::fmt;

use crate::value::ValueType;

/// Native column type declared by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    NChar,
    NVarChar,
    Clob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Binary,
    VarBinary,
    Blob,
    /// Vendor-specific type with no known in-memory representation.
    Other,
}

impl SqlType {
    /// In-memory representation of a column of this type.
    ///
    /// `None` for `Other`; values bound to such columns are passed through
    /// unchanged.
    pub fn value_type(self) -> Option<ValueType> {
        let t = match self {
            Self::Bit | Self::Boolean => ValueType::Bool,
            Self::TinyInt => ValueType::I8,
            Self::SmallInt => ValueType::I16,
            Self::Integer => ValueType::I32,
            Self::BigInt => ValueType::I64,
            Self::Real => ValueType::F32,
            // SQL FLOAT defaults to double precision.
            Self::Float | Self::Double => ValueType::F64,
            Self::Numeric | Self::Decimal => ValueType::Decimal,
            Self::Char
            | Self::VarChar
            | Self::LongVarChar
            | Self::NChar
            | Self::NVarChar
            | Self::Clob => ValueType::String,
            Self::Date => ValueType::Date,
            Self::Time => ValueType::Time,
            Self::Timestamp => ValueType::Timestamp,
            Self::TimestampWithTimezone => ValueType::TimestampTz,
            Self::Binary | Self::VarBinary | Self::Blob => ValueType::Bytes,
            Self::Other => return None,
        };
        Some(t)
    }

    /// Parse a declared column type (`"VARCHAR(255)"`, `"numeric(18,4)"`,
    /// `"timestamp with time zone"`). Length/precision suffixes are ignored.
    pub fn from_declared(declared: &str) -> Self {
        let base = declared
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "bit" => Self::Bit,
            "bool" | "boolean" => Self::Boolean,
            "tinyint" => Self::TinyInt,
            "smallint" | "int2" => Self::SmallInt,
            "int" | "integer" | "int4" => Self::Integer,
            "bigint" | "int8" => Self::BigInt,
            "real" | "float4" => Self::Real,
            "float" => Self::Float,
            "double" | "double precision" | "float8" => Self::Double,
            "numeric" => Self::Numeric,
            "decimal" | "number" => Self::Decimal,
            "char" | "character" => Self::Char,
            "varchar" | "character varying" | "varchar2" => Self::VarChar,
            "text" | "longvarchar" => Self::LongVarChar,
            "nchar" => Self::NChar,
            "nvarchar" | "nvarchar2" => Self::NVarChar,
            "clob" => Self::Clob,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" | "timestamp without time zone" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" | "datetimeoffset" => {
                Self::TimestampWithTimezone
            }
            "binary" => Self::Binary,
            "varbinary" | "bytea" => Self::VarBinary,
            "blob" => Self::Blob,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_ignore_length_and_case() {
        assert_eq!(SqlType::from_declared("VARCHAR(255)"), SqlType::VarChar);
        assert_eq!(SqlType::from_declared("numeric(18, 4)"), SqlType::Numeric);
        assert_eq!(
            SqlType::from_declared("timestamp with time zone"),
            SqlType::TimestampWithTimezone
        );
        assert_eq!(SqlType::from_declared("geometry"), SqlType::Other);
    }

    #[test]
    fn in_memory_representation() {
        assert_eq!(SqlType::Integer.value_type(), Some(ValueType::I32));
        assert_eq!(SqlType::Numeric.value_type(), Some(ValueType::Decimal));
        assert_eq!(SqlType::Clob.value_type(), Some(ValueType::String));
        assert_eq!(SqlType::Other.value_type(), None);
    }
}
