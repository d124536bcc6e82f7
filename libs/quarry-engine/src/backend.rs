use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

use quarry_api::converter::ConversionBackend;
use quarry_api::error::CollaboratorError;
use quarry_api::value::{Value, ValueType};

use crate::coercion;
use crate::config::ConversionConfig;

/// Default generic conversion backend.
///
/// Parses and formats strings, moves between temporal types and between
/// text and bytes. Numeric pairs go through the same table as
/// `ConversionEngine::convert_number`, so both entry points agree.
#[derive(Debug, Clone)]
pub struct StandardBackend {
    date_formats: Vec<String>,
    time_formats: Vec<String>,
    timestamp_formats: Vec<String>,
}

impl Default for StandardBackend {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl StandardBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[conversion]` configuration section.
    ///
    /// The first format of each list is also the output format.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            date_formats: config.date_formats.clone(),
            time_formats: config.time_formats.clone(),
            timestamp_formats: config.timestamp_formats.clone(),
        }
    }

    fn parse_string(&self, s: &str, target: &ValueType) -> Result<Value, CollaboratorError> {
        let s = s.trim();
        let value = match target {
            ValueType::Bool => Value::Bool(parse_bool(s)?),
            ValueType::I8 => Value::I8(s.parse()?),
            ValueType::I16 => Value::I16(s.parse()?),
            ValueType::I32 => Value::I32(s.parse()?),
            ValueType::I64 => Value::I64(s.parse()?),
            ValueType::F32 => Value::F32(s.parse()?),
            ValueType::F64 => Value::F64(s.parse()?),
            ValueType::Decimal => Value::Decimal(parse_decimal(s)?),
            ValueType::Bytes => Value::Bytes(s.as_bytes().to_vec()),
            ValueType::Date => Value::Date(first_match(s, &self.date_formats, |s, f| {
                NaiveDate::parse_from_str(s, f)
            })?),
            ValueType::Time => Value::Time(first_match(s, &self.time_formats, |s, f| {
                NaiveTime::parse_from_str(s, f)
            })?),
            ValueType::Timestamp => Value::Timestamp(first_match(s, &self.timestamp_formats, |s, f| {
                NaiveDateTime::parse_from_str(s, f)
            })?),
            ValueType::TimestampTz => Value::TimestampTz(self.parse_timestamp_tz(s)?),
            other => return Err(unsupported(&ValueType::String, other)),
        };
        Ok(value)
    }

    /// RFC 3339 first; naive timestamps are taken as UTC.
    fn parse_timestamp_tz(&self, s: &str) -> Result<DateTime<FixedOffset>, CollaboratorError> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(ts);
        }
        let naive = first_match(s, &self.timestamp_formats, |s, f| {
            NaiveDateTime::parse_from_str(s, f)
        })?;
        Ok(Utc.from_utc_datetime(&naive).fixed_offset())
    }

    fn format_temporal(&self, value: &Value) -> Option<String> {
        let out = match value {
            Value::Date(d) => d.format(first_or(&self.date_formats, "%Y-%m-%d")).to_string(),
            Value::Time(t) => t.format(first_or(&self.time_formats, "%H:%M:%S")).to_string(),
            Value::Timestamp(ts) => ts
                .format(first_or(&self.timestamp_formats, "%Y-%m-%d %H:%M:%S"))
                .to_string(),
            Value::TimestampTz(ts) => ts.to_rfc3339(),
            _ => return None,
        };
        Some(out)
    }
}

impl ConversionBackend for StandardBackend {
    fn convert(&self, value: &Value, target: &ValueType) -> Result<Value, CollaboratorError> {
        if coercion::is_same_class(value, target) {
            return Ok(value.clone());
        }

        match (value, target) {
            (Value::Null, _) => Ok(Value::Null),
            (v, t) if v.is_numeric() && coercion::is_numeric_target(t) => {
                coercion::coerce_number(v, t).map_err(CollaboratorError::conversion)
            }
            (Value::String(s), t) => self.parse_string(s, t),

            (Value::Bool(b), ValueType::String) => Ok(Value::String(b.to_string())),
            (Value::Bool(b), t) if t.is_integer() => {
                coercion::coerce_number(&Value::I64(i64::from(*b)), t)
                    .map_err(CollaboratorError::conversion)
            }

            (Value::Bytes(b), ValueType::String) => Ok(Value::String(String::from_utf8(b.clone())?)),

            (v, ValueType::String) if v.value_type().is_some_and(|t| t.is_temporal()) => self
                .format_temporal(v)
                .map(Value::String)
                .ok_or_else(|| unsupported_value(v, target)),
            (Value::Timestamp(ts), ValueType::Date) => Ok(Value::Date(ts.date())),
            (Value::Timestamp(ts), ValueType::Time) => Ok(Value::Time(ts.time())),
            (Value::Timestamp(ts), ValueType::TimestampTz) => {
                Ok(Value::TimestampTz(Utc.from_utc_datetime(ts).fixed_offset()))
            }
            (Value::TimestampTz(ts), ValueType::Timestamp) => Ok(Value::Timestamp(ts.naive_local())),
            (Value::TimestampTz(ts), ValueType::Date) => Ok(Value::Date(ts.naive_local().date())),
            (Value::Date(d), ValueType::Timestamp) => Ok(Value::Timestamp(d.and_time(NaiveTime::MIN))),
            (Value::Date(d), ValueType::TimestampTz) => Ok(Value::TimestampTz(
                Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)).fixed_offset(),
            )),

            (v, t) => Err(unsupported_value(v, t)),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, CollaboratorError> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(CollaboratorError::conversion(format!(
            "'{s}' is not a boolean"
        ))),
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, CollaboratorError> {
    if s.contains(['e', 'E']) {
        return Ok(Decimal::from_scientific(s)?);
    }
    Ok(Decimal::from_str_exact(s)?)
}

/// Try each format in order; report the last parse error.
fn first_match<T, F>(s: &str, formats: &[String], parse: F) -> Result<T, CollaboratorError>
where
    F: Fn(&str, &str) -> Result<T, chrono::ParseError>,
{
    let mut last = None;
    for format in formats {
        match parse(s, format) {
            Ok(v) => return Ok(v),
            Err(e) => last = Some(e),
        }
    }
    Err(match last {
        Some(e) => CollaboratorError::from(e).with_context(format!("'{s}'")),
        None => CollaboratorError::config("no formats configured"),
    })
}

fn first_or<'a>(formats: &'a [String], default: &'a str) -> &'a str {
    formats.first().map(String::as_str).unwrap_or(default)
}

fn unsupported(source: &ValueType, target: &ValueType) -> CollaboratorError {
    CollaboratorError::conversion(format!("no conversion from {source} to {target}"))
}

fn unsupported_value(value: &Value, target: &ValueType) -> CollaboratorError {
    match value.value_type() {
        Some(source) => unsupported(&source, target),
        None => CollaboratorError::conversion(format!("no conversion from null to {target}")),
    }
}
