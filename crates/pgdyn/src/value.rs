//! The dynamically-typed column value.
//!
//! [`Value`] is what an [`AssocRow`](crate::AssocRow) stores. It knows how to
//! encode itself into whatever parameter type Postgres inferred for a
//! placeholder (`ToSql`), and how to decode itself from any supported column
//! type (`FromSql`), so rows round-trip without compile-time types.

use crate::numeric;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn StdError + Sync + Send>;

/// A single column value of unknown static type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

// -2^63 and 2^63; every float in between converts to i64 exactly.
const I64_LOW: f64 = -9_223_372_036_854_775_808.0;
const I64_HIGH: f64 = 9_223_372_036_854_775_808.0;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, accepting integral floats and numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(v) => {
                Some(*v as i64)
            }
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `NULL`, `0`, `0.0` or blank text.
    ///
    /// This is what "no id yet" looked like to callers that build rows from
    /// zero-initialised records.
    pub fn is_zero_or_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Text(s) => s.trim().is_empty() || s.trim().parse::<i64>() == Ok(0),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("\\x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::TimestampTz(v) => f.write_str(&v.to_rfc3339()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

// ===== JSON conversion (fixtures, CLI output) =====

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(x) => serde_json::Number::from_f64(x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Bytes(b) => serde_json::Value::from(b),
            Value::Json(j) => j,
            other @ (Value::Date(_) | Value::Timestamp(_) | Value::TimestampTz(_)) => {
                serde_json::Value::String(other.to_string())
            }
        }
    }
}

// ===== Rust -> Value =====

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ===== Encoding =====

fn mismatch(ty: &Type, kind: &str) -> BoxError {
    format!("cannot encode {kind} value as Postgres type {ty}").into()
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("invalid boolean literal '{other}'").into()),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(v);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_time(NaiveTime::MIN))
}

fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    let s = s.trim();
    if let Ok(v) = DateTime::parse_from_rfc3339(s) {
        return Ok(v.with_timezone(&Utc));
    }
    if let Ok(v) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(v.with_timezone(&Utc));
    }
    Ok(parse_timestamp(s)?.and_utc())
}

/// Encode text into whatever the server asked for.
///
/// Text is the loosest representation (it is what a CLI or JSON fixture
/// hands us), so it is parsed into the parameter's actual type.
fn encode_text(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if <&str as ToSql>::accepts(ty) {
        return s.to_sql(ty, out);
    }
    match *ty {
        Type::BOOL => parse_bool(s)?.to_sql(ty, out),
        Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
        Type::OID => s.trim().parse::<u32>()?.to_sql(ty, out),
        Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => {
            numeric::encode(s, out)?;
            Ok(IsNull::No)
        }
        Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(s.trim())?.to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ => Err(mismatch(ty, "text")),
    }
}

fn encode_int(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::OID => u32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::from(v).to_sql(ty, out),
        _ if <&str as ToSql>::accepts(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch(ty, "integer")),
    }
}

fn encode_float(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => match Decimal::try_from(v) {
            Ok(d) => d.to_sql(ty, out),
            // NaN, infinities and magnitudes beyond 28 digits.
            Err(_) => {
                numeric::encode(&v.to_string(), out)?;
                Ok(IsNull::No)
            }
        },
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID
            if v.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(&v) =>
        {
            encode_int(v as i64, ty, out)
        }
        _ if <&str as ToSql>::accepts(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch(ty, "floating-point")),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::BOOL => v.to_sql(ty, out),
                _ => encode_text(&v.to_string(), ty, out),
            },
            Value::Int(v) => encode_int(*v, ty, out),
            Value::Float(v) => encode_float(*v, ty, out),
            Value::Text(v) => encode_text(v, ty, out),
            Value::Bytes(v) => match *ty {
                Type::BYTEA => v.to_sql(ty, out),
                _ => Err(mismatch(ty, "bytes")),
            },
            Value::Date(v) => match *ty {
                Type::DATE => v.to_sql(ty, out),
                Type::TIMESTAMP => v.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => v.and_time(NaiveTime::MIN).and_utc().to_sql(ty, out),
                _ => encode_text(&self.to_string(), ty, out),
            },
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.to_sql(ty, out),
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ => encode_text(&self.to_string(), ty, out),
            },
            Value::TimestampTz(v) => match *ty {
                Type::TIMESTAMPTZ => v.to_sql(ty, out),
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                Type::DATE => v.date_naive().to_sql(ty, out),
                _ => encode_text(&self.to_string(), ty, out),
            },
            Value::Json(v) => match *ty {
                Type::JSON | Type::JSONB => v.to_sql(ty, out),
                _ => encode_text(&v.to_string(), ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ===== Decoding =====

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::CHAR => Value::Int(i8::from_sql(ty, raw)?.into()),
            Type::INT2 => Value::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::OID => Value::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            // Exact decimal string; going through f64 would lose digits.
            Type::NUMERIC => Value::Text(numeric::decode(raw)?),
            Type::UUID => Value::Text(uuid::Uuid::from_sql(ty, raw)?.to_string()),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ if <String as FromSql>::accepts(ty) => Value::Text(String::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type {ty}").into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<BytesMut, BoxError> {
        let mut buf = BytesMut::new();
        value.to_sql_checked(ty, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn int_narrows_to_int4_column() {
        let buf = encode(&Value::Int(7), &Type::INT4).unwrap();
        assert_eq!(&buf[..], &7i32.to_be_bytes());
    }

    #[test]
    fn int_out_of_range_for_int2_fails() {
        assert!(encode(&Value::Int(100_000), &Type::INT2).is_err());
    }

    #[test]
    fn text_parses_into_numeric_columns() {
        let buf = encode(&Value::Text(" 42 ".into()), &Type::INT8).unwrap();
        assert_eq!(&buf[..], &42i64.to_be_bytes());
        assert!(encode(&Value::Text("abc".into()), &Type::INT4).is_err());
    }

    #[test]
    fn text_goes_to_varchar_verbatim() {
        let buf = encode(&Value::Text("toto".into()), &Type::VARCHAR).unwrap();
        assert_eq!(&buf[..], b"toto");
    }

    #[test]
    fn int_renders_as_text_for_text_columns() {
        let buf = encode(&Value::Int(12), &Type::TEXT).unwrap();
        assert_eq!(&buf[..], b"12");
    }

    #[test]
    fn bytes_only_encode_as_bytea() {
        assert!(encode(&Value::Bytes(vec![1, 2]), &Type::BYTEA).is_ok());
        assert!(encode(&Value::Bytes(vec![1, 2]), &Type::TEXT).is_err());
    }

    #[test]
    fn null_encodes_for_any_type() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql_checked(&Type::DATE, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn decode_dispatches_on_column_type() {
        assert_eq!(
            Value::from_sql(&Type::INT4, &5i32.to_be_bytes()).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            Value::from_sql(&Type::VARCHAR, b"hi").unwrap(),
            Value::Text("hi".into())
        );
        assert_eq!(Value::from_sql_null(&Type::INT4).unwrap(), Value::Null);
    }

    #[test]
    fn numeric_decodes_past_decimal_precision() {
        let raw = [0, 1, 0, 10, 0, 0, 0, 0, 0, 1];
        assert_eq!(
            Value::from_sql(&Type::NUMERIC, &raw).unwrap(),
            Value::Text(format!("1{}", "0".repeat(40)))
        );
        assert_eq!(
            Value::from_sql(&Type::NUMERIC, &[0, 0, 0, 0, 0xC0, 0, 0, 0]).unwrap(),
            Value::Text("NaN".into())
        );
    }

    #[test]
    fn numeric_encodes_exponent_text_and_nan() {
        let buf = encode(&Value::Text("1e40".into()), &Type::NUMERIC).unwrap();
        assert_eq!(&buf[..], &[0, 1, 0, 10, 0, 0, 0, 0, 0, 1]);
        let buf = encode(&Value::Float(f64::NAN), &Type::NUMERIC).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0xC0, 0, 0, 0]);
        let buf = encode(&Value::Text("2.5".into()), &Type::NUMERIC).unwrap();
        assert_eq!(&buf[..], &[0, 2, 0, 0, 0, 0, 0, 1, 0, 2, 0x13, 0x88]);
        assert!(encode(&Value::Text("abc".into()), &Type::NUMERIC).is_err());
    }

    #[test]
    fn as_i64_rejects_floats_outside_i64() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(1e300).as_i64(), None);
        assert_eq!(Value::Float(-1e19).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Value::Float(2.5).as_i64(), None);
    }

    #[test]
    fn decode_rejects_unknown_types() {
        assert!(Value::from_sql(&Type::POINT, &[0u8; 16]).is_err());
    }

    #[test]
    fn parse_bool_accepts_postgres_spellings() {
        assert!(parse_bool("t").unwrap());
        assert!(!parse_bool("OFF").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn json_conversion_keeps_integers_integral() {
        let v: Value = serde_json::from_str("12").unwrap();
        assert_eq!(v, Value::Int(12));
        let v: Value = serde_json::from_str("1.5").unwrap();
        assert_eq!(v, Value::Float(1.5));
        let v: Value = serde_json::from_str(r#"{"a":1}"#).unwrap();
        assert!(matches!(v, Value::Json(_)));
    }

    #[test]
    fn display_is_the_raw_rendering() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2024-02-29");
    }

    #[test]
    fn zero_or_empty_detection() {
        assert!(Value::Int(0).is_zero_or_empty());
        assert!(Value::Text("0".into()).is_zero_or_empty());
        assert!(Value::Text("  ".into()).is_zero_or_empty());
        assert!(Value::Null.is_zero_or_empty());
        assert!(!Value::Int(3).is_zero_or_empty());
    }
}
