use std::borrow::Cow;

use bson::Bson;
use chrono::NaiveDateTime;

/// A generated value for a record field.
///
/// The `String` variant uses `Cow<'static, str>` so that values drawn from
/// static vocabularies (states, regions, street names, flags) are held as
/// zero-cost `&'static str` borrows, while formatted values (names, street
/// numbers) are stored as owned `String`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Encode a yes/no flag the way both sink schemas store it ("S" / "N").
    pub fn flag(set: bool) -> Self {
        Value::String(Cow::Borrowed(if set { "S" } else { "N" }))
    }

    /// Convert to a BSON value for the document store.
    ///
    /// Timestamps become native BSON dates (UTC) so they sort and index as
    /// dates rather than strings.
    pub fn to_bson(&self) -> Bson {
        match self {
            Value::Null => Bson::Null,
            Value::Int(i) => Bson::Int64(*i),
            Value::Float(f) => Bson::Double(*f),
            Value::String(s) => Bson::String(s.to_string()),
            Value::Timestamp(ts) => Bson::DateTime(bson::DateTime::from_chrono(ts.and_utc())),
        }
    }

    /// Convert a BSON value read back from the document store.
    pub fn from_bson(bson: Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Value::Null,
            Bson::Int32(i) => Value::Int(i64::from(i)),
            Bson::Int64(i) => Value::Int(i),
            Bson::Double(f) => Value::Float(f),
            Bson::String(s) => Value::String(Cow::Owned(s)),
            Bson::DateTime(dt) => Value::Timestamp(dt.to_chrono().naive_utc()),
            other => Value::String(Cow::Owned(other.to_string())),
        }
    }

    /// Convert to a JSON value for the wide-column store's `INSERT ... JSON`.
    ///
    /// Timestamps are emitted as epoch milliseconds, which CQL accepts for
    /// `timestamp` columns without any format negotiation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Timestamp(ts) => serde_json::Value::from(ts.and_utc().timestamp_millis()),
        }
    }

    /// Convert a JSON value read back through `SELECT JSON`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(Cow::Owned(s)),
            other => Value::String(Cow::Owned(other.to_string())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers widen to floats since a sink may
    /// hand back `15.0` as `15`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Cow::Owned(value))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}
