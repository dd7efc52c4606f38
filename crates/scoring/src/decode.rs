//! Decoder for the numeric and date encodings used by the leaderboard provider.
//!
//! The provider mixes plain JSON numbers, numeric strings and Mongo extended
//! JSON (`{"$numberInt": "4"}`, `{"$numberLong": "..."}`,
//! `{"$date": {"$numberLong": "<epoch millis>"}}`) for the same fields.
//! Everything is funnelled through [`ProviderValue::decode`] so callers match on
//! a closed set of variants instead of probing JSON shapes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderValue {
    Int(i32),
    Long(i64),
    Date(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("value is missing")]
    Missing,

    #[error("unsupported encoding: {0}")]
    Unsupported(String),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("value {0} does not fit in 32 bits")]
    Overflow(i64),

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("expected a number, found a date")]
    UnexpectedDate,

    #[error("expected a date, found a number")]
    UnexpectedNumber,
}

impl ProviderValue {
    pub fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Err(DecodeError::Missing),
            Value::Number(_) | Value::String(_) => Ok(Self::from_i64(parse_integer(value)?)),
            Value::Object(map) => decode_extended(map),
            Value::Bool(_) => Err(DecodeError::Unsupported("boolean".to_string())),
            Value::Array(_) => Err(DecodeError::Unsupported("array".to_string())),
        }
    }

    fn from_i64(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Self::Int(small),
            Err(_) => Self::Long(n),
        }
    }

    pub fn as_i64(&self) -> Result<i64, DecodeError> {
        match *self {
            Self::Int(n) => Ok(i64::from(n)),
            Self::Long(n) => Ok(n),
            Self::Date(_) => Err(DecodeError::UnexpectedDate),
        }
    }

    pub fn as_i32(&self) -> Result<i32, DecodeError> {
        let n = self.as_i64()?;
        i32::try_from(n).map_err(|_| DecodeError::Overflow(n))
    }

    pub fn as_date(&self) -> Result<DateTime<Utc>, DecodeError> {
        match *self {
            Self::Date(date) => Ok(date),
            Self::Int(_) | Self::Long(_) => Err(DecodeError::UnexpectedNumber),
        }
    }
}

fn decode_extended(map: &Map<String, Value>) -> Result<ProviderValue, DecodeError> {
    if let Some(raw) = map.get("$numberInt") {
        let n = parse_integer(raw)?;
        return i32::try_from(n)
            .map(ProviderValue::Int)
            .map_err(|_| DecodeError::Overflow(n));
    }

    if let Some(raw) = map.get("$numberLong") {
        return Ok(ProviderValue::Long(parse_integer(raw)?));
    }

    if let Some(raw) = map.get("$date") {
        return decode_date(raw).map(ProviderValue::Date);
    }

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    Err(DecodeError::Unsupported(format!("object with keys {:?}", keys)))
}

fn decode_date(raw: &Value) -> Result<DateTime<Utc>, DecodeError> {
    let millis = match raw {
        Value::Object(inner) => match inner.get("$numberLong") {
            Some(n) => parse_integer(n)?,
            None => return Err(DecodeError::Unsupported("$date object".to_string())),
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                return DateTime::parse_from_rfc3339(s.trim())
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|_| DecodeError::InvalidNumber(s.clone()));
            }
        },
        other => parse_integer(other)?,
    };

    DateTime::<Utc>::from_timestamp_millis(millis).ok_or(DecodeError::TimestampOutOfRange(millis))
}

fn parse_integer(value: &Value) -> Result<i64, DecodeError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(DecodeError::InvalidNumber(n.to_string())),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DecodeError::InvalidNumber(s.clone())),
        Value::Null => Err(DecodeError::Missing),
        other => Err(DecodeError::InvalidNumber(other.to_string())),
    }
}

impl fmt::Display for ProviderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Long(n) => write!(f, "{}", n),
            Self::Date(date) => write!(f, "{}", date.to_rfc3339()),
        }
    }
}

impl Serialize for ProviderValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = match self {
            Self::Int(n) => json!(n),
            Self::Long(n) => json!({ "$numberLong": n.to_string() }),
            Self::Date(date) => {
                json!({ "$date": { "$numberLong": date.timestamp_millis().to_string() } })
            }
        };
        encoded.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProviderValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}
