//! Numeric coercion for identifiers, slot indices and quantities.
//!
//! UI widgets hand over ids and indices as plain numbers, numeric strings or
//! 64-bit integers depending on where they were read from. Everything is
//! coerced here before a reducer is invoked; a failure aborts the gesture.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A number as the UI held it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field} `{raw}` is not a valid {expected}")]
pub struct CoercionError {
    pub field: &'static str,
    pub raw: String,
    pub expected: &'static str,
}

impl fmt::Display for RawNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNumber::Int(v) => write!(f, "{}", v),
            RawNumber::UInt(v) => write!(f, "{}", v),
            RawNumber::Float(v) => write!(f, "{}", v),
            RawNumber::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl RawNumber {
    /// The exact integer this value represents, if any. Floats must be finite
    /// and integral; strings are trimmed and may carry an integral float.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            RawNumber::Int(v) => Some(*v as i128),
            RawNumber::UInt(v) => Some(*v as i128),
            RawNumber::Float(v) => float_to_integer(*v),
            RawNumber::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed
                    .parse::<i128>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
            }
        }
    }
}

fn float_to_integer(v: f64) -> Option<i128> {
    // 2^64 keeps every u64 id representable while rejecting absurd magnitudes.
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= 18_446_744_073_709_551_616.0 {
        Some(v as i128)
    } else {
        None
    }
}

macro_rules! raw_number_from {
    ($variant:ident as $target:ty: $($src:ty),*) => {
        $(impl From<$src> for RawNumber {
            fn from(v: $src) -> Self {
                RawNumber::$variant(v as $target)
            }
        })*
    };
}

raw_number_from!(Int as i64: i8, i16, i32, i64, u8, u16, u32);
raw_number_from!(UInt as u64: u64, usize);
raw_number_from!(Float as f64: f32, f64);

impl From<&str> for RawNumber {
    fn from(v: &str) -> Self {
        RawNumber::Text(v.to_string())
    }
}

impl From<String> for RawNumber {
    fn from(v: String) -> Self {
        RawNumber::Text(v)
    }
}

fn coerce_in_range(
    field: &'static str,
    raw: &RawNumber,
    expected: &'static str,
    min: i128,
    max: i128,
) -> Result<i128, CoercionError> {
    match raw.as_integer() {
        Some(v) if v >= min && v <= max => Ok(v),
        _ => Err(CoercionError { field, raw: raw.to_string(), expected }),
    }
}

pub fn coerce_u64(field: &'static str, raw: &RawNumber) -> Result<u64, CoercionError> {
    coerce_in_range(field, raw, "unsigned 64-bit integer", 0, u64::MAX as i128).map(|v| v as u64)
}

pub fn coerce_u32(field: &'static str, raw: &RawNumber) -> Result<u32, CoercionError> {
    coerce_in_range(field, raw, "unsigned 32-bit integer", 0, u32::MAX as i128).map(|v| v as u32)
}

pub fn coerce_u8(field: &'static str, raw: &RawNumber) -> Result<u8, CoercionError> {
    coerce_in_range(field, raw, "slot index", 0, u8::MAX as i128).map(|v| v as u8)
}

/// Quantities must be at least one; zero and negatives never reach a reducer.
pub fn coerce_quantity(field: &'static str, raw: &RawNumber) -> Result<u32, CoercionError> {
    coerce_in_range(field, raw, "positive quantity", 1, u32::MAX as i128).map(|v| v as u32)
}
