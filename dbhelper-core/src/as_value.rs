use crate::{Error, Result, Value, truncate_long};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, borrow::Cow, str::FromStr};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, macros::format_description};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// `as_value` is used when binding statement parameters and building records,
/// `try_from_value` when decoding result rows. Engines often return numbers and
/// dates as text (MySQL reports `SUM` as a decimal string for example), so the
/// numeric and temporal implementations also accept a `Value::Varchar` holding
/// a parsable representation.
///
/// ```rust
/// use dbhelper_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int64(42));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.into())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(value: [&str; N]) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for Value {
    fn from(value: &[&str]) -> Self {
        Value::List(value.iter().map(|v| (*v).into()).collect())
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {} `{}` to {}",
        value.type_name(),
        truncate_long!(value.to_string()),
        any::type_name::<T>(),
    ))
}

fn parse_text<T: FromStr>(text: &str) -> Result<T> {
    text.trim().parse::<T>().map_err(|_| {
        Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(text),
            any::type_name::<T>()
        ))
    })
}

fn text_of(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Varchar(v) => Some(Cow::Borrowed(v)),
        Value::Blob(v) => std::str::from_utf8(v).ok().map(Cow::Borrowed),
        _ => None,
    }
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path, $wide:ty) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                $destination(self as $wide)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let out_of_range = |v: &dyn std::fmt::Display| {
                    Error::msg(format!(
                        "Value {v} is out of range for {}",
                        any::type_name::<Self>()
                    ))
                };
                match value {
                    Value::Int64(v) => <$source>::try_from(v).map_err(|_| out_of_range(&v)),
                    Value::UInt64(v) => <$source>::try_from(v).map_err(|_| out_of_range(&v)),
                    Value::Boolean(v) => Ok(v as _),
                    Value::Decimal(v) if v.fract().is_zero() => v
                        .to_i128()
                        .and_then(|v| <$source>::try_from(v).ok())
                        .ok_or_else(|| out_of_range(&v)),
                    ref v => match text_of(v) {
                        Some(text) => parse_text(&text),
                        None => Err(mismatch::<Self>(v)),
                    },
                }
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int64, i64);
impl_as_value_integer!(i16, Value::Int64, i64);
impl_as_value_integer!(i32, Value::Int64, i64);
impl_as_value_integer!(i64, Value::Int64, i64);
impl_as_value_integer!(isize, Value::Int64, i64);
impl_as_value_integer!(u8, Value::UInt64, u64);
impl_as_value_integer!(u16, Value::UInt64, u64);
impl_as_value_integer!(u32, Value::UInt64, u64);
impl_as_value_integer!(u64, Value::UInt64, u64);
impl_as_value_integer!(usize, Value::UInt64, u64);

macro_rules! impl_as_value_float {
    ($source:ty) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                Value::Float64(self as f64)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Float64(v) => Ok(v as _),
                    Value::Int64(v) => Ok(v as _),
                    Value::UInt64(v) => Ok(v as _),
                    Value::Decimal(v) => v.to_f64().map(|v| v as _).ok_or_else(|| mismatch::<Self>(&value)),
                    ref v => match text_of(v) {
                        Some(text) => parse_text(&text),
                        None => Err(mismatch::<Self>(v)),
                    },
                }
            }
        }
    };
}

impl_as_value_float!(f32);
impl_as_value_float!(f64);

impl AsValue for bool {
    fn as_value(self) -> Value {
        Value::Boolean(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Int64(v) => Ok(v != 0),
            Value::UInt64(v) => Ok(v != 0),
            ref v => match text_of(v).as_deref() {
                Some("1") => Ok(true),
                Some("0") => Ok(false),
                Some(text) => parse_text(text),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for String {
    fn as_value(self) -> Value {
        Value::Varchar(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(v) => Ok(v),
            Value::Blob(v) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::new(e).context("Blob is not a valid utf-8 string")),
            Value::Null | Value::List(..) => Err(mismatch::<Self>(&value)),
            v => Ok(v.to_string()),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_value(self) -> Value {
        Value::Blob(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            Value::Varchar(v) => Ok(v.into_bytes().into()),
            v => Err(mismatch::<Self>(&v)),
        }
    }
}

impl AsValue for Decimal {
    fn as_value(self) -> Value {
        Value::Decimal(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::Int64(v) => Ok(Decimal::from(v)),
            Value::UInt64(v) => Ok(Decimal::from(v)),
            Value::Float64(v) => Decimal::from_f64(v).ok_or_else(|| mismatch::<Self>(&value)),
            ref v => match text_of(v) {
                Some(text) => parse_text(&text),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for Uuid {
    fn as_value(self) -> Value {
        Value::Uuid(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Blob(ref v) if v.len() == 16 => {
                Uuid::from_slice(v).map_err(|_| mismatch::<Self>(&value))
            }
            ref v => match text_of(v) {
                Some(text) => parse_text(&text),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for Date {
    fn as_value(self) -> Value {
        Value::Date(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.date()),
            ref v => match text_of(v) {
                Some(text) => Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
                    .map_err(|_| mismatch::<Self>(v)),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for Time {
    fn as_value(self) -> Value {
        Value::Time(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.time()),
            ref v => match text_of(v) {
                Some(text) => Time::parse(
                    text.trim(),
                    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]"),
                )
                .map_err(|_| mismatch::<Self>(v)),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_value(self) -> Value {
        Value::Timestamp(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Date(v) => Ok(v.midnight()),
            Value::TimestampWithTimezone(v) => {
                let v = v.to_utc();
                Ok(PrimitiveDateTime::new(v.date(), v.time()))
            }
            ref v => match text_of(v) {
                Some(text) => PrimitiveDateTime::parse(
                    &text.trim().replacen('T', " ", 1),
                    format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
                    ),
                )
                .map_err(|_| mismatch::<Self>(v)),
                None => Err(mismatch::<Self>(v)),
            },
        }
    }
}

impl AsValue for OffsetDateTime {
    fn as_value(self) -> Value {
        Value::TimestampWithTimezone(self)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::TimestampWithTimezone(v) => Ok(v),
            v => PrimitiveDateTime::try_from_value(v).map(PrimitiveDateTime::assume_utc),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(T::try_from_value(value)?)
        })
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_value(self) -> Value {
        Value::List(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(v) => v.into_iter().map(T::try_from_value).collect(),
            v => Err(mismatch::<Self>(&v)),
        }
    }
}

impl<T: AsValue, const N: usize> AsValue for [T; N] {
    fn as_value(self) -> Value {
        Value::List(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Vec::<T>::try_from_value(value)?
            .try_into()
            .map_err(|v: Vec<T>| {
                Error::msg(format!(
                    "Expected array of length {}, got {} elements ({})",
                    N,
                    v.len(),
                    any::type_name::<[T; N]>()
                ))
            })
    }
}
