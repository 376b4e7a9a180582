use dbhelper_core::{Error, Value};
use time::{Date, Month, PrimitiveDateTime, Time};

pub(crate) struct ValueWrap(pub(crate) Value);

impl From<Value> for ValueWrap {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
impl From<ValueWrap> for Value {
    fn from(value: ValueWrap) -> Self {
        value.0
    }
}

impl mysql_async::prelude::FromValue for ValueWrap {
    type Intermediate = ValueWrap;
}

impl TryFrom<mysql_async::Value> for ValueWrap {
    type Error = mysql_async::FromValueError;
    fn try_from(value: mysql_async::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            mysql_async::Value::NULL => Value::Null,
            mysql_async::Value::Bytes(v) => match String::from_utf8(v) {
                Ok(v) => Value::Varchar(v),
                Err(e) => Value::Blob(e.into_bytes().into()),
            },
            mysql_async::Value::Int(v) => Value::Int64(v),
            mysql_async::Value::UInt(v) => Value::UInt64(v),
            mysql_async::Value::Float(v) => Value::Float64(v.into()),
            mysql_async::Value::Double(v) => Value::Float64(v),
            mysql_async::Value::Date(year, month, day, hour, minute, second, microsecond) => {
                let invalid = || mysql_async::FromValueError(value.clone());
                let month = Month::try_from(month).map_err(|_| invalid())?;
                let date = Date::from_calendar_date(year as _, month, day).map_err(|_| invalid())?;
                let time = Time::from_hms_micro(hour, minute, second, microsecond)
                    .map_err(|_| invalid())?;
                Value::Timestamp(PrimitiveDateTime::new(date, time))
            }
            mysql_async::Value::Time(negative, days, hours, minutes, seconds, micro) => {
                if !negative && days == 0 {
                    Value::Time(
                        Time::from_hms_micro(hours, minutes, seconds, micro)
                            .map_err(|_| mysql_async::FromValueError(value.clone()))?,
                    )
                } else {
                    // Durations beyond a day have no time of day counterpart
                    let hours = days * 24 + hours as u32;
                    let sign = if negative { "-" } else { "" };
                    Value::Varchar(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micro:06}"))
                }
            }
        }
        .into())
    }
}

impl TryFrom<ValueWrap> for mysql_async::Value {
    type Error = Error;

    fn try_from(value: ValueWrap) -> Result<Self, Self::Error> {
        type MySQLValue = mysql_async::Value;
        macro_rules! ensure_date_range {
            ($date:expr, $target:ty) => {{
                let year = $date.year();
                if year == year.clamp(<$target>::MIN as _, <$target>::MAX as _) {
                    Ok(MySQLValue::Date(
                        $date.year() as _,
                        $date.month().into(),
                        $date.day(),
                        $date.hour(),
                        $date.minute(),
                        $date.second(),
                        $date.microsecond(),
                    ))
                } else {
                    Err(Self::Error::msg(format!(
                        "Date {} is out of range for MySQL",
                        $date
                    )))
                }
            }};
        }
        Ok(match value.0 {
            Value::Null => MySQLValue::NULL,
            Value::Boolean(v) => MySQLValue::from(v),
            Value::Int64(v) => MySQLValue::from(v),
            Value::UInt64(v) => MySQLValue::from(v),
            Value::Float64(v) => MySQLValue::from(v),
            Value::Decimal(v) => MySQLValue::from(v),
            Value::Varchar(v) => MySQLValue::from(v),
            Value::Blob(v) => MySQLValue::from(v.into_vec()),
            Value::Date(v) => MySQLValue::from(v),
            Value::Time(v) => MySQLValue::from(v),
            Value::Timestamp(v) => ensure_date_range!(v, u16)?,
            Value::TimestampWithTimezone(v) => {
                let date_time = v.to_utc();
                ensure_date_range!(date_time, u16)?
            }
            Value::Uuid(v) => MySQLValue::from(v.hyphenated().to_string()),
            Value::List(..) => {
                return Err(Error::msg(
                    "A list cannot be bound to a single placeholder, expand it into `(?, ?, ...)`",
                ));
            }
        })
    }
}
