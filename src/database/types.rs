//! SQL Server type mapping to Rust types.

use crate::error::ServerError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use tiberius::{ColumnData, FromSql};
use uuid::Uuid;

/// A nullable scalar cell value.
///
/// Every variant has a single, locale-independent text form (see the
/// [`fmt::Display`] impl), so identical data always renders identically.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Widen any integer value to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::U8(v) => Some(i64::from(*v)),
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert one column of a tiberius row.
    pub fn from_column(data: &ColumnData<'static>) -> Result<Self, ServerError> {
        let value = match data {
            ColumnData::U8(v) => v.map(SqlValue::U8),
            ColumnData::I16(v) => v.map(SqlValue::I16),
            ColumnData::I32(v) => v.map(SqlValue::I32),
            ColumnData::I64(v) => v.map(SqlValue::I64),
            ColumnData::F32(v) => v.map(SqlValue::F32),
            ColumnData::F64(v) => v.map(SqlValue::F64),
            ColumnData::Bit(v) => v.map(SqlValue::Bool),
            ColumnData::String(v) => v.as_ref().map(|s| SqlValue::String(s.to_string())),
            ColumnData::Guid(v) => v.map(SqlValue::Uuid),
            ColumnData::Binary(v) => v.as_ref().map(|b| SqlValue::Bytes(b.to_vec())),
            // DECIMAL(38, s) can exceed rust_decimal's 96-bit mantissa or
            // scale 28; tiberius renders those losslessly.
            ColumnData::Numeric(v) => v.as_ref().map(|n| {
                Decimal::try_from_i128_with_scale(n.value(), u32::from(n.scale()))
                    .map(SqlValue::Decimal)
                    .unwrap_or_else(|_| SqlValue::String(n.to_string()))
            }),
            ColumnData::Xml(v) => v
                .as_ref()
                .map(|xml| SqlValue::String(xml.clone().into_owned().into_string())),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                convert::<NaiveDateTime>(data)?.map(SqlValue::DateTime)
            }
            ColumnData::Date(_) => convert::<NaiveDate>(data)?.map(SqlValue::Date),
            ColumnData::Time(_) => convert::<NaiveTime>(data)?.map(SqlValue::Time),
            ColumnData::DateTimeOffset(_) => {
                convert::<DateTime<FixedOffset>>(data)?.map(SqlValue::DateTimeOffset)
            }
            #[allow(unreachable_patterns)]
            _ => {
                return Err(ServerError::formatting(format!(
                    "unsupported column type: {:?}",
                    data
                )))
            }
        };

        Ok(value.unwrap_or(SqlValue::Null))
    }
}

/// Run a tiberius conversion; a cell that cannot be read is a formatting
/// failure, not a query failure.
fn convert<'a, T: FromSql<'a>>(data: &'a ColumnData<'static>) -> Result<Option<T>, ServerError> {
    T::from_sql(data)
        .map_err(|e| ServerError::formatting(format!("cannot convert {:?}: {}", data, e)))
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str(crate::constants::NULL_TEXT),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::U8(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::String(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "0x{}", hex::encode_upper(v)),
            SqlValue::Uuid(v) => write!(f, "{}", v),
            SqlValue::Date(v) => write!(f, "{}", v),
            SqlValue::Time(v) => write!(f, "{}", v),
            SqlValue::DateTime(v) => write!(f, "{}", v),
            SqlValue::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tiberius::numeric::Numeric;

    #[test]
    fn test_sql_value_display() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::I32(42).to_string(), "42");
        assert_eq!(SqlValue::from("hello").to_string(), "hello");
        assert_eq!(SqlValue::Bool(true).to_string(), "true");
        assert_eq!(SqlValue::F64(1.5).to_string(), "1.5");
        assert_eq!(SqlValue::Bytes(vec![0xDE, 0xAD]).to_string(), "0xDEAD");
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let value = SqlValue::Decimal(Decimal::from_i128_with_scale(12345, 2));
        assert_eq!(value.to_string(), "123.45");
    }

    #[test]
    fn test_temporal_display_is_iso() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let time = NaiveTime::from_hms_opt(13, 5, 0).unwrap();
        assert_eq!(SqlValue::Date(date).to_string(), "2024-02-29");
        assert_eq!(SqlValue::Time(time).to_string(), "13:05:00");
        assert_eq!(
            SqlValue::DateTime(date.and_time(time)).to_string(),
            "2024-02-29 13:05:00"
        );
    }

    #[test]
    fn test_sql_value_is_null() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::I32(0).is_null());
        assert!(SqlValue::from(None::<i32>).is_null());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(SqlValue::from("dbo").as_str(), Some("dbo"));
        assert_eq!(SqlValue::U8(7).as_i64(), Some(7));
        assert_eq!(SqlValue::I16(-1).as_i64(), Some(-1));
        assert_eq!(SqlValue::from("7").as_i64(), None);
    }

    #[test]
    fn test_from_column_data() {
        let value = SqlValue::from_column(&ColumnData::I32(Some(5))).unwrap();
        assert_eq!(value, SqlValue::I32(5));

        let value = SqlValue::from_column(&ColumnData::String(None)).unwrap();
        assert!(value.is_null());

        let value =
            SqlValue::from_column(&ColumnData::String(Some(Cow::Borrowed("Ann")))).unwrap();
        assert_eq!(value, SqlValue::from("Ann"));

        let value = SqlValue::from_column(&ColumnData::Bit(Some(false))).unwrap();
        assert_eq!(value.to_string(), "false");
    }

    #[test]
    fn test_binary_renders_upper_hex() {
        let value = SqlValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(value.to_string(), "0xDEADBEEF");
        assert_eq!(SqlValue::Bytes(Vec::new()).to_string(), "0x");
    }

    #[test]
    fn test_numeric_within_decimal_range() {
        let numeric = Numeric::new_with_scale(12345, 2);
        let value = SqlValue::from_column(&ColumnData::Numeric(Some(numeric))).unwrap();
        assert_eq!(value, SqlValue::Decimal(Decimal::from_i128_with_scale(12345, 2)));
        assert_eq!(value.to_string(), "123.45");
    }

    #[test]
    fn test_numeric_scale_above_28() {
        // CAST(0.5 AS DECIMAL(38, 30))
        let numeric = Numeric::new_with_scale(5 * 10_i128.pow(29), 30);
        let value = SqlValue::from_column(&ColumnData::Numeric(Some(numeric))).unwrap();
        assert_eq!(value.to_string(), "0.500000000000000000000000000000");
    }

    #[test]
    fn test_numeric_38_digits() {
        let max = 99_999_999_999_999_999_999_999_999_999_999_999_999_i128;
        let numeric = Numeric::new_with_scale(max, 0);
        let value = SqlValue::from_column(&ColumnData::Numeric(Some(numeric))).unwrap();
        assert_eq!(value.to_string(), "99999999999999999999999999999999999999");
    }

    #[test]
    fn test_unconvertible_cell_is_a_formatting_error() {
        let err = convert::<NaiveDate>(&ColumnData::I32(Some(1))).unwrap_err();
        assert!(matches!(err, ServerError::Formatting(_)));
        assert!(err.caller_message().starts_with("Internal error: "));
    }
}
