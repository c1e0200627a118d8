//! Cell values decoded from SQL Server rows.
//!
//! Every column is decoded into a [`SqlValue`] whose `Display` implementation is
//! the textual form used in tool output.

use crate::error::DbResult;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use tiberius::{ColumnData, FromSql, Row};

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// DECIMAL/NUMERIC/MONEY, kept in the server's exact representation
    Decimal(String),
    Text(String),
    Binary(Vec<u8>),
    Uuid(String),
    /// Date, time and timestamp values, already rendered
    Temporal(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Decimal(v) | Self::Text(v) | Self::Uuid(v) | Self::Temporal(v) => {
                f.write_str(v)
            }
            Self::Binary(bytes) => f.write_str(&STANDARD.encode(bytes)),
        }
    }
}

/// Shortest round-trip form that always keeps a fraction or an exponent:
/// `1.0`, `0.1`, `1e+20`, `1.5e-07`.
fn format_float(v: f64) -> String {
    let repr = format!("{:?}", v);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

fn temporal<'a, T>(data: &'a ColumnData<'static>) -> DbResult<SqlValue>
where
    T: FromSql<'a> + fmt::Display,
{
    Ok(T::from_sql(data)?
        .map(|v| SqlValue::Temporal(v.to_string()))
        .unwrap_or(SqlValue::Null))
}

impl SqlValue {
    /// Decode one column value as delivered by the TDS stream.
    pub fn from_column(data: ColumnData<'static>) -> DbResult<Self> {
        let value = match data {
            ColumnData::U8(v) => v.map(|v| Self::Int(v.into())).into(),
            ColumnData::I16(v) => v.map(|v| Self::Int(v.into())).into(),
            ColumnData::I32(v) => v.map(|v| Self::Int(v.into())).into(),
            ColumnData::I64(v) => v.map(Self::Int).into(),
            ColumnData::F32(v) => v.map(|v| Self::Float(v.into())).into(),
            ColumnData::F64(v) => v.map(Self::Float).into(),
            ColumnData::Bit(v) => v.map(Self::Bool).into(),
            ColumnData::String(v) => v.map(|s| Self::Text(s.into_owned())).into(),
            ColumnData::Guid(v) => v.map(|g| Self::Uuid(g.to_string())).into(),
            ColumnData::Binary(v) => v.map(|b| Self::Binary(b.into_owned())).into(),
            ColumnData::Numeric(v) => v.map(|n| Self::Decimal(n.to_string())).into(),
            ColumnData::Xml(v) => v.map(|x| Self::Text(x.into_owned().into_string())).into(),
            ref data @ (ColumnData::DateTime(_)
            | ColumnData::SmallDateTime(_)
            | ColumnData::DateTime2(_)) => temporal::<NaiveDateTime>(data)?,
            ref data @ ColumnData::Date(_) => temporal::<NaiveDate>(data)?,
            ref data @ ColumnData::Time(_) => temporal::<NaiveTime>(data)?,
            ref data @ ColumnData::DateTimeOffset(_) => temporal::<DateTime<FixedOffset>>(data)?,
        };
        Ok(value)
    }

    /// Decode every column of a row, in column order.
    pub fn from_row(row: Row) -> DbResult<Vec<Self>> {
        row.into_iter().map(Self::from_column).collect()
    }
}
