//! Core value types shared by the schema, the coercion engine and imported records.
//!
//! A field's [`FieldKind`] is resolved once when the schema is built, so mapping a row is a plain
//! `match` over a closed set of variants. Every coerced cell ends up as a [`Value`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Logical scalar type a cell can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// UTF-8 string.
    String,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit floating point number.
    Float,
    /// 64-bit floating point number.
    Double,
    /// Boolean.
    Boolean,
    /// Calendar date and wall-clock time.
    DateTime,
    /// Calendar date.
    Date,
    /// Wall-clock time.
    Time,
}

impl ScalarType {
    /// `true` for the date/time family, whose `matches` option is a parse format, not a regex.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::DateTime | Self::Date | Self::Time)
    }
}

/// What a map-valued field is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKeyKind {
    /// The matched column's display name (named mode only).
    Name,
    /// The matched column's zero-based index.
    Index,
}

/// Shape of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A single builtin value.
    Scalar(ScalarType),
    /// One value per matched column, in resolved column order.
    List(ScalarType),
    /// One value per matched column, keyed by display name or column index.
    Map { key: MapKeyKind, value: ScalarType },
    /// A symbolic value that must be one of `allowed` (case-sensitive).
    Enum { allowed: Vec<String> },
    /// A record-defined type built from the cell's string by [`crate::Importable::set_field`].
    Custom,
}

impl FieldKind {
    /// Shorthand for [`FieldKind::Scalar`].
    pub fn scalar(ty: ScalarType) -> Self {
        Self::Scalar(ty)
    }

    /// Shorthand for an enum kind from any list of symbolic names.
    pub fn enumeration<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// `true` for kinds that may bind more than one column.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map { .. })
    }

    /// The scalar type used to coerce each matched cell, if the kind has one.
    pub fn element_type(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(ty) | Self::List(ty) => Some(*ty),
            Self::Map { value, .. } => Some(*value),
            Self::Enum { .. } | Self::Custom => None,
        }
    }
}

/// Key of a [`Value::Map`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MapKey {
    /// Display name of the source column.
    Name(String),
    /// Zero-based index of the source column.
    Index(usize),
}

/// A single coerced value handed to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// Missing, empty or rejected value.
    Null,
    String(String),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    /// A declared enum symbol.
    Enum(String),
    /// Values of a multi-column field, in resolved column order.
    List(Vec<Value>),
    /// Keyed values of a multi-column field, in resolved column order.
    Map(Vec<(MapKey, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload of `String` and `Enum` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant, widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Any numeric variant, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match *self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match *self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match *self {
            Self::Time(t) => Some(t),
            _ => None,
        }
    }

    /// Take the string payload, leaving nothing behind. `Null` maps to `None`.
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Take the elements of a `List`. `Null` maps to an empty list.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Self::List(values) => values,
            _ => Vec::new(),
        }
    }

    /// Take the entries of a `Map`. `Null` maps to an empty list of entries.
    pub fn into_entries(self) -> Vec<(MapKey, Value)> {
        match self {
            Self::Map(entries) => entries,
            _ => Vec::new(),
        }
    }
}
