//! Typed property values
//!
//! JSON erases the difference between an `i32` and an `i64`, or between a
//! date and a string. Each value is therefore stored next to a tag naming its
//! variant, and decoding rebuilds exactly that variant.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A property value of one of the supported kinds
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Date(DateTime<Utc>),
    BooleanArray(Vec<bool>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

/// Wire form: `{"value": ..., "valueType": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    pub value: Value,
    pub value_type: String,
}

impl PropertyValue {
    /// Tag written next to the value
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Byte(_) => "Byte",
            Self::Short(_) => "Short",
            Self::Int(_) => "Int",
            Self::Long(_) => "Long",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::Date(_) => "Date",
            Self::BooleanArray(_) => "BooleanArray",
            Self::IntArray(_) => "IntArray",
            Self::LongArray(_) => "LongArray",
            Self::DoubleArray(_) => "DoubleArray",
            Self::StringArray(_) => "StringArray",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
        }
    }

    /// Encode into the tagged wire form
    pub fn encode(&self) -> Result<TypedValue> {
        Ok(TypedValue {
            value: self.to_json()?,
            value_type: self.type_tag().to_string(),
        })
    }

    /// Decode from the tagged wire form
    pub fn decode(typed: &TypedValue) -> Result<Self> {
        Self::from_json(&typed.value_type, &typed.value)
    }

    fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Byte(n) => Value::from(*n),
            Self::Short(n) => Value::from(*n),
            Self::Int(n) => Value::from(*n),
            Self::Long(n) => Value::from(*n),
            Self::Float(n) => finite(f64::from(*n))?,
            Self::Double(n) => finite(*n)?,
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.to_rfc3339()),
            Self::BooleanArray(v) => Value::from(v.clone()),
            Self::IntArray(v) => Value::from(v.clone()),
            Self::LongArray(v) => Value::from(v.clone()),
            Self::DoubleArray(v) => Value::Array(
                v.iter()
                    .map(|n| finite(*n))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::StringArray(v) => Value::from(v.clone()),
            Self::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Ok(serde_json::to_value(item.encode()?)?))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), serde_json::to_value(v.encode()?)?);
                }
                Value::Object(map)
            }
        })
    }

    fn from_json(tag: &str, value: &Value) -> Result<Self> {
        let mismatch = || Error::UnsupportedValue(format!("{} does not hold a {}", value, tag));
        Ok(match tag {
            "Boolean" => Self::Boolean(value.as_bool().ok_or_else(mismatch)?),
            "Byte" => Self::Byte(int_in_range(value).ok_or_else(mismatch)?),
            "Short" => Self::Short(int_in_range(value).ok_or_else(mismatch)?),
            "Int" => Self::Int(int_in_range(value).ok_or_else(mismatch)?),
            "Long" => Self::Long(value.as_i64().ok_or_else(mismatch)?),
            "Float" => Self::Float(value.as_f64().ok_or_else(mismatch)? as f32),
            "Double" => Self::Double(value.as_f64().ok_or_else(mismatch)?),
            "String" => Self::String(value.as_str().ok_or_else(mismatch)?.to_string()),
            "Date" => {
                let text = value.as_str().ok_or_else(mismatch)?;
                let date = DateTime::parse_from_rfc3339(text).map_err(|_| mismatch())?;
                Self::Date(date.with_timezone(&Utc))
            }
            "BooleanArray" => Self::BooleanArray(array_of(value, Value::as_bool).ok_or_else(mismatch)?),
            "IntArray" => Self::IntArray(array_of(value, int_in_range).ok_or_else(mismatch)?),
            "LongArray" => Self::LongArray(array_of(value, Value::as_i64).ok_or_else(mismatch)?),
            "DoubleArray" => Self::DoubleArray(array_of(value, Value::as_f64).ok_or_else(mismatch)?),
            "StringArray" => Self::StringArray(
                array_of(value, |v| v.as_str().map(str::to_string)).ok_or_else(mismatch)?,
            ),
            "List" => {
                let items = value.as_array().ok_or_else(mismatch)?;
                Self::List(
                    items
                        .iter()
                        .map(|item| Self::decode(&serde_json::from_value(item.clone())?))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            "Map" => {
                let entries = value.as_object().ok_or_else(mismatch)?;
                let mut map = BTreeMap::new();
                for (k, v) in entries {
                    map.insert(k.clone(), Self::decode(&serde_json::from_value(v.clone())?)?);
                }
                Self::Map(map)
            }
            other => {
                return Err(Error::UnsupportedValue(format!("unknown value type '{}'", other)));
            }
        })
    }
}

fn finite(n: f64) -> Result<Value> {
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| Error::UnsupportedValue(format!("non-finite number {}", n)))
}

fn int_in_range<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|n| T::try_from(n).ok())
}

fn array_of<T>(value: &Value, item: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(item).collect()
}

impl Serialize for PropertyValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.encode()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let typed = TypedValue::deserialize(deserializer)?;
        Self::decode(&typed).map_err(serde::de::Error::custom)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    DateTime<Utc> => Date,
    Vec<bool> => BooleanArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    Vec<f64> => DoubleArray,
    Vec<String> => StringArray,
}

/// Best-effort typing of untyped JSON input
///
/// Integers become `Long`, other numbers `Double`, arrays `List` and objects
/// `Map`. `null` and integers beyond `i64` have no property representation.
impl TryFrom<Value> for PropertyValue {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(Error::UnsupportedValue("null".to_string())),
            Value::Bool(b) => Ok(Self::Boolean(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Long(i))
                } else if n.is_u64() {
                    Err(Error::UnsupportedValue(format!("{} exceeds the Long range", n)))
                } else {
                    n.as_f64()
                        .map(Self::Double)
                        .ok_or_else(|| Error::UnsupportedValue(n.to_string()))
                }
            }
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(items) => Ok(Self::List(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Object(entries) => Ok(Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, Self::try_from(v)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            )),
        }
    }
}
