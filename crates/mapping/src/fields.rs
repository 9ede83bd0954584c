//! Structural field conversion
//!
//! [`FieldValue`] is the seam every declared field goes through when no
//! custom converter claims its type. Width handling is strict: payloads
//! store integers at `i64` and floats at `f64`, and reading back into a
//! narrower declared type succeeds only when the value fits losslessly —
//! otherwise the read fails with `Error::Conversion` rather than wrapping
//! or truncating. Integers and floats never convert into each other
//! implicitly, with one exception: an `f64` field accepts an integer that
//! is exactly representable.

use crate::convert::{DateFormat, MapContext};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use sediment_core::{Error, Payload, Result, Value};
use std::collections::{BTreeMap, HashMap};

/// A type that can live in a declared field.
///
/// Implementations exist for the primitives, `String`, `Option`, `Vec`,
/// string-keyed maps, and `DateTime<Utc>`. Embedded object types get an
/// impl delegating to [`MapContext::encode_fragment`] /
/// [`MapContext::decode_fragment`]; enums get one from
/// [`map_enum!`](crate::map_enum). Conversion recurses through the
/// context so the custom registry is consulted at every level.
pub trait FieldValue: Sized + 'static {
    /// Encode into a payload value
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value>;
    /// Decode from a payload value
    fn from_value(value: &Value, cx: &MapContext<'_>) -> Result<Self>;
}

fn mismatch<T>(expected: &str, got: &Value) -> Result<T> {
    Err(Error::Conversion(format!(
        "expected {expected}, got {}",
        got.type_name()
    )))
}

impl FieldValue for bool {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => mismatch("Bool", other),
        }
    }
}

impl FieldValue for String {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => mismatch("String", other),
        }
    }
}

impl FieldValue for Value {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        Ok(value.clone())
    }
}

macro_rules! integral_field {
    ($($ty:ty),+) => {$(
        impl FieldValue for $ty {
            fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
                Ok(Value::Int(i64::from(*self)))
            }

            fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
                match value {
                    Value::Int(n) => <$ty>::try_from(*n).map_err(|_| {
                        Error::Conversion(format!(
                            "Int {n} does not fit in {}",
                            stringify!($ty)
                        ))
                    }),
                    other => mismatch("Int", other),
                }
            }
        }
    )+};
}

integral_field!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for u64 {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        i64::try_from(*self)
            .map(Value::Int)
            .map_err(|_| Error::Conversion(format!("u64 {self} exceeds the storable range")))
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Int(n) => u64::try_from(*n)
                .map_err(|_| Error::Conversion(format!("Int {n} does not fit in u64"))),
            other => mismatch("Int", other),
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            // integers exactly representable at f64 are accepted; the
            // back-cast compares at i128 width because a float->i64 cast
            // saturates and would wave through values near i64::MAX
            Value::Int(n) => {
                let widened = *n as f64;
                if widened as i128 == i128::from(*n) {
                    Ok(widened)
                } else {
                    Err(Error::Conversion(format!(
                        "Int {n} is not exactly representable as f64"
                    )))
                }
            }
            other => mismatch("Float", other),
        }
    }
}

impl FieldValue for f32 {
    fn to_value(&self, _cx: &MapContext<'_>) -> Result<Value> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Float(f) => {
                let narrowed = *f as f32;
                if f64::from(narrowed) == *f || f.is_nan() {
                    Ok(narrowed)
                } else {
                    Err(Error::Conversion(format!(
                        "Float {f} does not fit in f32 without loss"
                    )))
                }
            }
            other => mismatch("Float", other),
        }
    }
}

impl<F: FieldValue> FieldValue for Option<F> {
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value> {
        match self {
            Some(inner) => cx.encode(inner),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value, cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            present => Ok(Some(cx.decode(present)?)),
        }
    }
}

impl<F: FieldValue> FieldValue for Vec<F> {
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value> {
        // nulls inside a sequence are positional and kept, unlike
        // top-level fields
        self.iter()
            .map(|item| cx.encode(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn from_value(value: &Value, cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Array(items) => items.iter().map(|item| cx.decode(item)).collect(),
            other => mismatch("Array", other),
        }
    }
}

impl<F: FieldValue> FieldValue for HashMap<String, F> {
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value> {
        // entries land in key order so output is deterministic
        let mut keys: Vec<&String> = self.keys().collect();
        keys.sort();
        let mut payload = Payload::with_capacity(keys.len());
        for key in keys {
            payload.insert(key.clone(), cx.encode(&self[key])?);
        }
        Ok(Value::Object(payload))
    }

    fn from_value(value: &Value, cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Object(payload) => payload
                .iter()
                .map(|(key, item)| Ok((key.to_string(), cx.decode(item)?)))
                .collect(),
            other => mismatch("Object", other),
        }
    }
}

impl<F: FieldValue> FieldValue for BTreeMap<String, F> {
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value> {
        let mut payload = Payload::with_capacity(self.len());
        for (key, item) in self {
            payload.insert(key.clone(), cx.encode(item)?);
        }
        Ok(Value::Object(payload))
    }

    fn from_value(value: &Value, cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Object(payload) => payload
                .iter()
                .map(|(key, item)| Ok((key.to_string(), cx.decode(item)?)))
                .collect(),
            other => mismatch("Object", other),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_value(&self, cx: &MapContext<'_>) -> Result<Value> {
        Ok(match cx.date_format() {
            DateFormat::EpochMillis => Value::Int(self.timestamp_millis()),
            DateFormat::Iso8601 => {
                Value::String(self.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        })
    }

    // reads accept either canonical encoding, so documents written under
    // one config remain readable under the other
    fn from_value(value: &Value, _cx: &MapContext<'_>) -> Result<Self> {
        match value {
            Value::Int(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .ok_or_else(|| Error::Conversion(format!("Int {millis} is out of range for a timestamp"))),
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Conversion(format!("not an RFC 3339 timestamp: {e}"))),
            other => mismatch("Int or String", other),
        }
    }
}

/// Implement [`FieldValue`] for a fieldless enum, encoding each variant as
/// its symbolic name. An unknown name on read is `Error::Conversion`.
///
/// ```ignore
/// #[derive(Default)]
/// enum Strength { #[default] Session, Standard, Imperial }
/// map_enum!(Strength { Session, Standard, Imperial });
/// ```
#[macro_export]
macro_rules! map_enum {
    ($enum:ty { $($variant:ident),+ $(,)? }) => {
        impl $crate::FieldValue for $enum {
            fn to_value(
                &self,
                _cx: &$crate::MapContext<'_>,
            ) -> $crate::Result<$crate::Value> {
                let name = match self {
                    $(<$enum>::$variant => stringify!($variant)),+
                };
                Ok($crate::Value::String(name.to_string()))
            }

            fn from_value(
                value: &$crate::Value,
                _cx: &$crate::MapContext<'_>,
            ) -> $crate::Result<Self> {
                let name = value.as_str().ok_or_else(|| {
                    $crate::Error::Conversion(format!(
                        "expected String for {}, got {}",
                        std::any::type_name::<$enum>(),
                        value.type_name()
                    ))
                })?;
                match name {
                    $(stringify!($variant) => Ok(<$enum>::$variant),)+
                    other => Err($crate::Error::Conversion(format!(
                        "unknown {} variant {:?}",
                        std::any::type_name::<$enum>(),
                        other
                    ))),
                }
            }
        }
    };
}
