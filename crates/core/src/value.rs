//! Preference values
//!
//! A stored value is a scalar or a set of strings. The type tag is kept
//! through serialization so reads can tell an `Int` from a `Long`. JSON has
//! no literal for NaN or the infinities, so a non-finite `Float` is written
//! as one of the strings `"NaN"`, `"Infinity"` or `"-Infinity"`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A value stored under a preference key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    #[serde(with = "float_repr")]
    Float(f32),
    String(String),
    StringSet(BTreeSet<String>),
}

impl PrefValue {
    /// Name of the stored type, as used in the serialized tag
    pub fn type_name(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Int(_) => "int",
            PrefValue::Long(_) => "long",
            PrefValue::Float(_) => "float",
            PrefValue::String(_) => "string",
            PrefValue::StringSet(_) => "string_set",
        }
    }

    /// Coerce into the requested type
    pub fn get<T: FromPrefValue>(&self) -> Option<T> {
        T::from_pref_value(self)
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Bool(v) => write!(f, "{v}"),
            PrefValue::Int(v) => write!(f, "{v}"),
            PrefValue::Long(v) => write!(f, "{v}"),
            PrefValue::Float(v) => write!(f, "{v}"),
            PrefValue::String(v) => f.write_str(v),
            PrefValue::StringSet(set) => {
                let items: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

mod float_repr {
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            serializer.serialize_f32(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl Visitor<'_> for FloatVisitor {
        type Value = f32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a number or one of {NAN:?}, {INFINITY:?}, {NEG_INFINITY:?}")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f32, E> {
            Ok(v as f32)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f32, E> {
            match v {
                NAN => Ok(f32::NAN),
                INFINITY => Ok(f32::INFINITY),
                NEG_INFINITY => Ok(f32::NEG_INFINITY),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }
    }
}

/// Checked conversion out of a stored value.
///
/// Conversion only succeeds when the stored tag is exactly the requested
/// type; there is no widening from `Int` to `Long` or parsing of strings.
pub trait FromPrefValue: Sized {
    fn from_pref_value(value: &PrefValue) -> Option<Self>;
}

macro_rules! impl_pref_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromPrefValue for $ty {
                fn from_pref_value(value: &PrefValue) -> Option<Self> {
                    match value {
                        PrefValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for PrefValue {
                fn from(value: $ty) -> Self {
                    PrefValue::$variant(value)
                }
            }
        )*
    };
}

impl_pref_conversions! {
    bool => Bool,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    String => String,
    BTreeSet<String> => StringSet,
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::String(value.to_string())
    }
}
