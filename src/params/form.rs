//! Construct-and-decode: build a value of a declared type from the value pool.
//!
//! Struct fields are matched by name against pool keys (exact match first,
//! then ASCII case-insensitive). Scalars take the last value under their key,
//! sequences take all of them. A value wrapped in one pair of double quotes
//! has the quotes removed before parsing. Empty values decode to the zero
//! value of the target (`0`, `false`, `""`, `None`). Unknown keys are
//! ignored; a value that does not parse fails the whole decode.

use super::values::ValuePool;
use crate::error::FormError;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

/// A handler parameter built from the request's value pool.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct SaveInput {
///     #[serde(rename = "Name")]
///     name: String,
/// }
///
/// fn save(&mut self, Form(input): Form<SaveInput>) -> ActionResult { .. }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Form<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Form<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// Decode `T` from a value pool.
pub fn from_values<T: DeserializeOwned>(values: &ValuePool) -> Result<T, FormError> {
    T::deserialize(PoolDeserializer { values })
}

/// Remove one pair of surrounding double quotes, as sent by script clients
/// that stringify their values.
pub fn strip_quotes(value: &str) -> &str {
    if value.len() > 1 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

struct PoolDeserializer<'a> {
    values: &'a ValuePool,
}

impl<'de> de::Deserializer<'de> for PoolDeserializer<'_> {
    type Error = FormError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        let mut entries: Vec<_> = self.values.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        visitor.visit_map(PoolMapAccess {
            entries: entries.into_iter(),
            pending: None,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_map(StructAccess {
            fields: fields.iter(),
            values: self.values,
            used: HashSet::new(),
            pending: None,
        })
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct enum identifier ignored_any
    }
}

struct StructAccess<'a> {
    fields: std::slice::Iter<'static, &'static str>,
    values: &'a ValuePool,
    used: HashSet<&'a str>,
    pending: Option<(&'static str, &'a [String])>,
}

impl<'de, 'a> MapAccess<'de> for StructAccess<'a> {
    type Error = FormError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, FormError> {
        for &field in self.fields.by_ref() {
            let Some((key, vals)) = self.values.find(field) else {
                continue;
            };
            if !self.used.insert(key) {
                continue;
            }
            self.pending = Some((field, vals));
            return seed.deserialize(field.into_deserializer()).map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, FormError> {
        let (field, values) = self
            .pending
            .take()
            .ok_or_else(|| FormError::Custom("value requested before key".to_string()))?;
        seed.deserialize(ValueDeserializer { values })
            .map_err(|e| e.in_field(field))
    }
}

struct PoolMapAccess<'a, I: Iterator<Item = (&'a str, &'a [String])>> {
    entries: I,
    pending: Option<(&'a str, &'a [String])>,
}

impl<'de, 'a, I> MapAccess<'de> for PoolMapAccess<'a, I>
where
    I: Iterator<Item = (&'a str, &'a [String])>,
{
    type Error = FormError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, FormError> {
        match self.entries.next() {
            Some((key, values)) => {
                self.pending = Some((key, values));
                seed.deserialize(key.to_string().into_deserializer())
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, FormError> {
        let (key, values) = self
            .pending
            .take()
            .ok_or_else(|| FormError::Custom("value requested before key".to_string()))?;
        seed.deserialize(ValueDeserializer { values })
            .map_err(|e| e.in_field(key))
    }
}

/// Deserializer over the values stored under one key.
struct ValueDeserializer<'a> {
    values: &'a [String],
}

impl<'a> ValueDeserializer<'a> {
    fn last(&self) -> &'a str {
        self.values.last().map(|v| strip_quotes(v)).unwrap_or_default()
    }

    fn invalid(&self, expected: &'static str) -> FormError {
        FormError::InvalidValue {
            field: String::new(),
            value: self.last().to_string(),
            expected,
        }
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
                let raw = self.last().trim();
                if raw.is_empty() {
                    return visitor.$visit(<$ty>::default());
                }
                let parsed = raw
                    .parse::<$ty>()
                    .map_err(|_| self.invalid(stringify!($ty)))?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_> {
    type Error = FormError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        if self.values.len() > 1 {
            self.deserialize_seq(visitor)
        } else {
            visitor.visit_string(self.last().to_string())
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        let raw = self.last().trim();
        let value = match raw.to_ascii_lowercase().as_str() {
            "" | "0" | "f" | "false" | "off" | "no" => false,
            "1" | "t" | "true" | "on" | "yes" => true,
            _ => return Err(self.invalid("bool")),
        };
        visitor.visit_bool(value)
    }

    deserialize_number! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        let mut chars = self.last().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            (None, _) => visitor.visit_char('\0'),
            _ => Err(self.invalid("char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_string(self.last().to_string())
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_string(self.last().to_string())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_byte_buf(self.last().as_bytes().to_vec())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        if self.last().is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_seq(ValuesSeq {
            values: self.values.iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_enum(self.last().to_string().into_deserializer())
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! { map struct }
}

struct ValuesSeq<'a> {
    values: std::slice::Iter<'a, String>,
}

impl<'de> SeqAccess<'de> for ValuesSeq<'_> {
    type Error = FormError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, FormError> {
        match self.values.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer {
                    values: std::slice::from_ref(value),
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.values.len())
    }
}
