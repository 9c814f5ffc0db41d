//! Implementation of [serde::de::Deserializer] for [Value]

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::de::{
    self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;

use crate::codec::err::{Error, Result};
use crate::value::{HybridInt, Value};

/// Visits a big integer as the narrowest primitive that holds it, or as text.
fn visit_bigint<'de, V: Visitor<'de>>(v: BigInt, visitor: V) -> Result<V::Value> {
    if let Some(small) = v.to_i64() {
        visitor.visit_i64(small)
    } else if let Some(small) = v.to_u64() {
        visitor.visit_u64(small)
    } else if let Some(wide) = v.to_i128() {
        visitor.visit_i128(wide)
    } else if let Some(wide) = v.to_u128() {
        visitor.visit_u128(wide)
    } else {
        visitor.visit_string(v.to_string())
    }
}

fn visit_items<'de, V, I>(items: I, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
    I: IntoIterator<Item = Value>,
{
    let mut seq = SeqDeserializer {
        iter: items.into_iter(),
    };
    let value = visitor.visit_seq(&mut seq)?;
    match seq.iter.next() {
        None => Ok(value),
        Some(_) => Err(de::Error::custom("sequence has trailing elements")),
    }
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Byte(v) => visitor.visit_i8(v),
            Value::Short(v) => visitor.visit_i16(v),
            Value::Int(v) => visitor.visit_i32(v),
            Value::Long(v) => visitor.visit_i64(v),
            Value::Float(v) => visitor.visit_f32(v),
            Value::Double(v) => visitor.visit_f64(v),
            Value::Char(v) => visitor.visit_char(v),

            Value::String(s)
            | Value::Keyword(s)
            | Value::Symbol(s)
            | Value::Url(s)
            | Value::Uri(s)
            | Value::ZoneId(s) => visitor.visit_string(s),
            Value::Regex(p) => visitor.visit_str(p.as_str()),
            Value::Uuid(u) => visitor.visit_string(u.to_string()),
            Value::Bytes(b) => visitor.visit_byte_buf(b),

            Value::BigInt(v) => visit_bigint(v, visitor),
            Value::HybridInt(HybridInt::Small(v)) => visitor.visit_i64(v),
            Value::HybridInt(HybridInt::Big(v)) => visit_bigint(v, visitor),
            Value::BigDecimal(v) => visitor.visit_string(v.to_string()),
            Value::Ratio(v) => visitor.visit_string(v.to_string()),

            Value::IntArray(v) => visit_items(v.into_iter().map(Value::Int), visitor),
            Value::ShortArray(v) => visit_items(v.into_iter().map(Value::Short), visitor),
            Value::LongArray(v) => visit_items(v.into_iter().map(Value::Long), visitor),
            Value::FloatArray(v) => visit_items(v.into_iter().map(Value::Float), visitor),
            Value::DoubleArray(v) => visit_items(v.into_iter().map(Value::Double), visitor),
            Value::BoolArray(v) => visit_items(v.into_iter().map(Value::Bool), visitor),
            Value::CharArray(v) => visit_items(v.into_iter().map(Value::Char), visitor),

            Value::Vector(items)
            | Value::Set(items)
            | Value::SortedSet(items)
            | Value::List(items)
            | Value::Seq(items)
            | Value::Iterable(items)
            | Value::GenericList(items)
            | Value::ObjectArray(items) => visit_items(items, visitor),
            Value::Queue(items) => visit_items(items, visitor),
            // endless producers never finish here
            Value::Lazy(seq) => visit_items(seq.iter(), visitor),
            Value::MapEntry(k, v) => visit_items([*k, *v], visitor),

            Value::Map(map) | Value::SortedMap(map) | Value::GenericMap(map) => {
                let mut access = MapDeserializer {
                    iter: map.into_iter(),
                    value: None,
                };
                visitor.visit_map(&mut access)
            }

            Value::Instant(dt) | Value::Date(dt) => visitor.visit_string(dt.to_rfc3339()),
            Value::LocalDate(d) => visitor.visit_string(d.to_string()),
            Value::LocalTime(t) => visitor.visit_string(t.to_string()),
            Value::LocalDateTime(dt) => visitor.visit_string(dt.to_string()),
            Value::OffsetDateTime(dt) => visitor.visit_string(dt.to_rfc3339()),
            Value::OffsetTime(t) => visitor.visit_string(format!("{}{}", t.time, t.offset)),
            Value::ZonedDateTime(z) => visitor.visit_string(format!("{}[{}]", z.local, z.zone)),
            Value::Duration(d) => visitor.visit_string(d.to_string()),
            Value::Period(p) => {
                visitor.visit_string(format!("P{}Y{}M{}D", p.years, p.months, p.days))
            }

            Value::Atom(inner) | Value::Ref(inner) => (*inner).deserialize_any(visitor),
            Value::WithMeta { value, .. } => (*value).deserialize_any(visitor),
            Value::Future(deferred) => match deferred.peek() {
                Some(inner) => inner.deserialize_any(visitor),
                None => Err(de::Error::custom("future is not realized")),
            },
            Value::Exception(ex) => visitor.visit_string(ex.to_string()),
            Value::Unsupported { repr, .. } => visitor.visit_string(repr),
            Value::Custom(custom) => Err(Error::UnsupportedType {
                type_name: custom.type_name().into(),
            }),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::Keyword(variant) | Value::String(variant) => {
                visitor.visit_enum(variant.into_deserializer())
            }
            Value::Map(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(de::Error::custom("empty enum map")),
                }
            }
            other => Err(de::Error::custom(format!(
                "expected an enum, got {}",
                other.type_name()
            ))),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

/// This wrapper contains the implementation for accessing sequences.
struct SeqDeserializer<I> {
    iter: I,
}

impl<'de, I> SeqAccess<'de> for SeqDeserializer<I>
where
    I: Iterator<Item = Value>,
{
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

/// This wrapper contains the implementation for accessing maps and structs.
struct MapDeserializer<I> {
    iter: I,
    value: Option<Value>,
}

impl<'de, I> MapAccess<'de> for MapDeserializer<I>
where
    I: Iterator<Item = (Value, Value)>,
{
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(de::Error::custom("map key without a value")),
        }
    }
}

/// A single-entry map read as `variant => data`.
struct EnumDeserializer {
    variant: Value,
    value: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;

    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(self.variant)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(de::Error::custom(format!(
                "unit variant carries a {}",
                other.type_name()
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(value),
            None => Err(de::Error::custom("newtype variant without data")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_seq(value, visitor),
            None => Err(de::Error::custom("tuple variant without data")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_map(value, visitor),
            None => Err(de::Error::custom("struct variant without data")),
        }
    }
}
