//! Implementation of [serde::ser::Serializer] for [ValueSerializer]

use num_bigint::BigInt;
use serde::{ser, Serialize};

use crate::codec::err::{Error, Result};
use crate::value::{Map, Value};

/// Lowers any `T: Serialize` into a [`Value`].
pub struct ValueSerializer;

/// Impl serialize for primitives that widen losslessly into a variant
macro_rules! serialize_numeric_primitive {
    ($fn_name: ident, $num_type: ty => $variant: ident) => {
        fn $fn_name(self, v: $num_type) -> Result<Value> {
            Ok(Value::$variant(v.into()))
        }
    };
}

/// Wraps `value` in a single-entry map keyed by the variant name.
fn variant_map(variant: &'static str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.push(Value::keyword(variant), value);
    Value::Map(map)
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;

    type Error = Error;

    type SerializeSeq = SerializeVec;

    type SerializeTuple = SerializeVec;

    type SerializeTupleStruct = SerializeVec;

    type SerializeTupleVariant = SerializeTupleVariant;

    type SerializeMap = SerializeMap;

    type SerializeStruct = SerializeStruct;

    type SerializeStructVariant = SerializeStructVariant;

    serialize_numeric_primitive! {serialize_bool, bool => Bool}

    serialize_numeric_primitive! {serialize_i8, i8 => Byte}
    serialize_numeric_primitive! {serialize_i16, i16 => Short}
    serialize_numeric_primitive! {serialize_i32, i32 => Int}
    serialize_numeric_primitive! {serialize_i64, i64 => Long}

    // unsigned values take the next wider signed variant
    serialize_numeric_primitive! {serialize_u8, u8 => Short}
    serialize_numeric_primitive! {serialize_u16, u16 => Int}
    serialize_numeric_primitive! {serialize_u32, u32 => Long}

    serialize_numeric_primitive! {serialize_f32, f32 => Float}
    serialize_numeric_primitive! {serialize_f64, f64 => Double}
    serialize_numeric_primitive! {serialize_char, char => Char}

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(match i64::try_from(v) {
            Ok(v) => Value::Long(v),
            Err(_) => Value::BigInt(BigInt::from(v)),
        })
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(Value::BigInt(BigInt::from(v)))
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(Value::BigInt(BigInt::from(v)))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    // some variants are stored as the inner value
    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<Value>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Value> {
        self.serialize_unit()
    }

    // unit variants are stored as a keyword of the variant name
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::keyword(variant))
    }

    // serialize the inner value
    fn serialize_newtype_struct<T: ?Sized>(self, _: &'static str, value: &T) -> Result<Value>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _: &'static str,
        _: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: Serialize,
    {
        Ok(variant_map(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or_default()),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMap {
            map: Map::with_capacity(len.unwrap_or_default()),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        Ok(SerializeStruct {
            map: Map::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeStructVariant {
            variant,
            map: Map::with_capacity(len),
        })
    }
}

pub struct SerializeVec {
    items: Vec<Value>,
}

pub struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
}

pub struct SerializeMap {
    map: Map,
    next_key: Option<Value>,
}

pub struct SerializeStruct {
    map: Map,
}

pub struct SerializeStructVariant {
    variant: &'static str,
    map: Map,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;

    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Vector(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;

    type Error = Error;

    fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(variant_map(self.variant, Value::Vector(self.items)))
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;

    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.next_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <Error as ser::Error>::custom("map value without a key"))?;
        self.map.push(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStruct for SerializeStruct {
    type Ok = Value;

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.map
            .push(Value::keyword(key), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;

    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.map
            .push(Value::keyword(key), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(variant_map(self.variant, Value::Map(self.map)))
    }
}
