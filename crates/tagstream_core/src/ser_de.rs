//! Bridge between serde data structures and [`Value`].
//!
//! Any `T: Serialize` lowers into a value graph that the encoder can
//! write, and a decoded value raises back into `T: Deserialize`. Structs
//! become maps keyed by keywords, sequences and tuples become vectors,
//! and enum variants carrying data become single-entry maps keyed by the
//! variant name.

mod de;
mod ser;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::err::Result;
use crate::value::Value;

/// Lowers a data structure into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(ser::ValueSerializer)
}

/// Raises a [`Value`] into a data structure.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}
