//! The value graph carried by a stream.
//!
//! [`Value`] owns all of its children; a value that appears twice in a
//! graph is written twice. Decoding always produces fresh values.

mod custom;
mod deferred;
mod exception;
mod lazy;
mod numeric;
mod temporal;

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

pub use bigdecimal::BigDecimal;
pub use num_bigint::BigInt;
pub use num_rational::BigRational;
pub use uuid::Uuid;

pub use custom::{Custom, CustomValue};
pub use deferred::{Deferred, Promise};
pub use exception::{Exception, StackFrame};
pub use lazy::LazySeq;
pub use numeric::HybridInt;
pub use temporal::{OffsetTime, Period, ZonedDateTime};

pub(crate) use temporal::wire;

/// A value that can be written to or read from a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Uuid(Uuid),

    String(String),
    Keyword(String),
    Symbol(String),
    Regex(Pattern),
    Url(String),
    Uri(String),
    Bytes(Vec<u8>),

    IntArray(Vec<i32>),
    ShortArray(Vec<i16>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    BoolArray(Vec<bool>),
    CharArray(Vec<char>),

    BigInt(BigInt),
    BigDecimal(BigDecimal),
    Ratio(BigRational),
    HybridInt(HybridInt),

    /// Indexable sequence.
    Vector(Vec<Value>),
    /// Keyed mapping.
    Map(Map),
    /// A single key/value pair.
    MapEntry(Box<Value>, Box<Value>),
    Set(Vec<Value>),
    SortedSet(Vec<Value>),
    SortedMap(Map),
    /// Singly-linked list.
    List(Vec<Value>),
    Queue(VecDeque<Value>),
    /// A realized sequence of unknown length, written in chunks.
    Seq(Vec<Value>),
    /// A sequence produced on demand, possibly without end. Reads back as [`Value::Seq`].
    Lazy(LazySeq),
    /// An iterable of unknown size, written in chunks.
    Iterable(Vec<Value>),
    /// Keyed mapping of the fallback shape.
    GenericMap(Map),
    /// Indexable list of the fallback shape.
    GenericList(Vec<Value>),
    ObjectArray(Vec<Value>),

    Instant(DateTime<Utc>),
    /// Millisecond-precision date.
    Date(DateTime<Utc>),
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    LocalDateTime(NaiveDateTime),
    OffsetDateTime(DateTime<FixedOffset>),
    OffsetTime(OffsetTime),
    ZonedDateTime(ZonedDateTime),
    ZoneId(String),
    Duration(TimeDelta),
    Period(Period),

    Atom(Box<Value>),
    Ref(Box<Value>),
    /// Realized before writing, bounded by the deref timeout.
    Future(Deferred),

    Exception(Box<Exception>),

    /// A value carrying a metadata map.
    WithMeta { meta: Map, value: Box<Value> },

    /// Placeholder written in place of a value nothing knew how to encode.
    Unsupported { type_name: String, repr: String },

    /// A caller-defined type, written only through an encode hook.
    Custom(Custom),
}

impl Value {
    /// Short name of the variant. For [`Value::Custom`] this is the Rust type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Uuid(_) => "uuid",
            Value::String(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::Regex(_) => "regex",
            Value::Url(_) => "url",
            Value::Uri(_) => "uri",
            Value::Bytes(_) => "bytes",
            Value::IntArray(_) => "int-array",
            Value::ShortArray(_) => "short-array",
            Value::LongArray(_) => "long-array",
            Value::FloatArray(_) => "float-array",
            Value::DoubleArray(_) => "double-array",
            Value::BoolArray(_) => "bool-array",
            Value::CharArray(_) => "char-array",
            Value::BigInt(_) => "big-int",
            Value::BigDecimal(_) => "big-decimal",
            Value::Ratio(_) => "ratio",
            Value::HybridInt(_) => "hybrid-int",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::MapEntry(..) => "map-entry",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "sorted-set",
            Value::SortedMap(_) => "sorted-map",
            Value::List(_) => "list",
            Value::Queue(_) => "queue",
            Value::Seq(_) => "seq",
            Value::Lazy(_) => "lazy-seq",
            Value::Iterable(_) => "iterable",
            Value::GenericMap(_) => "generic-map",
            Value::GenericList(_) => "generic-list",
            Value::ObjectArray(_) => "object-array",
            Value::Instant(_) => "instant",
            Value::Date(_) => "date",
            Value::LocalDate(_) => "local-date",
            Value::LocalTime(_) => "local-time",
            Value::LocalDateTime(_) => "local-date-time",
            Value::OffsetDateTime(_) => "offset-date-time",
            Value::OffsetTime(_) => "offset-time",
            Value::ZonedDateTime(_) => "zoned-date-time",
            Value::ZoneId(_) => "zone-id",
            Value::Duration(_) => "duration",
            Value::Period(_) => "period",
            Value::Atom(_) => "atom",
            Value::Ref(_) => "ref",
            Value::Future(_) => "future",
            Value::Exception(_) => "exception",
            Value::WithMeta { .. } => "with-meta",
            Value::Unsupported { .. } => "unsupported",
            Value::Custom(c) => c.type_name(),
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn custom<T: CustomValue>(value: T) -> Self {
        Value::Custom(Custom::new(value))
    }

    pub fn map_entry(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Value::MapEntry(Box::new(key.into()), Box::new(value.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Keyword(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Value::Exception(e) => Some(e),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Vec<Value> => Vector,
    Map => Map,
    BigInt => BigInt,
    Uuid => Uuid,
    Exception => Exception,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An insertion-ordered association list.
///
/// Equality is order-sensitive: two maps are equal when they hold the
/// same entries in the same order, which is what a round trip preserves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map(Vec<(Value, Value)>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Inserts an entry, replacing the value of an equal key in place.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    /// Appends an entry without looking for an existing key.
    pub(crate) fn push(&mut self, key: Value, value: Value) {
        self.0.push((key, value));
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.0.iter()
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.0
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for Map {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = &'a (Value, Value);
    type IntoIter = std::slice::Iter<'a, (Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A compiled regular expression, compared by its source text.
#[derive(Clone)]
pub struct Pattern(regex::Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &regex::Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#\"{}\"", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_insert_replaces_in_place() {
        let mut map = Map::new();
        map.insert(Value::keyword("a"), 1);
        map.insert(Value::keyword("b"), 2);
        let old = map.insert(Value::keyword("a"), 3);

        assert_eq!(old, Some(Value::Int(1)));
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().next().unwrap().1, Value::Int(3));
        assert_eq!(map.get(&Value::keyword("b")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_map_equality_is_ordered() {
        let ab: Map = [("a", 1), ("b", 2)].into_iter().collect();
        let ba: Map = [("b", 2), ("a", 1)].into_iter().collect();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_pattern_eq_by_source() {
        let a = Pattern::new("a+b").unwrap();
        let b = Pattern::new("a+b").unwrap();
        assert_eq!(a, b);
        assert!(a.regex().is_match("aaab"));
        assert!(Pattern::new("(").is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(Some(5i64)).type_name(), "long");
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::map_entry("k", 1).type_name(), "map-entry");
    }
}
