//! Value decoder.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::chunked::{self, ChunkCursor};
use super::err::{Error, Result};
use super::hooks::DecodeHooks;
use super::io::ReadPrimitives;
use super::tags::{self, Tag, FORMAT_VERSION};
use crate::options::Options;
use crate::stream;
use crate::value::{
    wire, Deferred, Exception, HybridInt, Map, OffsetTime, Pattern, Period, StackFrame, Value,
    ZonedDateTime,
};

/// Cap on preallocation driven by a count read from the stream.
const MAX_PREALLOC: usize = 4096;

/// Deepest nesting of values accepted before the stream is rejected.
pub const MAX_DEPTH: usize = 128;

/// Reads the primitives of a stream, delegating to [`ReadPrimitives`].
macro_rules! delegate_reads {
    ($($name:ident -> $ty:ty;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(self.input.$name()?)
            }
        )*
    };
}

/// Decoder over a read stream.
pub struct Decoder<'a> {
    input: BufReader<Box<dyn Read + 'a>>,
    options: Options,
    hooks: Arc<DecodeHooks>,
    version: i16,
    /// Tag whose payload is being read.
    tag: Tag,
    /// Payloads currently being read, outermost included.
    depth: usize,
}

impl<'a> Decoder<'a> {
    /// Opens a decoder without decode hooks and reads the stream header.
    pub fn new<R>(reader: R, options: Options) -> Result<Self>
    where
        R: Read + 'a,
    {
        Self::with_hooks(reader, options, DecodeHooks::default())
    }

    pub fn with_hooks<R>(reader: R, options: Options, hooks: DecodeHooks) -> Result<Self>
    where
        R: Read + 'a,
    {
        options.validate()?;
        let source = stream::source(reader, &options);
        let input = BufReader::with_capacity(options.buf_input_size(), source);

        let mut dec = Self {
            input,
            options,
            hooks: Arc::new(hooks),
            version: 0,
            tag: 0,
            depth: 0,
        };

        let version = dec.read_short()?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }
        dec.version = version;

        log::debug!("decoder opened (version {version}, {:?})", dec.options);
        Ok(dec)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Format version read from the header.
    pub fn version(&self) -> i16 {
        self.version
    }

    /// Tag of the value whose payload is being read, for hooks and errors.
    pub fn current_tag(&self) -> Tag {
        self.tag
    }

    /// Whether the source holds no further bytes.
    pub fn is_at_end(&mut self) -> Result<bool> {
        Ok(self.input.fill_buf()?.is_empty())
    }

    delegate_reads! {
        read_tag -> Tag;
        read_short -> i16;
        read_int -> i32;
        read_long -> i64;
        read_float -> f32;
        read_double -> f64;
        read_byte -> i8;
        read_bool -> bool;
    }

    /// Reads an `i32` length, then that many bytes.
    pub fn read_blob(&mut self) -> Result<Vec<u8>> {
        let len = self.read_int()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::malformed(self.tag, format!("negative length {len}")))?;
        self.read_raw(len)
    }

    pub fn read_text(&mut self) -> Result<String> {
        let bytes = self.read_blob()?;
        String::from_utf8(bytes).map_err(|e| Error::malformed(self.tag, e.to_string()))
    }

    /// Reads `len` bytes whose length is known from context.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.input.read_raw(len, self.options.byte_chunk_size())?)
    }

    pub fn read_bigint(&mut self) -> Result<BigInt> {
        Ok(BigInt::from_signed_bytes_be(&self.read_blob()?))
    }

    /// Decodes the next value, or `None` at the end of the stream.
    pub fn decode(&mut self) -> Result<Option<Value>> {
        if self.is_at_end()? {
            return Ok(None);
        }
        self.decode_child().map(Some)
    }

    /// Decodes a value that must be present, such as a child inside a composite.
    pub fn decode_child(&mut self) -> Result<Value> {
        let tag = self.read_tag()?;
        self.decode_tagged(tag)
    }

    /// Decodes the next value and raises it into `T` through serde.
    pub fn decode_serde<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.decode()? {
            Some(value) => crate::ser_de::from_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// Iterates the remaining values once, stopping after the first error.
    pub fn into_values(self) -> IntoValues<'a> {
        IntoValues {
            decoder: self,
            done: false,
        }
    }

    /// Reads the tag of an uncountable collection and streams its elements.
    pub fn stream_sequence(&mut self) -> Result<SequenceReader<'_, 'a>> {
        let tag = self.read_tag()?;
        if !tags::is_uncountable(tag) {
            return Err(Error::TypeMismatch {
                expected: "uncountable sequence",
                actual: tags::describe(tag),
            });
        }
        let limit = self.options.uncountable_max_items();
        Ok(SequenceReader {
            decoder: self,
            cursor: ChunkCursor::new(tag, limit),
            tag,
            failed: false,
        })
    }

    pub fn close(self) {
        log::debug!("decoder closed");
    }

    /// Decodes the payload of `tag`, which has already been read.
    pub fn decode_tagged(&mut self, tag: Tag) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::malformed(
                tag,
                format!("values nested deeper than {MAX_DEPTH}"),
            ));
        }

        let outer = std::mem::replace(&mut self.tag, tag);
        self.depth += 1;
        let result = self.decode_payload(tag);
        self.depth -= 1;
        self.tag = outer;
        result
    }

    fn decode_payload(&mut self, tag: Tag) -> Result<Value> {
        let value = match tag {
            tags::NULL => Value::Null,
            tags::BOOL_TRUE => Value::Bool(true),
            tags::BOOL_FALSE => Value::Bool(false),
            tags::BYTE_MINUS_ONE => Value::Byte(-1),
            tags::BYTE_ZERO => Value::Byte(0),
            tags::BYTE_ONE => Value::Byte(1),
            tags::SHORT_MINUS_ONE => Value::Short(-1),
            tags::SHORT_ZERO => Value::Short(0),
            tags::SHORT_ONE => Value::Short(1),
            tags::INT_MINUS_ONE => Value::Int(-1),
            tags::INT_ZERO => Value::Int(0),
            tags::INT_ONE => Value::Int(1),
            tags::LONG_MINUS_ONE => Value::Long(-1),
            tags::LONG_ZERO => Value::Long(0),
            tags::LONG_ONE => Value::Long(1),
            tags::FLOAT_MINUS_ONE => Value::Float(-1.0),
            tags::FLOAT_ZERO => Value::Float(0.0),
            tags::FLOAT_ONE => Value::Float(1.0),
            tags::DOUBLE_MINUS_ONE => Value::Double(-1.0),
            tags::DOUBLE_ZERO => Value::Double(0.0),
            tags::DOUBLE_ONE => Value::Double(1.0),
            tags::STRING_EMPTY => Value::String(String::new()),

            tags::VECTOR_EMPTY => Value::Vector(Vec::new()),
            tags::MAP_EMPTY => Value::Map(Map::new()),
            tags::SET_EMPTY => Value::Set(Vec::new()),
            tags::SORTED_SET_EMPTY => Value::SortedSet(Vec::new()),
            tags::SORTED_MAP_EMPTY => Value::SortedMap(Map::new()),
            tags::LIST_EMPTY => Value::List(Vec::new()),
            tags::QUEUE_EMPTY => Value::Queue(VecDeque::new()),
            tags::GENERIC_LIST_EMPTY => Value::GenericList(Vec::new()),
            tags::GENERIC_MAP_EMPTY => Value::GenericMap(Map::new()),
            tags::OBJECT_ARRAY_EMPTY => Value::ObjectArray(Vec::new()),

            tags::BOOL => Value::Bool(self.read_bool()?),
            tags::BYTE => Value::Byte(self.read_byte()?),
            tags::SHORT => Value::Short(self.read_short()?),
            tags::INT => Value::Int(self.read_int()?),
            tags::LONG => Value::Long(self.read_long()?),
            tags::FLOAT => Value::Float(self.read_float()?),
            tags::DOUBLE => Value::Double(self.read_double()?),
            tags::CHAR => Value::Char(self.read_char()?),
            tags::UUID => {
                let hi = self.read_long()?;
                let lo = self.read_long()?;
                Value::Uuid(Uuid::from_u64_pair(hi as u64, lo as u64))
            }

            tags::STRING => Value::String(self.read_text()?),
            tags::KEYWORD => Value::Keyword(self.read_text()?),
            tags::SYMBOL => Value::Symbol(self.read_text()?),
            tags::REGEX => {
                let source = self.read_text()?;
                let pattern =
                    Pattern::new(&source).map_err(|e| Error::malformed(tag, e.to_string()))?;
                Value::Regex(pattern)
            }
            tags::URL => Value::Url(self.read_text()?),
            tags::URI => Value::Uri(self.read_text()?),
            tags::BYTES => Value::Bytes(self.read_blob()?),
            tags::ZONE_ID => Value::ZoneId(self.read_text()?),

            tags::INT_ARRAY => Value::IntArray(self.read_array(Self::read_int)?),
            tags::SHORT_ARRAY => Value::ShortArray(self.read_array(Self::read_short)?),
            tags::LONG_ARRAY => Value::LongArray(self.read_array(Self::read_long)?),
            tags::FLOAT_ARRAY => Value::FloatArray(self.read_array(Self::read_float)?),
            tags::DOUBLE_ARRAY => Value::DoubleArray(self.read_array(Self::read_double)?),
            tags::BOOL_ARRAY => Value::BoolArray(self.read_array(Self::read_bool)?),
            tags::CHAR_ARRAY => Value::CharArray(self.read_array(Self::read_char)?),

            tags::BIG_INT => Value::BigInt(self.read_bigint()?),
            tags::BIG_DECIMAL => {
                let scale = self.read_int()?;
                let unscaled = self.read_bigint()?;
                Value::BigDecimal(BigDecimal::new(unscaled, i64::from(scale)))
            }
            tags::RATIO => {
                let numer = self.read_bigint()?;
                let denom = self.read_bigint()?;
                if denom.is_zero() {
                    return Err(Error::malformed(tag, "zero denominator"));
                }
                Value::Ratio(BigRational::new_raw(numer, denom))
            }
            tags::HYBRID_INT => {
                let small = self.read_long()?;
                let big = self.read_blob()?;
                Value::HybridInt(if big.is_empty() {
                    HybridInt::Small(small)
                } else {
                    HybridInt::Big(BigInt::from_signed_bytes_be(&big))
                })
            }

            tags::INSTANT => {
                let secs = self.read_long()?;
                let nanos = self.read_int()?;
                Value::Instant(self.temporal(wire::from_instant(secs, nanos))?)
            }
            tags::DATE => {
                let millis = self.read_long()?;
                Value::Date(self.temporal(wire::from_date(millis))?)
            }
            tags::LOCAL_DATE => {
                let day = self.read_long()?;
                Value::LocalDate(self.temporal(wire::from_local_date(day))?)
            }
            tags::LOCAL_TIME => {
                let nanos = self.read_long()?;
                Value::LocalTime(self.temporal(wire::from_local_time(nanos))?)
            }
            tags::LOCAL_DATE_TIME => {
                let secs = self.read_long()?;
                let nanos = self.read_int()?;
                Value::LocalDateTime(self.temporal(wire::from_local_date_time(secs, nanos))?)
            }
            tags::OFFSET_DATE_TIME => {
                let secs = self.read_long()?;
                let nanos = self.read_int()?;
                let offset = self.read_int()?;
                let dt = wire::from_offset_date_time(secs, nanos, offset);
                Value::OffsetDateTime(self.temporal(dt)?)
            }
            tags::OFFSET_TIME => {
                let nanos = self.read_long()?;
                let offset = self.read_int()?;
                Value::OffsetTime(OffsetTime {
                    time: self.temporal(wire::from_local_time(nanos))?,
                    offset: self.temporal(wire::from_offset(offset))?,
                })
            }
            tags::ZONED_DATE_TIME => {
                let secs = self.read_long()?;
                let nanos = self.read_int()?;
                let local = self.temporal(wire::from_local_date_time(secs, nanos))?;
                let zone = self.read_text()?;
                Value::ZonedDateTime(ZonedDateTime { local, zone })
            }
            tags::DURATION => {
                let secs = self.read_long()?;
                let nanos = self.read_int()?;
                Value::Duration(self.temporal(wire::from_duration(secs, nanos))?)
            }
            tags::PERIOD => Value::Period(Period {
                years: self.read_int()?,
                months: self.read_int()?,
                days: self.read_int()?,
            }),

            tags::VECTOR => Value::Vector(self.read_values()?),
            tags::MAP | tags::RECORD => Value::Map(self.read_map_body()?),
            tags::MAP_ENTRY => {
                let key = self.decode_child()?;
                let value = self.decode_child()?;
                Value::MapEntry(Box::new(key), Box::new(value))
            }
            tags::SET => Value::Set(self.read_values()?),
            tags::SORTED_SET => Value::SortedSet(self.read_values()?),
            tags::SORTED_MAP => Value::SortedMap(self.read_map_body()?),
            tags::LIST => Value::List(self.read_values()?),
            tags::QUEUE => Value::Queue(self.read_values()?.into()),
            tags::GENERIC_LIST => Value::GenericList(self.read_values()?),
            tags::GENERIC_MAP => Value::GenericMap(self.read_map_body()?),
            tags::OBJECT_ARRAY => Value::ObjectArray(self.read_values()?),

            tags::SEQ | tags::LAZY_SEQ => Value::Seq(chunked::read_chunked(self, tag)?),
            tags::ITERABLE | tags::ITERATOR | tags::STREAM => {
                Value::Iterable(chunked::read_chunked(self, tag)?)
            }

            tags::ATOM => Value::Atom(Box::new(self.decode_child()?)),
            tags::REF => Value::Ref(Box::new(self.decode_child()?)),
            tags::FUTURE => Value::Future(Deferred::ready(self.decode_child()?)),

            tags::THROWABLE => Value::Exception(Box::new(self.read_exception_body(None)?)),
            tags::EX_INFO => {
                let data = self.read_map_body()?;
                Value::Exception(Box::new(self.read_exception_body(Some(data))?))
            }

            tags::META => {
                let meta = self.read_map_body()?;
                let value = self.decode_child()?;
                if self.options.save_meta() {
                    Value::WithMeta {
                        meta,
                        value: Box::new(value),
                    }
                } else {
                    value
                }
            }
            tags::UNSUPPORTED => Value::Unsupported {
                type_name: self.read_text()?,
                repr: self.read_text()?,
            },

            other => return self.decode_external(other),
        };
        Ok(value)
    }

    fn decode_external(&mut self, tag: Tag) -> Result<Value> {
        let hooks = Arc::clone(&self.hooks);
        match hooks.decoder_for(tag) {
            Some(hook) => {
                log::trace!("decoding {} through its hook", tags::describe(tag));
                hook(tag, self)
            }
            None => Err(Error::UnknownTag { tag }),
        }
    }

    fn temporal<T>(&self, v: Option<T>) -> Result<T> {
        v.ok_or_else(|| Error::malformed(self.tag, "field out of range"))
    }

    fn read_char(&mut self) -> Result<char> {
        let code = self.read_int()?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::malformed(self.tag, format!("invalid code point {code}")))
    }

    fn read_count(&mut self) -> Result<usize> {
        let count = self.read_int()?;
        usize::try_from(count)
            .map_err(|_| Error::malformed(self.tag, format!("negative count {count}")))
    }

    fn read_array<T>(&mut self, read: fn(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    fn read_values(&mut self) -> Result<Vec<Value>> {
        self.read_array(Self::decode_child)
    }

    /// Count, then alternating tagged keys and values.
    fn read_map_body(&mut self) -> Result<Map> {
        let count = self.read_count()?;
        let mut map = Map::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let key = self.decode_child()?;
            let value = self.decode_child()?;
            map.push(key, value);
        }
        Ok(map)
    }

    fn read_exception_body(&mut self, data: Option<Map>) -> Result<Exception> {
        let message = match self.read_bool()? {
            true => Some(self.read_text()?),
            false => None,
        };
        let stack_trace = self.read_array(Self::read_frame)?;
        let cause = match self.read_bool()? {
            true => Some(Box::new(self.read_nested_exception()?)),
            false => None,
        };
        let suppressed = self.read_array(Self::read_nested_exception)?;

        Ok(Exception {
            message,
            stack_trace,
            cause,
            suppressed,
            data,
        })
    }

    fn read_frame(&mut self) -> Result<StackFrame> {
        Ok(StackFrame {
            class_name: self.read_text()?,
            method_name: self.read_text()?,
            file_name: self.read_text()?,
            line: self.read_int()?,
        })
    }

    fn read_nested_exception(&mut self) -> Result<Exception> {
        match self.decode_child()? {
            Value::Exception(ex) => Ok(*ex),
            other => Err(Error::TypeMismatch {
                expected: "exception",
                actual: other.type_name().into(),
            }),
        }
    }
}

impl Decoder<'static> {
    /// Opens the file at `path`.
    pub fn open(path: impl AsRef<Path>, options: Options, hooks: DecodeHooks) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("reading {}", path.display());
        Self::with_hooks(File::open(path)?, options, hooks)
    }
}

/// Single pass over the values of a stream. See [`Decoder::into_values`].
pub struct IntoValues<'a> {
    decoder: Decoder<'a>,
    done: bool,
}

impl Iterator for IntoValues<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Elements of one chunked collection, read one at a time.
pub struct SequenceReader<'d, 'a> {
    decoder: &'d mut Decoder<'a>,
    cursor: ChunkCursor,
    tag: Tag,
    failed: bool,
}

impl SequenceReader<'_, '_> {
    /// Tag the collection was written with.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl Iterator for SequenceReader<'_, '_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let outer = std::mem::replace(&mut self.decoder.tag, self.tag);
        let next = self.cursor.next_item(self.decoder);
        self.decoder.tag = outer;

        match next {
            Ok(item) => item.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::io::WritePrimitives;

    fn stream(build: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_short(FORMAT_VERSION).unwrap();
        build(&mut buf);
        buf
    }

    fn decode_all(bytes: &[u8]) -> Result<Vec<Value>> {
        Decoder::new(bytes, Options::default())?.into_values().collect()
    }

    #[test]
    fn test_empty_list_tag() {
        let bytes = stream(|b| b.write_tag(tags::LIST_EMPTY).unwrap());
        assert_eq!(decode_all(&bytes).unwrap(), [Value::List(vec![])]);

        let bytes = stream(|b| b.write_tag(tags::GENERIC_LIST_EMPTY).unwrap());
        assert_eq!(decode_all(&bytes).unwrap(), [Value::GenericList(vec![])]);
    }

    #[test]
    fn test_header_only_is_empty() {
        let bytes = stream(|_| {});
        let mut dec = Decoder::new(bytes.as_slice(), Options::default()).unwrap();
        assert_eq!(dec.version(), 1);
        assert!(dec.decode().unwrap().is_none());
        assert!(dec.decode().unwrap().is_none());
    }

    #[test]
    fn test_bad_version() {
        let bytes = [0, 2, 0, tags::NULL as u8];
        let err = Decoder::new(bytes.as_slice(), Options::default()).err().unwrap();
        assert!(matches!(err, Error::UnsupportedVersion { version: 2 }));
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = stream(|b| b.write_tag(0x2000).unwrap());
        let err = decode_all(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnknownTag { tag: 0x2000 }));
    }

    #[test]
    fn test_foreign_bool_and_record() {
        let bytes = stream(|b| {
            b.write_tag(tags::BOOL).unwrap();
            b.write_bool(true).unwrap();
            b.write_tag(tags::RECORD).unwrap();
            b.write_int(1).unwrap();
            b.write_tag(tags::KEYWORD).unwrap();
            b.write_text("a").unwrap();
            b.write_tag(tags::INT_ONE).unwrap();
        });

        let expected_map: Map = [(Value::keyword("a"), Value::Int(1))].into_iter().collect();
        assert_eq!(
            decode_all(&bytes).unwrap(),
            [Value::Bool(true), Value::Map(expected_map)]
        );
    }

    #[test]
    fn test_truncated_composite() {
        let bytes = stream(|b| {
            b.write_tag(tags::VECTOR).unwrap();
            b.write_int(3).unwrap();
            b.write_tag(tags::NULL).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let bytes = stream(|b| {
            b.write_tag(tags::VECTOR).unwrap();
            b.write_int(-1).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(matches!(err, Error::Malformed { tag: tags::VECTOR, .. }));
    }

    #[test]
    fn test_negative_blob_length_is_malformed() {
        let bytes = stream(|b| {
            b.write_tag(tags::BYTES).unwrap();
            b.write_int(-5).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(matches!(err, Error::Malformed { tag: tags::BYTES, .. }));
    }

    #[test]
    fn test_blob_with_lying_length() {
        let bytes = stream(|b| {
            b.write_tag(tags::BYTES).unwrap();
            b.write_int(i32::MAX).unwrap();
            b.write_raw(&[1, 2, 3]).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    fn nested_atoms(depth: usize) -> Vec<u8> {
        stream(|b| {
            for _ in 0..depth {
                b.write_tag(tags::ATOM).unwrap();
            }
            b.write_tag(tags::NULL).unwrap();
        })
    }

    #[test]
    fn test_nesting_limit() {
        let values = decode_all(&nested_atoms(MAX_DEPTH - 1)).unwrap();
        let mut value = &values[0];
        let mut depth = 0;
        while let Value::Atom(inner) = value {
            value = inner;
            depth += 1;
        }
        assert_eq!(depth, MAX_DEPTH - 1);
        assert_eq!(*value, Value::Null);

        let err = decode_all(&nested_atoms(5000)).unwrap_err();
        println!("{err}");
        assert!(matches!(err, Error::Malformed { tag: tags::ATOM, .. }));
    }

    #[test]
    fn test_depth_resets_between_values() {
        let mut bytes = nested_atoms(MAX_DEPTH - 1);
        bytes.extend_from_slice(&nested_atoms(MAX_DEPTH - 1)[2..]);
        let values = decode_all(&bytes).unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let bytes = stream(|b| {
            b.write_tag(tags::STRING).unwrap();
            b.write_blob(&[0xff, 0xfe]).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(matches!(err, Error::Malformed { tag: tags::STRING, .. }));
    }

    #[test]
    fn test_cause_must_be_exception() {
        let bytes = stream(|b| {
            b.write_tag(tags::THROWABLE).unwrap();
            b.write_bool(false).unwrap(); // no message
            b.write_int(0).unwrap(); // no frames
            b.write_bool(true).unwrap(); // has cause
            b.write_tag(tags::STRING_EMPTY).unwrap();
        });
        let err = decode_all(&bytes).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "exception", actual } if actual == "string"));
    }

    #[test]
    fn test_zero_denominator() {
        let bytes = stream(|b| {
            b.write_tag(tags::RATIO).unwrap();
            b.write_blob(&[1]).unwrap();
            b.write_blob(&[0]).unwrap();
        });
        assert!(matches!(
            decode_all(&bytes).unwrap_err(),
            Error::Malformed { tag: tags::RATIO, .. }
        ));
    }

    #[test]
    fn test_into_values_stops_after_error() {
        let bytes = stream(|b| {
            b.write_tag(tags::NULL).unwrap();
            b.write_tag(0x3000).unwrap();
            b.write_tag(tags::NULL).unwrap();
        });
        let mut values = Decoder::new(bytes.as_slice(), Options::default())
            .unwrap()
            .into_values();

        assert_eq!(values.next().unwrap().unwrap(), Value::Null);
        assert!(values.next().unwrap().is_err());
        assert!(values.next().is_none());
    }

    #[test]
    fn test_stream_sequence_across_chunks() {
        let bytes = stream(|b| {
            b.write_tag(tags::SEQ).unwrap();
            b.write_int(2).unwrap();
            b.write_tag(tags::INT_ONE).unwrap();
            b.write_tag(tags::INT_ZERO).unwrap();
            b.write_int(1).unwrap();
            b.write_tag(tags::NULL).unwrap();
            b.write_int(0).unwrap();
            b.write_tag(tags::BOOL_TRUE).unwrap();
        });

        let mut dec = Decoder::new(bytes.as_slice(), Options::default()).unwrap();
        let items: Vec<_> = dec
            .stream_sequence()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items, [Value::Int(1), Value::Int(0), Value::Null]);

        // the reader leaves the decoder on the next top-level value
        assert_eq!(dec.decode().unwrap(), Some(Value::Bool(true)));
    }

    #[test]
    fn test_stream_sequence_rejects_countable() {
        let bytes = stream(|b| b.write_tag(tags::VECTOR_EMPTY).unwrap());
        let mut dec = Decoder::new(bytes.as_slice(), Options::default()).unwrap();
        assert!(matches!(
            dec.stream_sequence().err().unwrap(),
            Error::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_decode_limit_enforced() {
        let bytes = stream(|b| {
            b.write_tag(tags::ITERATOR).unwrap();
            b.write_int(3).unwrap();
            for _ in 0..3 {
                b.write_tag(tags::NULL).unwrap();
            }
            b.write_int(0).unwrap();
        });

        let options = Options::builder().uncountable_max_items(2).build().unwrap();
        let err = Decoder::new(bytes.as_slice(), options)
            .unwrap()
            .decode()
            .unwrap_err();
        assert!(matches!(err, Error::OversizeSequence { limit: 2 }));

        assert_eq!(
            decode_all(&bytes).unwrap(),
            [Value::Iterable(vec![Value::Null; 3])]
        );
    }

    #[test]
    fn test_decode_hook() {
        let hooks = DecodeHooks::new()
            .register(0x1234, |tag, dec| {
                assert_eq!(dec.current_tag(), tag);
                let n = dec.read_int()?;
                Ok(Value::keyword(format!("custom-{n}")))
            })
            .unwrap();
        let bytes = stream(|b| {
            b.write_tag(0x1234).unwrap();
            b.write_int(5).unwrap();
        });

        let mut dec = Decoder::with_hooks(bytes.as_slice(), Options::default(), hooks).unwrap();
        assert_eq!(dec.decode().unwrap(), Some(Value::keyword("custom-5")));
        assert_eq!(dec.current_tag(), 0);
    }
}
