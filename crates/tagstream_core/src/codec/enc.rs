//! Value encoder.

use std::borrow::Borrow;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::Serialize;

use super::chunked;
use super::err::{Error, Result};
use super::hooks::EncodeHooks;
use super::io::WritePrimitives;
use super::tags::{self, Tag, FORMAT_VERSION};
use crate::options::Options;
use crate::stream::{self, Sink};
use crate::value::{wire, Exception, HybridInt, Map, Value};

type Out<'a> = BufWriter<Box<dyn Sink + 'a>>;

/// One encoding stage. Returns `false` when the value belongs to a later stage.
type Stage<'a> = fn(&mut Encoder<'a>, &Value) -> Result<bool>;

/// Scalars with dedicated tags for -1, 0 and 1.
trait Sentinel: Copy {
    /// Index into `[minus_one, zero, one]`.
    fn sentinel(self) -> Option<usize>;
}

macro_rules! int_sentinel {
    ($($ty:ty),*) => {
        $(
            impl Sentinel for $ty {
                fn sentinel(self) -> Option<usize> {
                    match self {
                        -1 => Some(0),
                        0 => Some(1),
                        1 => Some(2),
                        _ => None,
                    }
                }
            }
        )*
    };
}

/// Floats match by bit pattern, so `-0.0` and every NaN take the general tag.
macro_rules! float_sentinel {
    ($($ty:ty),*) => {
        $(
            impl Sentinel for $ty {
                fn sentinel(self) -> Option<usize> {
                    let bits = self.to_bits();
                    [-1.0 as $ty, 0.0, 1.0]
                        .iter()
                        .position(|s| s.to_bits() == bits)
                }
            }
        )*
    };
}

int_sentinel!(i8, i16, i32, i64);
float_sentinel!(f32, f64);

/// Writes the primitives of a stream, delegating to [`WritePrimitives`].
macro_rules! delegate_writes {
    ($($name:ident($ty:ty);)*) => {
        $(
            pub fn $name(&mut self, v: $ty) -> Result<()> {
                self.out()?.$name(v)?;
                Ok(())
            }
        )*
    };
}

/// Encoder over a write stream.
///
/// Each [`encode`](Self::encode) call writes exactly one tagged value.
/// The stream must be finished with [`close`](Self::close); dropping an
/// open encoder finishes it too, but can only log a failure.
pub struct Encoder<'a> {
    out: Option<Out<'a>>,
    options: Options,
    hooks: Arc<EncodeHooks>,
}

impl<'a> Encoder<'a> {
    /// Opens an encoder with the default hooks.
    pub fn new<W>(writer: W, options: Options) -> Result<Self>
    where
        W: Write + 'a,
    {
        Self::with_hooks(writer, options, EncodeHooks::default())
    }

    /// Opens an encoder. The header is written unless `options.append()` is set.
    pub fn with_hooks<W>(writer: W, options: Options, hooks: EncodeHooks) -> Result<Self>
    where
        W: Write + 'a,
    {
        let header = !options.append();
        Self::open(writer, options, hooks, header)
    }

    fn open<W>(writer: W, options: Options, hooks: EncodeHooks, header: bool) -> Result<Self>
    where
        W: Write + 'a,
    {
        options.validate()?;
        let sink = stream::sink(writer, &options)?;
        let out = BufWriter::with_capacity(options.buf_output_size(), sink);

        let mut enc = Self {
            out: Some(out),
            options,
            hooks: Arc::new(hooks),
        };
        if header {
            enc.write_short(FORMAT_VERSION)?;
        }

        log::debug!("encoder opened (header: {header}, {:?})", enc.options);
        Ok(enc)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn out(&mut self) -> io::Result<&mut Out<'a>> {
        self.out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "encoder is closed"))
    }

    delegate_writes! {
        write_tag(Tag);
        write_short(i16);
        write_int(i32);
        write_long(i64);
        write_float(f32);
        write_double(f64);
        write_byte(i8);
        write_bool(bool);
        write_blob(&[u8]);
        write_text(&str);
        write_raw(&[u8]);
    }

    /// Writes a big integer as length-prefixed two's-complement bytes.
    pub fn write_bigint(&mut self, v: &BigInt) -> Result<()> {
        self.write_blob(&v.to_signed_bytes_be())
    }

    /// Writes one tagged value.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        let stages: [Stage<'a>; 7] = [
            Self::encode_scalar,
            Self::encode_text,
            Self::encode_number,
            Self::encode_array,
            Self::encode_standard,
            Self::encode_temporal,
            Self::encode_reference,
        ];

        for stage in stages {
            if stage(self, value)? {
                return Ok(());
            }
        }
        self.encode_external(value)
    }

    /// Lowers `value` through serde and writes the result.
    pub fn encode_serde<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let value = crate::ser_de::to_value(value)?;
        self.encode(&value)
    }

    /// Writes `tag`, the item count and each item. No empty tag is substituted.
    pub fn encode_countable<'v, I>(&mut self, tag: Tag, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'v Value>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        let expected = items.len();
        self.write_tag(tag)?;
        self.write_count(tag, expected)?;

        let mut written = 0usize;
        for item in items {
            self.encode(item)?;
            written += 1;
        }

        if written != expected {
            return Err(Error::malformed(
                tag,
                format!("iterator promised {expected} items, yielded {written}"),
            ));
        }
        Ok(())
    }

    /// Writes `tag` and the items with the chunked protocol.
    pub fn encode_uncountable<I>(&mut self, tag: Tag, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Value>,
    {
        chunked::write_chunked(self, tag, items)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out()?.flush()?;
        Ok(())
    }

    /// Flushes the buffer and finishes every stream transform.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let Some(out) = self.out.take() else {
            return Ok(());
        };
        let sink = out.into_inner().map_err(|e| e.into_error())?;
        sink.finish()?;
        log::debug!("encoder closed");
        Ok(())
    }

    fn write_count(&mut self, tag: Tag, len: usize) -> Result<()> {
        let count = i32::try_from(len)
            .map_err(|_| Error::malformed(tag, format!("{len} items do not fit an i32 count")))?;
        self.write_int(count)
    }

    fn write_scalar<T: Sentinel>(
        &mut self,
        v: T,
        sentinels: [Tag; 3],
        general: Tag,
        write: fn(&mut Out<'a>, T) -> io::Result<()>,
    ) -> Result<()> {
        let out = self.out()?;
        match v.sentinel() {
            Some(i) => out.write_tag(sentinels[i])?,
            None => {
                out.write_tag(general)?;
                write(out, v)?;
            }
        }
        Ok(())
    }

    fn encode_scalar(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Null => self.write_tag(tags::NULL)?,
            Value::Bool(true) => self.write_tag(tags::BOOL_TRUE)?,
            Value::Bool(false) => self.write_tag(tags::BOOL_FALSE)?,
            Value::Byte(v) => self.write_scalar(
                *v,
                [tags::BYTE_MINUS_ONE, tags::BYTE_ZERO, tags::BYTE_ONE],
                tags::BYTE,
                |out, v| out.write_byte(v),
            )?,
            Value::Short(v) => self.write_scalar(
                *v,
                [tags::SHORT_MINUS_ONE, tags::SHORT_ZERO, tags::SHORT_ONE],
                tags::SHORT,
                |out, v| out.write_short(v),
            )?,
            Value::Int(v) => self.write_scalar(
                *v,
                [tags::INT_MINUS_ONE, tags::INT_ZERO, tags::INT_ONE],
                tags::INT,
                |out, v| out.write_int(v),
            )?,
            Value::Long(v) => self.write_scalar(
                *v,
                [tags::LONG_MINUS_ONE, tags::LONG_ZERO, tags::LONG_ONE],
                tags::LONG,
                |out, v| out.write_long(v),
            )?,
            Value::Float(v) => self.write_scalar(
                *v,
                [tags::FLOAT_MINUS_ONE, tags::FLOAT_ZERO, tags::FLOAT_ONE],
                tags::FLOAT,
                |out, v| out.write_float(v),
            )?,
            Value::Double(v) => self.write_scalar(
                *v,
                [tags::DOUBLE_MINUS_ONE, tags::DOUBLE_ZERO, tags::DOUBLE_ONE],
                tags::DOUBLE,
                |out, v| out.write_double(v),
            )?,
            Value::Char(c) => {
                self.write_tag(tags::CHAR)?;
                self.write_int(u32::from(*c) as i32)?;
            }
            Value::Uuid(u) => {
                let (hi, lo) = u.as_u64_pair();
                self.write_tag(tags::UUID)?;
                self.write_long(hi as i64)?;
                self.write_long(lo as i64)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode_text(&mut self, value: &Value) -> Result<bool> {
        let (tag, text) = match value {
            Value::String(s) if s.is_empty() => {
                self.write_tag(tags::STRING_EMPTY)?;
                return Ok(true);
            }
            Value::String(s) => (tags::STRING, s.as_str()),
            Value::Keyword(s) => (tags::KEYWORD, s.as_str()),
            Value::Symbol(s) => (tags::SYMBOL, s.as_str()),
            Value::Regex(p) => (tags::REGEX, p.as_str()),
            Value::Url(s) => (tags::URL, s.as_str()),
            Value::Uri(s) => (tags::URI, s.as_str()),
            Value::ZoneId(s) => (tags::ZONE_ID, s.as_str()),
            Value::Bytes(b) => {
                self.write_tag(tags::BYTES)?;
                self.write_blob(b)?;
                return Ok(true);
            }
            _ => return Ok(false),
        };
        self.write_tag(tag)?;
        self.write_text(text)?;
        Ok(true)
    }

    fn encode_number(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::BigInt(v) => {
                self.write_tag(tags::BIG_INT)?;
                self.write_bigint(v)?;
            }
            Value::BigDecimal(v) => {
                let (unscaled, scale) = v.as_bigint_and_exponent();
                let scale = i32::try_from(scale).map_err(|_| {
                    Error::malformed(tags::BIG_DECIMAL, format!("scale {scale} does not fit an i32"))
                })?;
                self.write_tag(tags::BIG_DECIMAL)?;
                self.write_int(scale)?;
                self.write_bigint(&unscaled)?;
            }
            Value::Ratio(v) => {
                self.write_tag(tags::RATIO)?;
                self.write_bigint(v.numer())?;
                self.write_bigint(v.denom())?;
            }
            Value::HybridInt(v) => {
                self.write_tag(tags::HYBRID_INT)?;
                match v {
                    HybridInt::Small(small) => {
                        self.write_long(*small)?;
                        self.write_blob(&[])?;
                    }
                    HybridInt::Big(big) => match big.to_i64() {
                        Some(small) => {
                            self.write_long(small)?;
                            self.write_blob(&[])?;
                        }
                        None => {
                            self.write_long(0)?;
                            self.write_bigint(big)?;
                        }
                    },
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode_array(&mut self, value: &Value) -> Result<bool> {
        macro_rules! typed_array {
            ($tag:expr, $items:expr, $write:ident) => {{
                self.write_tag($tag)?;
                self.write_count($tag, $items.len())?;
                for item in $items {
                    self.$write(*item)?;
                }
            }};
        }

        match value {
            Value::IntArray(v) => typed_array!(tags::INT_ARRAY, v, write_int),
            Value::ShortArray(v) => typed_array!(tags::SHORT_ARRAY, v, write_short),
            Value::LongArray(v) => typed_array!(tags::LONG_ARRAY, v, write_long),
            Value::FloatArray(v) => typed_array!(tags::FLOAT_ARRAY, v, write_float),
            Value::DoubleArray(v) => typed_array!(tags::DOUBLE_ARRAY, v, write_double),
            Value::BoolArray(v) => typed_array!(tags::BOOL_ARRAY, v, write_bool),
            Value::CharArray(v) => {
                self.write_tag(tags::CHAR_ARRAY)?;
                self.write_count(tags::CHAR_ARRAY, v.len())?;
                for c in v {
                    self.write_int(u32::from(*c) as i32)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Collections, in fixed priority order.
    fn encode_standard(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Vector(items) => self.write_countable(tags::VECTOR, tags::VECTOR_EMPTY, items)?,
            Value::Map(map) => self.write_map(tags::MAP, tags::MAP_EMPTY, map)?,
            Value::MapEntry(k, v) => {
                self.write_tag(tags::MAP_ENTRY)?;
                self.encode(k)?;
                self.encode(v)?;
            }
            Value::Set(items) => self.write_countable(tags::SET, tags::SET_EMPTY, items)?,
            Value::SortedSet(items) => {
                self.write_countable(tags::SORTED_SET, tags::SORTED_SET_EMPTY, items)?
            }
            Value::SortedMap(map) => {
                self.write_map(tags::SORTED_MAP, tags::SORTED_MAP_EMPTY, map)?
            }
            Value::List(items) => self.write_countable(tags::LIST, tags::LIST_EMPTY, items)?,
            Value::Queue(items) => self.write_countable(tags::QUEUE, tags::QUEUE_EMPTY, items)?,
            Value::Lazy(seq) => chunked::write_chunked(self, tags::LAZY_SEQ, seq.iter())?,
            Value::Seq(items) => chunked::write_chunked(self, tags::SEQ, items)?,
            Value::Iterable(items) => chunked::write_chunked(self, tags::ITERABLE, items)?,
            Value::GenericMap(map) => {
                self.write_map(tags::GENERIC_MAP, tags::GENERIC_MAP_EMPTY, map)?
            }
            Value::GenericList(items) => {
                self.write_countable(tags::GENERIC_LIST, tags::GENERIC_LIST_EMPTY, items)?
            }
            Value::ObjectArray(items) => {
                self.write_countable(tags::OBJECT_ARRAY, tags::OBJECT_ARRAY_EMPTY, items)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_countable<'v, I>(&mut self, tag: Tag, empty: Tag, items: I) -> Result<()>
    where
        I: IntoIterator<Item = &'v Value>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        if items.len() == 0 {
            return self.write_tag(empty);
        }
        self.encode_countable(tag, items)
    }

    fn write_map(&mut self, tag: Tag, empty: Tag, map: &Map) -> Result<()> {
        if map.is_empty() {
            return self.write_tag(empty);
        }
        self.write_tag(tag)?;
        self.write_map_body(tag, map)
    }

    /// Count, then alternating tagged keys and values.
    fn write_map_body(&mut self, tag: Tag, map: &Map) -> Result<()> {
        self.write_count(tag, map.len())?;
        for (k, v) in map {
            self.encode(k)?;
            self.encode(v)?;
        }
        Ok(())
    }

    fn encode_temporal(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Instant(dt) => {
                let (secs, nanos) = wire::instant(dt);
                self.write_tag(tags::INSTANT)?;
                self.write_long(secs)?;
                self.write_int(nanos)?;
            }
            Value::Date(dt) => {
                self.write_tag(tags::DATE)?;
                self.write_long(wire::date(dt))?;
            }
            Value::LocalDate(d) => {
                self.write_tag(tags::LOCAL_DATE)?;
                self.write_long(wire::local_date(d))?;
            }
            Value::LocalTime(t) => {
                self.write_tag(tags::LOCAL_TIME)?;
                self.write_long(wire::local_time(t))?;
            }
            Value::LocalDateTime(dt) => {
                let (secs, nanos) = wire::local_date_time(dt);
                self.write_tag(tags::LOCAL_DATE_TIME)?;
                self.write_long(secs)?;
                self.write_int(nanos)?;
            }
            Value::OffsetDateTime(dt) => {
                let (secs, nanos, offset) = wire::offset_date_time(dt);
                self.write_tag(tags::OFFSET_DATE_TIME)?;
                self.write_long(secs)?;
                self.write_int(nanos)?;
                self.write_int(offset)?;
            }
            Value::OffsetTime(t) => {
                self.write_tag(tags::OFFSET_TIME)?;
                self.write_long(wire::local_time(&t.time))?;
                self.write_int(t.offset.local_minus_utc())?;
            }
            Value::ZonedDateTime(z) => {
                let (secs, nanos) = wire::local_date_time(&z.local);
                self.write_tag(tags::ZONED_DATE_TIME)?;
                self.write_long(secs)?;
                self.write_int(nanos)?;
                self.write_text(&z.zone)?;
            }
            Value::Duration(d) => {
                let (secs, nanos) = wire::duration(d);
                self.write_tag(tags::DURATION)?;
                self.write_long(secs)?;
                self.write_int(nanos)?;
            }
            Value::Period(p) => {
                self.write_tag(tags::PERIOD)?;
                self.write_int(p.years)?;
                self.write_int(p.months)?;
                self.write_int(p.days)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// References, exceptions, metadata and fallback records.
    fn encode_reference(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Atom(inner) => {
                self.write_tag(tags::ATOM)?;
                self.encode(inner)?;
            }
            Value::Ref(inner) => {
                self.write_tag(tags::REF)?;
                self.encode(inner)?;
            }
            Value::Future(deferred) => {
                let timeout = self.options.deref_timeout();
                let Some(inner) = deferred.wait(timeout) else {
                    return Err(Error::DerefTimeout { timeout });
                };
                self.write_tag(tags::FUTURE)?;
                self.encode(&inner)?;
            }
            Value::Exception(ex) => self.write_exception(ex)?,
            Value::WithMeta { meta, value } => {
                if self.options.save_meta() {
                    self.write_tag(tags::META)?;
                    self.write_map_body(tags::META, meta)?;
                }
                self.encode(value)?;
            }
            Value::Unsupported { type_name, repr } => {
                self.write_tag(tags::UNSUPPORTED)?;
                self.write_text(type_name)?;
                self.write_text(repr)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_exception(&mut self, ex: &Exception) -> Result<()> {
        let tag = match &ex.data {
            Some(data) => {
                self.write_tag(tags::EX_INFO)?;
                self.write_map_body(tags::EX_INFO, data)?;
                tags::EX_INFO
            }
            None => {
                self.write_tag(tags::THROWABLE)?;
                tags::THROWABLE
            }
        };

        self.write_bool(ex.message.is_some())?;
        if let Some(message) = &ex.message {
            self.write_text(message)?;
        }

        self.write_count(tag, ex.stack_trace.len())?;
        for frame in &ex.stack_trace {
            self.write_text(&frame.class_name)?;
            self.write_text(&frame.method_name)?;
            self.write_text(&frame.file_name)?;
            self.write_int(frame.line)?;
        }

        self.write_bool(ex.cause.is_some())?;
        if let Some(cause) = &ex.cause {
            self.write_exception(cause)?;
        }

        self.write_count(tag, ex.suppressed.len())?;
        for suppressed in &ex.suppressed {
            self.write_exception(suppressed)?;
        }
        Ok(())
    }

    /// Custom values: registered hook, then the fallback.
    fn encode_external(&mut self, value: &Value) -> Result<()> {
        let Value::Custom(custom) = value else {
            return Err(Error::UnsupportedType {
                type_name: value.type_name().into(),
            });
        };

        let hooks = Arc::clone(&self.hooks);
        if let Some(hook) = hooks.encoder_for(custom.type_id()) {
            log::trace!("encoding {} through its hook", custom.type_name());
            return hook(custom.as_any(), self);
        }

        if self.options.encode_unsupported() {
            if let Some(fallback) = hooks.fallback_fn() {
                if fallback(value, self)? {
                    log::debug!("{} written by the fallback", custom.type_name());
                    return Ok(());
                }
            }
        }

        Err(Error::UnsupportedType {
            type_name: custom.type_name().into(),
        })
    }
}

impl Encoder<'static> {
    /// Creates or truncates the file at `path`. With `options.append()`
    /// the file is opened for appending and the header is only written
    /// when the file is empty.
    pub fn create(path: impl AsRef<Path>, options: Options, hooks: EncodeHooks) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;

        let file = if options.append() {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };
        let fresh = file.metadata()?.len() == 0;
        log::debug!("writing {} (fresh: {fresh})", path.display());

        Self::open(file, options, hooks, fresh)
    }
}

impl Drop for Encoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("failed to finish stream on drop: {e}");
        }
    }
}
