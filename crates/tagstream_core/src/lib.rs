//! Type-tagged binary serialization of value graphs.
//!
//! A stream is a 2-byte format version followed by any number of values.
//! Every value starts with a 16-bit tag that names its type; composites of
//! unknown length are written as chunks so a reader can consume them
//! incrementally. Streams may be gzip-compressed, encrypted, or both.

pub mod codec;
pub mod options;
pub mod ser_de;
pub mod stream;
pub mod value;

pub use codec::dec::{Decoder, IntoValues, SequenceReader};
pub use codec::enc::Encoder;
pub use codec::err::{Error, Result};
pub use codec::hooks::{write_unsupported, DecodeHooks, EncodeHooks};
pub use codec::tags::{self, Tag, FORMAT_VERSION};
pub use codec::{from_bytes, to_bytes};
pub use options::{Options, OptionsBuilder};
pub use ser_de::{from_value, to_value};
pub use stream::cipher::CHACHA20_POLY1305;
pub use value::{Map, Pattern, Value};
