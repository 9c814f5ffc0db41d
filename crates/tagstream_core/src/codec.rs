//! The tagged wire format.

mod chunked;
pub mod dec;
pub mod enc;
pub mod err;
pub mod hooks;
pub mod io;
pub mod tags;

use crate::options::Options;
use crate::value::Value;
use err::Result;

/// Encodes `values` into one in-memory stream, header included.
pub fn to_bytes<'v, I>(values: I, options: Options) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'v Value>,
{
    let mut buf = Vec::new();
    let mut enc = enc::Encoder::new(&mut buf, options)?;
    for value in values {
        enc.encode(value)?;
    }
    enc.close()?;
    Ok(buf)
}

/// Decodes every value of an in-memory stream.
pub fn from_bytes(bytes: &[u8], options: Options) -> Result<Vec<Value>> {
    dec::Decoder::new(bytes, options)?.into_values().collect()
}
