//! Byte-level transforms composed around the raw stream.
//!
//! Writes pass through gzip, then the cipher, then the spool or the raw
//! writer. Reads unwind the same layers in reverse. None of the layers
//! knows anything about tags or values.

pub mod cipher;
mod spool;

use std::io::{self, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::codec::err::Result;
use crate::options::Options;

/// The write side of a transform stack.
///
/// `finish` completes the layer (trailers, final frames, spool copies)
/// and then finishes the layer below it.
pub trait Sink: Write {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// The bottom of a stack: a caller-supplied writer.
struct Plain<W: Write>(W);

impl<W: Write> Write for Plain<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Sink for Plain<W> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

/// One gzip member over the rest of the stack.
struct Gzip<'a>(GzEncoder<Box<dyn Sink + 'a>>);

impl Write for Gzip<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Sink for Gzip<'_> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = self.0.finish()?;
        inner.finish()
    }
}

/// Builds the write stack described by `options` over `writer`.
pub(crate) fn sink<'a, W>(writer: W, options: &Options) -> Result<Box<dyn Sink + 'a>>
where
    W: Write + 'a,
{
    let mut sink: Box<dyn Sink + 'a> = if options.io_use_temp_file() {
        Box::new(spool::Spool::new(writer)?)
    } else {
        Box::new(Plain(writer))
    };

    if let Some(secret) = options.cipher_secret() {
        log::trace!("encrypting stream frames of {} bytes", options.byte_chunk_size());
        sink = Box::new(cipher::Encrypt::new(sink, secret, options.byte_chunk_size())?);
    }

    if options.gzip() {
        sink = Box::new(Gzip(GzEncoder::new(sink, Compression::default())));
    }

    Ok(sink)
}

/// Builds the read stack described by `options` over `reader`.
pub(crate) fn source<'a, R>(reader: R, options: &Options) -> Box<dyn Read + 'a>
where
    R: Read + 'a,
{
    let mut source: Box<dyn Read + 'a> = Box::new(reader);

    if let Some(secret) = options.cipher_secret() {
        source = Box::new(cipher::Decrypt::new(source, secret));
    }

    if options.gzip() {
        source = Box::new(MultiGzDecoder::new(source));
    }

    source
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::cipher::CHACHA20_POLY1305;
    use super::*;

    fn write_through(options: &Options, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sink = sink(&mut out, options).unwrap();
        sink.write_all(payload).unwrap();
        sink.finish().unwrap();
        out
    }

    fn read_through(options: &Options, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut read = Vec::new();
        source(bytes, options).read_to_end(&mut read)?;
        Ok(read)
    }

    fn random_payload(len: usize) -> Vec<u8> {
        let mut payload = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut payload);
        payload
    }

    fn cipher_options() -> Options {
        Options::builder()
            .cipher(CHACHA20_POLY1305, b"secret".to_vec())
            .byte_chunk_size(100)
            .build()
            .unwrap()
    }

    #[test]
    fn test_gzip_round_trip() {
        let options = Options::builder().gzip(true).build().unwrap();
        let payload = vec![7u8; 10_000];

        let bytes = write_through(&options, &payload);
        assert!(bytes.len() < payload.len());
        assert_eq!(&bytes[..2], [0x1f, 0x8b]);
        assert_eq!(read_through(&options, &bytes).unwrap(), payload);
    }

    #[test]
    fn test_gzip_members_concatenate() {
        let options = Options::builder().gzip(true).build().unwrap();
        let mut bytes = write_through(&options, b"first ");
        bytes.extend(write_through(&options, b"second"));

        assert_eq!(read_through(&options, &bytes).unwrap(), b"first second");
    }

    #[test]
    fn test_cipher_round_trip() {
        let options = cipher_options();
        let payload = random_payload(1_234);

        let bytes = write_through(&options, &payload);
        assert_ne!(&bytes[12..], &payload[..]);
        assert_eq!(read_through(&options, &bytes).unwrap(), payload);
    }

    #[test]
    fn test_cipher_empty_stream() {
        let options = cipher_options();
        let bytes = write_through(&options, &[]);
        assert!(read_through(&options, &bytes).unwrap().is_empty());
    }

    #[test]
    fn test_cipher_rejects_tampering() {
        let options = cipher_options();
        let mut bytes = write_through(&options, &random_payload(300));
        let last = bytes.len() - 1;
        bytes[last] ^= 1;

        let err = read_through(&options, &bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_cipher_rejects_truncation() {
        let options = cipher_options();
        let bytes = write_through(&options, &random_payload(300));

        // drop the final frame: 12 byte nonce, then three frames of 4 + 100 + 16
        let cut = 12 + 3 * (4 + 100 + 16);
        assert!(read_through(&options, &bytes[..cut]).is_err());
    }

    #[test]
    fn test_cipher_wrong_secret() {
        let bytes = write_through(&cipher_options(), b"payload");
        let other = Options::builder()
            .cipher(CHACHA20_POLY1305, b"other".to_vec())
            .build()
            .unwrap();

        assert!(read_through(&other, &bytes).is_err());
    }

    #[test]
    fn test_spool_copies_on_finish() {
        let options = Options::builder().io_use_temp_file(true).build().unwrap();
        let payload = random_payload(5_000);
        assert_eq!(write_through(&options, &payload), payload);
    }

    #[test]
    fn test_all_layers() {
        let options = Options::builder()
            .gzip(true)
            .io_use_temp_file(true)
            .cipher(CHACHA20_POLY1305, b"s".to_vec())
            .build()
            .unwrap();
        let payload = b"layered".repeat(500);

        let bytes = write_through(&options, &payload);
        assert_eq!(read_through(&options, &bytes).unwrap(), payload);
    }
}
