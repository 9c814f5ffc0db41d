//! Fixed-width and length-prefixed primitives.
//!
//! Every multi-byte quantity in a stream is big-endian. Blobs are framed
//! as an `i32` length followed by that many bytes; text is a blob holding
//! UTF-8.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::tags::Tag;

/// Write-side primitives, available on every [`Write`].
pub trait WritePrimitives: Write {
    fn write_tag(&mut self, tag: Tag) -> io::Result<()> {
        self.write_i16::<BigEndian>(tag)
    }

    fn write_short(&mut self, v: i16) -> io::Result<()> {
        self.write_i16::<BigEndian>(v)
    }

    fn write_int(&mut self, v: i32) -> io::Result<()> {
        self.write_i32::<BigEndian>(v)
    }

    fn write_long(&mut self, v: i64) -> io::Result<()> {
        self.write_i64::<BigEndian>(v)
    }

    fn write_float(&mut self, v: f32) -> io::Result<()> {
        self.write_f32::<BigEndian>(v)
    }

    fn write_double(&mut self, v: f64) -> io::Result<()> {
        self.write_f64::<BigEndian>(v)
    }

    fn write_byte(&mut self, v: i8) -> io::Result<()> {
        self.write_i8(v)
    }

    fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.write_u8(u8::from(v))
    }

    /// Writes the `i32` length of the slice, then the slice.
    fn write_blob(&mut self, bytes: &[u8]) -> io::Result<()> {
        let len = i32::try_from(bytes.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("blob of {} bytes does not fit an i32 length", bytes.len()),
            )
        })?;
        self.write_int(len)?;
        self.write_all(bytes)
    }

    fn write_text(&mut self, s: &str) -> io::Result<()> {
        self.write_blob(s.as_bytes())
    }

    /// Writes bytes whose length the reader already knows from context.
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }
}

impl<W: Write + ?Sized> WritePrimitives for W {}

/// Read-side primitives, available on every [`Read`].
pub trait ReadPrimitives: Read {
    fn read_tag(&mut self) -> io::Result<Tag> {
        self.read_i16::<BigEndian>()
    }

    fn read_short(&mut self) -> io::Result<i16> {
        self.read_i16::<BigEndian>()
    }

    fn read_int(&mut self) -> io::Result<i32> {
        self.read_i32::<BigEndian>()
    }

    fn read_long(&mut self) -> io::Result<i64> {
        self.read_i64::<BigEndian>()
    }

    fn read_float(&mut self) -> io::Result<f32> {
        self.read_f32::<BigEndian>()
    }

    fn read_double(&mut self) -> io::Result<f64> {
        self.read_f64::<BigEndian>()
    }

    fn read_byte(&mut self) -> io::Result<i8> {
        self.read_i8()
    }

    fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads exactly `len` bytes, growing the buffer at most `slice` bytes
    /// at a time so a corrupt length fails on the missing bytes instead of
    /// on one oversized allocation.
    fn read_raw(&mut self, len: usize, slice: usize) -> io::Result<Vec<u8>> {
        let slice = slice.max(1);
        let mut buf = Vec::with_capacity(len.min(slice));

        while buf.len() < len {
            let start = buf.len();
            let step = (len - start).min(slice);
            buf.resize(start + step, 0);
            self.read_exact(&mut buf[start..])?;
        }

        Ok(buf)
    }
}

impl<R: Read + ?Sized> ReadPrimitives for R {}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{ReadPrimitives, WritePrimitives};

    #[test]
    fn test_big_endian_layout() {
        let mut buf = Vec::new();
        buf.write_tag(0x0102).unwrap();
        buf.write_int(42).unwrap();
        buf.write_long(-2).unwrap();
        buf.write_bool(true).unwrap();

        assert_eq!(
            buf,
            [1, 2, 0, 0, 0, 42, 255, 255, 255, 255, 255, 255, 255, 254, 1]
        );
    }

    #[test]
    fn test_text_framing() {
        let mut buf = Vec::new();
        buf.write_text("hé").unwrap();
        assert_eq!(buf, [0, 0, 0, 3, b'h', 0xc3, 0xa9]);

        let mut input = buf.as_slice();
        let len = input.read_int().unwrap() as usize;
        let bytes = input.read_raw(len, 1).unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), "hé");
        assert!(input.is_empty());
    }

    /// A length larger than the remaining input must fail, not allocate.
    #[test]
    fn test_raw_with_lying_length() {
        let data = [1u8, 2, 3];
        let err = data.as_slice().read_raw(i32::MAX as usize, 4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_raw_across_slices() {
        let data = (0..=255u8).collect::<Vec<_>>();
        let read = data.as_slice().read_raw(data.len(), 7).unwrap();
        assert_eq!(read, data);
    }
}
