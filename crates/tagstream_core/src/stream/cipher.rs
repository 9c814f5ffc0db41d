//! Authenticated stream encryption.
//!
//! Layout: a 12-byte random nonce base, then frames of
//! `[u32 header][ciphertext]`. The header holds the ciphertext length,
//! with the high bit set on the final frame. Frame `i` is sealed with
//! the nonce base XOR `i` in its last 8 bytes and with the final flag as
//! associated data, so dropped, reordered or truncated frames fail
//! authentication.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::Sink;
use crate::codec::io::ReadPrimitives;

/// The only supported algorithm name.
pub const CHACHA20_POLY1305: &str = "chacha20-poly1305";

const NONCE_LEN: usize = 12;
const FINAL_FLAG: u32 = 1 << 31;
const TAG_LEN: usize = 16;
/// Largest frame a conforming writer produces.
const MAX_FRAME_LEN: usize = (1 << 24) + TAG_LEN;

fn cipher_for(secret: &[u8]) -> ChaCha20Poly1305 {
    let digest = Sha256::digest(secret);
    ChaCha20Poly1305::new(Key::from_slice(digest.as_slice()))
}

fn frame_nonce(base: &[u8; NONCE_LEN], counter: u64) -> [u8; NONCE_LEN] {
    let mut nonce = *base;
    for (b, c) in nonce[NONCE_LEN - 8..].iter_mut().zip(counter.to_be_bytes()) {
        *b ^= c;
    }
    nonce
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

pub(super) struct Encrypt<'a> {
    inner: Box<dyn Sink + 'a>,
    cipher: ChaCha20Poly1305,
    nonce_base: [u8; NONCE_LEN],
    counter: u64,
    buf: Vec<u8>,
    frame_len: usize,
}

impl<'a> Encrypt<'a> {
    pub fn new(mut inner: Box<dyn Sink + 'a>, secret: &[u8], frame_len: usize) -> io::Result<Self> {
        let mut nonce_base = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_base);
        inner.write_all(&nonce_base)?;

        Ok(Self {
            inner,
            cipher: cipher_for(secret),
            nonce_base,
            counter: 0,
            buf: Vec::with_capacity(frame_len),
            frame_len,
        })
    }

    fn seal(&mut self, last: bool) -> io::Result<()> {
        let nonce = frame_nonce(&self.nonce_base, self.counter);
        let aad = [u8::from(last)];
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &self.buf,
                    aad: &aad,
                },
            )
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "frame encryption failed"))?;

        let len = u32::try_from(sealed.len())
            .ok()
            .filter(|len| len & FINAL_FLAG == 0)
            .ok_or_else(|| invalid("cipher frame too large"))?;
        let header = if last { len | FINAL_FLAG } else { len };

        self.inner.write_u32::<BigEndian>(header)?;
        self.inner.write_all(&sealed)?;
        self.counter += 1;
        self.buf.clear();
        Ok(())
    }
}

impl Write for Encrypt<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.frame_len - self.buf.len();
        let taken = room.min(data.len());
        self.buf.extend_from_slice(&data[..taken]);

        if self.buf.len() == self.frame_len {
            self.seal(false)?;
        }
        Ok(taken)
    }

    /// Seals any partial frame, so flushed bytes are readable.
    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.seal(false)?;
        }
        self.inner.flush()
    }
}

impl Sink for Encrypt<'_> {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.seal(true)?;
        self.inner.finish()
    }
}

pub(super) struct Decrypt<'a> {
    inner: Box<dyn Read + 'a>,
    cipher: ChaCha20Poly1305,
    nonce_base: Option<[u8; NONCE_LEN]>,
    counter: u64,
    plain: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl<'a> Decrypt<'a> {
    pub fn new(inner: Box<dyn Read + 'a>, secret: &[u8]) -> Self {
        Self {
            inner,
            cipher: cipher_for(secret),
            nonce_base: None,
            counter: 0,
            plain: Vec::new(),
            pos: 0,
            finished: false,
        }
    }

    fn next_frame(&mut self) -> io::Result<()> {
        let base = match self.nonce_base {
            Some(base) => base,
            None => {
                let mut base = [0u8; NONCE_LEN];
                self.inner.read_exact(&mut base)?;
                self.nonce_base = Some(base);
                base
            }
        };

        let header = match self.inner.read_u32::<BigEndian>() {
            Ok(header) => header,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(invalid("encrypted stream ended before its final frame"))
            }
            Err(e) => return Err(e),
        };
        let last = header & FINAL_FLAG != 0;
        let len = (header & !FINAL_FLAG) as usize;
        if len > MAX_FRAME_LEN {
            return Err(invalid("cipher frame too large"));
        }

        let sealed = self.inner.read_raw(len, 1 << 16)?;
        let nonce = frame_nonce(&base, self.counter);
        let aad = [u8::from(last)];
        self.plain = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| invalid("encrypted frame failed authentication"))?;

        self.pos = 0;
        self.counter += 1;
        self.finished = last;
        Ok(())
    }
}

impl Read for Decrypt<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.plain.len() {
            if self.finished {
                return Ok(0);
            }
            self.next_frame()?;
        }

        let n = buf.len().min(self.plain.len() - self.pos);
        buf[..n].copy_from_slice(&self.plain[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
