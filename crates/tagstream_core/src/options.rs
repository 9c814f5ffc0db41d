//! Encoder and decoder configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::err::{Error, Result};
use crate::stream::cipher::CHACHA20_POLY1305;

/// Largest ciphertext frame the cipher transform will produce or accept.
const MAX_BYTE_CHUNK_SIZE: usize = 1 << 24;

/// Immutable stream configuration.
///
/// Built with [`Options::builder`], or deserialized from any serde format
/// using kebab-case keys. Every missing key takes its default.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    deref_timeout_ms: u64,
    object_chunk_size: usize,
    byte_chunk_size: usize,
    buf_input_size: usize,
    buf_output_size: usize,
    uncountable_max_items: usize,
    encode_unsupported: bool,
    io_use_temp_file: bool,
    save_meta: bool,
    append: bool,
    gzip: bool,
    cipher_algorithm: Option<String>,
    #[serde(skip_serializing, deserialize_with = "serde_bytes::deserialize")]
    cipher_secret: Option<Vec<u8>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            deref_timeout_ms: 5000,
            object_chunk_size: 255,
            byte_chunk_size: 0xFFFF,
            buf_input_size: 0x10000,
            buf_output_size: 0x10000,
            uncountable_max_items: i32::MAX as usize,
            encode_unsupported: true,
            io_use_temp_file: false,
            save_meta: true,
            append: false,
            gzip: false,
            cipher_algorithm: None,
            cipher_secret: None,
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Rejects settings no stream can be opened with.
    pub fn validate(&self) -> Result<()> {
        if self.object_chunk_size == 0 || i32::try_from(self.object_chunk_size).is_err() {
            return Err(Error::Config(format!(
                "object-chunk-size must be in 1..={}, got {}",
                i32::MAX,
                self.object_chunk_size
            )));
        }

        if !(1..=MAX_BYTE_CHUNK_SIZE).contains(&self.byte_chunk_size) {
            return Err(Error::Config(format!(
                "byte-chunk-size must be in 1..={MAX_BYTE_CHUNK_SIZE}, got {}",
                self.byte_chunk_size
            )));
        }

        for (name, size) in [
            ("buf-input-size", self.buf_input_size),
            ("buf-output-size", self.buf_output_size),
        ] {
            if size == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }

        match (&self.cipher_algorithm, &self.cipher_secret) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(Error::Config(
                    "cipher-secret given without cipher-algorithm".into(),
                ))
            }
            (Some(_), None) => {
                return Err(Error::Config(
                    "cipher-algorithm given without cipher-secret".into(),
                ))
            }
            (Some(algo), Some(_)) if algo != CHACHA20_POLY1305 => {
                return Err(Error::Config(format!("unknown cipher algorithm {algo:?}")))
            }
            (Some(_), Some(_)) if self.append => {
                return Err(Error::Config(
                    "an encrypted stream cannot be appended to".into(),
                ))
            }
            (Some(_), Some(_)) => {}
        }

        Ok(())
    }

    pub fn deref_timeout(&self) -> Duration {
        Duration::from_millis(self.deref_timeout_ms)
    }

    pub fn object_chunk_size(&self) -> usize {
        self.object_chunk_size
    }

    pub fn byte_chunk_size(&self) -> usize {
        self.byte_chunk_size
    }

    pub fn buf_input_size(&self) -> usize {
        self.buf_input_size
    }

    pub fn buf_output_size(&self) -> usize {
        self.buf_output_size
    }

    pub fn uncountable_max_items(&self) -> usize {
        self.uncountable_max_items
    }

    pub fn encode_unsupported(&self) -> bool {
        self.encode_unsupported
    }

    pub fn io_use_temp_file(&self) -> bool {
        self.io_use_temp_file
    }

    pub fn save_meta(&self) -> bool {
        self.save_meta
    }

    pub fn append(&self) -> bool {
        self.append
    }

    pub fn gzip(&self) -> bool {
        self.gzip
    }

    pub fn cipher_algorithm(&self) -> Option<&str> {
        self.cipher_algorithm.as_deref()
    }

    pub(crate) fn cipher_secret(&self) -> Option<&[u8]> {
        match self.cipher_algorithm {
            Some(_) => self.cipher_secret.as_deref(),
            None => None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("deref_timeout_ms", &self.deref_timeout_ms)
            .field("object_chunk_size", &self.object_chunk_size)
            .field("byte_chunk_size", &self.byte_chunk_size)
            .field("buf_input_size", &self.buf_input_size)
            .field("buf_output_size", &self.buf_output_size)
            .field("uncountable_max_items", &self.uncountable_max_items)
            .field("encode_unsupported", &self.encode_unsupported)
            .field("io_use_temp_file", &self.io_use_temp_file)
            .field("save_meta", &self.save_meta)
            .field("append", &self.append)
            .field("gzip", &self.gzip)
            .field("cipher_algorithm", &self.cipher_algorithm)
            .field(
                "cipher_secret",
                &self.cipher_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Builder for [`Options`].
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    inner: Options,
}

macro_rules! builder_setters {
    ($($(#[$doc:meta])* $field:ident: $ty:ty,)*) => {
        $(
            $(#[$doc])*
            pub fn $field(mut self, value: $ty) -> Self {
                self.inner.$field = value;
                self
            }
        )*
    };
}

impl OptionsBuilder {
    builder_setters! {
        object_chunk_size: usize,
        /// Cipher frame size and the slice size used when reading blobs.
        byte_chunk_size: usize,
        buf_input_size: usize,
        buf_output_size: usize,
        uncountable_max_items: usize,
        /// Allow the fallback hook to encode values without a registered hook.
        encode_unsupported: bool,
        /// Spool encoder output to an anonymous temp file until close.
        io_use_temp_file: bool,
        save_meta: bool,
        /// Continue an existing stream: no header is written.
        append: bool,
        gzip: bool,
    }

    pub fn deref_timeout(mut self, timeout: Duration) -> Self {
        self.inner.deref_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn cipher(mut self, algorithm: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        self.inner.cipher_algorithm = Some(algorithm.into());
        self.inner.cipher_secret = Some(secret.into());
        self
    }

    pub fn build(self) -> Result<Options> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
