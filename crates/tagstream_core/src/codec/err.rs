//! Error implementations

use std::{io, time::Duration};

use serde::{de, ser};

use super::tags::Tag;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error object for this library.
///
/// None of these are recovered from inside the codec. A failed encode may
/// already have written a prefix of the value; a failed decode leaves the
/// read position undefined.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying stream failed, including a stream that ended inside a value.
    #[error("stream i/o failed: {0}")]
    Io(#[from] io::Error),

    /// A tag that is neither built in nor handled by a decode hook.
    #[error("unknown tag {tag}")]
    UnknownTag { tag: Tag },

    /// A nested value has the wrong shape for where it appears.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// No built-in rule or hook can encode the value.
    #[error("no encoder for type {type_name}")]
    UnsupportedType { type_name: String },

    /// An uncountable sequence went past `uncountable_max_items`.
    #[error("uncountable sequence exceeds {limit} items")]
    OversizeSequence { limit: usize },

    /// A deferred value was not realized in time.
    #[error("deferred value not realized within {timeout:?}")]
    DerefTimeout { timeout: Duration },

    /// A payload that violates the shape its tag promises.
    #[error("malformed payload for tag {tag}: {reason}")]
    Malformed { tag: Tag, reason: String },

    /// The stream header carries a version this build does not read.
    #[error("unsupported stream format version {version}")]
    UnsupportedVersion { version: i16 },

    /// Invalid [`Options`](crate::Options) or hook registration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised by a `Serialize`/`Deserialize` impl through the serde bridge.
    #[error("{0}")]
    Serde(String),
}

impl Error {
    pub(crate) fn malformed(tag: Tag, reason: impl Into<String>) -> Self {
        Self::Malformed {
            tag,
            reason: reason.into(),
        }
    }

    /// Whether the stream ended in the middle of a value.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Self::Serde(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        Self::Serde(msg.to_string())
    }
}
