//! Shared constants between encoding and decoding logic.
//!
//! Every value on the wire starts with one of these tags. Tags are only
//! ever appended to this table; changing or reusing a value breaks every
//! stream written before the change.

use std::ops::RangeInclusive;

/// A wire tag.
pub type Tag = i16;

/// Format version written in the 2-byte stream header.
pub const FORMAT_VERSION: i16 = 1;

/// Tags in this range are never built in and belong to hook-registered types.
pub const EXTERNAL_RANGE: RangeInclusive<Tag> = 0x1000..=Tag::MAX;

/// Defines the tag constants together with the lookup functions, so the
/// name table can never drift from the constants.
macro_rules! tag_table {
    ($($(#[$doc:meta])* $name:ident = $value:expr,)*) => {
        $(
            $(#[$doc])*
            pub const $name: Tag = $value;
        )*

        /// Every built-in tag, in table order.
        pub const ALL: &[Tag] = &[$($name),*];

        /// Name of a built-in tag.
        pub fn name(tag: Tag) -> Option<&'static str> {
            match tag {
                $($name => Some(stringify!($name)),)*
                _ => None,
            }
        }
    };
}

tag_table! {
    // zero-payload sentinels
    NULL = 1,
    BOOL_TRUE = 2,
    BOOL_FALSE = 3,
    BYTE_MINUS_ONE = 4,
    BYTE_ZERO = 5,
    BYTE_ONE = 6,
    SHORT_MINUS_ONE = 7,
    SHORT_ZERO = 8,
    SHORT_ONE = 9,
    INT_MINUS_ONE = 10,
    INT_ZERO = 11,
    INT_ONE = 12,
    LONG_MINUS_ONE = 13,
    LONG_ZERO = 14,
    LONG_ONE = 15,
    FLOAT_MINUS_ONE = 16,
    FLOAT_ZERO = 17,
    FLOAT_ONE = 18,
    DOUBLE_MINUS_ONE = 19,
    DOUBLE_ZERO = 20,
    DOUBLE_ONE = 21,
    STRING_EMPTY = 22,

    // empty countable collections
    VECTOR_EMPTY = 23,
    MAP_EMPTY = 24,
    SET_EMPTY = 25,
    SORTED_SET_EMPTY = 26,
    SORTED_MAP_EMPTY = 27,
    LIST_EMPTY = 28,
    QUEUE_EMPTY = 29,
    GENERIC_LIST_EMPTY = 30,
    GENERIC_MAP_EMPTY = 31,
    OBJECT_ARRAY_EMPTY = 32,

    // fixed-width scalars
    /// One byte, non-zero is `true`. Only produced by foreign writers.
    BOOL = 40,
    BYTE = 41,
    SHORT = 42,
    INT = 43,
    LONG = 44,
    FLOAT = 45,
    DOUBLE = 46,
    /// Unicode scalar value as an `i32`.
    CHAR = 47,
    /// Most significant `i64`, then least significant `i64`.
    UUID = 48,

    // length-prefixed text and blobs
    STRING = 60,
    KEYWORD = 61,
    SYMBOL = 62,
    REGEX = 63,
    URL = 64,
    URI = 65,
    BYTES = 66,
    ZONE_ID = 67,

    // typed arrays: count, then untagged fixed-width elements
    INT_ARRAY = 70,
    SHORT_ARRAY = 71,
    LONG_ARRAY = 72,
    FLOAT_ARRAY = 73,
    DOUBLE_ARRAY = 74,
    BOOL_ARRAY = 75,
    CHAR_ARRAY = 76,

    // arbitrary precision
    BIG_INT = 80,
    BIG_DECIMAL = 81,
    RATIO = 82,
    HYBRID_INT = 83,

    // temporal
    INSTANT = 90,
    DATE = 91,
    LOCAL_DATE = 92,
    LOCAL_TIME = 93,
    LOCAL_DATE_TIME = 94,
    OFFSET_DATE_TIME = 95,
    OFFSET_TIME = 96,
    ZONED_DATE_TIME = 97,
    DURATION = 98,
    PERIOD = 99,

    // countable collections: count, then tagged children
    VECTOR = 110,
    MAP = 111,
    /// Exactly two tagged children, no count.
    MAP_ENTRY = 112,
    SET = 113,
    SORTED_SET = 114,
    SORTED_MAP = 115,
    LIST = 116,
    QUEUE = 117,
    GENERIC_LIST = 118,
    GENERIC_MAP = 119,
    OBJECT_ARRAY = 120,
    /// Record written by foreign producers, read back as a map.
    RECORD = 121,

    // uncountable collections: chunked
    SEQ = 140,
    LAZY_SEQ = 141,
    ITERABLE = 142,
    /// Read back as an iterable.
    ITERATOR = 143,
    /// Read back as an iterable.
    STREAM = 144,

    // references
    ATOM = 150,
    REF = 151,
    FUTURE = 152,

    // exceptions
    THROWABLE = 160,
    EX_INFO = 161,

    // wrappers and fallbacks
    META = 170,
    UNSUPPORTED = 171,
}

/// Whether the tag is part of the built-in table.
pub fn is_builtin(tag: Tag) -> bool {
    name(tag).is_some()
}

/// Whether the tag lies in the range reserved for hook-registered types.
pub fn is_external(tag: Tag) -> bool {
    EXTERNAL_RANGE.contains(&tag)
}

/// Whether the tag frames its payload with the chunked protocol.
pub fn is_uncountable(tag: Tag) -> bool {
    matches!(tag, SEQ | LAZY_SEQ | ITERABLE | ITERATOR | STREAM)
}

/// Display form of a tag for logs and error messages.
pub fn describe(tag: Tag) -> String {
    match name(tag) {
        Some(name) => format!("{name} ({tag})"),
        None => format!("tag {tag}"),
    }
}
