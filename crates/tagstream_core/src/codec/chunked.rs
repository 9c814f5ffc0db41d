//! Framing for collections of unknown length.
//!
//! After the collection tag come chunks of `[i32 count][count values]`,
//! each holding at most `object_chunk_size` values, and a terminating
//! count of `0`.

use std::borrow::Borrow;

use super::dec::Decoder;
use super::enc::Encoder;
use super::err::{Error, Result};
use super::tags::Tag;
use crate::value::Value;

/// Cap on buffer preallocation driven by a configured chunk size.
const MAX_CHUNK_PREALLOC: usize = 1024;

/// Writes `tag` and then `items` as chunks.
///
/// Items are pulled one at a time; pulling item `uncountable_max_items + 1`
/// fails with [`Error::OversizeSequence`], so an endless iterator never
/// runs unbounded.
pub(crate) fn write_chunked<I>(enc: &mut Encoder<'_>, tag: Tag, items: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Borrow<Value>,
{
    let chunk_size = enc.options().object_chunk_size();
    let limit = enc.options().uncountable_max_items();

    enc.write_tag(tag)?;

    let mut chunk = Vec::with_capacity(chunk_size.min(MAX_CHUNK_PREALLOC));
    let mut pulled = 0usize;

    for item in items {
        if pulled == limit {
            return Err(Error::OversizeSequence { limit });
        }
        pulled += 1;
        chunk.push(item);

        if chunk.len() == chunk_size {
            write_chunk(enc, tag, &mut chunk)?;
        }
    }

    if !chunk.is_empty() {
        write_chunk(enc, tag, &mut chunk)?;
    }

    log::trace!("wrote {pulled} items in chunks of {chunk_size}");
    enc.write_int(0)
}

fn write_chunk<T: Borrow<Value>>(enc: &mut Encoder<'_>, tag: Tag, chunk: &mut Vec<T>) -> Result<()> {
    let count = i32::try_from(chunk.len())
        .map_err(|_| Error::malformed(tag, "chunk count does not fit an i32"))?;
    enc.write_int(count)?;
    for item in chunk.drain(..) {
        enc.encode(item.borrow())?;
    }
    Ok(())
}

/// Read position inside a chunked collection whose tag is already consumed.
#[derive(Debug)]
pub(crate) struct ChunkCursor {
    tag: Tag,
    remaining: usize,
    seen: usize,
    limit: usize,
    done: bool,
}

impl ChunkCursor {
    pub fn new(tag: Tag, limit: usize) -> Self {
        Self {
            tag,
            remaining: 0,
            seen: 0,
            limit,
            done: false,
        }
    }

    /// The next element, or `None` after the terminating count.
    pub fn next_item(&mut self, dec: &mut Decoder<'_>) -> Result<Option<Value>> {
        while !self.done && self.remaining == 0 {
            let count = dec.read_int()?;
            if count < 0 {
                return Err(Error::malformed(
                    self.tag,
                    format!("negative chunk count {count}"),
                ));
            }
            self.remaining = count as usize;
            self.done = count == 0;
        }

        if self.done {
            return Ok(None);
        }

        if self.seen == self.limit {
            return Err(Error::OversizeSequence { limit: self.limit });
        }
        self.remaining -= 1;
        self.seen += 1;
        dec.decode_child().map(Some)
    }
}

/// Reads a whole chunked collection whose tag is already consumed.
pub(crate) fn read_chunked(dec: &mut Decoder<'_>, tag: Tag) -> Result<Vec<Value>> {
    let mut cursor = ChunkCursor::new(tag, dec.options().uncountable_max_items());
    let mut items = Vec::new();
    while let Some(item) = cursor.next_item(dec)? {
        items.push(item);
    }
    Ok(items)
}
