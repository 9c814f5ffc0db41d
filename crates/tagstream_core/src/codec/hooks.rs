//! Extension points for types the tag table does not cover.
//!
//! Hooks are injected per encoder or decoder at construction; there is no
//! process-wide registry.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::dec::Decoder;
use super::enc::Encoder;
use super::err::{Error, Result};
use super::tags::{self, Tag};
use crate::value::Value;

/// Writes one caller-defined value, tag included.
pub type EncodeFn = dyn Fn(&(dyn Any + 'static), &mut Encoder<'_>) -> Result<()> + Send + Sync;

/// Best-effort encoding; returns `false` to decline the value.
pub type FallbackFn = dyn Fn(&Value, &mut Encoder<'_>) -> Result<bool> + Send + Sync;

/// Reads the payload of one external tag. The tag is already consumed.
pub type DecodeFn = dyn Fn(Tag, &mut Decoder<'_>) -> Result<Value> + Send + Sync;

fn encode_fn<F>(f: F) -> Box<EncodeFn>
where
    F: Fn(&(dyn Any + 'static), &mut Encoder<'_>) -> Result<()> + Send + Sync + 'static,
{
    Box::new(f)
}

/// The default fallback: an `UNSUPPORTED` record of the type name and the
/// `Debug` text of the value.
pub fn write_unsupported(value: &Value, enc: &mut Encoder<'_>) -> Result<bool> {
    let repr = match value {
        Value::Custom(custom) => format!("{custom:?}"),
        other => format!("{other:?}"),
    };
    enc.write_tag(tags::UNSUPPORTED)?;
    enc.write_text(value.type_name())?;
    enc.write_text(&repr)?;
    Ok(true)
}

/// Encode strategies keyed by the runtime type of a [`Value::Custom`].
pub struct EncodeHooks {
    by_type: HashMap<TypeId, Box<EncodeFn>>,
    fallback: Option<Box<FallbackFn>>,
}

impl Default for EncodeHooks {
    /// No registered types; [`write_unsupported`] as the fallback.
    fn default() -> Self {
        Self {
            by_type: HashMap::new(),
            fallback: Some(Box::new(write_unsupported)),
        }
    }
}

impl EncodeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the strategy for custom values of type `T`, replacing any
    /// earlier one.
    pub fn register<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T, &mut Encoder<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let hook = encode_fn(move |value, enc| match value.downcast_ref::<T>() {
            Some(value) => f(value, enc),
            None => Err(Error::TypeMismatch {
                expected: type_name::<T>(),
                actual: "another custom type".into(),
            }),
        });
        self.by_type.insert(TypeId::of::<T>(), hook);
        self
    }

    pub fn fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &mut Encoder<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(f));
        self
    }

    /// Removes the fallback, so unregistered custom values fail.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub(crate) fn encoder_for(&self, type_id: TypeId) -> Option<&EncodeFn> {
        self.by_type.get(&type_id).map(|hook| &**hook)
    }

    pub(crate) fn fallback_fn(&self) -> Option<&FallbackFn> {
        self.fallback.as_deref()
    }
}

impl fmt::Debug for EncodeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeHooks")
            .field("types", &self.by_type.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Decode strategies keyed by external tag.
#[derive(Default)]
pub struct DecodeHooks {
    by_tag: HashMap<Tag, Box<DecodeFn>>,
}

impl DecodeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the strategy for `tag`. Only tags in
    /// [`EXTERNAL_RANGE`](tags::EXTERNAL_RANGE) can be registered.
    pub fn register<F>(mut self, tag: Tag, f: F) -> Result<Self>
    where
        F: Fn(Tag, &mut Decoder<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        if !tags::is_external(tag) {
            return Err(Error::Config(format!(
                "{} is outside the external tag range {:?}",
                tags::describe(tag),
                tags::EXTERNAL_RANGE
            )));
        }
        self.by_tag.insert(tag, Box::new(f));
        Ok(self)
    }

    pub(crate) fn decoder_for(&self, tag: Tag) -> Option<&DecodeFn> {
        self.by_tag.get(&tag).map(|hook| &**hook)
    }
}

impl fmt::Debug for DecodeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.by_tag.keys().collect();
        tags.sort();
        f.debug_struct("DecodeHooks").field("tags", &tags).finish()
    }
}
