use std::fmt;
use std::sync::Arc;

use super::Value;

type Producer = dyn Fn() -> Box<dyn Iterator<Item = Value> + Send> + Send + Sync;

/// A sequence whose elements are produced on demand.
///
/// Each call to [`LazySeq::iter`] restarts the sequence from its first
/// element. The producer may return an endless iterator; writing one is
/// bounded by `uncountable_max_items`.
#[derive(Clone)]
pub struct LazySeq(Arc<Producer>);

impl LazySeq {
    pub fn new<F, I>(producer: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = Value> + Send + 'static,
    {
        Self(Arc::new(move || {
            Box::new(producer()) as Box<dyn Iterator<Item = Value> + Send>
        }))
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        let items = Arc::new(items);
        Self::new(move || {
            let items = items.clone();
            (0..items.len()).map(move |i| items[i].clone())
        })
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Value> + Send> {
        (self.0)()
    }
}

/// Lazy sequences compare by identity; comparing contents could run forever.
impl PartialEq for LazySeq {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazySeq(..)")
    }
}
