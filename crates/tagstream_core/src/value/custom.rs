use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A caller-defined type that can travel inside a [`Value`](super::Value).
///
/// Implemented for every `Debug + PartialEq` type that is `Send + Sync`
/// and `'static`; there is normally no reason to implement it by hand.
pub trait CustomValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &(dyn Any + 'static);

    fn type_name(&self) -> &'static str;

    fn eq_dyn(&self, other: &dyn CustomValue) -> bool;
}

impl<T> CustomValue for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &(dyn Any + 'static) {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn eq_dyn(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Shared handle to a [`CustomValue`].
#[derive(Clone)]
pub struct Custom(Arc<dyn CustomValue>);

impl Custom {
    pub fn new<T: CustomValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn as_any(&self) -> &(dyn Any + 'static) {
        (*self.0).as_any()
    }

    /// Type id of the wrapped value, not of the handle.
    pub fn type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.eq_dyn(&*other.0)
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
