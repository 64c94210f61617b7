use super::computed::Computed;
use super::error::ReactiveError;
use super::runtime::Runtime;
use super::signal::Signal;

/// Common read/write surface over signals and computeds.
///
/// Collaborators that only need "something reactive holding a `T`", such as
/// panel bindings, take this instead of a concrete type.
pub trait ReactiveValue<T>: Clone + 'static {
    /// Tracked read.
    fn get(&self) -> T;

    /// Writes the value, or fails if the accessor is read-only.
    fn try_set(&self, value: T) -> Result<(), ReactiveError>;

    fn runtime(&self) -> &Runtime;
}

impl<T: Clone + 'static> ReactiveValue<T> for Signal<T> {
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn try_set(&self, value: T) -> Result<(), ReactiveError> {
        self.set(value);
        Ok(())
    }

    fn runtime(&self) -> &Runtime {
        Signal::runtime(self)
    }
}

impl<T: Clone + PartialEq + 'static> ReactiveValue<T> for Computed<T> {
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn try_set(&self, _value: T) -> Result<(), ReactiveError> {
        Err(ReactiveError::Misuse("computed values are read-only"))
    }

    fn runtime(&self) -> &Runtime {
        Computed::runtime(self)
    }
}
