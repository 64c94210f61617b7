use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown store key `{0}`")]
    UnknownKey(String),

    #[error("store key `{key}` expects a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },
}

/// State held by a [`Store`](super::Store): a value with string-keyed fields.
///
/// Struct states implement this by hand, matching on field names and
/// converting from a shared value enum. Map states get it for free.
pub trait StoreState: Clone + 'static {
    type Value: Clone;

    fn get(&self, key: &str) -> Option<Self::Value>;

    fn set(&mut self, key: &str, value: Self::Value) -> Result<(), StoreError>;
}

impl<V: Clone + 'static> StoreState for HashMap<String, V> {
    type Value = V;

    fn get(&self, key: &str) -> Option<V> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: V) -> Result<(), StoreError> {
        self.insert(key.to_owned(), value);
        Ok(())
    }
}

impl<V: Clone + 'static> StoreState for BTreeMap<String, V> {
    type Value = V;

    fn get(&self, key: &str) -> Option<V> {
        BTreeMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: V) -> Result<(), StoreError> {
        self.insert(key.to_owned(), value);
        Ok(())
    }
}
