use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
};

use anyhow::Result;

/// Interface for abstracting the durable byte store the habit collection is written into.
/// Missing keys are `Ok(None)`; errors are reserved for the store itself failing.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

impl<T: DerefMut> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.deref().get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.deref_mut().set(key, value)
    }
}

/// Store that only lives as long as the process. Used by tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.values.insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{KeyValueStore, MemoryStore};

    #[test]
    fn test_memory_store_basic() -> Result<()> {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("habits")?, None);

        store.set("habits", b"[]")?;
        assert_eq!(store.get("habits")?, Some(b"[]".to_vec()));

        store.set("habits", b"[1]")?;
        assert_eq!(store.get_str("habits"), Some("[1]"));
        Ok(())
    }

    #[test]
    fn test_store_through_box() -> Result<()> {
        let mut store: Box<MemoryStore> = Box::default();
        KeyValueStore::set(&mut store, "key", b"value")?;
        assert_eq!(KeyValueStore::get(&store, "key")?, Some(b"value".to_vec()));
        Ok(())
    }
}
