use foldhash::HashMap;
use parking_lot::RwLock;
use std::{borrow::Borrow, hash::Hash};

/// A map for objects that are created lazily on first use and then shared, such as the indirect
/// command signatures of a pipeline or the repack shaders of the blitter.
///
/// Readers never block each other, except when an entry is vacant. In that case it gets written to
/// once and then never again, entries are immutable after insertion.
#[derive(Debug)]
pub(crate) struct OnceCache<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for OnceCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OnceCache<K, V> {
    /// Creates a new `OnceCache`.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::default()),
        }
    }

    /// Returns the number of entries that were written.
    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Removes and returns every entry, leaving the cache empty.
    pub(crate) fn drain(&self) -> Vec<(K, V)> {
        self.inner.write().drain().collect()
    }
}

impl<K, V> OnceCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns the value for the specified `key`, if it exists.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.read().get(key).cloned()
    }

    /// Returns the value for the specified `key`. The entry gets written to with the key-value
    /// pair returned by `f` if it doesn't exist. If `f` returns [`Err`], the error is
    /// propagated and the entry isn't written to.
    ///
    /// If two threads race on a vacant entry, both run `f` and the first value written wins. The
    /// loser's value is returned to it, so `f` must produce interchangeable values.
    pub(crate) fn get_or_try_insert<Q, E>(
        &self,
        key: &Q,
        f: impl FnOnce() -> Result<(K, V), E>,
    ) -> Result<V, E>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let (key, value) = f()?;

        Ok(self
            .inner
            .write()
            .entry(key)
            .or_insert_with(|| value)
            .clone())
    }
}
