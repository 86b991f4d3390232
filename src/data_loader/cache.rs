use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::num::NonZeroUsize;

/// Creates the per-loader cache storage for a
/// [DataLoader](super::DataLoader).
pub trait CacheFactory<K, V>: Send + Sync + 'static
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Storage: CacheStorage<Key = K, Value = V>;

  fn create(&self) -> Self::Storage;
}

/// Cache storage for a [DataLoader](super::DataLoader).
pub trait CacheStorage: Send + Sync + 'static {
  /// The key type of the record.
  type Key: Send + Sync + Clone + Eq + Hash + 'static;

  /// The value type of the record.
  type Value: Send + Sync + Clone + 'static;

  /// Returns a reference to the value of the key in the cache or None if it
  /// is not present in the cache.
  fn get(&mut self, key: &Self::Key) -> Option<&Self::Value>;

  /// Puts a key-value pair into the cache. If the key already exists in the
  /// cache, then it updates the key's value.
  fn insert(&mut self, key: Self::Key, value: Self::Value);

  /// Removes the value corresponding to the key from the cache.
  fn remove(&mut self, key: &Self::Key);

  /// Clears the cache, removing all key-value pairs.
  fn clear(&mut self);

  /// Returns an iterator over the key-value pairs in the cache.
  fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_>;
}

/// No cache.
pub struct NoCache;

impl<K, V> CacheFactory<K, V> for NoCache
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Storage = NoCacheImpl<K, V>;

  fn create(&self) -> Self::Storage {
    NoCacheImpl { _mark: PhantomData }
  }
}

pub struct NoCacheImpl<K, V> {
  _mark: PhantomData<(K, V)>,
}

impl<K, V> CacheStorage for NoCacheImpl<K, V>
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Key = K;
  type Value = V;

  #[inline]
  fn get(&mut self, _key: &K) -> Option<&V> {
    None
  }

  #[inline]
  fn insert(&mut self, _key: K, _value: V) {}

  #[inline]
  fn remove(&mut self, _key: &K) {}

  #[inline]
  fn clear(&mut self) {}

  fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_> {
    Box::new(std::iter::empty())
  }
}

/// [std::collections::HashMap] cache.
#[derive(Default)]
pub struct HashMapCache;

impl HashMapCache {
  pub fn new() -> Self {
    Self
  }
}

impl<K, V> CacheFactory<K, V> for HashMapCache
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Storage = HashMapCacheImpl<K, V>;

  fn create(&self) -> Self::Storage {
    HashMapCacheImpl(HashMap::new())
  }
}

pub struct HashMapCacheImpl<K, V>(HashMap<K, V>);

impl<K, V> CacheStorage for HashMapCacheImpl<K, V>
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Key = K;
  type Value = V;

  #[inline]
  fn get(&mut self, key: &Self::Key) -> Option<&Self::Value> {
    self.0.get(key)
  }

  #[inline]
  fn insert(&mut self, key: Self::Key, value: Self::Value) {
    self.0.insert(key, value);
  }

  #[inline]
  fn remove(&mut self, key: &Self::Key) {
    self.0.remove(key);
  }

  #[inline]
  fn clear(&mut self) {
    self.0.clear();
  }

  fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_> {
    Box::new(self.0.iter())
  }
}

/// LRU cache.
pub struct LruCache {
  cap: usize,
}

impl LruCache {
  /// Creates a new LRU cache that holds at most `cap` records.
  pub fn new(cap: usize) -> Self {
    Self { cap }
  }
}

impl<K, V> CacheFactory<K, V> for LruCache
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Storage = LruCacheImpl<K, V>;

  fn create(&self) -> Self::Storage {
    LruCacheImpl(lru::LruCache::new(NonZeroUsize::new(self.cap).unwrap()))
  }
}

pub struct LruCacheImpl<K: Hash + Eq, V>(lru::LruCache<K, V>);

impl<K, V> CacheStorage for LruCacheImpl<K, V>
where
  K: Send + Sync + Clone + Eq + Hash + 'static,
  V: Send + Sync + Clone + 'static,
{
  type Key = K;
  type Value = V;

  #[inline]
  fn get(&mut self, key: &Self::Key) -> Option<&Self::Value> {
    self.0.get(key)
  }

  #[inline]
  fn insert(&mut self, key: Self::Key, value: Self::Value) {
    self.0.put(key, value);
  }

  #[inline]
  fn remove(&mut self, key: &Self::Key) {
    self.0.pop(key);
  }

  #[inline]
  fn clear(&mut self) {
    self.0.clear();
  }

  fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_> {
    Box::new(self.0.iter())
  }
}
