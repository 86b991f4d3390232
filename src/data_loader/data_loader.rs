use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_channel::oneshot;
use futures_timer::Delay;
use futures_util::future::BoxFuture;

use super::cache::{CacheFactory, CacheStorage, NoCache};
use super::loader::Loader;

struct ResSender<K, L>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
{
  use_cache_values: HashMap<K, L::Value>,
  tx: oneshot::Sender<Result<HashMap<K, L::Value>, L::Error>>,
}

type KeysAndSender<K, L> = (HashSet<K>, Vec<(HashSet<K>, ResSender<K, L>)>);

struct Requests<K, L, C>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  keys: HashSet<K>,
  pending: Vec<(HashSet<K>, ResSender<K, L>)>,
  cache_storage: C::Storage,
  disable_cache: bool,
}

impl<K, L, C> Requests<K, L, C>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  fn new(cache_factory: &C) -> Self {
    Self {
      keys: HashSet::new(),
      pending: Vec::new(),
      cache_storage: cache_factory.create(),
      disable_cache: false,
    }
  }

  fn take(&mut self) -> KeysAndSender<K, L> {
    (std::mem::take(&mut self.keys), std::mem::take(&mut self.pending))
  }
}

struct DataLoaderInner<K, L, C>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  requests: Mutex<Requests<K, L, C>>,
  loader: L,
}

impl<K, L, C> DataLoaderInner<K, L, C>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  async fn do_load(&self, (keys, senders): KeysAndSender<K, L>) {
    let keys = keys.into_iter().collect::<Vec<_>>();
    tracing::debug!(keys = keys.len(), waiters = senders.len(), "dispatching batch");

    match self.loader.load(&keys).await {
      Ok(values) => {
        {
          let mut requests = self.requests.lock().unwrap();
          if !requests.disable_cache {
            for (key, value) in &values {
              requests.cache_storage.insert(key.clone(), value.clone());
            }
          }
        }

        for (keys, sender) in senders {
          let mut res = sender.use_cache_values;
          for key in &keys {
            if let Some(value) = values.get(key) {
              res.insert(key.clone(), value.clone());
            }
          }
          let _ = sender.tx.send(Ok(res));
        }
      }
      Err(err) => {
        for (_, sender) in senders {
          let _ = sender.tx.send(Err(err.clone()));
        }
      }
    }
  }
}

/// Data loader.
///
/// Coalesces the keys of every `load_one`/`load_many` call issued within one
/// dispatch window into a single [Loader::load] call, deduplicating keys and
/// serving already-cached keys without a refetch.
///
/// Reference: <https://github.com/facebook/dataloader>
pub struct DataLoader<K, L, C = NoCache>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  inner: Arc<DataLoaderInner<K, L, C>>,
  delay: Duration,
  max_batch_size: usize,
  spawner: Box<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>,
}

impl<K, L> DataLoader<K, L, NoCache>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
{
  /// Use `Loader` to create a [DataLoader] that does not cache records.
  pub fn new<S, R>(loader: L, spawner: S) -> Self
  where
    S: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
  {
    Self::with_cache(loader, spawner, NoCache)
  }
}

impl<K, L, C> DataLoader<K, L, C>
where
  K: Send + Sync + Hash + Eq + Clone + 'static,
  L: Loader<K>,
  C: CacheFactory<K, L::Value>,
{
  /// Use `Loader` to create a [DataLoader] with a cache factory.
  pub fn with_cache<S, R>(loader: L, spawner: S, cache_factory: C) -> Self
  where
    S: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
  {
    Self {
      inner: Arc::new(DataLoaderInner {
        requests: Mutex::new(Requests::new(&cache_factory)),
        loader,
      }),
      delay: Duration::from_millis(1),
      max_batch_size: 1000,
      spawner: Box::new(move |fut| {
        spawner(fut);
      }),
    }
  }

  /// Specify the dispatch window, the default is `1ms`.
  #[must_use]
  pub fn delay(self, delay: Duration) -> Self {
    Self { delay, ..self }
  }

  /// Specify the max batch size for loading data, the default is `1000`.
  ///
  /// If the keys waiting to be loaded reach the threshold, they are loaded
  /// immediately.
  #[must_use]
  pub fn max_batch_size(self, max_batch_size: usize) -> Self {
    Self { max_batch_size, ..self }
  }

  /// Get the loader.
  #[inline]
  pub fn loader(&self) -> &L {
    &self.inner.loader
  }

  /// Enable/Disable the cache of this loader.
  pub fn enable_cache(&self, enable: bool) {
    let mut requests = self.inner.requests.lock().unwrap();
    requests.disable_cache = !enable;
  }

  /// Use this `DataLoader` to load one record.
  pub async fn load_one(&self, key: K) -> Result<Option<L::Value>, L::Error> {
    let mut values = self.load_many(std::iter::once(key.clone())).await?;
    Ok(values.remove(&key))
  }

  /// Use this `DataLoader` to load some records.
  pub async fn load_many<I>(&self, keys: I) -> Result<HashMap<K, L::Value>, L::Error>
  where
    I: IntoIterator<Item = K>,
  {
    enum Action<K: Send + Sync + Hash + Eq + Clone + 'static, L: Loader<K>> {
      ImmediateLoad(KeysAndSender<K, L>),
      StartFetch,
      Delay,
    }

    let (action, rx) = {
      let mut requests = self.inner.requests.lock().unwrap();
      let prev_count = requests.keys.len();
      let mut keys_set = HashSet::new();
      let mut use_cache_values = HashMap::new();

      if requests.disable_cache {
        keys_set = keys.into_iter().collect();
      } else {
        for key in keys {
          if let Some(value) = requests.cache_storage.get(&key) {
            // Already in cache
            use_cache_values.insert(key.clone(), value.clone());
          } else {
            keys_set.insert(key);
          }
        }
      }

      if keys_set.is_empty() {
        return Ok(use_cache_values);
      }

      requests.keys.extend(keys_set.iter().cloned());
      let (tx, rx) = oneshot::channel();
      requests.pending.push((keys_set, ResSender { use_cache_values, tx }));

      if requests.keys.len() >= self.max_batch_size {
        (Action::ImmediateLoad(requests.take()), rx)
      } else if prev_count == 0 {
        (Action::StartFetch, rx)
      } else {
        (Action::Delay, rx)
      }
    };

    match action {
      Action::ImmediateLoad(keys) => {
        let inner = self.inner.clone();
        (self.spawner)(Box::pin(async move { inner.do_load(keys).await }));
      }
      Action::StartFetch => {
        let inner = self.inner.clone();
        let delay = self.delay;
        (self.spawner)(Box::pin(async move {
          Delay::new(delay).await;

          let keys = {
            let mut requests = inner.requests.lock().unwrap();
            requests.take()
          };

          if !keys.0.is_empty() {
            inner.do_load(keys).await
          }
        }));
      }
      Action::Delay => {}
    }

    rx.await.unwrap()
  }

  /// Feed some data into the cache.
  ///
  /// **NOTE: If the cache type is [NoCache], this function will not take
  /// effect.**
  pub async fn feed_many<I>(&self, values: I)
  where
    I: IntoIterator<Item = (K, L::Value)>,
  {
    let mut requests = self.inner.requests.lock().unwrap();
    for (key, value) in values {
      requests.cache_storage.insert(key, value);
    }
  }

  /// Feed one record into the cache.
  ///
  /// **NOTE: If the cache type is [NoCache], this function will not take
  /// effect.**
  pub async fn feed_one(&self, key: K, value: L::Value) {
    self.feed_many(std::iter::once((key, value))).await;
  }

  /// Clears the cache.
  ///
  /// **NOTE: If the cache type is [NoCache], this function will not take
  /// effect.**
  pub fn clear(&self) {
    let mut requests = self.inner.requests.lock().unwrap();
    requests.cache_storage.clear();
  }

  /// Gets all values in the cache.
  pub fn get_cached_values(&self) -> HashMap<K, L::Value> {
    let requests = self.inner.requests.lock().unwrap();
    requests
      .cache_storage
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use futures_util::future::join_all;

  use super::*;
  use crate::data_loader::HashMapCache;

  struct CountingLoader {
    load_calls: Arc<AtomicUsize>,
  }

  #[async_trait::async_trait]
  impl Loader<u64> for CountingLoader {
    type Value = u64;
    type Error = String;

    async fn load(&self, keys: &[u64]) -> Result<HashMap<u64, Self::Value>, Self::Error> {
      self.load_calls.fetch_add(1, Ordering::SeqCst);
      Ok(keys.iter().map(|key| (*key, key * 10)).collect())
    }
  }

  struct FailingLoader;

  #[async_trait::async_trait]
  impl Loader<u64> for FailingLoader {
    type Value = u64;
    type Error = String;

    async fn load(&self, _keys: &[u64]) -> Result<HashMap<u64, Self::Value>, Self::Error> {
      Err("backend unavailable".to_string())
    }
  }

  #[tokio::test]
  async fn coalesces_concurrent_calls_into_one_batch() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::new(CountingLoader { load_calls: load_calls.clone() }, tokio::spawn);

    let futures: Vec<_> = (0..100).map(|_| loader.load_one(7)).collect();
    let results = join_all(futures).await;

    assert_eq!(load_calls.load(Ordering::SeqCst), 1);
    for result in results {
      assert_eq!(result.unwrap(), Some(70));
    }
  }

  #[tokio::test]
  async fn load_many_returns_every_requested_key() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::new(CountingLoader { load_calls }, tokio::spawn);

    let values = loader.load_many(vec![1, 2, 3]).await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[&2], 20);
  }

  #[tokio::test]
  async fn cached_keys_are_not_refetched() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::with_cache(
      CountingLoader { load_calls: load_calls.clone() },
      tokio::spawn,
      HashMapCache::new(),
    );

    assert_eq!(loader.load_one(3).await.unwrap(), Some(30));
    assert_eq!(loader.load_one(3).await.unwrap(), Some(30));
    assert_eq!(load_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn disabled_cache_refetches() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::with_cache(
      CountingLoader { load_calls: load_calls.clone() },
      tokio::spawn,
      HashMapCache::new(),
    );
    loader.enable_cache(false);

    loader.load_one(3).await.unwrap();
    loader.load_one(3).await.unwrap();
    assert_eq!(load_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn max_batch_size_flushes_immediately() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::new(CountingLoader { load_calls: load_calls.clone() }, tokio::spawn)
      .max_batch_size(2)
      .delay(Duration::from_secs(60));

    let values = loader.load_many(vec![1, 2]).await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(load_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn batch_error_reaches_every_waiter() {
    let loader = DataLoader::new(FailingLoader, tokio::spawn);

    let results = join_all([loader.load_one(1), loader.load_one(2)]).await;
    for result in results {
      assert_eq!(result.unwrap_err(), "backend unavailable");
    }
  }

  #[tokio::test]
  async fn lru_cache_evicts_least_recently_used_keys() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::with_cache(
      CountingLoader { load_calls: load_calls.clone() },
      tokio::spawn,
      crate::data_loader::LruCache::new(1),
    );

    loader.load_one(1).await.unwrap();
    loader.load_one(2).await.unwrap();
    assert_eq!(loader.load_one(1).await.unwrap(), Some(10));
    assert_eq!(load_calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn feed_primes_the_cache() {
    let load_calls = Arc::new(AtomicUsize::new(0));
    let loader = DataLoader::with_cache(
      CountingLoader { load_calls: load_calls.clone() },
      tokio::spawn,
      HashMapCache::new(),
    );

    loader.feed_one(9, 900).await;
    assert_eq!(loader.load_one(9).await.unwrap(), Some(900));
    assert_eq!(load_calls.load(Ordering::SeqCst), 0);

    loader.clear();
    assert_eq!(loader.load_one(9).await.unwrap(), Some(90));
    assert_eq!(load_calls.load(Ordering::SeqCst), 1);
    assert_eq!(loader.get_cached_values()[&9], 90);
  }
}
