use std::collections::HashMap;
use std::hash::Hash;

/// Trait for batch loading.
///
/// Implementations receive every distinct key accumulated during one dispatch
/// window and resolve them with as few upstream reads as possible. A key with
/// no corresponding entry in the returned map is reported to callers as
/// missing, so loaders that need an explicit per-key error should use a
/// `Result` as their `Value`.
#[async_trait::async_trait]
pub trait Loader<K: Send + Sync + Hash + Eq + Clone + 'static>: Send + Sync + 'static {
  /// Type of the resolved value.
  type Value: Send + Sync + Clone + 'static;

  /// Type of the batch-level error, fanned out to every waiter.
  type Error: Send + Clone + 'static;

  /// Load the data set specified by the `keys`.
  async fn load(&self, keys: &[K]) -> Result<HashMap<K, Self::Value>, Self::Error>;
}
