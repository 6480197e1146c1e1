//! Cache layer that orchestrates TTL caching, fallback data and network fetching.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use color_eyre::Result;

use super::storage::CacheStore;
use super::traits::{now_millis, CacheEntry, CacheResult};

type KeyFn<P> = dyn Fn(&P) -> String + Send + Sync;
type FetchFn<P, T> = dyn Fn(P) -> BoxFuture<'static, Result<T>> + Send + Sync;
type FallbackFn<P, T> = dyn Fn(&P) -> T + Send + Sync;
type InFlight<T> = Mutex<HashMap<String, Shared<BoxFuture<'static, CacheResult<T>>>>>;

/// Which stored keys `clear_cache` removes.
#[derive(Debug, Clone)]
pub enum ClearScope {
  /// A single key
  Key(String),
  /// Every key sharing a prefix (one entry per parameterization)
  Prefix(String),
}

/// Static settings of one cached data source.
#[derive(Debug, Clone)]
pub struct CachePolicy {
  /// Service name used in log output
  pub name: &'static str,
  /// How long an entry is served without a remote call
  pub ttl: Duration,
  pub scope: ClearScope,
}

/// Stale-while-fallback fetcher.
///
/// Serves a fresh cache entry when one exists, otherwise calls the remote
/// source once and caches the result. Any remote failure is logged and
/// replaced by the fallback dataset, which is never cached. `fetch` therefore
/// never fails; callers learn the provenance from [`CacheResult::source`].
///
/// Concurrent fetches for the same key share one remote call. That call runs
/// on its own task, so a caller that stops waiting neither cancels it nor
/// leaves it behind for later fetches. Requires a tokio runtime.
pub struct CachedFetcher<P, T> {
  inner: Arc<Inner<P, T>>,
}

struct Inner<P, T> {
  policy: CachePolicy,
  store: Arc<dyn CacheStore>,
  key_fn: Box<KeyFn<P>>,
  fetch_fn: Box<FetchFn<P, T>>,
  fallback_fn: Box<FallbackFn<P, T>>,
  in_flight: InFlight<T>,
}

impl<P, T> CachedFetcher<P, T>
where
  P: Clone + Send + Sync + 'static,
  T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Create a fetcher from its policy and the three domain functions.
  pub fn new<K, F, Fut, B>(
    policy: CachePolicy,
    store: Arc<dyn CacheStore>,
    key_fn: K,
    fetch_fn: F,
    fallback_fn: B,
  ) -> Self
  where
    K: Fn(&P) -> String + Send + Sync + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    B: Fn(&P) -> T + Send + Sync + 'static,
  {
    Self {
      inner: Arc::new(Inner {
        policy,
        store,
        key_fn: Box::new(key_fn),
        fetch_fn: Box::new(move |params| fetch_fn(params).boxed()),
        fallback_fn: Box::new(fallback_fn),
        in_flight: Mutex::new(HashMap::new()),
      }),
    }
  }

  pub fn name(&self) -> &'static str {
    self.inner.policy.name
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh cache entry: return it, no remote call
  /// 2. Otherwise join an in-flight call for the key or start one
  /// 3. Remote success: cache and return
  /// 4. Remote failure: return the fallback dataset
  pub async fn fetch(&self, params: P) -> CacheResult<T> {
    let key = (self.inner.key_fn)(&params);

    if let Some(hit) = self.inner.read_fresh(&key) {
      return hit;
    }

    let shared = {
      let mut in_flight = self
        .inner
        .in_flight
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

      match in_flight.get(&key).cloned() {
        Some(pending) => {
          tracing::debug!(service = self.name(), key = %key, "Joining in-flight fetch");
          pending
        }
        None => {
          // The load runs on its own task so it completes and leaves the
          // registry even when every caller has gone away.
          let inner = Arc::clone(&self.inner);
          let load_key = key.clone();
          let fallback_params = params.clone();
          let handle = tokio::spawn(async move {
            let result = inner.load(&load_key, params).await;
            inner.forget(&load_key);
            result
          });

          let inner = Arc::clone(&self.inner);
          let join_key = key.clone();
          let pending = handle
            .map(move |joined| match joined {
              Ok(result) => result,
              Err(e) => {
                tracing::error!(service = inner.policy.name, error = %e, "Fetch task failed");
                inner.forget(&join_key);
                CacheResult::fallback((inner.fallback_fn)(&fallback_params))
              }
            })
            .boxed()
            .shared();
          in_flight.insert(key, pending.clone());
          pending
        }
      }
    };

    shared.await
  }

  /// Remove every cache entry owned by this fetcher. Idempotent.
  pub fn clear_cache(&self) {
    let inner = &self.inner;
    let outcome = match &inner.policy.scope {
      ClearScope::Key(key) => inner.store.clear(key).map(|_| 1),
      ClearScope::Prefix(prefix) => inner.store.clear_prefix(prefix),
    };

    match outcome {
      Ok(removed) => tracing::debug!(service = inner.policy.name, removed, "Cleared cache"),
      Err(e) => tracing::error!(service = inner.policy.name, error = %e, "Failed to clear cache"),
    }
  }
}

impl<P, T> Inner<P, T>
where
  P: Clone,
  T: Serialize + DeserializeOwned,
{
  /// Return the entry under `key` if it is still within the TTL.
  ///
  /// Expired and unreadable entries are removed and count as a miss.
  fn read_fresh(&self, key: &str) -> Option<CacheResult<T>> {
    let raw = match self.store.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        tracing::warn!(service = self.policy.name, error = %e, "Cache read failed");
        return None;
      }
    };

    match serde_json::from_str::<CacheEntry<T>>(&raw) {
      Ok(entry) if entry.is_fresh(self.policy.ttl, now_millis()) => {
        tracing::debug!(service = self.policy.name, key, "Cache hit");
        let cached_at = entry.written_at();
        Some(CacheResult::from_cache(entry.data, cached_at))
      }
      Ok(_) => {
        tracing::debug!(service = self.policy.name, key, "Cache entry expired");
        self.remove(key);
        None
      }
      Err(e) => {
        tracing::warn!(service = self.policy.name, key, error = %e, "Discarding corrupt cache entry");
        self.remove(key);
        None
      }
    }
  }

  async fn load(&self, key: &str, params: P) -> CacheResult<T> {
    match (self.fetch_fn)(params.clone()).await {
      Ok(data) => {
        self.write(key, &data);
        CacheResult::live(data)
      }
      Err(e) => {
        tracing::warn!(
          service = self.policy.name,
          error = %e,
          "Remote fetch failed, serving fallback data"
        );
        CacheResult::fallback((self.fallback_fn)(&params))
      }
    }
  }

  fn write(&self, key: &str, data: &T) {
    let encoded = match serde_json::to_string(&CacheEntry::new(data)) {
      Ok(encoded) => encoded,
      Err(e) => {
        tracing::error!(service = self.policy.name, error = %e, "Failed to encode cache entry");
        return;
      }
    };

    if let Err(e) = self.store.set(key, &encoded) {
      tracing::error!(service = self.policy.name, error = %e, "Failed to write cache entry");
    }
  }

  fn forget(&self, key: &str) {
    self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(key);
  }

  fn remove(&self, key: &str) {
    if let Err(e) = self.store.clear(key) {
      tracing::warn!(service = self.policy.name, error = %e, "Failed to remove cache entry");
    }
  }
}

impl<P, T> Clone for CachedFetcher<P, T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}
