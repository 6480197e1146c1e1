//! Observable fetch state around a data service.
//!
//! A [`Resource`] owns one background task that runs fetch cycles and publishes
//! [`FetchState`] through a watch channel. Cycles start on creation (when
//! `auto_fetch` is set), on explicit [`Resource::refetch`], and on the optional
//! interval and environment triggers. At most one cycle runs at a time; requests
//! made while a cycle is running join it.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, Fuse, FusedFuture, FutureExt};
use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheResult, CacheSource};

#[derive(Debug, Clone)]
pub struct ResourceOptions {
  /// Fetch on creation and honour the automatic triggers
  pub auto_fetch: bool,
  pub refetch_interval: Option<Duration>,
  /// Clear the service cache before every refetch
  pub enable_cache: bool,
  pub refetch_on_focus: bool,
  pub refetch_on_reconnect: bool,
}

impl Default for ResourceOptions {
  fn default() -> Self {
    Self {
      auto_fetch: true,
      refetch_interval: None,
      enable_cache: true,
      refetch_on_focus: false,
      refetch_on_reconnect: false,
    }
  }
}

/// Environment changes that may trigger a refetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSignal {
  /// Terminal regained focus
  Focus,
  /// Backend became reachable again
  Online,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
  pub loading: bool,
  /// Message of the last failed cycle; cleared by the next success
  pub error: Option<String>,
  pub data: T,
  /// Where `data` came from, when the loader reports it
  pub source: Option<CacheSource>,
}

impl<T: Default> Default for FetchState<T> {
  fn default() -> Self {
    Self {
      loading: false,
      error: None,
      data: T::default(),
      source: None,
    }
  }
}

/// Output of one successful load.
pub struct Loaded<T> {
  pub data: T,
  pub source: Option<CacheSource>,
}

impl<T> From<CacheResult<T>> for Loaded<T> {
  fn from(result: CacheResult<T>) -> Self {
    Self {
      data: result.data,
      source: Some(result.source),
    }
  }
}

type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Loaded<T>>> + Send + Sync>;
type CacheClear = Arc<dyn Fn() + Send + Sync>;
type Cycle<T> = Fuse<BoxFuture<'static, Result<Loaded<T>>>>;

/// Handle to a running fetch task. Dropping it cancels the task.
pub struct Resource<T> {
  state: watch::Receiver<FetchState<T>>,
  commands: mpsc::UnboundedSender<oneshot::Sender<()>>,
  token: CancellationToken,
}

impl<T> Resource<T>
where
  T: Clone + Default + Send + Sync + 'static,
{
  /// Spawn the fetch task. Must be called within a tokio runtime.
  ///
  /// `signals` feeds the focus/reconnect triggers; `clear_cache` runs before
  /// each refetch when `enable_cache` is set.
  pub fn spawn<F, Fut, C>(
    options: ResourceOptions,
    signals: Option<broadcast::Receiver<EnvSignal>>,
    loader: F,
    clear_cache: C,
  ) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Loaded<T>>> + Send + 'static,
    C: Fn() + Send + Sync + 'static,
  {
    let initial = FetchState {
      loading: options.auto_fetch,
      ..FetchState::default()
    };
    let (state_tx, state_rx) = watch::channel(initial);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();

    let worker = Worker {
      options,
      loader: Arc::new(move || loader().boxed()),
      clear_cache: Arc::new(clear_cache),
      state: state_tx,
      token: token.clone(),
    };
    tokio::spawn(worker.run(command_rx, signals));

    Self {
      state: state_rx,
      commands: command_tx,
      token,
    }
  }

  /// Resource over a fetch that never fails, such as a cached data service.
  pub fn from_cached<F, Fut, C>(
    options: ResourceOptions,
    signals: Option<broadcast::Receiver<EnvSignal>>,
    fetch: F,
    clear_cache: C,
  ) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CacheResult<T>> + Send + 'static,
    C: Fn() + Send + Sync + 'static,
  {
    Self::spawn(
      options,
      signals,
      move || fetch().map(|result| Ok::<_, color_eyre::Report>(Loaded::from(result))),
      clear_cache,
    )
  }

  /// Snapshot of the current state.
  pub fn state(&self) -> FetchState<T> {
    self.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
    self.state.clone()
  }

  /// Run a fetch cycle (clearing the cache first when enabled) and wait for it.
  ///
  /// Joins the running cycle if there is one.
  pub async fn refetch(&self) -> Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    self
      .commands
      .send(done_tx)
      .map_err(|_| eyre!("Resource task has stopped"))?;
    done_rx
      .await
      .map_err(|_| eyre!("Resource cancelled before the fetch finished"))
  }

  /// Request a refetch without waiting for it.
  pub fn request_refetch(&self) {
    let (done_tx, _) = oneshot::channel();
    if self.commands.send(done_tx).is_err() {
      tracing::debug!("Refetch requested on a stopped resource");
    }
  }
}

impl<T> Resource<T> {
  /// Stop the task. A running cycle is abandoned and never reaches the state;
  /// subscribers see `loading` drop back to false.
  pub fn cancel(&self) {
    self.token.cancel();
  }
}

impl<T> Drop for Resource<T> {
  fn drop(&mut self) {
    self.cancel();
  }
}

struct Worker<T> {
  options: ResourceOptions,
  loader: Loader<T>,
  clear_cache: CacheClear,
  state: watch::Sender<FetchState<T>>,
  token: CancellationToken,
}

impl<T> Worker<T>
where
  T: Send + Sync + 'static,
{
  async fn run(
    self,
    mut commands: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    mut signals: Option<broadcast::Receiver<EnvSignal>>,
  ) {
    let mut ticker = self
      .options
      .refetch_interval
      .filter(|period| self.options.auto_fetch && !period.is_zero())
      .map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
      });

    let mut cycle: Cycle<T> = Fuse::terminated();
    let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();

    if self.options.auto_fetch {
      cycle = self.start_cycle(false);
    }

    loop {
      tokio::select! {
        biased;

        _ = self.token.cancelled() => break,

        command = commands.recv() => match command {
          Some(done) => {
            waiters.push(done);
            if cycle.is_terminated() {
              cycle = self.start_cycle(true);
            }
          }
          None => break,
        },

        result = &mut cycle, if !cycle.is_terminated() => {
          self.finish(result);
          for done in waiters.drain(..) {
            let _ = done.send(());
          }
        }

        _ = next_tick(&mut ticker) => {
          if cycle.is_terminated() {
            tracing::debug!("Interval refetch");
            cycle = self.start_cycle(true);
          }
        }

        signal = next_signal(&mut signals) => match signal {
          Some(signal) if self.wants(signal) && cycle.is_terminated() => {
            tracing::debug!(?signal, "Environment refetch");
            cycle = self.start_cycle(true);
          }
          Some(_) => {}
          None => signals = None,
        },
      }
    }

    // A cycle abandoned here never finishes, so subscribers must not keep
    // seeing it as loading. Data and error stay as they were.
    self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    tracing::debug!("Resource task stopped");
  }

  fn wants(&self, signal: EnvSignal) -> bool {
    self.options.auto_fetch
      && match signal {
        EnvSignal::Focus => self.options.refetch_on_focus,
        EnvSignal::Online => self.options.refetch_on_reconnect,
      }
  }

  fn start_cycle(&self, refetch: bool) -> Cycle<T> {
    if refetch && self.options.enable_cache {
      (self.clear_cache)();
    }
    self.state.send_modify(|state| state.loading = true);
    (self.loader)().fuse()
  }

  fn finish(&self, result: Result<Loaded<T>>) {
    if self.token.is_cancelled() {
      return;
    }

    self.state.send_modify(|state| {
      state.loading = false;
      match result {
        Ok(loaded) => {
          state.data = loaded.data;
          state.source = loaded.source;
          state.error = None;
        }
        Err(e) => {
          // Previous data stays visible
          tracing::warn!(error = %e, "Fetch cycle failed");
          state.error = Some(e.to_string());
        }
      }
    });
  }
}

async fn next_tick(ticker: &mut Option<Interval>) {
  match ticker {
    Some(ticker) => {
      ticker.tick().await;
    }
    None => pending().await,
  }
}

/// Next signal, or None once the sender is gone.
async fn next_signal(signals: &mut Option<broadcast::Receiver<EnvSignal>>) -> Option<EnvSignal> {
  let Some(rx) = signals else {
    return pending().await;
  };
  loop {
    match rx.recv().await {
      Ok(signal) => return Some(signal),
      Err(RecvError::Lagged(skipped)) => {
        tracing::debug!(skipped, "Missed environment signals");
      }
      Err(RecvError::Closed) => return None,
    }
  }
}
