use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::resource::EnvSignal;
use crate::supabase::SupabaseClient;

/// Probe on an interval and publish reachability.
///
/// Emits [`EnvSignal::Online`] when a probe succeeds after a failed one. The
/// returned receiver holds the latest result, starting optimistic.
pub fn spawn_monitor<F, Fut>(
  period: Duration,
  probe: F,
  signals: broadcast::Sender<EnvSignal>,
  token: CancellationToken,
) -> watch::Receiver<bool>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = bool> + Send + 'static,
{
  let (status_tx, status_rx) = watch::channel(true);

  tokio::spawn(async move {
    let mut ticker = interval(period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      let online = tokio::select! {
        _ = token.cancelled() => break,
        online = async { ticker.tick().await; probe().await } => online,
      };

      let was_online = status_tx.send_replace(online);
      match (was_online, online) {
        (false, true) => {
          tracing::info!("Backend reachable again");
          // No subscribers is fine
          let _ = signals.send(EnvSignal::Online);
        }
        (true, false) => tracing::warn!("Backend unreachable"),
        _ => {}
      }
    }
  });

  status_rx
}

/// Probe for [`spawn_monitor`] backed by the Supabase REST endpoint.
pub fn supabase_probe(
  client: SupabaseClient,
) -> impl Fn() -> futures::future::BoxFuture<'static, bool> + Send + Sync + 'static {
  use futures::FutureExt;

  move || {
    let client = client.clone();
    async move {
      match client.ping().await {
        Ok(()) => true,
        Err(e) => {
          tracing::debug!(error = %e, "Connectivity probe failed");
          false
        }
      }
    }
    .boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use tokio::sync::broadcast::error::TryRecvError;
  use tokio::time::sleep;

  #[tokio::test(start_paused = true)]
  async fn test_online_emitted_on_recovery_only() {
    // up, down, down, up, up...
    let script = [true, false, false, true];
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let (signal_tx, mut signal_rx) = broadcast::channel(8);
    let token = CancellationToken::new();

    let status = spawn_monitor(
      Duration::from_secs(1),
      move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let up = script.get(n).copied().unwrap_or(true);
        async move { up }
      },
      signal_tx,
      token.clone(),
    );

    assert_eq!(signal_rx.recv().await.unwrap(), EnvSignal::Online);
    assert!(*status.borrow());
    assert_eq!(probes.load(Ordering::SeqCst), 4);

    sleep(Duration::from_secs(5)).await;
    assert!(matches!(signal_rx.try_recv(), Err(TryRecvError::Empty)));

    token.cancel();
  }

  #[tokio::test(start_paused = true)]
  async fn test_status_tracks_outage() {
    let (signal_tx, _signal_rx) = broadcast::channel(8);
    let token = CancellationToken::new();

    let mut status = spawn_monitor(
      Duration::from_secs(1),
      || async { false },
      signal_tx,
      token.clone(),
    );

    status.wait_for(|online| !*online).await.unwrap();
    token.cancel();
  }
}
