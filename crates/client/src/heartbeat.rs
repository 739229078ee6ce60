// Periodic "check for new messages" ticker.
//
// The ticker never touches the session directly. It pushes a tick value into
// the same channel the runtime already drains, so heartbeats are serialized
// with every other input.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub struct HeartbeatHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatHandle {
    /// Start ticking. The first tick fires one full `period` from now.
    pub fn spawn<M>(period: Duration, tx: mpsc::UnboundedSender<M>, tick: M) -> Self
    where
        M: Clone + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        if tx.send(tick.clone()).is_err() {
                            debug!("heartbeat receiver dropped, stopping");
                            break;
                        }
                    }
                }
            }
        });
        Self { shutdown_tx, task: Some(task) }
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub async fn wait(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
