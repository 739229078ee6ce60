// Async driver for a sync session.
//
// One task owns the session and the view. Inputs, heartbeat ticks and the
// deferred scroll-to-bottom are arms of a single select loop, so the core
// never runs concurrently with itself.

use std::time::Duration;

use chatsync_common::ServerEvent;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::heartbeat::HeartbeatHandle;
use crate::scroll::ScrollAction;
use crate::session::SyncSession;
use crate::transport::ChatTransport;
use crate::view::TranscriptView;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeInput {
    Server(ServerEvent),
    /// The user scrolled the transcript to this offset.
    Scroll { scroll_top: f64 },
    Submit(String),
    /// Manual full refresh.
    Refresh,
    Shutdown,
}

pub struct SessionRuntime<T: ChatTransport, V: TranscriptView> {
    session: SyncSession<T>,
    view: V,
    inputs: mpsc::UnboundedReceiver<RuntimeInput>,
    heartbeat_period: Duration,
}

impl<T: ChatTransport, V: TranscriptView> SessionRuntime<T, V> {
    pub fn new(
        session: SyncSession<T>,
        view: V,
        heartbeat_period: Duration,
    ) -> (Self, mpsc::UnboundedSender<RuntimeInput>) {
        let (tx, inputs) = mpsc::unbounded_channel();
        (Self { session, view, inputs, heartbeat_period }, tx)
    }

    /// Drive the session until `Shutdown` arrives or every input sender is
    /// dropped. A pending deferred scroll is flushed before returning.
    pub async fn run(mut self) -> (SyncSession<T>, V) {
        let (tick_tx, mut ticks) = mpsc::unbounded_channel();
        let heartbeat = HeartbeatHandle::spawn(self.heartbeat_period, tick_tx, ());
        let mut deferred_scroll: Option<Instant> = None;

        info!(heartbeat_ms = self.heartbeat_period.as_millis() as u64, "session runtime started");
        loop {
            let deadline = deferred_scroll.unwrap_or_else(Instant::now);
            tokio::select! {
                input = self.inputs.recv() => {
                    let Some(input) = input else { break };
                    if input == RuntimeInput::Shutdown {
                        break;
                    }
                    if let Some(delay) = self.dispatch(input) {
                        let due = Instant::now() + delay;
                        deferred_scroll = Some(deferred_scroll.map_or(due, |pending| pending.max(due)));
                    }
                }
                Some(()) = ticks.recv() => {
                    if let Err(error) = self.session.heartbeat() {
                        warn!(?error, "heartbeat emit failed");
                    }
                }
                _ = sleep_until(deadline), if deferred_scroll.is_some() => {
                    deferred_scroll = None;
                    self.session.scroll_to_bottom(&mut self.view);
                }
            }
        }

        heartbeat.wait().await;
        if deferred_scroll.is_some() {
            self.session.scroll_to_bottom(&mut self.view);
        }
        self.session.close();
        info!(transcript_len = self.session.transcript().len(), "session runtime stopped");
        (self.session, self.view)
    }

    /// Apply one input. Returns the delay of a scroll-to-bottom to schedule.
    fn dispatch(&mut self, input: RuntimeInput) -> Option<Duration> {
        let result = match input {
            RuntimeInput::Server(event) => {
                let name = event.name();
                match self.session.handle(event, &mut self.view) {
                    Ok(ScrollAction::ScrollToBottomAfter(delay)) => return Some(delay),
                    Ok(_) => Ok(()),
                    Err(error) => Err(error.context(format!("handling `{name}` failed"))),
                }
            }
            RuntimeInput::Scroll { scroll_top } => {
                self.view.set_scroll_top(scroll_top);
                self.session.on_scroll(&mut self.view).map(|_| ())
            }
            RuntimeInput::Submit(text) => self.session.send_message(&text).map(|_| ()),
            RuntimeInput::Refresh => self.session.refresh(),
            RuntimeInput::Shutdown => Ok(()),
        };
        if let Err(error) = result {
            warn!(?error, "session input failed");
        } else {
            debug!("session input applied");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::merge::InsertPlan;
    use crate::scroll::ViewportMetrics;
    use crate::transport::ChannelTransport;
    use crate::view::SimulatedView;
    use chatsync_common::{ClientEvent, Message, RefreshRequest, Timestamp};
    use std::sync::{Arc, Mutex};

    /// Lets a test observe the view while the runtime owns it.
    #[derive(Clone)]
    struct SharedView(Arc<Mutex<SimulatedView>>);

    impl SharedView {
        fn scroll_top(&self) -> f64 {
            self.0.lock().expect("view lock").metrics().scroll_top
        }

        fn max_scroll_top(&self) -> f64 {
            self.0.lock().expect("view lock").metrics().max_scroll_top()
        }
    }

    impl TranscriptView for SharedView {
        fn metrics(&self) -> ViewportMetrics {
            self.0.lock().expect("view lock").metrics()
        }

        fn apply(&mut self, plan: &InsertPlan) {
            self.0.lock().expect("view lock").apply(plan);
        }

        fn set_scroll_top(&mut self, scroll_top: f64) {
            self.0.lock().expect("view lock").set_scroll_top(scroll_top);
        }
    }

    fn history(count: u32) -> Vec<Message> {
        (0..count)
            .map(|i| {
                let ts = Timestamp::new(format!("2024-01-01 {:02}:{:02}:00", 10 + i / 60, i % 60));
                Message::new("bob", format!("m{i}"), ts)
            })
            .collect()
    }

    fn runtime() -> (
        SessionRuntime<ChannelTransport, SharedView>,
        mpsc::UnboundedSender<RuntimeInput>,
        mpsc::UnboundedReceiver<ClientEvent>,
        SharedView,
    ) {
        let config = SyncConfig::default();
        let (transport, outbound) = ChannelTransport::new();
        let view = SharedView(Arc::new(Mutex::new(SimulatedView::new("me", 20.0, 400.0))));
        let session = SyncSession::new(&config, transport);
        let (runtime, tx) = SessionRuntime::new(session, view.clone(), config.heartbeat_interval());
        (runtime, tx, outbound, view)
    }

    #[tokio::test(start_paused = true)]
    async fn history_scrolls_to_bottom_after_settle_delay() {
        let (runtime, tx, _outbound, view) = runtime();
        let task = tokio::spawn(runtime.run());

        tx.send(RuntimeInput::Server(ServerEvent::Connect)).expect("send");
        tx.send(RuntimeInput::Server(ServerEvent::ChatHistory(history(60)))).expect("send");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(view.scroll_top(), 0.0, "scroll waits for layout to settle");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(view.scroll_top(), view.max_scroll_top());

        tx.send(RuntimeInput::Shutdown).expect("send");
        let (session, _view) = task.await.expect("runtime task");
        assert_eq!(session.transcript().len(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_nudges_while_connected() {
        let (runtime, tx, mut outbound, _view) = runtime();
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(outbound.try_recv().is_err(), "no nudge before connect");

        tx.send(RuntimeInput::Server(ServerEvent::Connect)).expect("send");
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(
            outbound.recv().await,
            Some(ClientEvent::RefreshChat(RefreshRequest { limit: 50 }))
        );
        assert_eq!(outbound.recv().await, Some(ClientEvent::CheckNewMessages));

        drop(tx);
        task.await.expect("runtime task");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_scroll() {
        let (runtime, tx, _outbound, view) = runtime();
        let task = tokio::spawn(runtime.run());

        tx.send(RuntimeInput::Server(ServerEvent::Connect)).expect("send");
        tx.send(RuntimeInput::Server(ServerEvent::ChatHistory(history(60)))).expect("send");
        tx.send(RuntimeInput::Shutdown).expect("send");

        let (session, _view) = task.await.expect("runtime task");
        assert_eq!(view.scroll_top(), view.max_scroll_top());
        assert!(session.anchor().auto_follow_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_goes_out_through_transport() {
        let (runtime, tx, mut outbound, _view) = runtime();
        let task = tokio::spawn(runtime.run());

        tx.send(RuntimeInput::Server(ServerEvent::Connect)).expect("send");
        tx.send(RuntimeInput::Submit("  hello ".into())).expect("send");
        tx.send(RuntimeInput::Submit("   ".into())).expect("send");
        drop(tx);
        task.await.expect("runtime task");

        let mut sent = Vec::new();
        while let Ok(event) = outbound.try_recv() {
            sent.push(event);
        }
        assert_eq!(
            sent,
            vec![
                ClientEvent::RefreshChat(RefreshRequest { limit: 50 }),
                ClientEvent::SendMessage("hello".into()),
            ]
        );
    }
}
