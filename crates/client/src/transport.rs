// Outbound half of the event channel.
//
// Inbound events are pushed into the session by whoever owns the socket, so
// the session only needs a way to emit.

use anyhow::{anyhow, Result};
use chatsync_common::ClientEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Abstraction over the outbound event channel for testability.
pub trait ChatTransport {
    /// Send one client event to the server.
    fn emit(&mut self, event: &ClientEvent) -> Result<()>;

    /// Release the underlying connection.
    fn close(&mut self) {}
}

/// Transport that forwards events into an in-process channel. The receiving
/// end is owned by a socket writer task, or by a test.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }
}

impl ChatTransport for ChannelTransport {
    fn emit(&mut self, event: &ClientEvent) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| anyhow!("transport is closed"))?;
        tx.send(event.clone())
            .map_err(|_| anyhow!("event receiver dropped before `{}`", event.name()))?;
        debug!(event = event.name(), "client event emitted");
        Ok(())
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

/// Transport that records everything it is asked to emit.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub sent: Vec<ClientEvent>,
    /// When set, `emit` fails with this message and records nothing.
    pub fail_with: Option<String>,
    pub closed: bool,
}

impl RecordingTransport {
    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), ..Default::default() }
    }

    /// Names of the recorded events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.sent.iter().map(ClientEvent::name).collect()
    }

    pub fn take(&mut self) -> Vec<ClientEvent> {
        std::mem::take(&mut self.sent)
    }
}

impl ChatTransport for RecordingTransport {
    fn emit(&mut self, event: &ClientEvent) -> Result<()> {
        if let Some(err) = &self.fail_with {
            return Err(anyhow!("{}", err));
        }
        self.sent.push(event.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_common::RefreshRequest;

    #[tokio::test]
    async fn channel_transport_forwards_events() {
        let (mut transport, mut rx) = ChannelTransport::new();
        transport.emit(&ClientEvent::CheckNewMessages).expect("emit should succeed");
        transport
            .emit(&ClientEvent::RefreshChat(RefreshRequest { limit: 50 }))
            .expect("emit should succeed");

        assert_eq!(rx.recv().await, Some(ClientEvent::CheckNewMessages));
        assert_eq!(rx.recv().await, Some(ClientEvent::RefreshChat(RefreshRequest { limit: 50 })));
    }

    #[test]
    fn closed_channel_transport_rejects_emit() {
        let (mut transport, _rx) = ChannelTransport::new();
        transport.close();
        let error = transport.emit(&ClientEvent::CheckNewMessages).expect_err("closed");
        assert!(error.to_string().contains("closed"));
    }

    #[test]
    fn dropped_receiver_is_an_error() {
        let (mut transport, rx) = ChannelTransport::new();
        drop(rx);
        assert!(transport.emit(&ClientEvent::CheckNewMessages).is_err());
    }

    #[test]
    fn recording_transport_records_and_fails_on_demand() {
        let mut ok = RecordingTransport::default();
        ok.emit(&ClientEvent::CheckNewMessages).expect("emit should succeed");
        assert_eq!(ok.names(), vec!["check_new_messages"]);

        let mut failing = RecordingTransport::failing("socket gone");
        assert!(failing.emit(&ClientEvent::CheckNewMessages).is_err());
        assert!(failing.sent.is_empty());
    }
}
