//! Connection lifecycle state machine
//!
//! Drives a [`Transport`] through Disconnected → Connecting → Connected →
//! Streaming. Operations take `&mut self`, so at most one runs against the
//! link at a time. Notification delivery never touches the lifecycle; it
//! only reaches the [`NotificationHandler`].

use std::sync::Arc;

use contracts::{
    CharacteristicUuid, ConnectionState, ContractError, LinkConfig, LinkEvent, Opcode, Transport,
};
use ingestion::NotificationHandler;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::{LinkError, Result};

/// Capacity of the status event channel
pub const EVENT_CAPACITY: usize = 256;

/// State machine over one link
pub struct ConnectionLifecycle<T: Transport> {
    transport: T,
    config: LinkConfig,
    handler: Arc<NotificationHandler>,
    state: ConnectionState,
    events: broadcast::Sender<LinkEvent>,
}

impl<T: Transport> ConnectionLifecycle<T> {
    /// Create a lifecycle in the Disconnected state
    pub fn new(transport: T, config: LinkConfig, handler: Arc<NotificationHandler>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            config,
            handler,
            state: ConnectionState::Disconnected,
            events,
        }
    }

    /// Publish status on an existing event channel (shared with the handler)
    pub fn with_events(mut self, events: broadcast::Sender<LinkEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handler(&self) -> &Arc<NotificationHandler> {
        &self.handler
    }

    /// Establish the link
    ///
    /// No-op when already Connected or Streaming. Bounded by the configured
    /// connect timeout; on failure the state returns to Disconnected.
    #[instrument(name = "link_connect", skip(self), fields(address = %self.config.address))]
    pub async fn connect(&mut self) -> Result<()> {
        self.reconcile();
        if self.state.is_connected() {
            debug!(state = ?self.state, "already connected");
            return Ok(());
        }

        self.transition(ConnectionState::Connecting, "Connecting...");

        let timeout = self.config.connect_timeout();
        let err = match tokio::time::timeout(timeout, self.transport.connect()).await {
            Ok(Ok(())) => {
                self.transition(ConnectionState::Connected, "Connected.");
                return Ok(());
            }
            Ok(Err(e)) => LinkError::connect(&self.config.address, e.to_string()),
            Err(_) => {
                // The abandoned attempt may have left a half-open link
                if let Err(e) = self.transport.disconnect().await {
                    debug!(error = %e, "cleanup after connect timeout failed");
                }
                LinkError::connect(
                    &self.config.address,
                    format!("timed out after {:.1}s", timeout.as_secs_f64()),
                )
            }
        };

        warn!(error = %err, "connect failed");
        self.transition(ConnectionState::Disconnected, format!("Connect error: {err}"));
        Err(err)
    }

    /// Subscribe to the notify characteristic
    ///
    /// Connects first if needed. No-op when already Streaming. When the
    /// target is not discoverable the state stays Connected.
    #[instrument(name = "link_start_streaming", skip(self), fields(target = %self.config.notify_characteristic))]
    pub async fn start_streaming(&mut self) -> Result<()> {
        self.reconcile();
        if self.state == ConnectionState::Streaming {
            // A failed stop leaves the subscription up with the handler off
            self.handler.activate();
            debug!("already streaming");
            return Ok(());
        }
        if !self.state.is_connected() {
            self.connect().await?;
        }

        let target = self.config.notify_characteristic.clone();
        if let Err(err) = self.ensure_discoverable(&target).await {
            warn!(error = %err, "notify target missing");
            self.publish_status(format!("Notify error: {err}"));
            return Err(err);
        }

        self.publish_status("Starting notifications...");
        self.handler.activate();

        if let Err(e) = self.transport.subscribe(&target, self.handler.callback()).await {
            self.handler.deactivate();
            let err = LinkError::Subscribe {
                characteristic: target.to_string(),
                message: e.to_string(),
            };
            warn!(error = %err, "subscribe failed");
            self.publish_status(format!("Notify error: {err}"));
            return Err(err);
        }

        self.transition(ConnectionState::Streaming, "Notifications ON.");
        Ok(())
    }

    /// Unsubscribe from the notify characteristic
    ///
    /// Safe in any state. A missing subscription is already the desired end
    /// state and is not an error. Ends in Connected when a link is up.
    #[instrument(name = "link_stop_streaming", skip(self), fields(state = ?self.state))]
    pub async fn stop_streaming(&mut self) -> Result<()> {
        self.reconcile();
        self.handler.deactivate();
        if !self.state.is_connected() {
            debug!("not connected, nothing to stop");
            return Ok(());
        }

        let was_streaming = self.state == ConnectionState::Streaming;
        let target = self.config.notify_characteristic.clone();
        match self.transport.unsubscribe(&target).await {
            Ok(()) => {}
            Err(e) if e.is_not_subscribed() || matches!(e, ContractError::NotConnected) => {
                debug!(reason = %e, "subscription already absent");
            }
            Err(e) => {
                // Subscription still live on the transport; stay Streaming so
                // a retry or disconnect tears it down
                warn!(error = %e, "unsubscribe failed");
                return Err(LinkError::Unsubscribe {
                    characteristic: target.to_string(),
                    message: e.to_string(),
                });
            }
        }

        if was_streaming {
            self.transition(ConnectionState::Connected, "Notifications OFF.");
        }
        Ok(())
    }

    /// Tear down the link
    ///
    /// Stops streaming, then disconnects the transport, then enters
    /// Disconnected. A failed unsubscribe never blocks the teardown.
    #[instrument(name = "link_disconnect", skip(self), fields(state = ?self.state))]
    pub async fn disconnect(&mut self) -> Result<()> {
        self.reconcile();
        if self.state == ConnectionState::Disconnected {
            debug!("already disconnected");
            return Ok(());
        }

        if let Err(e) = self.stop_streaming().await {
            warn!(error = %e, "stop streaming failed during disconnect, continuing");
        }

        let result = self.transport.disconnect().await;
        self.transition(ConnectionState::Disconnected, "Disconnected.");

        result.map_err(|e| {
            warn!(error = %e, "transport disconnect reported an error");
            LinkError::Disconnect {
                message: e.to_string(),
            }
        })
    }

    /// Write a single-byte opcode with acknowledgment
    ///
    /// Connects first when Disconnected.
    #[instrument(name = "link_send_command", skip(self), fields(opcode = %opcode))]
    pub async fn send_command(&mut self, opcode: Opcode) -> Result<()> {
        self.reconcile();
        if !self.state.is_connected() {
            self.connect().await?;
        }

        self.publish_status(format!("Sending {opcode}..."));

        let target = self.config.write_characteristic.clone();
        if let Err(e) = self
            .transport
            .write_with_response(&target, &[opcode.code()])
            .await
        {
            let err = LinkError::command_write(opcode, e.to_string());
            warn!(error = %err, "command write failed");
            self.publish_status(format!("Command error: {err}"));
            return Err(err);
        }

        metrics::counter!("liftlog_commands_sent_total", "opcode" => opcode.label())
            .increment(1);
        self.publish_status(format!("{} sent.", opcode.label()));
        Ok(())
    }
}

impl<T: Transport> ConnectionLifecycle<T> {
    /// Wait for late service discovery once, then look for `target`
    async fn ensure_discoverable(&self, target: &CharacteristicUuid) -> Result<()> {
        let mut found = self.transport.characteristics();
        if found.is_empty() {
            let delay = self.config.settle_delay();
            debug!(delay_ms = delay.as_millis() as u64, "no characteristics yet, settling");
            tokio::time::sleep(delay).await;
            found = self.transport.characteristics();
        }

        if found.iter().any(|c| c == target) {
            Ok(())
        } else {
            Err(LinkError::NotifyTargetNotFound {
                characteristic: target.to_string(),
            })
        }
    }

    /// Align the tracked state with the transport's view of the link
    fn reconcile(&mut self) {
        let up = self.transport.is_connected();
        match (self.state, up) {
            (ConnectionState::Connected | ConnectionState::Streaming, false) => {
                warn!(state = ?self.state, "link lost");
                self.handler.deactivate();
                self.transition(ConnectionState::Disconnected, "Disconnected.");
            }
            // A connect future was dropped mid-flight
            (ConnectionState::Connecting, true) => {
                self.transition(ConnectionState::Connected, "Connected.");
            }
            (ConnectionState::Connecting, false) => {
                self.transition(ConnectionState::Disconnected, "Disconnected.");
            }
            _ => {}
        }
    }

    fn transition(&mut self, next: ConnectionState, message: impl Into<String>) {
        let prev = self.state;
        let message = message.into();
        self.state = next;

        info!(from = %prev, to = %next, "{message}");
        metrics::counter!("liftlog_state_transitions_total", "to" => next.as_str()).increment(1);

        // No receivers is fine
        let _ = self.events.send(LinkEvent::Status {
            state: next,
            message,
        });

        if next.is_connected() && !prev.is_connected() {
            let _ = self.events.send(LinkEvent::Connectivity(true));
        } else if next == ConnectionState::Disconnected && prev.is_connected() {
            let _ = self.events.send(LinkEvent::Connectivity(false));
        }
    }

    fn publish_status(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(state = %self.state, "{message}");
        let _ = self.events.send(LinkEvent::Status {
            state: self.state,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_transport::{MockConfig, MockTransport};
    use async_channel::{bounded, Receiver};
    use contracts::{DecodeLayout, Sample};
    use ingestion::{IngestionMetrics, PacketDecoder};
    use std::time::Duration;

    struct Fixture {
        lifecycle: ConnectionLifecycle<MockTransport>,
        mock: MockTransport,
        events: broadcast::Receiver<LinkEvent>,
        samples: Receiver<Sample>,
    }

    fn fixture(config: MockConfig) -> Fixture {
        let link = LinkConfig {
            connect_timeout_s: 0.2,
            settle_delay_ms: 10,
            ..Default::default()
        };
        let mock = MockTransport::with_config(&link, config);

        let decoder = Arc::new(PacketDecoder::new(&DecodeLayout::default()).unwrap());
        let (tx, samples) = bounded(64);
        let (events_tx, events) = broadcast::channel(EVENT_CAPACITY);
        let handler = Arc::new(
            NotificationHandler::new(decoder, tx, Arc::new(IngestionMetrics::new()))
                .with_events(events_tx.clone()),
        );

        let lifecycle =
            ConnectionLifecycle::new(mock.clone(), link, handler).with_events(events_tx);
        Fixture {
            lifecycle,
            mock,
            events,
            samples,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn status_messages(events: &[LinkEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Status { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn packet(seq: u16) -> Vec<u8> {
        let mut out = seq.to_le_bytes().to_vec();
        out.extend_from_slice(&[0u8; 12]);
        out
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.connect().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
        let first = drain(&mut f.events);
        assert_eq!(
            first,
            vec![
                LinkEvent::Status {
                    state: ConnectionState::Connecting,
                    message: "Connecting...".into()
                },
                LinkEvent::Status {
                    state: ConnectionState::Connected,
                    message: "Connected.".into()
                },
                LinkEvent::Connectivity(true),
            ]
        );

        f.lifecycle.connect().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
        assert!(drain(&mut f.events).is_empty());
        assert_eq!(f.mock.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let mut f = fixture(MockConfig {
            connect_error: Some("peer unreachable".into()),
            ..Default::default()
        });

        let err = f.lifecycle.connect().await.unwrap_err();
        assert!(matches!(err, LinkError::Connect { .. }));
        assert!(err.to_string().contains("peer unreachable"));
        assert_eq!(f.lifecycle.state(), ConnectionState::Disconnected);

        let events = drain(&mut f.events);
        assert!(!events.contains(&LinkEvent::Connectivity(false)));
        assert!(status_messages(&events)
            .last()
            .is_some_and(|m| m.starts_with("Connect error:")));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let mut f = fixture(MockConfig {
            connect_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });

        let err = f.lifecycle.connect().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(f.lifecycle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_start_streaming_connects_implicitly() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.start_streaming().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Streaming);
        assert!(f.lifecycle.handler().is_active());

        let messages = status_messages(&drain(&mut f.events));
        assert_eq!(
            messages,
            vec![
                "Connecting...",
                "Connected.",
                "Starting notifications...",
                "Notifications ON."
            ]
        );
    }

    #[tokio::test]
    async fn test_start_streaming_twice_subscribes_once() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.start_streaming().await.unwrap();
        f.lifecycle.start_streaming().await.unwrap();

        let subscribes = f.mock.calls().iter().filter(|c| **c == "subscribe").count();
        assert_eq!(subscribes, 1);
    }

    #[tokio::test]
    async fn test_notify_target_not_found_stays_connected() {
        let mut f = fixture(MockConfig {
            characteristics: vec!["0000ffff-0000-1000-8000-00805f9b34fb".into()],
            ..Default::default()
        });

        let err = f.lifecycle.start_streaming().await.unwrap_err();
        assert!(matches!(err, LinkError::NotifyTargetNotFound { .. }));
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
        assert!(!f.lifecycle.handler().is_active());
    }

    #[tokio::test]
    async fn test_late_discovery_settles() {
        let mut f = fixture(MockConfig {
            empty_discovery_reads: 1,
            ..Default::default()
        });

        f.lifecycle.start_streaming().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Streaming);
    }

    #[tokio::test]
    async fn test_discovery_still_empty_after_settle() {
        let mut f = fixture(MockConfig {
            empty_discovery_reads: 2,
            ..Default::default()
        });

        let err = f.lifecycle.start_streaming().await.unwrap_err();
        assert!(matches!(err, LinkError::NotifyTargetNotFound { .. }));
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_reported() {
        let mut f = fixture(MockConfig {
            fail_subscribe: true,
            ..Default::default()
        });

        let err = f.lifecycle.start_streaming().await.unwrap_err();
        assert!(matches!(err, LinkError::Subscribe { .. }));
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
        assert!(!f.lifecycle.handler().is_active());
    }

    #[tokio::test]
    async fn test_stop_streaming_when_not_streaming() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.stop_streaming().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Disconnected);

        f.lifecycle.connect().await.unwrap();
        f.lifecycle.stop_streaming().await.unwrap();
        f.lifecycle.stop_streaming().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_stop_streaming_ignores_late_packets() {
        let mut f = fixture(MockConfig::default());
        let target = LinkConfig::default().notify_characteristic;

        f.lifecycle.start_streaming().await.unwrap();
        assert!(f.mock.inject(&target, packet(1)));

        // Keep a copy of the callback to deliver after unsubscribe
        let late = f.lifecycle.handler().callback();
        f.lifecycle.stop_streaming().await.unwrap();
        assert!(!f.mock.is_subscribed(&target));
        late(packet(2).into());

        assert_eq!(f.samples.try_recv().unwrap().seq, 1);
        assert!(f.samples.try_recv().is_err());
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_decode_error_keeps_streaming() {
        let mut f = fixture(MockConfig::default());
        let target = LinkConfig::default().notify_characteristic;

        f.lifecycle.start_streaming().await.unwrap();
        drain(&mut f.events);

        f.mock.inject(&target, vec![0u8; 5]);
        f.mock.inject(&target, packet(3));

        assert_eq!(f.lifecycle.state(), ConnectionState::Streaming);
        assert_eq!(f.samples.try_recv().unwrap().seq, 3);
        assert!(matches!(
            drain(&mut f.events).as_slice(),
            [LinkEvent::DecodeError { len: 5, .. }]
        ));
    }

    #[tokio::test]
    async fn test_disconnect_order() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.start_streaming().await.unwrap();
        drain(&mut f.events);
        f.lifecycle.disconnect().await.unwrap();

        assert_eq!(f.lifecycle.state(), ConnectionState::Disconnected);
        let calls = f.mock.calls();
        assert_eq!(&calls[calls.len() - 2..], &["unsubscribe", "disconnect"]);

        let events = drain(&mut f.events);
        assert_eq!(
            status_messages(&events),
            vec!["Notifications OFF.", "Disconnected."]
        );
        assert_eq!(events.last(), Some(&LinkEvent::Connectivity(false)));
    }

    #[tokio::test]
    async fn test_disconnect_not_blocked_by_failed_unsubscribe() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.start_streaming().await.unwrap();
        f.mock.update_config(|c| c.fail_unsubscribe = true);

        f.lifecycle.disconnect().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Disconnected);
        assert!(!f.mock.is_connected());
    }

    #[tokio::test]
    async fn test_failed_unsubscribe_keeps_streaming() {
        let mut f = fixture(MockConfig::default());
        let notify = f.lifecycle.config.notify_characteristic.clone();

        f.lifecycle.start_streaming().await.unwrap();
        f.mock.update_config(|c| c.fail_unsubscribe = true);

        assert!(matches!(
            f.lifecycle.stop_streaming().await,
            Err(LinkError::Unsubscribe { .. })
        ));
        assert_eq!(f.lifecycle.state(), ConnectionState::Streaming);
        assert!(f.mock.is_subscribed(&notify));
        assert!(!f.lifecycle.handler().is_active());

        // Restart reuses the live subscription
        f.mock.update_config(|c| c.fail_unsubscribe = false);
        f.lifecycle.start_streaming().await.unwrap();
        assert!(f.lifecycle.handler().is_active());
        let subscribes = f.mock.calls().iter().filter(|c| **c == "subscribe").count();
        assert_eq!(subscribes, 1);

        // Retry actually tears it down, and stays quiet after that
        f.lifecycle.stop_streaming().await.unwrap();
        assert_eq!(f.lifecycle.state(), ConnectionState::Connected);
        assert!(!f.mock.is_subscribed(&notify));
        f.lifecycle.stop_streaming().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut f = fixture(MockConfig::default());
        f.lifecycle.disconnect().await.unwrap();

        f.lifecycle.connect().await.unwrap();
        f.lifecycle.disconnect().await.unwrap();
        f.lifecycle.disconnect().await.unwrap();

        let disconnects = f.mock.calls().iter().filter(|c| **c == "disconnect").count();
        assert_eq!(disconnects, 1);
    }

    #[tokio::test]
    async fn test_send_command_writes_opcode() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.send_command(Opcode::Start).await.unwrap();
        f.lifecycle.send_command(Opcode::ResetSeq).await.unwrap();
        f.lifecycle.send_command(Opcode::Stop).await.unwrap();

        let bytes: Vec<Vec<u8>> = f.mock.writes().into_iter().map(|(_, b)| b).collect();
        assert_eq!(bytes, vec![vec![0x01], vec![0x02], vec![0x00]]);

        let messages = status_messages(&drain(&mut f.events));
        assert!(messages.contains(&"Sending START (0x01)...".to_string()));
        assert!(messages.contains(&"START sent.".to_string()));
    }

    #[tokio::test]
    async fn test_send_command_failure() {
        let mut f = fixture(MockConfig {
            fail_write: true,
            ..Default::default()
        });

        let err = f.lifecycle.send_command(Opcode::Start).await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::CommandWrite {
                opcode: Opcode::Start,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_link_loss_is_reconciled() {
        let mut f = fixture(MockConfig::default());

        f.lifecycle.start_streaming().await.unwrap();
        drain(&mut f.events);
        f.mock.drop_link();

        f.lifecycle.start_streaming().await.unwrap();
        let events = drain(&mut f.events);
        assert_eq!(events.get(1), Some(&LinkEvent::Connectivity(false)));
        assert_eq!(f.lifecycle.state(), ConnectionState::Streaming);
        assert_eq!(f.mock.connect_count(), 2);
    }
}
