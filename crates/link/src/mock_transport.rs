//! Mock transport
//!
//! In-memory [`Transport`] for tests, with failure injection and a call log.
//! Clones share state, so a test can keep a handle after moving the
//! transport into a lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{CharacteristicUuid, ContractError, LinkConfig, NotificationCallback, Transport};
use tracing::instrument;

/// Mock transport configuration (failure injection)
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Connect fails with this message
    pub connect_error: Option<String>,
    /// Connect sleeps this long before completing
    pub connect_delay: Option<Duration>,
    /// Characteristics exposed once discovery has settled
    pub characteristics: Vec<CharacteristicUuid>,
    /// Number of initial discovery reads that return nothing
    pub empty_discovery_reads: usize,
    /// Subscribe fails
    pub fail_subscribe: bool,
    /// Unsubscribe fails with a transport error
    pub fail_unsubscribe: bool,
    /// Writes fail
    pub fail_write: bool,
    /// Disconnect reports an error (the link still goes down)
    pub fail_disconnect: bool,
}

#[derive(Default)]
struct MockState {
    config: MockConfig,
    connected: bool,
    discovery_reads: usize,
    subscriptions: HashMap<CharacteristicUuid, NotificationCallback>,
    writes: Vec<(CharacteristicUuid, Vec<u8>)>,
    calls: Vec<&'static str>,
    connect_count: usize,
}

/// Mock radio link
#[derive(Clone)]
pub struct MockTransport {
    address: String,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(address: impl Into<String>, config: MockConfig) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(Mutex::new(MockState {
                config,
                ..Default::default()
            })),
        }
    }

    /// Mock exposing the notify and write characteristics of `link`
    pub fn for_link(link: &LinkConfig) -> Self {
        Self::with_config(link, MockConfig::default())
    }

    /// Like [`for_link`](Self::for_link) with extra failure injection
    pub fn with_config(link: &LinkConfig, mut config: MockConfig) -> Self {
        if config.characteristics.is_empty() {
            config.characteristics = vec![
                link.notify_characteristic.clone(),
                link.write_characteristic.clone(),
            ];
        }
        Self::new(link.address.clone(), config)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change failure injection on a live mock
    pub fn update_config(&self, f: impl FnOnce(&mut MockConfig)) {
        f(&mut self.lock().config);
    }

    /// Deliver a notification to the subscriber of `target`
    ///
    /// Returns false when nobody is subscribed. The callback runs without
    /// the mock's lock held.
    pub fn inject(&self, target: &CharacteristicUuid, payload: impl Into<Bytes>) -> bool {
        let callback = self.lock().subscriptions.get(target).cloned();
        match callback {
            Some(callback) => {
                callback(payload.into());
                true
            }
            None => false,
        }
    }

    /// Simulate the peer dropping the link
    pub fn drop_link(&self) {
        let mut state = self.lock();
        state.connected = false;
        state.subscriptions.clear();
    }

    pub fn is_subscribed(&self, target: &CharacteristicUuid) -> bool {
        self.lock().subscriptions.contains_key(target)
    }

    /// Bytes written so far, in order
    pub fn writes(&self) -> Vec<(CharacteristicUuid, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Transport primitives invoked so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }
}

impl Transport for MockTransport {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(name = "mock_transport_connect", skip(self), fields(address = %self.address))]
    async fn connect(&mut self) -> Result<(), ContractError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push("connect");
            state.config.connect_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(message) = state.config.connect_error.clone() {
            return Err(ContractError::transport(message));
        }
        state.connected = true;
        state.discovery_reads = 0;
        state.connect_count += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.calls.push("disconnect");
        state.connected = false;
        state.subscriptions.clear();
        if state.config.fail_disconnect {
            return Err(ContractError::transport("mock disconnect failure"));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn characteristics(&self) -> Vec<CharacteristicUuid> {
        let mut state = self.lock();
        if !state.connected {
            return Vec::new();
        }
        state.discovery_reads += 1;
        if state.discovery_reads <= state.config.empty_discovery_reads {
            return Vec::new();
        }
        state.config.characteristics.clone()
    }

    async fn subscribe(
        &mut self,
        target: &CharacteristicUuid,
        callback: NotificationCallback,
    ) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.calls.push("subscribe");
        if !state.connected {
            return Err(ContractError::NotConnected);
        }
        if state.config.fail_subscribe {
            return Err(ContractError::transport("mock subscribe failure"));
        }
        if !state.config.characteristics.contains(target) {
            return Err(ContractError::transport(format!(
                "unknown characteristic {target}"
            )));
        }
        state.subscriptions.insert(target.clone(), callback);
        Ok(())
    }

    async fn unsubscribe(&mut self, target: &CharacteristicUuid) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.calls.push("unsubscribe");
        if !state.connected {
            return Err(ContractError::NotConnected);
        }
        if state.config.fail_unsubscribe {
            return Err(ContractError::transport("mock unsubscribe failure"));
        }
        match state.subscriptions.remove(target) {
            Some(_) => Ok(()),
            None => Err(ContractError::NotSubscribed {
                characteristic: target.to_string(),
            }),
        }
    }

    async fn write_with_response(
        &mut self,
        target: &CharacteristicUuid,
        data: &[u8],
    ) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.calls.push("write");
        if !state.connected {
            return Err(ContractError::NotConnected);
        }
        if state.config.fail_write {
            return Err(ContractError::transport("mock write rejected"));
        }
        state.writes.push((target.clone(), data.to_vec()));
        Ok(())
    }
}
