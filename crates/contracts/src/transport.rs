//! Transport trait - radio link primitives
//!
//! The connection lifecycle is built on top of these primitives; concrete
//! radio stacks, mocks and simulators implement them.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{CharacteristicUuid, ContractError};

/// Notification callback type
///
/// Invoked on the transport's delivery context with the raw payload of one
/// notification. Implementations must return quickly and never block.
pub type NotificationCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Radio link to a single peripheral
///
/// Abstracts connect / subscribe / write so the lifecycle state machine can
/// be driven by a real stack, a mock with injected failures, or a simulator.
pub trait Transport: Send + Sync {
    /// Peer address (for logging and error messages)
    fn address(&self) -> &str;

    /// Establish the link
    fn connect(&mut self) -> impl Future<Output = Result<(), ContractError>> + Send;

    /// Tear down the link
    ///
    /// Idempotent: returns Ok if already disconnected
    fn disconnect(&mut self) -> impl Future<Output = Result<(), ContractError>> + Send;

    /// Whether the link is currently up
    fn is_connected(&self) -> bool;

    /// Characteristics discovered so far (may be empty while discovery settles)
    fn characteristics(&self) -> Vec<CharacteristicUuid>;

    /// Subscribe to notifications on `target`
    fn subscribe(
        &mut self,
        target: &CharacteristicUuid,
        callback: NotificationCallback,
    ) -> impl Future<Output = Result<(), ContractError>> + Send;

    /// Unsubscribe from `target`
    ///
    /// Returns [`ContractError::NotSubscribed`] when there was no subscription.
    fn unsubscribe(
        &mut self,
        target: &CharacteristicUuid,
    ) -> impl Future<Output = Result<(), ContractError>> + Send;

    /// Write `data` to `target` and wait for the peer's acknowledgment
    fn write_with_response(
        &mut self,
        target: &CharacteristicUuid,
        data: &[u8],
    ) -> impl Future<Output = Result<(), ContractError>> + Send;
}
