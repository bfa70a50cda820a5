//! Shared, verified connection handle with a bounded pool of call slots.

use std::sync::Arc;

use bollard::Docker;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, trace};

use crate::engine::endpoint::ConnectionLimits;
use crate::error::ExecutionError;

struct HandleInner<C> {
    client: C,
    endpoint: String,
    limits: ConnectionLimits,
    slots: Semaphore,
}

/// A verified connection to the daemon, cheap to clone and safe to share
/// between tasks.
///
/// Every clone refers to the same client and the same pool of
/// `max_connections` call slots, so concurrent callers beyond the pool size
/// wait for a slot instead of opening new connections.
pub struct ConnectionHandle<C = Docker> {
    inner: Arc<HandleInner<C>>,
}

impl<C> Clone for ConnectionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("endpoint", &self.inner.endpoint)
            .field("limits", &self.inner.limits)
            .field("available_slots", &self.inner.slots.available_permits())
            .field("closed", &self.inner.slots.is_closed())
            .finish()
    }
}

impl<C> ConnectionHandle<C> {
    /// Wrap a client without probing it. Callers go through
    /// [`ConnectionHandle::establish`].
    pub(super) fn from_parts(client: C, endpoint: String, limits: ConnectionLimits) -> Self {
        let slot_count = usize::try_from(limits.max_connections())
            .unwrap_or(Semaphore::MAX_PERMITS)
            .min(Semaphore::MAX_PERMITS);
        Self {
            inner: Arc::new(HandleInner {
                client,
                endpoint,
                limits,
                slots: Semaphore::new(slot_count),
            }),
        }
    }

    /// The underlying engine client.
    pub(crate) fn client(&self) -> &C {
        &self.inner.client
    }

    /// The endpoint this handle is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Pool and timeout limits in force for this handle.
    #[must_use]
    pub fn limits(&self) -> ConnectionLimits {
        self.inner.limits
    }

    /// Number of call slots free right now.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.inner.slots.available_permits()
    }

    /// Whether the handle has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.slots.is_closed()
    }

    /// Take one call slot, waiting at most the connect timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Timeout` when no slot frees up in time and
    /// `ExecutionError::Transport` when the handle has been closed.
    pub(crate) async fn lease(
        &self,
        operation: &'static str,
    ) -> Result<CallLease<'_>, ExecutionError> {
        let limits = self.inner.limits;
        let acquired =
            tokio::time::timeout(limits.connect_timeout(), self.inner.slots.acquire())
                .await
                .map_err(|_| ExecutionError::Timeout {
                    operation,
                    millis: limits.connect_timeout_ms(),
                })?;

        let permit = acquired.map_err(|_| ExecutionError::Transport {
            operation,
            message: String::from("connection closed"),
        })?;
        trace!(operation, available = self.available_slots(), "call slot acquired");

        Ok(CallLease {
            _permit: permit,
            operation,
        })
    }

    /// Wait for every in-flight call to finish, then refuse new ones.
    ///
    /// Only the connection manager closes handles, during shutdown or
    /// reconnect.
    pub(super) async fn close(&self) {
        let drained = self
            .inner
            .slots
            .acquire_many(self.inner.limits.max_connections())
            .await;
        self.inner.slots.close();
        drop(drained);
        debug!(endpoint = %self.inner.endpoint, "connection handle closed");
    }
}

/// One occupied call slot; released on drop.
pub(crate) struct CallLease<'a> {
    _permit: SemaphorePermit<'a>,
    operation: &'static str,
}

impl Drop for CallLease<'_> {
    fn drop(&mut self) {
        trace!(operation = self.operation, "call slot released");
    }
}
