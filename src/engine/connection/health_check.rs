//! Liveness probing for new and existing connection handles.
//!
//! A handle is only handed out after the daemon has answered a ping within
//! the response timeout. Reaching the endpoint at all is bounded separately
//! by the connect timeout, before the ping. The same ping is available
//! afterwards as a health check that goes through the call-slot pool like any
//! other command.

use tracing::{info, warn};

use super::error_classification::{classify_execution_error, classify_probe_error};
use super::{ConnectionHandle, EngineClient};
use crate::engine::endpoint::ConnectionLimits;
use crate::error::{ConnectionError, ExecutionError};

const PING_OPERATION: &str = "ping";

impl<C: EngineClient> ConnectionHandle<C> {
    /// Ping with the response timeout (internal helper).
    async fn probe(
        client: &C,
        endpoint: &str,
        limits: ConnectionLimits,
    ) -> Result<(), ConnectionError> {
        let outcome = tokio::time::timeout(limits.response_timeout(), client.ping()).await;

        let result = match outcome {
            Err(_) => Err(ConnectionError::Unreachable {
                endpoint: endpoint.to_owned(),
                reason: format!("no answer within {} ms", limits.response_timeout_ms()),
            }),
            Ok(Err(error)) => Err(classify_probe_error(&error, endpoint)),
            Ok(Ok(_)) => Ok(()),
        };

        if let Err(ref error) = result {
            warn!(endpoint, %error, "liveness probe failed");
        }
        result
    }

    /// Probe a freshly built client and wrap it in a handle.
    ///
    /// Nothing is returned until the daemon has answered a ping within
    /// `limits.response_timeout()`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::Unreachable` when the ping fails or does not
    /// answer in time.
    pub async fn establish(
        client: C,
        endpoint: impl Into<String>,
        limits: ConnectionLimits,
    ) -> Result<Self, ConnectionError> {
        let endpoint_text = endpoint.into();
        Self::probe(&client, &endpoint_text, limits).await?;
        info!(
            endpoint = %endpoint_text,
            max_connections = limits.max_connections(),
            "connected to container engine"
        );
        Ok(Self::from_parts(client, endpoint_text, limits))
    }

    /// Verify the daemon still answers (async version).
    ///
    /// The ping occupies a call slot and is bounded by the response timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::Timeout` when no slot frees up or the daemon
    /// does not answer in time, and `ExecutionError::Transport` when the
    /// handle is closed or the ping fails.
    pub async fn health_check_async(&self) -> Result<(), ExecutionError> {
        let limits = self.limits();
        let _lease = self.lease(PING_OPERATION).await?;

        tokio::time::timeout(limits.response_timeout(), self.client().ping())
            .await
            .map_err(|_| ExecutionError::Timeout {
                operation: PING_OPERATION,
                millis: limits.response_timeout_ms(),
            })?
            .map_err(|error| {
                classify_execution_error(
                    error,
                    PING_OPERATION,
                    self.endpoint(),
                    limits.response_timeout_ms(),
                )
            })?;
        Ok(())
    }

    /// Verify the daemon still answers, blocking on a caller runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::health_check_async`].
    pub fn health_check(&self, runtime: &tokio::runtime::Handle) -> Result<(), ExecutionError> {
        runtime.block_on(self.health_check_async())
    }
}
