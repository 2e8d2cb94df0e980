use crate::error::ExportError;
use async_trait::async_trait;

/// Asynchronous destination for serialized log payloads.
///
/// Implementations move bytes to a concrete backend (HTTP ingestion
/// endpoint, test recorder, etc). The batch manager calls `send` from
/// spawned Tokio tasks and never awaits it on the application thread.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one payload to the backend.
    ///
    /// **Parameters**
    /// - `payload`: either a single JSON object or a JSON array of objects,
    ///   already serialized.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the payload.
    /// - `Err(..)` on a network fault or a non-success status. The batch
    ///   manager reports the error on stderr and drops the payload; it is
    ///   never retried.
    async fn send(&self, payload: String) -> Result<(), ExportError>;
}
