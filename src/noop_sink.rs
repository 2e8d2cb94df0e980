use crate::error::ExportError;
use crate::sink::Transport;
use async_trait::async_trait;

/// Accepts every payload and discards it.
///
/// The load demos use it to time record formatting and batch swaps with no
/// network in the way.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _payload: String) -> Result<(), ExportError> {
        Ok(())
    }
}
