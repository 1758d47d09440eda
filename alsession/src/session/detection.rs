//! Detection cycle and the combined `ready` signal

use super::manager::ConsoleSession;
use super::types::ResolutionResult;
use tracing::debug;

impl ConsoleSession {
    /// Mark that a probe for an externally signalled session is running
    pub fn start_detection(&self) {
        if self.inner.detection.is_fulfilled() {
            let epoch = self.inner.detection.rescind();
            debug!(epoch, "Session detection restarted");
        }
    }

    /// Mark the running detection probe as finished
    pub fn end_detection(&self) {
        if self.inner.detection.resolve(()) {
            debug!(active = self.is_active(), "Session detection finished");
        }
    }

    pub fn is_detection_complete(&self) -> bool {
        self.inner.detection.is_fulfilled()
    }

    /// Wait until detection has finished and, if a session was found, its
    /// account resolution has settled. Without a session there is nothing
    /// to resolve and only detection is awaited.
    pub async fn ready(&self) -> ResolutionResult<()> {
        // Infallible
        let _ = self.inner.detection.wait().await;
        if self.is_active() {
            self.inner.resolution.wait().await?;
        }
        Ok(())
    }
}
