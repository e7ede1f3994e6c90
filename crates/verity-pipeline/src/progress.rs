//! Progress notification channel
//!
//! Purely observational: one event per state transition for live display.
//! Emission never affects control flow; a dropped or full receiver is
//! silently ignored.

use crate::state::PipelineState;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// One state transition of a running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The state the run just entered
    pub state: PipelineState,

    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// Sending half of a progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Emit a transition event. Send failures are ignored by design: the
/// observer may have gone away, and the run must not care.
pub(crate) fn emit(sender: &Option<ProgressSender>, state: PipelineState) {
    if let Some(sender) = sender {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let _ = sender.send(ProgressEvent {
            state,
            timestamp_ms,
        });
    }
}
