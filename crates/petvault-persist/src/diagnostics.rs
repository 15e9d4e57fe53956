use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;

/// Everything the controller reports about its own work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    Restored,
    NoSavedState,
    LoadFallback { kind: ErrorKind, detail: String },
    LoadSkipped,
    SaveDeferred,
    Saved { bytes: usize },
    SaveFailed { kind: ErrorKind, detail: String },
    Cleared,
    ClearFailed { kind: ErrorKind, detail: String },
}

impl DiagnosticEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DiagnosticEvent::LoadFallback { .. }
                | DiagnosticEvent::SaveFailed { .. }
                | DiagnosticEvent::ClearFailed { .. }
        )
    }
}

/// Sink for persistence diagnostics.
pub trait Diagnostics: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::Restored => info!("restored saved game state"),
            DiagnosticEvent::NoSavedState => info!("no saved game state, starting fresh"),
            DiagnosticEvent::LoadFallback { kind, detail } => {
                warn!(?kind, %detail, "saved game state unusable, starting fresh")
            }
            DiagnosticEvent::LoadSkipped => warn!("load already ran for this session"),
            DiagnosticEvent::SaveDeferred => debug!("state change before load finished, not saved"),
            DiagnosticEvent::Saved { bytes } => debug!(bytes, "game state saved"),
            DiagnosticEvent::SaveFailed { kind, detail } => {
                warn!(?kind, %detail, "failed to save game state")
            }
            DiagnosticEvent::Cleared => info!("saved game state cleared"),
            DiagnosticEvent::ClearFailed { kind, detail } => {
                warn!(?kind, %detail, "failed to clear saved game state")
            }
        }
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    pub fn failures(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_failure())
            .cloned()
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, event: DiagnosticEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order_and_filters_failures() {
        let sink = RecordingDiagnostics::new();
        let shared = sink.clone();
        shared.record(DiagnosticEvent::NoSavedState);
        shared.record(DiagnosticEvent::SaveFailed {
            kind: ErrorKind::Storage,
            detail: "quota".into(),
        });
        shared.record(DiagnosticEvent::Saved { bytes: 10 });

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.events()[0], DiagnosticEvent::NoSavedState);
        assert_eq!(
            sink.failures(),
            vec![DiagnosticEvent::SaveFailed {
                kind: ErrorKind::Storage,
                detail: "quota".into(),
            }]
        );
    }
}
