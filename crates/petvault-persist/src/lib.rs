//! Save/load orchestration for the pet's session state: one load at startup,
//! debounced saves on change, and an explicit clear. Persistence failures are
//! reported through a diagnostics sink and never reach the caller as panics.

pub mod controller;
pub mod debounce;
pub mod diagnostics;
pub mod error;

pub use controller::{
    FreshReason, LoadOutcome, PersistenceController, PersistenceSettings, Phase,
    DEFAULT_DEBOUNCE, DEFAULT_STORAGE_KEY,
};
pub use diagnostics::{DiagnosticEvent, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use error::{ErrorKind, PersistError};
