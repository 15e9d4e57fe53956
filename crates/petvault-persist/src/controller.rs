use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use petvault_core::{
    codec,
    config::CryptoConfig,
    state::{GameState, SharedState},
    storage::KeyValueStore,
    validate::validate,
};
use petvault_storage::{sealer::StateSealer, secret::SecretProvider};
use tracing::instrument;
use zeroize::Zeroizing;

use crate::{
    debounce::Debouncer,
    diagnostics::{DiagnosticEvent, Diagnostics, TracingDiagnostics},
    error::{ErrorKind, PersistError},
};

pub const DEFAULT_STORAGE_KEY: &str = "petvault/game-state";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Construction-time settings for a [`PersistenceController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    pub crypto: CryptoConfig,
    pub storage_key: String,
    pub debounce: Duration,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self::new(CryptoConfig::default())
    }
}

impl PersistenceSettings {
    pub fn new(crypto: CryptoConfig) -> Self {
        Self {
            crypto,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingLoad,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshReason {
    NoSavedState,
    Unreadable(ErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A saved state was decrypted, validated and installed.
    Restored(GameState),
    /// Nothing usable was saved; the session keeps its initial state.
    Fresh(FreshReason),
    /// `load` had already run for this controller.
    AlreadyLoaded,
}

/// Coordinates load, debounced save and clear for one [`SharedState`].
///
/// Saves are only scheduled once the initial load has finished, so a fresh
/// in-memory state never overwrites a save that has not been read yet.
/// Dropping the controller cancels a pending save; a save that is already
/// running is left to finish.
pub struct PersistenceController<S: KeyValueStore + 'static> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: S,
    secrets: Arc<dyn SecretProvider>,
    sealer: StateSealer,
    settings: PersistenceSettings,
    state: SharedState,
    diagnostics: Arc<dyn Diagnostics>,
    debouncer: Debouncer,
    phase: Mutex<Phase>,
    save_lock: tokio::sync::Mutex<()>,
}

impl<S: KeyValueStore + 'static> PersistenceController<S> {
    pub fn new(
        store: S,
        secrets: impl SecretProvider + 'static,
        state: SharedState,
        settings: PersistenceSettings,
    ) -> Self {
        Self::with_diagnostics(store, secrets, state, settings, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        store: S,
        secrets: impl SecretProvider + 'static,
        state: SharedState,
        settings: PersistenceSettings,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        let inner = Inner {
            store,
            secrets: Arc::new(secrets),
            sealer: StateSealer::new(settings.crypto.key_derivation_iterations),
            debouncer: Debouncer::new(settings.debounce),
            settings,
            state,
            diagnostics,
            phase: Mutex::new(Phase::AwaitingLoad),
            save_lock: tokio::sync::Mutex::new(()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.inner.state
    }

    pub fn settings(&self) -> &PersistenceSettings {
        &self.inner.settings
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.lock()
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Read the saved state once. On success the shared state is replaced
    /// with the restored value. Any failure is reported to diagnostics and
    /// the session continues with its current (fresh) state.
    ///
    /// If this future is dropped before completing, the controller stays in
    /// `Loading` and no saves are scheduled.
    #[instrument(skip_all, fields(key = %self.inner.settings.storage_key))]
    pub async fn load(&self) -> LoadOutcome {
        {
            let mut phase = self.inner.phase.lock();
            if *phase != Phase::AwaitingLoad {
                self.inner.diagnostics.record(DiagnosticEvent::LoadSkipped);
                return LoadOutcome::AlreadyLoaded;
            }
            *phase = Phase::Loading;
        }

        let outcome = match self.inner.read_saved().await {
            Ok(Some(state)) => {
                self.inner.state.replace(state.clone());
                self.inner.diagnostics.record(DiagnosticEvent::Restored);
                LoadOutcome::Restored(state)
            }
            Ok(None) => {
                self.inner.diagnostics.record(DiagnosticEvent::NoSavedState);
                LoadOutcome::Fresh(FreshReason::NoSavedState)
            }
            Err(err) => {
                let kind = err.kind();
                self.inner.diagnostics.record(DiagnosticEvent::LoadFallback {
                    kind,
                    detail: err.to_string(),
                });
                LoadOutcome::Fresh(FreshReason::Unreadable(kind))
            }
        };

        *self.inner.phase.lock() = Phase::Ready;
        outcome
    }

    /// Schedule a debounced save of whatever the shared state holds when the
    /// timer fires. Ignored until `load` has finished. Must be called from
    /// within a Tokio runtime.
    pub fn notify_state_changed(&self) {
        if self.phase() != Phase::Ready {
            self.inner.diagnostics.record(DiagnosticEvent::SaveDeferred);
            return;
        }

        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(move |ticket| async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.debouncer.claim(ticket) {
                inner.save_and_report().await;
            }
        });
    }

    /// Cancel any pending debounced save and write the current state now.
    #[instrument(skip_all, fields(key = %self.inner.settings.storage_key))]
    pub async fn flush(&self) -> Result<(), PersistError> {
        self.inner.debouncer.cancel();
        if self.phase() != Phase::Ready {
            return Err(PersistError::NotReady);
        }
        let result = self.inner.save().await;
        self.inner.report_save(&result);
        result.map(|_| ())
    }

    /// Delete the saved record immediately. A pending debounced save is
    /// cancelled so it cannot resurrect the record. In-memory state is left
    /// untouched; failures are reported to diagnostics only.
    #[instrument(skip_all, fields(key = %self.inner.settings.storage_key))]
    pub async fn clear(&self) {
        self.inner.debouncer.cancel();
        let _serial = self.inner.save_lock.lock().await;
        match self.inner.store.delete(&self.inner.settings.storage_key).await {
            Ok(()) => self.inner.diagnostics.record(DiagnosticEvent::Cleared),
            Err(err) => {
                let err = PersistError::from(err);
                self.inner.diagnostics.record(DiagnosticEvent::ClearFailed {
                    kind: err.kind(),
                    detail: err.to_string(),
                });
            }
        }
    }
}

impl<S: KeyValueStore + 'static> Drop for PersistenceController<S> {
    fn drop(&mut self) {
        self.inner.debouncer.cancel();
    }
}

impl<S: KeyValueStore> Inner<S> {
    async fn read_saved(&self) -> Result<Option<GameState>, PersistError> {
        let Some(raw) = self.store.get(&self.settings.storage_key).await? else {
            return Ok(None);
        };

        let plaintext = if self.settings.crypto.enabled {
            let secret = self.secrets.secret().await?;
            self.sealer.open(&raw, &secret)?
        } else {
            Zeroizing::new(raw.into_bytes())
        };

        let candidate = codec::decode(&plaintext)?;
        Ok(Some(validate(candidate)?))
    }

    /// Serialize the current state and write it. Saves run one at a time and
    /// snapshot the state only after acquiring the slot, so the latest value
    /// always wins.
    async fn save(&self) -> Result<usize, PersistError> {
        let _serial = self.save_lock.lock().await;
        let snapshot = self.state.snapshot();

        let record = if self.settings.crypto.enabled {
            let secret = self.secrets.secret().await?;
            let encoded = Zeroizing::new(codec::encode(&snapshot)?);
            self.sealer.seal(&encoded, &secret)?
        } else {
            codec::encode_to_string(&snapshot)?
        };

        self.store.set(&self.settings.storage_key, &record).await?;
        Ok(record.len())
    }

    async fn save_and_report(&self) {
        let result = self.save().await;
        self.report_save(&result);
    }

    fn report_save(&self, result: &Result<usize, PersistError>) {
        let event = match result {
            Ok(bytes) => DiagnosticEvent::Saved { bytes: *bytes },
            Err(err) => DiagnosticEvent::SaveFailed {
                kind: err.kind(),
                detail: err.to_string(),
            },
        };
        self.diagnostics.record(event);
    }
}
