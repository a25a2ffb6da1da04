use std::sync::Arc;

use ev_core::verification::WizardState;
use tokio::sync::Mutex;

/// Shared wizard state plus the dispatch lock.
///
/// ## Lock Ordering
/// Acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: serializes transition + action execution.
/// - `state`: read by getters without taking `dispatch_lock`.
#[derive(Clone)]
pub struct WizardContext {
    state: Arc<Mutex<WizardState>>,
    dispatch_lock: Arc<Mutex<()>>,
}

impl Default for WizardContext {
    fn default() -> Self {
        Self::new(WizardState::initial())
    }
}

impl WizardContext {
    pub fn new(initial_state: WizardState) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial_state)),
            dispatch_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn get_state(&self) -> WizardState {
        self.state.lock().await.clone()
    }

    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Only call while holding `dispatch_lock`.
    pub async fn set_state(&self, state: WizardState) {
        *self.state.lock().await = state;
    }
}
