/// Ordered catalogs of questions and bonus events.
pub mod catalog;
/// Per-player game client.
pub mod client;
/// Client-local flow machine.
pub mod machine;
/// Screen set and pure derivation.
pub mod screen;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dao::record_store::RecordStore;

pub use self::client::GameClient;
pub use self::machine::FlowMachine;
pub use self::screen::{GameView, Screen, derive_screen};

/// Shared handle to the relay server state.
pub type SharedState = Arc<AppState>;

/// Server-side application state: the hosted record store and the runtime
/// configuration. The relay never inspects game semantics; it only stores
/// rows and fans out their changes.
pub struct AppState {
    store: Arc<dyn RecordStore>,
    config: AppConfig,
}

impl AppState {
    /// Wrap a store and configuration into a shared state handle.
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> SharedState {
        Arc::new(Self { store, config })
    }

    /// Handle to the hosted record store.
    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
