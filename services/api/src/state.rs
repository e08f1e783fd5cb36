//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the process-wide
//! services every WebSocket session dispatches into.

use crate::config::Config;
use std::sync::Arc;
use vox_core::{
    CommandInterpreter, CredentialHandle, CredentialManager, SpeechBridge,
    credentials::CredentialStore, speech::SpeechCapability,
};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub interpreter: CommandInterpreter,
    pub speech: Arc<SpeechBridge>,
    pub credentials: Arc<CredentialManager>,
}

impl AppState {
    /// Wires the speech bridge and the credential manager to one shared credential handle.
    pub fn new(
        config: Config,
        capability: Arc<dyn SpeechCapability>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let handle = CredentialHandle::new(config.credentials.clone());
        let interpreter = CommandInterpreter::new();
        Self {
            speech: Arc::new(SpeechBridge::new(capability, handle.clone(), interpreter)),
            credentials: Arc::new(CredentialManager::new(handle, store)),
            interpreter,
            config: Arc::new(config),
        }
    }

    /// The region currently in use, or `None` when unset.
    pub fn region(&self) -> Option<String> {
        let snapshot = self.credentials.handle().snapshot();
        (!snapshot.region.is_empty()).then(|| snapshot.region.clone())
    }
}
