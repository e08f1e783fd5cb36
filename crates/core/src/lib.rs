//! Vox Core
//!
//! Transport-independent logic for the voice command service: the command
//! interpreter, the speech bridge and the credential set it depends on.

pub mod credentials;
pub mod intent;
pub mod interpreter;
pub mod speech;

pub use credentials::{CredentialHandle, CredentialManager, Credentials};
pub use intent::{CommandType, IntentResult};
pub use interpreter::CommandInterpreter;
pub use speech::SpeechBridge;
