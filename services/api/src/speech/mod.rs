//! The speech capability backing `azure_recognize` and `azure_synthesize`.
//!
//! - `azure`: recognition and synthesis through the Azure Speech REST API.
//! - `device`: host microphone and speaker access.

pub mod azure;
pub mod device;

pub use azure::AzureSpeech;
pub use device::{AudioDevice, NoAudio};
