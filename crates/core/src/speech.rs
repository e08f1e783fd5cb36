//! Speech Bridge
//!
//! Wraps an external speech capability (speech-to-text and text-to-speech) and
//! normalizes its outcomes into values the dispatcher can turn into envelopes.
//! The bridge reads the current credentials on every call, so a credential
//! update applies to the next call without any restart.

use crate::{
    credentials::{CredentialHandle, Credentials},
    intent::{CommandType, IntentResult},
    interpreter::CommandInterpreter,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Voice used when a synthesis request does not name one.
pub const DEFAULT_VOICE: &str = "en-GB-RyanNeural";

pub const NO_MATCH_TEXT: &str = "Could not understand speech";

/// What the speech-to-text capability heard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionStatus {
    /// Speech was recognized as the given text.
    Recognized(String),
    /// Audio was processed but nothing usable came out of it.
    NoMatch(String),
}

/// How a text-to-speech request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisStatus {
    Completed,
    /// The provider refused or abandoned the request.
    Canceled(String),
}

/// The external speech provider.
///
/// Calls run to completion; there is no cancellation or timeout at this layer.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SpeechCapability: Send + Sync {
    /// Listens once on the default microphone and transcribes what was said.
    async fn recognize_once(&self, credentials: &Credentials) -> anyhow::Result<RecognitionStatus>;

    /// Speaks `text` with `voice_name` on the default output device.
    async fn synthesize(
        &self,
        credentials: &Credentials,
        text: &str,
        voice_name: &str,
    ) -> anyhow::Result<SynthesisStatus>;
}

/// Errors surfaced by the bridge. Each maps to a dedicated error envelope.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Azure Speech not configured")]
    NotConfigured,
    /// The capability itself failed.
    #[error("{0}")]
    Capability(String),
    /// Synthesis ran but did not complete.
    #[error("Synthesis failed: {reason}")]
    Rejected { reason: String, text: String },
}

/// A recognition attempt that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub transcript: String,
    pub response: IntentResult,
    pub success: bool,
}

pub struct SpeechBridge {
    capability: Arc<dyn SpeechCapability>,
    credentials: CredentialHandle,
    interpreter: CommandInterpreter,
}

impl SpeechBridge {
    pub fn new(
        capability: Arc<dyn SpeechCapability>,
        credentials: CredentialHandle,
        interpreter: CommandInterpreter,
    ) -> Self {
        Self {
            capability,
            credentials,
            interpreter,
        }
    }

    /// Whether the current credentials allow calling the provider.
    pub fn is_configured(&self) -> bool {
        self.credentials.snapshot().is_configured()
    }

    fn configured_credentials(&self) -> Result<Arc<Credentials>, SpeechError> {
        let credentials = self.credentials.snapshot();
        if credentials.is_configured() {
            Ok(credentials)
        } else {
            Err(SpeechError::NotConfigured)
        }
    }

    /// Records one utterance and interprets its transcript.
    pub async fn recognize(&self) -> Result<Recognition, SpeechError> {
        let credentials = self.configured_credentials()?;
        let status = self
            .capability
            .recognize_once(&credentials)
            .await
            .map_err(|e| {
                warn!(error = ?e, "Speech recognition failed");
                SpeechError::Capability(e.to_string())
            })?;

        match status {
            RecognitionStatus::Recognized(transcript) if !transcript.trim().is_empty() => {
                let response = self.interpreter.interpret(&transcript);
                Ok(Recognition {
                    transcript,
                    response,
                    success: true,
                })
            }
            RecognitionStatus::Recognized(_) => Ok(Self::no_match()),
            RecognitionStatus::NoMatch(reason) => {
                debug!(%reason, "No speech recognized");
                Ok(Self::no_match())
            }
        }
    }

    fn no_match() -> Recognition {
        Recognition {
            transcript: String::new(),
            response: IntentResult::failed(CommandType::Error, NO_MATCH_TEXT),
            success: false,
        }
    }

    /// Speaks `text`, returning the text that was synthesized.
    pub async fn synthesize(&self, text: &str, voice_name: &str) -> Result<String, SpeechError> {
        let credentials = self.configured_credentials()?;
        let status = self
            .capability
            .synthesize(&credentials, text, voice_name)
            .await
            .map_err(|e| {
                warn!(error = ?e, voice = %voice_name, "Speech synthesis failed");
                SpeechError::Capability(e.to_string())
            })?;

        match status {
            SynthesisStatus::Completed => Ok(text.to_string()),
            SynthesisStatus::Canceled(reason) => Err(SpeechError::Rejected {
                reason,
                text: text.to_string(),
            }),
        }
    }
}
