//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! Every frame is a JSON object whose `type` field names the envelope kind.

use serde::{Deserialize, Serialize};
use vox_core::{
    CommandType, IntentResult, credentials::DEFAULT_REGION, intent::timer_finished_text,
    interpreter::DEFAULT_TIMER_SECONDS,
};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Listen once on the server's microphone and interpret what was said.
    AzureRecognize,
    /// Speak `text` on the server's speakers.
    AzureSynthesize {
        text: String,
        #[serde(default)]
        voice_name: Option<String>,
    },
    /// Interpret a typed command.
    ProcessCommand { command: String },
    /// Arm a timer without interpreting anything. Duration is in seconds.
    StartTimer {
        #[serde(default = "default_timer_duration")]
        duration: u64,
    },
    /// Replace the speech provider credentials.
    UpdateAzureCredentials {
        #[serde(default)]
        key: String,
        #[serde(default = "default_region")]
        region: String,
    },
    /// Any `type` this server does not know. Ignored.
    #[serde(other)]
    Unknown,
}

fn default_timer_duration() -> u64 {
    DEFAULT_TIMER_SECONDS
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The outcome of a recognize request, with the interpreted transcript.
    AzureRecognitionResult {
        transcript: String,
        response: IntentResult,
        success: bool,
    },
    AzureRecognitionError { error: String },
    AzureSynthesisComplete { text: String, success: bool },
    AzureSynthesisError {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// The interpreter's answer to a `process_command`.
    Response {
        text: String,
        success: bool,
        command_type: CommandType,
    },
    TimerComplete { text: String, success: bool },
    AzureCredentialsUpdated { success: bool, message: String },
    AzureCredentialsError { success: bool, error: String },
}

impl ServerMessage {
    pub fn response(intent: &IntentResult) -> Self {
        ServerMessage::Response {
            text: intent.text.clone(),
            success: intent.success,
            command_type: intent.command_type,
        }
    }

    pub fn timer_complete(duration: u64) -> Self {
        ServerMessage::TimerComplete {
            text: timer_finished_text(duration),
            success: true,
        }
    }

    /// The envelope kind, as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::AzureRecognitionResult { .. } => "azure_recognition_result",
            ServerMessage::AzureRecognitionError { .. } => "azure_recognition_error",
            ServerMessage::AzureSynthesisComplete { .. } => "azure_synthesis_complete",
            ServerMessage::AzureSynthesisError { .. } => "azure_synthesis_error",
            ServerMessage::Response { .. } => "response",
            ServerMessage::TimerComplete { .. } => "timer_complete",
            ServerMessage::AzureCredentialsUpdated { .. } => "azure_credentials_updated",
            ServerMessage::AzureCredentialsError { .. } => "azure_credentials_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn decode(value: Value) -> ClientMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_message_kinds() {
        assert_eq!(
            decode(json!({"type": "azure_recognize"})),
            ClientMessage::AzureRecognize
        );
        assert_eq!(
            decode(json!({"type": "azure_synthesize", "text": "hi"})),
            ClientMessage::AzureSynthesize {
                text: "hi".into(),
                voice_name: None
            }
        );
        assert_eq!(
            decode(json!({"type": "process_command", "command": "help"})),
            ClientMessage::ProcessCommand {
                command: "help".into()
            }
        );
    }

    #[test]
    fn test_client_message_defaults() {
        assert_eq!(
            decode(json!({"type": "start_timer"})),
            ClientMessage::StartTimer { duration: 60 }
        );
        assert_eq!(
            decode(json!({"type": "update_azure_credentials", "key": "k"})),
            ClientMessage::UpdateAzureCredentials {
                key: "k".into(),
                region: "japaneast".into()
            }
        );
        assert_eq!(
            decode(json!({"type": "update_azure_credentials"})),
            ClientMessage::UpdateAzureCredentials {
                key: String::new(),
                region: "japaneast".into()
            }
        );
    }

    #[test]
    fn test_unknown_kind_decodes_to_unknown() {
        assert_eq!(
            decode(json!({"type": "reboot_server", "now": true})),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn test_malformed_frames_fail_to_decode() {
        for raw in [
            r#"{"type": "process_command"}"#,
            r#"{"type": "start_timer", "duration": -5}"#,
            r#"{"command": "help"}"#,
            "not json",
        ] {
            assert!(serde_json::from_str::<ClientMessage>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_server_message_wire_shape() {
        let intent = IntentResult::ok(CommandType::Joke, "knock knock");
        let json = serde_json::to_value(ServerMessage::response(&intent)).unwrap();
        assert_eq!(
            json,
            json!({"type": "response", "text": "knock knock", "success": true, "command_type": "joke"})
        );

        let json = serde_json::to_value(ServerMessage::timer_complete(120)).unwrap();
        assert_eq!(
            json,
            json!({"type": "timer_complete", "text": "Timer finished! 2 minutes is up!", "success": true})
        );

        let json = serde_json::to_value(ServerMessage::AzureSynthesisError {
            error: "boom".into(),
            text: None,
        })
        .unwrap();
        assert_eq!(json, json!({"type": "azure_synthesis_error", "error": "boom"}));
    }

    #[test]
    fn test_recognition_result_nests_intent() {
        let msg = ServerMessage::AzureRecognitionResult {
            transcript: "set a timer for 2 minutes".into(),
            response: IntentResult::timer(120),
            success: true,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "azure_recognition_result");
        assert_eq!(json["response"]["command_type"], "timer");
        assert_eq!(json["response"]["duration"], 120);
        assert_eq!(json["type"], msg.kind());
    }
}
