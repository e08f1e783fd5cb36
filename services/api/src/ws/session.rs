//! Manages the WebSocket connection lifecycle and routes each inbound frame.

use super::{
    connection::{self, Connection},
    protocol::{ClientMessage, ServerMessage},
    timer,
};
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vox_core::{IntentResult, speech::SpeechError};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Runs one connection from upgrade to close.
#[instrument(name = "ws_session", skip_all, fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (connection, socket_rx, _writer) = connection::attach(socket);
    tracing::Span::current().record("connection_id", tracing::field::display(connection.id()));
    info!("New WebSocket connection.");

    Dispatcher::new(state).run(connection, socket_rx).await;
}

/// Routes decoded client messages to the interpreter, the speech bridge,
/// the credential manager and the timer scheduler.
pub struct Dispatcher {
    state: Arc<AppState>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Reads frames until the client goes away, then closes `connection`.
    ///
    /// Frames are handled one at a time. Timers keep running in the
    /// background and never hold up the loop.
    pub async fn run<S>(&self, connection: Connection, mut inbound: S)
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        while let Some(frame) = inbound.next().await {
            match frame {
                Ok(Message::Text(text)) => self.handle_frame(&connection, text.as_str()).await,
                Ok(Message::Binary(_)) => debug!("Ignoring binary frame."),
                Ok(Message::Close(_)) => {
                    info!("Client sent close frame. Shutting down session.");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    debug!(error = %e, "WebSocket receive failed, closing session.");
                    break;
                }
            }
        }

        connection.close();
        info!(
            outstanding_timers = connection.timers().outstanding(),
            "WebSocket connection closed."
        );
    }

    /// Decodes one text frame and handles it. Undecodable frames are dropped.
    pub async fn handle_frame(&self, connection: &Connection, text: &str) {
        let msg = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed frame.");
                return;
            }
        };

        match msg {
            ClientMessage::AzureRecognize => self.recognize(connection).await,
            ClientMessage::AzureSynthesize { text, voice_name } => {
                self.synthesize(connection, &text, voice_name.as_deref())
                    .await
            }
            ClientMessage::ProcessCommand { command } => {
                self.process_command(connection, &command).await
            }
            ClientMessage::StartTimer { duration } => {
                timer::arm(connection, duration);
            }
            ClientMessage::UpdateAzureCredentials { key, region } => {
                self.update_credentials(connection, &key, &region).await
            }
            ClientMessage::Unknown => debug!("Ignoring frame with unknown type."),
        }
    }

    async fn recognize(&self, connection: &Connection) {
        let reply = match self.state.speech.recognize().await {
            Ok(recognition) => {
                info!(
                    transcript = %recognition.transcript,
                    command_type = %recognition.response.command_type,
                    "Speech recognized."
                );
                arm_if_timer(connection, &recognition.response);
                ServerMessage::AzureRecognitionResult {
                    transcript: recognition.transcript,
                    response: recognition.response,
                    success: recognition.success,
                }
            }
            Err(e) => ServerMessage::AzureRecognitionError {
                error: e.to_string(),
            },
        };
        send(connection, reply).await;
    }

    async fn synthesize(&self, connection: &Connection, text: &str, voice_name: Option<&str>) {
        let voice_name = voice_name.unwrap_or(&self.state.config.default_voice);
        let reply = match self.state.speech.synthesize(text, voice_name).await {
            Ok(text) => ServerMessage::AzureSynthesisComplete {
                text,
                success: true,
            },
            Err(e) => {
                let error = e.to_string();
                // Only a rejected synthesis echoes the text back.
                let text = match e {
                    SpeechError::Rejected { text, .. } => Some(text),
                    _ => None,
                };
                ServerMessage::AzureSynthesisError { error, text }
            }
        };
        send(connection, reply).await;
    }

    async fn process_command(&self, connection: &Connection, command: &str) {
        let intent = self.state.interpreter.interpret(command);
        debug!(%command, command_type = %intent.command_type, "Command interpreted.");
        arm_if_timer(connection, &intent);
        send(connection, ServerMessage::response(&intent)).await;
    }

    async fn update_credentials(&self, connection: &Connection, key: &str, region: &str) {
        let reply = match self.state.credentials.apply(key, region).await {
            Ok(()) => ServerMessage::AzureCredentialsUpdated {
                success: true,
                message: "Azure credentials updated successfully!".to_string(),
            },
            Err(e) => {
                warn!(error = %e, "Credential update rejected.");
                ServerMessage::AzureCredentialsError {
                    success: false,
                    error: e.to_string(),
                }
            }
        };
        send(connection, reply).await;
    }
}

fn arm_if_timer(connection: &Connection, intent: &IntentResult) {
    if let Some(duration) = intent.timer_duration() {
        timer::arm(connection, duration);
    }
}

/// Queues `msg`, dropping it if the connection has closed.
async fn send(connection: &Connection, msg: ServerMessage) {
    let kind = msg.kind();
    if let Err(e) = connection.send(msg).await {
        debug!(kind, error = %e, "Dropping outbound message.");
    }
}
