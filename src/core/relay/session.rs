//! Event loop for one call.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    CallerInbound, CallerLink, CallerOutbound, InboundFrame, RelayConfig, RelayError, Side,
    WEBSOCKET_CONNECTED_EVENT, classify_frame,
};
use crate::core::realtime::openai::{ConversationItem, SessionConfig};
use crate::core::realtime::{
    ClientEvent, ConnectionState, RealtimeInbound, RealtimeLink, ServerEvent,
};
use crate::core::tools::ToolRegistry;
use crate::core::turn::{TurnCommand, TurnController};

/// AI event types logged at info level; everything else is traced.
const LOGGED_EVENT_TYPES: &[&str] = &[
    "response.content.done",
    "response.created",
    "response.done",
    "response.audio_transcript.done",
    "response.function_call_arguments.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
    "session.updated",
    "conversation.item.created",
    "conversation.item.truncated",
];

const TOOL_OUTCOME_CAPACITY: usize = 8;

/// Time allowed for the caller writer to accept the close instruction.
const CALLER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Caller socket closed
    CallerHangup,
    /// AI transport closed; `reason` is set for failures
    AiClosed { reason: Option<String> },
    /// A send to one side failed
    TransportLost(Side),
}

#[derive(Debug)]
struct ToolOutcome {
    call_id: String,
    name: String,
    output: String,
}

#[derive(Debug, Default)]
struct SessionStats {
    caller_frames: u64,
    frames_played: u64,
    interruptions: u64,
    tool_calls: u64,
}

/// Only used to name events the relay does not model.
#[derive(Deserialize)]
struct EventEnvelope<'a> {
    #[serde(rename = "type", borrow)]
    event_type: Cow<'a, str>,
}

/// Relay between one caller media stream and one AI session.
#[derive(Debug)]
pub struct SessionRelay {
    session_id: Uuid,
    config: RelayConfig,
    session: SessionConfig,
    tools: Arc<ToolRegistry>,
    caller: CallerLink,
    ai: RealtimeLink,
    ai_state: ConnectionState,
    turn: TurnController,
    /// call_id -> function name, from `response.output_item.added`
    pending_calls: HashMap<String, String>,
    tool_tx: mpsc::Sender<ToolOutcome>,
    tool_rx: mpsc::Receiver<ToolOutcome>,
    session_update_at: Option<Instant>,
    greeting_at: Option<Instant>,
    pacing: Option<Interval>,
    stats: SessionStats,
}

impl SessionRelay {
    /// `session` is the payload sent with `session.update`.
    pub fn new(
        session_id: Uuid,
        config: &RelayConfig,
        session: SessionConfig,
        tools: Arc<ToolRegistry>,
        caller: CallerLink,
        ai: RealtimeLink,
    ) -> Result<Self, RelayError> {
        let turn = config.turn_controller()?;
        let (tool_tx, tool_rx) = mpsc::channel(TOOL_OUTCOME_CAPACITY);

        Ok(Self {
            session_id,
            config: config.clone(),
            session,
            tools,
            caller,
            ai,
            ai_state: ConnectionState::Connecting,
            turn,
            pending_calls: HashMap::new(),
            tool_tx,
            tool_rx,
            session_update_at: None,
            greeting_at: None,
            pacing: None,
            stats: SessionStats::default(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn ai_state(&self) -> ConnectionState {
        self.ai_state
    }

    /// Run until either side closes. Both transports are closed on return.
    pub async fn run(mut self) -> CloseReason {
        tracing::info!(session_id = %self.session_id, "Session started");

        let reason = loop {
            let step = tokio::select! {
                inbound = self.caller.inbound.recv() => match inbound {
                    Some(CallerInbound::Frame(payload)) => self.on_caller_frame(&payload).await,
                    Some(CallerInbound::Closed) | None => break CloseReason::CallerHangup,
                },
                inbound = self.ai.recv() => match inbound {
                    Some(RealtimeInbound::Opened) => {
                        self.on_ai_opened();
                        Ok(())
                    }
                    Some(RealtimeInbound::Event(text)) => self.on_ai_event(&text).await,
                    Some(RealtimeInbound::Closed { reason }) => break CloseReason::AiClosed { reason },
                    None => break CloseReason::AiClosed { reason: None },
                },
                Some(outcome) = self.tool_rx.recv() => self.on_tool_outcome(outcome).await,
                _ = until(self.session_update_at) => {
                    self.session_update_at = None;
                    self.send_session_update().await
                }
                _ = until(self.greeting_at) => {
                    self.greeting_at = None;
                    self.send_greeting().await
                }
                _ = tick(&mut self.pacing) => {
                    let commands = self.turn.on_pacing_tick();
                    self.apply(commands).await
                }
            };

            if let Err(e) = step
                && let Some(reason) = self.settle(e)
            {
                break reason;
            }
        };

        self.teardown(&reason).await;
        reason
    }

    /// Log a per-message failure. Returns a close reason when the session
    /// cannot continue.
    fn settle(&self, error: RelayError) -> Option<CloseReason> {
        match error {
            RelayError::TransportClosed(side) => {
                tracing::debug!(side = %side, "Transport closed while sending");
                Some(CloseReason::TransportLost(side))
            }
            RelayError::UnhandledMessage { reason, raw } => {
                tracing::warn!(raw = %raw, "Unhandled message: {}", reason);
                None
            }
            RelayError::Audio(e) => {
                tracing::warn!("Dropped audio message: {}", e);
                None
            }
            other => {
                tracing::error!(error = %other, "Failed to process message");
                None
            }
        }
    }

    async fn teardown(&mut self, reason: &CloseReason) {
        self.pacing = None;
        self.session_update_at = None;
        self.greeting_at = None;

        if self.ai_state != ConnectionState::Closed {
            self.ai_state = ConnectionState::Closed;
            self.ai.close();
        }
        self.close_caller().await;

        tracing::info!(
            reason = ?reason,
            caller_frames = self.stats.caller_frames,
            frames_played = self.stats.frames_played,
            interruptions = self.stats.interruptions,
            tool_calls = self.stats.tool_calls,
            "Session ended"
        );
    }

    /// Queue the close instruction behind any frames still in flight.
    async fn close_caller(&self) {
        match time::timeout(
            CALLER_CLOSE_TIMEOUT,
            self.caller.outbound.send(CallerOutbound::Close),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::debug!("Caller writer already gone"),
            Err(_) => tracing::warn!(
                timeout_ms = CALLER_CLOSE_TIMEOUT.as_millis() as u64,
                "Caller writer stalled, close not delivered"
            ),
        }
    }

    // =========================================================================
    // Caller side
    // =========================================================================

    async fn on_caller_frame(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        match classify_frame(payload) {
            InboundFrame::Lifecycle(event) if event == WEBSOCKET_CONNECTED_EVENT => {
                tracing::info!(event = %event, "Media stream connected");
                Ok(())
            }
            InboundFrame::Lifecycle(event) => {
                tracing::debug!(event = %event, "Media stream event");
                Ok(())
            }
            InboundFrame::Audio => {
                self.stats.caller_frames += 1;
                if self.ai_state != ConnectionState::Open {
                    tracing::trace!(state = %self.ai_state, bytes = payload.len(), "Dropping caller audio");
                    return Ok(());
                }
                self.turn.note_input_audio(payload.len());
                self.ai_send(ClientEvent::audio_append(payload)).await
            }
        }
    }

    async fn caller_send(&self, message: CallerOutbound) -> Result<(), RelayError> {
        self.caller
            .outbound
            .send(message)
            .await
            .map_err(|_| RelayError::TransportClosed(Side::Caller))
    }

    // =========================================================================
    // AI side
    // =========================================================================

    fn on_ai_opened(&mut self) {
        tracing::info!("AI transport open");
        self.ai_state = ConnectionState::Open;

        let now = Instant::now();
        self.session_update_at = Some(now + self.config.session_update_delay());
        if self.config.send_greeting {
            self.greeting_at = Some(now + self.config.greeting_delay());
        }
    }

    async fn ai_send(&self, event: ClientEvent) -> Result<(), RelayError> {
        tracing::trace!(event_type = event.event_type(), "Sending AI event");
        self.ai
            .send(event)
            .await
            .map_err(|_| RelayError::TransportClosed(Side::Ai))
    }

    async fn send_session_update(&mut self) -> Result<(), RelayError> {
        tracing::info!(
            voice = ?self.session.voice,
            tools = self.session.tools.as_ref().map_or(0, Vec::len),
            "Sending session update"
        );
        let session = self.session.clone();
        self.ai_send(ClientEvent::SessionUpdate { session }).await
    }

    async fn send_greeting(&mut self) -> Result<(), RelayError> {
        tracing::info!("Requesting initial greeting");
        self.ai_send(ClientEvent::ResponseCreate { response: None })
            .await
    }

    async fn on_ai_event(&mut self, text: &str) -> Result<(), RelayError> {
        let event: ServerEvent =
            serde_json::from_str(text).map_err(|e| RelayError::UnhandledMessage {
                reason: e.to_string(),
                raw: text.to_string(),
            })?;

        let event_type = match &event {
            ServerEvent::Unknown => serde_json::from_str::<EventEnvelope>(text)
                .map(|envelope| envelope.event_type.into_owned())
                .unwrap_or_default(),
            known => known.event_type().to_string(),
        };
        if LOGGED_EVENT_TYPES.contains(&event_type.as_str()) {
            tracing::info!(event_type = %event_type, "Received AI event");
        } else {
            tracing::trace!(event_type = %event_type, "Received AI event");
        }

        match event {
            ServerEvent::Error { error } => {
                tracing::warn!(
                    error_type = %error.error_type,
                    code = ?error.code,
                    param = ?error.param,
                    message = %error.message,
                    "AI reported an error"
                );
                if !error.concerns_truncation() {
                    return Ok(());
                }
                let commands = self.turn.on_truncate_rejected();
                self.apply(commands).await
            }
            ServerEvent::SessionCreated { session } => {
                tracing::debug!(ai_session_id = ?session.id, model = ?session.model, "AI session created");
                Ok(())
            }
            ServerEvent::SessionUpdated { .. } => {
                tracing::debug!("Session configuration applied");
                Ok(())
            }
            ServerEvent::ConversationItemCreated { item } => {
                self.track_function_call(&item);
                match item.id.as_deref() {
                    Some(item_id) => {
                        let commands = self.turn.on_item_created(item_id, item.role.as_deref());
                        self.apply(commands).await
                    }
                    None => Ok(()),
                }
            }
            ServerEvent::OutputItemAdded { item } => {
                self.track_function_call(&item);
                Ok(())
            }
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                let audio = ServerEvent::decode_audio_delta(&delta).map_err(|e| {
                    RelayError::UnhandledMessage {
                        reason: format!("invalid audio delta: {e}"),
                        raw: format!("item_id={item_id}, {} base64 chars", delta.len()),
                    }
                })?;
                let commands = self.turn.on_audio_delta(&item_id, &audio, Instant::now())?;
                self.apply(commands).await
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                let commands = self.turn.on_speech_started(audio_start_ms, Instant::now());
                if !commands.is_empty() {
                    self.stats.interruptions += 1;
                }
                self.apply(commands).await
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                tracing::debug!(audio_end_ms = ?audio_end_ms, "Caller stopped speaking");
                Ok(())
            }
            ServerEvent::ConversationItemTruncated { item_id, .. } => {
                let commands = self.turn.on_item_truncated(&item_id);
                self.apply(commands).await
            }
            ServerEvent::ResponseDone { response } => {
                tracing::debug!(response_id = ?response.id, status = ?response.status, "Response done");
                let commands = self.turn.on_response_done();
                self.apply(commands).await
            }
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                self.on_function_call(call_id, name, arguments);
                Ok(())
            }
            ServerEvent::TranscriptionCompleted { transcript, .. } => {
                tracing::info!(transcript = %transcript, "Caller said");
                Ok(())
            }
            ServerEvent::AudioTranscriptDone { transcript, .. } => {
                tracing::info!(transcript = %transcript, "Assistant said");
                Ok(())
            }
            ServerEvent::InputAudioBufferCommitted { .. }
            | ServerEvent::RateLimitsUpdated { .. }
            | ServerEvent::Unknown => Ok(()),
        }
    }

    /// Execute turn controller commands in order.
    async fn apply(&mut self, commands: Vec<TurnCommand>) -> Result<(), RelayError> {
        for command in commands {
            match command {
                TurnCommand::PlayFrame(frame) => {
                    self.stats.frames_played += 1;
                    self.caller_send(CallerOutbound::Audio(frame)).await?;
                }
                TurnCommand::ClearPlayback => self.caller_send(CallerOutbound::Clear).await?,
                TurnCommand::Truncate {
                    item_id,
                    audio_end_ms,
                } => {
                    self.ai_send(ClientEvent::truncate(item_id, audio_end_ms))
                        .await?
                }
                TurnCommand::StartPacing => self.start_pacing(),
                TurnCommand::StopPacing => self.pacing = None,
            }
        }
        Ok(())
    }

    fn start_pacing(&mut self) {
        if self.pacing.is_some() {
            return;
        }
        if let Some(period) = self.config.delivery.interval() {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.pacing = Some(interval);
        }
    }

    // =========================================================================
    // Tools
    // =========================================================================

    fn track_function_call(&mut self, item: &ConversationItem) {
        if item.item_type != "function_call" {
            return;
        }
        if let (Some(call_id), Some(name)) = (&item.call_id, &item.name) {
            self.pending_calls.insert(call_id.clone(), name.clone());
        }
    }

    fn on_function_call(&mut self, call_id: String, name: Option<String>, arguments: String) {
        let announced = self.pending_calls.remove(&call_id);
        let Some(name) = name.or(announced) else {
            tracing::warn!(call_id = %call_id, "Function call without a name, ignoring");
            return;
        };
        if !self.tools.contains(&name) {
            tracing::warn!(tool = %name, call_id = %call_id, "Unknown tool requested, ignoring");
            return;
        }

        tracing::info!(tool = %name, call_id = %call_id, "Invoking tool");
        self.stats.tool_calls += 1;

        let tools = self.tools.clone();
        let outcomes = self.tool_tx.clone();
        tokio::spawn(
            async move {
                let output = tools.invoke_soft(&name, &arguments).await;
                let _ = outcomes
                    .send(ToolOutcome {
                        call_id,
                        name,
                        output,
                    })
                    .await;
            }
            .in_current_span(),
        );
    }

    async fn on_tool_outcome(&mut self, outcome: ToolOutcome) -> Result<(), RelayError> {
        tracing::debug!(tool = %outcome.name, call_id = %outcome.call_id, output = %outcome.output, "Tool finished");

        // The model receives the output as a JSON string
        let output = serde_json::Value::String(outcome.output).to_string();
        self.ai_send(ClientEvent::ConversationItemCreate {
            item: ConversationItem::function_call_output(outcome.call_id, output),
        })
        .await?;
        self.ai_send(ClientEvent::ResponseCreate { response: None })
            .await
    }
}

/// Resolves at `deadline`, never when there is none.
async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Next pacing tick, never when pacing is off.
async fn tick(pacing: &mut Option<Interval>) {
    match pacing {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
