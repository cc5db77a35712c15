//! Caller media WebSocket.
//!
//! Vonage connects here after the `/answer` NCCO. Binary frames carry
//! 16 kHz PCM16; text frames carry lifecycle notices. Each connection gets a
//! fresh realtime AI link and one [`SessionRelay`].

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use futures::stream::SplitSink;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::relay::{
    CallerInbound, CallerLink, CallerOutbound, CallerRemote, CloseReason, SessionRelay,
};
use crate::state::AppState;

/// Channel capacity between the socket and the relay.
const CHANNEL_BUFFER_SIZE: usize = 512;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Time allowed for the writer to flush the close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream connection upgrade requested");
    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let session_id = Uuid::new_v4();
            handle_media_socket(socket, state, session_id)
                .instrument(info_span!("session", %session_id))
        })
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>, session_id: Uuid) {
    info!("Caller connected");

    let (sender, mut receiver) = socket.split();
    let (caller, remote) = CallerLink::channel(CHANNEL_BUFFER_SIZE);
    let CallerRemote { inbound, outbound } = remote;
    let mut writer = tokio::spawn(write_caller(sender, outbound).in_current_span());

    let relay = match state.connector.connect().await {
        Ok(ai) => SessionRelay::new(
            session_id,
            &state.config.relay,
            state.session.clone(),
            state.tools.clone(),
            caller,
            ai,
        ),
        Err(e) => {
            error!(provider = state.connector.provider(), "Failed to connect to realtime AI: {}", e);
            let _ = caller.outbound.send(CallerOutbound::Close).await;
            drain_writer(&mut writer).await;
            return;
        }
    };
    let relay = match relay {
        Ok(relay) => relay,
        Err(e) => {
            // The writer ends once the dropped relay releases its sender.
            error!("Failed to start session relay: {}", e);
            drain_writer(&mut writer).await;
            return;
        }
    };

    let mut relay_task = tokio::spawn(relay.run().in_current_span());

    let reason = loop {
        select! {
            result = &mut relay_task => break result.ok(),
            msg = receiver.next() => {
                let frame = match msg {
                    Some(Ok(Message::Binary(data))) => data,
                    Some(Ok(Message::Text(text))) => Bytes::copy_from_slice(text.as_str().as_bytes()),
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Caller closed the media stream");
                        let _ = inbound.send(CallerInbound::Closed).await;
                        break (&mut relay_task).await.ok();
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Media stream error: {}", e);
                        let _ = inbound.send(CallerInbound::Closed).await;
                        break (&mut relay_task).await.ok();
                    }
                };
                if inbound.send(CallerInbound::Frame(frame)).await.is_err() {
                    break (&mut relay_task).await.ok();
                }
            }
        }
    };

    match reason {
        Some(CloseReason::CallerHangup) => info!("Session ended: caller hung up"),
        Some(CloseReason::AiClosed { reason }) => {
            info!(reason = reason.as_deref().unwrap_or("none"), "Session ended: AI closed")
        }
        Some(CloseReason::TransportLost(side)) => warn!("Session ended: {} transport lost", side),
        None => error!("Session relay task failed"),
    }

    drain_writer(&mut writer).await;
    info!("Media stream connection terminated");
}

/// Forward relay output to the socket until `Close` or the channel ends.
async fn write_caller(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<CallerOutbound>,
) {
    while let Some(message) = outbound.recv().await {
        let result = match message {
            CallerOutbound::Audio(frame) => sender.send(Message::Binary(frame)).await,
            CallerOutbound::Clear => {
                debug!("Clearing caller playback");
                sender
                    .send(Message::Text(CallerOutbound::CLEAR_PAYLOAD.to_string().into()))
                    .await
            }
            CallerOutbound::Close => {
                debug!("Closing media stream");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        };

        if let Err(e) = result {
            warn!("Failed to write to media stream: {}", e);
            break;
        }
    }
}

async fn drain_writer(writer: &mut tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut *writer).await.is_err() {
        writer.abort();
    }
}
