//! WebSocket upgrade handler and per-connection pumps

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::hitscan::HitscanConfig;
use crate::game::session::{GameSession, Outgoing, PlayerInput, SessionHandle};
use crate::game::world::WorldConfig;
use crate::game::PlayerId;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Preferred display name
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.name, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, display_name: Option<String>, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    // Join an open session or start a fresh one
    let session = acquire_session(&state);
    let intent_tx = session.intent_tx.clone();
    let outgoing_rx = session.outgoing_tx.subscribe();

    run_connection(player_id, display_name, ws_sink, ws_stream, &intent_tx, outgoing_rx).await;

    // The session removes the character and announces the departure
    let _ = intent_tx
        .send(PlayerInput {
            player_id,
            msg: ClientMsg::Leave,
        })
        .await;

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Find a session with a free slot, or spawn a new one
fn acquire_session(state: &AppState) -> SessionHandle {
    let max_players = state.config.max_players_per_session;
    if let Some(handle) = state.sessions.find_available_session(max_players) {
        return handle;
    }

    let id = Uuid::new_v4();
    let config = WorldConfig {
        seed: rand::random(),
        hitscan: HitscanConfig {
            debug_traces: state.config.debug_weapon_traces,
            ..HitscanConfig::default()
        },
        ..WorldConfig::default()
    };
    let (session, handle) = GameSession::new(id, config, max_players);
    state.sessions.insert(handle.clone());

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        session.run().await;
        sessions.remove(&id);
        info!(session_id = %id, "Session removed from registry");
    });

    info!(session_id = %id, "Session created");
    handle
}

/// Pump the connection: reader forwards intents, writer filters scoped
/// messages down to this player.
async fn run_connection(
    player_id: PlayerId,
    display_name: Option<String>,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    intent_tx: &mpsc::Sender<PlayerInput>,
    mut outgoing_rx: broadcast::Receiver<Outgoing>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    let writer_handle = tokio::spawn(async move {
        loop {
            match outgoing_rx.recv().await {
                Ok(out) => {
                    // Delivery scope enforcement happens here, per connection
                    if !out.scope.includes(player_id) {
                        continue;
                    }
                    if let Err(e) = send_msg(&mut ws_sink, &out.msg).await {
                        debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Field updates carry versions; a lagging client recovers
                    // from the next delivery of each field
                    warn!(player_id = %player_id, lagged_count = n, "Client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Session channel closed");
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_intent() {
                    warn!(player_id = %player_id, "Rate limited intent message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(mut msg) => {
                        if let ClientMsg::Join { display_name: name } = &mut msg {
                            if name.is_none() {
                                *name = display_name.clone();
                            }
                        }
                        if intent_tx.send(PlayerInput { player_id, msg }).await.is_err() {
                            debug!(player_id = %player_id, "Intent channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
