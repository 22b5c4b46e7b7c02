//! Websocket endpoint: command intake and topic delivery.
//!
//! Clients connect to `GET /ws`, optionally naming the topics they want
//! as a comma-separated query string (`/ws?events,logs`); with no query
//! they receive all three topics. Each connection registers a mailbox
//! with the broadcaster; this task is the only place the socket is ever
//! written, so the broadcaster's fan-out thread never touches it.
//!
//! Inbound text frames are handed to the command router. Malformed
//! frames are swallowed there -- the client is never answered on this
//! path.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use arenaviz_core::commands::route_message;
use arenaviz_types::Topic;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, RawQuery, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a websocket connection.
///
/// # Route
///
/// `GET /ws[?topic,topic,...]`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    RawQuery(query): RawQuery,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let topics = parse_topics(query.as_deref());
    ws.on_upgrade(move |socket| handle_ws(socket, state, topics, addr))
}

/// Select topics from the query string.
///
/// No query (or a blank one) means all topics. Unknown tokens are logged
/// and skipped; a client that names only unknown topics receives nothing,
/// which is its own doing.
fn parse_topics(query: Option<&str>) -> HashSet<Topic> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Topic::ALL.into_iter().collect();
    };

    let mut topics = HashSet::new();
    for token in query.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match Topic::parse(token) {
            Some(topic) => {
                topics.insert(topic);
            }
            None => warn!(token, "ignoring unknown subscription topic"),
        }
    }
    topics
}

/// Drive one websocket connection until it closes.
async fn handle_ws(
    mut socket: WebSocket,
    state: Arc<AppState>,
    topics: HashSet<Topic>,
    addr: SocketAddr,
) {
    let peer = addr.to_string();
    let (client_id, mut mailbox) = state.broadcaster.register_client(topics);
    debug!(client_id, %peer, "websocket client connected");

    loop {
        tokio::select! {
            // Outbound: frames posted into this connection's mailbox by
            // the broadcast loop.
            frame = mailbox.recv() => {
                match frame {
                    Some(frame) => {
                        let message = Message::Text(frame.payload.as_ref().into());
                        if socket.send(message).await.is_err() {
                            debug!(client_id, "websocket client disconnected (send failed)");
                            break;
                        }
                    }
                    None => {
                        debug!(client_id, "mailbox closed, shutting down websocket");
                        break;
                    }
                }
            }
            // Inbound: commands, pings, close.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        route_message(&state.controller, state.hook.as_ref(), &peer, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(client_id, "websocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(client_id, "websocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(client_id, error = %e, "websocket error");
                        break;
                    }
                    _ => {
                        // Binary and pong frames are ignored.
                    }
                }
            }
        }
    }

    state.broadcaster.unregister_client(client_id);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn no_query_subscribes_to_everything() {
        let topics = parse_topics(None);
        assert_eq!(topics.len(), 3);
    }

    #[test]
    fn blank_query_subscribes_to_everything() {
        assert_eq!(parse_topics(Some("   ")).len(), 3);
    }

    #[test]
    fn query_selects_named_topics() {
        let topics = parse_topics(Some("events,logs"));
        assert_eq!(topics.len(), 2);
        assert!(topics.contains(&Topic::Events));
        assert!(topics.contains(&Topic::Logs));
        assert!(!topics.contains(&Topic::Broadcasts));
    }

    #[test]
    fn singular_broadcast_spelling_is_accepted() {
        let topics = parse_topics(Some("broadcast"));
        assert!(topics.contains(&Topic::Broadcasts));
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let topics = parse_topics(Some("events,metrics"));
        assert_eq!(topics.len(), 1);
        assert!(topics.contains(&Topic::Events));
    }
}
