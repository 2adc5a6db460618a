//! WebSocket server handler using Axum.

use crate::error::{GatewayError, Result};
use crate::protocol::{ClientCommand, ServerReply, Stream};
use crate::session::WsSession;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use feed::{FeedEngine, FeedSession};
use futures::{SinkExt, StreamExt};
use ledger_backend::MemoryBackend;
use ledger_model::Book;
use metrics::{counter, gauge};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub engine: Arc<FeedEngine>,
    pub backend: Arc<MemoryBackend>,
}

/// Create the gateway router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/ingest/ledger", post(crate::ingest::ingest_ledger))
        .route("/ingest/proposed", post(crate::ingest::ingest_proposed))
        .route("/ingest/manifest", post(crate::ingest::ingest_manifest))
        .route("/ingest/validation", post(crate::ingest::ingest_validation))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Health check handler: status plus the live subscription report.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "subscriptions": state.engine.report(),
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // The session's outbound FIFO: both command replies and feed payloads
    // funnel through here, so per-session delivery order is the enqueue
    // order.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let session = WsSession::new(tx);
    let session_id = session.id;

    counter!("gateway_connections_total").increment(1);
    gauge!("gateway_active_sessions").increment(1.0);
    info!(session = %session_id, "client connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut ping_interval = interval(Duration::from_secs(30));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        if let Err(e) = handle_message(&state, &session, msg).await {
                            warn!(session = %session_id, error = %e, "error handling message");
                            let _ = session.reply(&ServerReply::error(e));
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session = %session_id, error = %e, "websocket error");
                        break;
                    }
                    None => break,
                }
            }

            _ = ping_interval.tick() => {
                if session.enqueue(Message::Ping(vec![].into())).is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the session releases the registry's weak handles; counts
    // return to their pre-subscribe values on the next report.
    drop(session);
    send_task.abort();

    counter!("gateway_disconnections_total").increment(1);
    gauge!("gateway_active_sessions").decrement(1.0);
    info!(session = %session_id, "client disconnected");
}

/// Handle a single WebSocket frame.
async fn handle_message(
    state: &Arc<AppState>,
    session: &Arc<WsSession>,
    msg: Message,
) -> Result<()> {
    match msg {
        Message::Text(text) => {
            let command: ClientCommand = serde_json::from_str(&text)?;
            handle_command(state, session, command).await
        }
        Message::Binary(data) => {
            let command: ClientCommand = serde_json::from_slice(&data)?;
            handle_command(state, session, command).await
        }
        Message::Ping(data) => session.enqueue(Message::Pong(data)),
        Message::Pong(_) | Message::Close(_) => Ok(()),
    }
}

/// Handle a parsed client command.
async fn handle_command(
    state: &Arc<AppState>,
    session: &Arc<WsSession>,
    command: ClientCommand,
) -> Result<()> {
    match command {
        ClientCommand::Subscribe {
            streams,
            accounts,
            accounts_proposed,
            books,
            api_version,
        } => {
            if let Some(version) = api_version {
                session.set_api_version(version);
            }
            // Validate every book before touching the registry so a bad
            // command is all-or-nothing.
            let books: Vec<Book> = books
                .iter()
                .map(|spec| spec.to_book().map_err(GatewayError::InvalidTarget))
                .collect::<Result<_>>()?;

            let feed_session: Arc<dyn FeedSession> = session.clone();
            let mut ledger_window = None;
            for stream in &streams {
                match stream {
                    Stream::Ledger => {
                        ledger_window = Some(state.engine.sub_ledger(&feed_session).await?);
                    }
                    Stream::Transactions => {
                        state.engine.sub_transactions(&feed_session);
                    }
                    Stream::TransactionsProposed => {
                        state.engine.sub_proposed_transactions(&feed_session);
                    }
                    Stream::Manifests => {
                        state.engine.sub_manifests(&feed_session);
                    }
                    Stream::Validations => {
                        state.engine.sub_validations(&feed_session);
                    }
                    Stream::BookChanges => {
                        state.engine.sub_book_changes(&feed_session);
                    }
                }
            }
            for account in accounts {
                state.engine.sub_account(account, &feed_session);
            }
            for account in accounts_proposed {
                state.engine.sub_proposed_account(account, &feed_session);
            }
            for book in books {
                state.engine.sub_book(book, &feed_session);
            }

            counter!("gateway_subscribe_commands_total").increment(1);
            debug!(session = %session.id, "subscribed");
            session.reply(&ServerReply::Subscribed { result: ledger_window })
        }
        ClientCommand::Unsubscribe {
            streams,
            accounts,
            accounts_proposed,
            books,
        } => {
            let books: Vec<Book> = books
                .iter()
                .map(|spec| spec.to_book().map_err(GatewayError::InvalidTarget))
                .collect::<Result<_>>()?;

            let feed_session: Arc<dyn FeedSession> = session.clone();
            for stream in &streams {
                match stream {
                    Stream::Ledger => {
                        state.engine.unsub_ledger(&feed_session);
                    }
                    Stream::Transactions => {
                        state.engine.unsub_transactions(&feed_session);
                    }
                    Stream::TransactionsProposed => {
                        state.engine.unsub_proposed_transactions(&feed_session);
                    }
                    Stream::Manifests => {
                        state.engine.unsub_manifests(&feed_session);
                    }
                    Stream::Validations => {
                        state.engine.unsub_validations(&feed_session);
                    }
                    Stream::BookChanges => {
                        state.engine.unsub_book_changes(&feed_session);
                    }
                }
            }
            for account in &accounts {
                state.engine.unsub_account(account, &feed_session);
            }
            for account in &accounts_proposed {
                state.engine.unsub_proposed_account(account, &feed_session);
            }
            for book in &books {
                state.engine.unsub_book(book, &feed_session);
            }

            debug!(session = %session.id, "unsubscribed");
            session.reply(&ServerReply::Unsubscribed)
        }
        ClientCommand::Ping => session.reply(&ServerReply::Pong),
    }
}
