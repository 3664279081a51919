use crate::{
    game::{PointerEvent, PointerOutcome, Point, PuzzleSession, SettleTicket, Verdict},
    websocket::messages::{ClientMessage, ServerMessage},
    AppState,
};
use anyhow::anyhow;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Messages to send back for one client message, plus the deferred clear to
/// schedule if a gesture was released
#[derive(Debug, Default)]
pub struct Reply {
    pub messages: Vec<ServerMessage>,
    pub settle: Option<SettleTicket>,
}

/// WebSocket upgrade handler
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    let session = PuzzleSession::new(state.catalog.clone());
    let greeting = level_loaded(&session);
    state.sessions.insert(session_id, session);

    tracing::info!("Puzzle session {} started", session_id);

    // Spawn a task to send messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    let _ = tx.send(greeting).await;

    // Handle incoming messages from the client
    let state_for_recv = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        if let Err(e) =
                            handle_client_message(client_msg, &state_for_recv, session_id, &tx)
                                .await
                        {
                            tracing::error!("Error handling message: {}", e);
                            let error_msg = ServerMessage::Error {
                                message: e.to_string(),
                            };
                            let _ = tx.send(error_msg).await;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse message: {}", e);
                        let error_msg = ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        };
                        let _ = tx.send(error_msg).await;
                    }
                },
                Message::Close(_) => {
                    tracing::info!("Client closed puzzle session {}", session_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.sessions.remove(&session_id);

    tracing::info!("Puzzle session {} closed", session_id);
}

/// Apply a client message to the session and send the resulting updates
async fn handle_client_message(
    msg: ClientMessage,
    state: &Arc<AppState>,
    session_id: Uuid,
    tx: &mpsc::Sender<ServerMessage>,
) -> anyhow::Result<()> {
    // The session guard must be dropped before awaiting
    let reply = {
        let mut session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| anyhow!("puzzle session {} not found", session_id))?;
        apply_message(&mut session, msg)?
    };

    for message in reply.messages {
        tx.send(message).await?;
    }

    if let Some(ticket) = reply.settle {
        schedule_settle(state.clone(), session_id, ticket, tx.clone());
    }

    Ok(())
}

/// Run one client message against a session
pub fn apply_message(session: &mut PuzzleSession, msg: ClientMessage) -> anyhow::Result<Reply> {
    let outcome = match msg {
        ClientMessage::PointerDown { x, y } => {
            session.handle_pointer(PointerEvent::Down(Point::new(x, y)))
        }
        ClientMessage::PointerMove { x, y } => {
            session.handle_pointer(PointerEvent::Move(Point::new(x, y)))
        }
        ClientMessage::PointerUp => session.handle_pointer(PointerEvent::Up),
        ClientMessage::PointerLeave => session.handle_pointer(PointerEvent::Leave),
        ClientMessage::PressTile { tile } => session.press_tile(tile),
        ClientMessage::EnterTile { tile } => session.enter_tile(tile),
        ClientMessage::Release => session.release(),
        ClientMessage::Reset => {
            session.reset();
            tracing::info!("Level {} reset", session.level_index());
            return Ok(Reply {
                messages: vec![ServerMessage::AttemptCleared, progress(session)],
                settle: None,
            });
        }
        ClientMessage::Sync => {
            return Ok(Reply {
                messages: vec![ServerMessage::State {
                    level_index: session.level_index(),
                    snapshot: session.engine().snapshot(),
                }],
                settle: None,
            });
        }
        ClientMessage::SelectLevel { index } => {
            session.select_level(index)?;
            tracing::info!("Level {} ({}) selected", index, session.level().name());
            return Ok(Reply {
                messages: vec![level_loaded(session)],
                settle: None,
            });
        }
    };

    Ok(match outcome {
        PointerOutcome::Ignored | PointerOutcome::PointerMoved => Reply::default(),
        PointerOutcome::PathChanged => Reply {
            messages: vec![path_update(session)],
            settle: None,
        },
        PointerOutcome::Released(release) => {
            tracing::debug!(
                "Released `{}` (accepted: {})",
                release.verdict.word(),
                release.verdict.is_accepted()
            );
            let mut messages = Vec::new();
            match release.verdict {
                Verdict::Accepted(word) => {
                    let (found, total) = session.engine().progress();
                    messages.push(ServerMessage::WordAccepted { word, found, total });
                    messages.push(progress(session));
                    if session.engine().is_solved() {
                        tracing::info!("Level {} solved", session.level().name());
                        messages.push(ServerMessage::LevelSolved {
                            name: session.level().name().to_string(),
                        });
                    }
                }
                Verdict::Rejected(word) => {
                    messages.push(ServerMessage::WordRejected { word });
                }
            }
            Reply {
                messages,
                settle: Some(release.ticket),
            }
        }
    })
}

/// Clear the released attempt once the client has had time to show feedback
fn schedule_settle(
    state: Arc<AppState>,
    session_id: Uuid,
    ticket: SettleTicket,
    tx: mpsc::Sender<ServerMessage>,
) {
    let delay = state.config.feedback_delay();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let cleared = state
            .sessions
            .get_mut(&session_id)
            .map(|mut session| session.settle(ticket))
            .unwrap_or(false);

        if cleared {
            let _ = tx.send(ServerMessage::AttemptCleared).await;
        }
    });
}

fn level_loaded(session: &PuzzleSession) -> ServerMessage {
    let level = session.level();
    ServerMessage::LevelLoaded {
        index: session.level_index(),
        name: level.name().to_string(),
        letters: level.letters().to_vec(),
        total_words: level.word_count(),
        tiles: session.tile_centers(),
    }
}

fn path_update(session: &PuzzleSession) -> ServerMessage {
    let engine = session.engine();
    ServerMessage::PathUpdate {
        path: engine.path().to_vec(),
        word: engine.candidate_word(),
        pointer: engine.live_pointer(),
    }
}

fn progress(session: &PuzzleSession) -> ServerMessage {
    let (found, total) = session.engine().progress();
    ServerMessage::Progress {
        found_words: session.engine().found_words_sorted(),
        found,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, GameConfig, ServerConfig},
        game::{engine::InteractionState, LevelDefinition},
        levels::LevelCatalog,
    };
    use dashmap::DashMap;
    use std::time::Duration;

    fn catalog() -> Arc<LevelCatalog> {
        let defs = vec![
            LevelDefinition {
                name: "Tea".to_string(),
                letters: "TEA".to_string(),
                words: vec!["TEA".to_string(), "EAT".to_string()],
            },
            LevelDefinition {
                name: "Hi".to_string(),
                letters: "HI".to_string(),
                words: vec!["HI".to_string()],
            },
        ];
        Arc::new(LevelCatalog::from_definitions(defs).unwrap())
    }

    fn tiles(session: &mut PuzzleSession, tiles: &[usize]) -> Reply {
        apply_message(session, ClientMessage::PressTile { tile: tiles[0] }).unwrap();
        for &tile in &tiles[1..] {
            apply_message(session, ClientMessage::EnterTile { tile }).unwrap();
        }
        apply_message(session, ClientMessage::Release).unwrap()
    }

    #[test]
    fn test_press_sends_path_update() {
        let mut session = PuzzleSession::new(catalog());
        let reply = apply_message(&mut session, ClientMessage::PressTile { tile: 1 }).unwrap();
        assert_eq!(
            reply.messages,
            vec![ServerMessage::PathUpdate {
                path: vec![1],
                word: "E".to_string(),
                pointer: None,
            }]
        );
        assert!(reply.settle.is_none());
    }

    #[test]
    fn test_duplicate_enter_sends_nothing() {
        let mut session = PuzzleSession::new(catalog());
        apply_message(&mut session, ClientMessage::PressTile { tile: 0 }).unwrap();
        let reply = apply_message(&mut session, ClientMessage::EnterTile { tile: 0 }).unwrap();
        assert!(reply.messages.is_empty());
    }

    #[test]
    fn test_accepted_word_reports_progress() {
        let mut session = PuzzleSession::new(catalog());
        let reply = tiles(&mut session, &[0, 1, 2]);
        assert!(reply.settle.is_some());
        assert_eq!(
            reply.messages,
            vec![
                ServerMessage::WordAccepted {
                    word: "TEA".to_string(),
                    found: 1,
                    total: 2
                },
                ServerMessage::Progress {
                    found_words: vec!["TEA".to_string()],
                    found: 1,
                    total: 2
                },
            ]
        );
    }

    #[test]
    fn test_last_word_solves_level() {
        let mut session = PuzzleSession::new(catalog());
        let first = tiles(&mut session, &[0, 1, 2]);
        session.settle(first.settle.unwrap());

        let reply = tiles(&mut session, &[1, 2, 0]);
        assert_eq!(
            reply.messages.last(),
            Some(&ServerMessage::LevelSolved {
                name: "Tea".to_string()
            })
        );
    }

    #[test]
    fn test_rejected_word() {
        let mut session = PuzzleSession::new(catalog());
        let reply = tiles(&mut session, &[0, 1]);
        assert_eq!(
            reply.messages,
            vec![ServerMessage::WordRejected {
                word: "TE".to_string()
            }]
        );
        assert!(reply.settle.is_some());
    }

    #[test]
    fn test_release_while_idle_sends_nothing() {
        let mut session = PuzzleSession::new(catalog());
        let reply = apply_message(&mut session, ClientMessage::PointerUp).unwrap();
        assert!(reply.messages.is_empty());
        assert!(reply.settle.is_none());
    }

    #[test]
    fn test_select_level() {
        let mut session = PuzzleSession::new(catalog());
        let reply = apply_message(&mut session, ClientMessage::SelectLevel { index: 1 }).unwrap();
        match &reply.messages[..] {
            [ServerMessage::LevelLoaded {
                index,
                letters,
                tiles,
                ..
            }] => {
                assert_eq!(*index, 1);
                assert_eq!(letters, &vec!['H', 'I']);
                assert_eq!(tiles.len(), 2);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        assert!(apply_message(&mut session, ClientMessage::SelectLevel { index: 9 }).is_err());
    }

    #[test]
    fn test_sync_returns_snapshot() {
        let mut session = PuzzleSession::new(catalog());
        apply_message(&mut session, ClientMessage::PressTile { tile: 2 }).unwrap();
        let reply = apply_message(&mut session, ClientMessage::Sync).unwrap();
        match &reply.messages[..] {
            [ServerMessage::State {
                level_index,
                snapshot,
            }] => {
                assert_eq!(*level_index, 0);
                assert_eq!(snapshot.state, InteractionState::Dragging);
                assert_eq!(snapshot.word, "A");
                assert_eq!(snapshot.total, 2);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_reset_reports_empty_progress() {
        let mut session = PuzzleSession::new(catalog());
        tiles(&mut session, &[0, 1, 2]);
        let reply = apply_message(&mut session, ClientMessage::Reset).unwrap();
        assert_eq!(
            reply.messages,
            vec![
                ServerMessage::AttemptCleared,
                ServerMessage::Progress {
                    found_words: vec![],
                    found: 0,
                    total: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_settle_fires_after_delay() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                frontend_dir: ".".to_string(),
            },
            game: GameConfig {
                levels_path: "./levels.json".to_string(),
                feedback_delay_ms: 50,
            },
        };
        let catalog = catalog();
        let state = Arc::new(AppState {
            config,
            catalog: catalog.clone(),
            sessions: DashMap::new(),
        });

        let session_id = Uuid::new_v4();
        state
            .sessions
            .insert(session_id, PuzzleSession::new(catalog));

        let (tx, mut rx) = mpsc::channel(8);
        handle_client_message(ClientMessage::PressTile { tile: 0 }, &state, session_id, &tx)
            .await
            .unwrap();
        handle_client_message(ClientMessage::Release, &state, session_id, &tx)
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::PathUpdate { .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::WordRejected { .. })
        ));
        assert_eq!(
            state.sessions.get(&session_id).unwrap().engine().state(),
            InteractionState::Settling
        );

        let cleared = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(cleared, Some(ServerMessage::AttemptCleared));
        assert_eq!(
            state.sessions.get(&session_id).unwrap().engine().state(),
            InteractionState::Idle
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let (tx, _rx) = mpsc::channel(1);
        let state = Arc::new(AppState {
            config: Config {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 0,
                    frontend_dir: ".".to_string(),
                },
                game: GameConfig {
                    levels_path: "./levels.json".to_string(),
                    feedback_delay_ms: 500,
                },
            },
            catalog: catalog(),
            sessions: DashMap::new(),
        });
        let result =
            handle_client_message(ClientMessage::Reset, &state, Uuid::new_v4(), &tx).await;
        assert!(result.is_err());
    }
}
