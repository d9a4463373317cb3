//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It owns the session for the lifetime of the socket, applies client commands
//! to it and spawns the delayed reply tasks.

use crate::{
    error::ApiError,
    web::{
        chat_task::{publish, reply_process, resume_process, TaskOutcome},
        protocol::{ClientMessage, ServerMessage},
        state::{AppState, Outbound, SessionState},
    },
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use learning_session_core::{domain::MessageId, playback::SeekOutcome, session::ChatSession};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut ws_sender, mut receiver) = socket.split();

    // --- 1. Writer Task ---
    // Every outgoing event goes through one channel so the reply tasks never
    // contend for the socket.
    let (outbound, mut events) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                warn!("Failed to send server message; closing writer.");
                break;
            }
        }
    });

    // --- 2. Initialization Phase ---
    let session_state_lock = Arc::new(Mutex::new(SessionState::new(&app_state.config)));
    open_session(&session_state_lock, &outbound).await;

    // --- 3. Main Message Loop ---
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    loop {
        match receiver.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(command) => {
                        if let Some(task) =
                            handle_client_message(command, &app_state, &session_state_lock, &outbound)
                                .await
                        {
                            tasks.push(task);
                        }
                    }
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        publish(
                            &outbound,
                            ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            },
                        );
                    }
                }
                tasks.retain(|task| !task.is_finished());
            }
            Some(Ok(WsMessage::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("{}", ApiError::from(e));
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    let session_id = {
        let session = session_state_lock.lock().await;
        session.cancellation_token.cancel();
        session.session_id
    };
    for task in tasks {
        task.abort();
    }
    drop(outbound);
    writer.abort();
    info!("WebSocket connection for session {} closed.", session_id);
}

/// Announces the session and replays the messages it was seeded with.
async fn open_session(session_state_lock: &Mutex<SessionState>, outbound: &Outbound) {
    let session = session_state_lock.lock().await;
    info!("Initialized learning session {}", session.session_id);
    publish(
        outbound,
        ServerMessage::SessionInitialized {
            session_id: session.session_id,
            clarity: session.chat.clarity(),
            mode: session.chat.mode(),
        },
    );
    for message in session.chat.messages() {
        publish(outbound, ServerMessage::appended(message.clone()));
    }
}

/// Applies one client command. Returns the handle of any delayed work it spawned.
///
/// Failures are reported to the client as `ServerMessage::Error`; the
/// connection stays open.
async fn handle_client_message(
    command: ClientMessage,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    outbound: &Outbound,
) -> Option<JoinHandle<()>> {
    let mut session = session_state_lock.lock().await;
    let token = session.cancellation_token.clone();

    let result: Result<Option<JoinHandle<()>>, ApiError> = match command {
        ClientMessage::SendMessage { text } => match session.chat.submit(&text) {
            Some(submission) => {
                debug!("Submitted message, planned reply: {:?}", submission.plan);
                publish(outbound, ServerMessage::appended(submission.user_message.clone()));
                publish(outbound, ServerMessage::Typing { is_loading: true });

                let app_state = app_state.clone();
                let session_state_lock = session_state_lock.clone();
                let outbound = outbound.clone();
                Ok(Some(tokio::spawn(async move {
                    if reply_process(app_state, session_state_lock, outbound, submission, token).await
                        == TaskOutcome::Cancelled
                    {
                        debug!("Reply cancelled by session teardown.");
                    }
                })))
            }
            None => Ok(None),
        },

        ClientMessage::StartDoubt {
            video_id,
            timestamp_seconds,
        } => session
            .chat
            .start_doubt(video_id, timestamp_seconds)
            .map_err(ApiError::from)
            .map(|context| {
                publish_video_state(&session.chat, video_id, outbound);
                let prompt = session.chat.doubt_context_text().unwrap_or_default();
                info!("Doubt started on video {} at {}s", video_id, context.timestamp_seconds);
                publish(outbound, ServerMessage::DoubtStarted { context, prompt });
                None
            }),

        ClientMessage::CancelDoubt => {
            if session.chat.cancel_doubt().is_some() {
                publish(outbound, ServerMessage::DoubtCancelled);
            }
            Ok(None)
        }

        ClientMessage::ToggleCollapse { video_id, force } => session
            .chat
            .toggle_collapse(video_id, force)
            .map_err(ApiError::from)
            .map(|is_collapsed| {
                publish_message_update(&session.chat, video_id, outbound);
                if is_collapsed {
                    publish_video_state(&session.chat, video_id, outbound);
                }
                None
            }),

        ClientMessage::SetVideoState { video_id, patch } => session
            .chat
            .set_video_state(video_id, &patch)
            .map_err(ApiError::from)
            .map(|state| {
                publish(outbound, ServerMessage::VideoState { video_id, state });
                None
            }),

        ClientMessage::VideoProgress {
            video_id,
            played_seconds,
        } => session
            .chat
            .video_progress(video_id, played_seconds)
            .map_err(ApiError::from)
            .map(|applied| {
                if !applied {
                    debug!("Ignoring progress for paused video {}", video_id);
                }
                None
            }),

        ClientMessage::VideoDuration { video_id, duration } => session
            .chat
            .video_duration(video_id, duration)
            .map_err(ApiError::from)
            .map(|state| {
                publish_message_update(&session.chat, video_id, outbound);
                publish(outbound, ServerMessage::VideoState { video_id, state });
                None
            }),

        ClientMessage::PlayerAttached { video_id } => session
            .chat
            .attach_player(video_id)
            .map_err(ApiError::from)
            .map(|()| None),

        ClientMessage::PlayerDetached { video_id } => {
            if !session.chat.detach_player(video_id) {
                debug!("Video {} had no attached player", video_id);
            }
            Ok(None)
        }

        ClientMessage::PlayerReady { video_id } => session
            .chat
            .player_ready(video_id)
            .map_err(ApiError::from)
            .map(|pending| {
                if let Some(seconds) = pending {
                    info!("Applying deferred seek on video {} to {}s", video_id, seconds);
                    publish(outbound, ServerMessage::SeekVideo { video_id, seconds });
                }
                None
            }),

        ClientMessage::Seek {
            video_id,
            timestamp_seconds,
        } => session
            .chat
            .seek(video_id, timestamp_seconds)
            .map_err(ApiError::from)
            .map(|outcome| {
                if let SeekOutcome::Immediate(seconds) = outcome {
                    publish(outbound, ServerMessage::SeekVideo { video_id, seconds });
                }
                publish_video_state(&session.chat, video_id, outbound);
                None
            }),

        ClientMessage::ContinueLearning { video_id } => session
            .chat
            .continue_learning(video_id)
            .map_err(ApiError::from)
            .map(|expanded| {
                if expanded {
                    publish_message_update(&session.chat, video_id, outbound);
                }
                publish(outbound, ServerMessage::FocusVideo { video_id });

                let session_state_lock = session_state_lock.clone();
                let outbound = outbound.clone();
                Some(tokio::spawn(async move {
                    if resume_process(session_state_lock, outbound, video_id, token).await
                        == TaskOutcome::Cancelled
                    {
                        debug!("Resume cancelled by session teardown.");
                    }
                }))
            }),

        ClientMessage::SetClarity { clarity } => {
            session.chat.set_clarity(clarity);
            publish_settings(&session.chat, outbound);
            Ok(None)
        }

        ClientMessage::SetMode { mode } => {
            session.chat.set_mode(mode);
            publish_settings(&session.chat, outbound);
            Ok(None)
        }
    };

    match result {
        Ok(task) => task,
        Err(e) => {
            warn!("Rejected client command: {}", e);
            publish(outbound, ServerMessage::Error { message: e.to_string() });
            None
        }
    }
}

fn publish_video_state(chat: &ChatSession, video_id: MessageId, outbound: &Outbound) {
    if let Some(state) = chat.video_state(video_id) {
        publish(
            outbound,
            ServerMessage::VideoState {
                video_id,
                state: state.clone(),
            },
        );
    }
}

fn publish_message_update(chat: &ChatSession, video_id: MessageId, outbound: &Outbound) {
    if let Some(message) = chat.log().get(video_id) {
        publish(
            outbound,
            ServerMessage::MessageUpdated {
                message: message.clone(),
            },
        );
    }
}

fn publish_settings(chat: &ChatSession, outbound: &Outbound) {
    publish(
        outbound,
        ServerMessage::SettingsChanged {
            clarity: chat.clarity(),
            mode: chat.mode(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockCatalogAdapter, TemplateResponder};
    use crate::config::Config;
    use learning_session_core::domain::{
        ClarityLevel, LearningMode, Message, VideoStatePatch,
    };
    use std::time::Duration;

    struct Harness {
        app_state: Arc<AppState>,
        session: Arc<Mutex<SessionState>>,
        outbound: Outbound,
        events: mpsc::UnboundedReceiver<ServerMessage>,
    }

    impl Harness {
        fn new() -> Self {
            let config = Config::from_lookup(|_| None).unwrap();
            let session = Arc::new(Mutex::new(SessionState::new(&config)));
            let app_state = Arc::new(AppState {
                config: Arc::new(config),
                responder: Arc::new(TemplateResponder::new()),
                catalog: Arc::new(MockCatalogAdapter::new()),
            });
            let (outbound, events) = mpsc::unbounded_channel();
            Self {
                app_state,
                session,
                outbound,
                events,
            }
        }

        async fn send(&self, command: ClientMessage) -> Option<JoinHandle<()>> {
            handle_client_message(command, &self.app_state, &self.session, &self.outbound).await
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }

        /// Runs "start" to completion and returns the first video's id.
        async fn start_lesson(&mut self) -> MessageId {
            let task = self
                .send(ClientMessage::SendMessage {
                    text: "start".to_string(),
                })
                .await
                .expect("reply task");
            task.await.unwrap();
            self.drain()
                .iter()
                .find_map(|event| match event {
                    ServerMessage::MessageAppended {
                        message: Message::Video(video),
                        ..
                    } => Some(video.id),
                    _ => None,
                })
                .expect("first video")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn open_session_replays_welcome_messages() {
        let mut h = Harness::new();
        open_session(&h.session, &h.outbound).await;
        let events = h.drain();
        assert!(matches!(
            events[0],
            ServerMessage::SessionInitialized {
                clarity: ClarityLevel::Intermediate,
                mode: LearningMode::Normal,
                ..
            }
        ));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn send_message_echoes_and_marks_typing() {
        let mut h = Harness::new();
        let task = h
            .send(ClientMessage::SendMessage {
                text: "  hello  ".to_string(),
            })
            .await;
        let events = h.drain();
        match &events[0] {
            ServerMessage::MessageAppended {
                message: Message::Text(text),
                ..
            } => assert_eq!(text.content, "hello"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], ServerMessage::Typing { is_loading: true });

        task.unwrap().await.unwrap();
        let events = h.drain();
        assert_eq!(events.last(), Some(&ServerMessage::Typing { is_loading: false }));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_message_does_nothing() {
        let mut h = Harness::new();
        assert!(h
            .send(ClientMessage::SendMessage {
                text: "   ".to_string()
            })
            .await
            .is_none());
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn doubt_on_missing_video_reports_error() {
        let mut h = Harness::new();
        h.send(ClientMessage::StartDoubt {
            video_id: MessageId(5),
            timestamp_seconds: None,
        })
        .await;
        assert!(matches!(&h.drain()[..], [ServerMessage::Error { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn start_doubt_pauses_and_announces_prompt() {
        let mut h = Harness::new();
        let video_id = h.start_lesson().await;
        h.send(ClientMessage::SetVideoState {
            video_id,
            patch: VideoStatePatch::playing(true),
        })
        .await;
        h.drain();

        h.send(ClientMessage::StartDoubt {
            video_id,
            timestamp_seconds: Some(37.0),
        })
        .await;
        let events = h.drain();
        match &events[..] {
            [ServerMessage::VideoState { state, .. }, ServerMessage::DoubtStarted { context, prompt }] => {
                assert!(!state.is_playing);
                assert_eq!(context.timestamp_seconds, 37.0);
                assert!(prompt.ends_with("at 00:37"));
            }
            other => panic!("unexpected events {other:?}"),
        }

        h.send(ClientMessage::CancelDoubt).await;
        assert_eq!(h.drain(), vec![ServerMessage::DoubtCancelled]);
        h.send(ClientMessage::CancelDoubt).await;
        assert!(h.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_seek_is_sent_when_player_is_ready() {
        let mut h = Harness::new();
        let video_id = h.start_lesson().await;

        h.send(ClientMessage::Seek {
            video_id,
            timestamp_seconds: 42.0,
        })
        .await;
        assert!(matches!(&h.drain()[..], [ServerMessage::VideoState { .. }]));

        h.send(ClientMessage::PlayerReady { video_id }).await;
        assert_eq!(
            h.drain(),
            vec![ServerMessage::SeekVideo {
                video_id,
                seconds: 42.0
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn continue_learning_expands_focuses_then_resumes() {
        let mut h = Harness::new();
        let video_id = h.start_lesson().await;
        h.send(ClientMessage::ToggleCollapse {
            video_id,
            force: Some(true),
        })
        .await;
        h.drain();

        let task = h
            .send(ClientMessage::ContinueLearning { video_id })
            .await
            .expect("resume task");
        let events = h.drain();
        assert!(matches!(events[0], ServerMessage::MessageUpdated { .. }));
        assert_eq!(events[1], ServerMessage::FocusVideo { video_id });

        task.await.unwrap();
        match &h.drain()[..] {
            [ServerMessage::VideoState { state, .. }] => assert!(state.is_playing),
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn appended_videos(events: &[ServerMessage]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|event| match event {
                ServerMessage::MessageAppended {
                    message: Message::Video(video),
                    ..
                } => Some(video.video_number),
                _ => None,
            })
            .collect()
    }

    fn last_typing(events: &[ServerMessage]) -> Option<bool> {
        events.iter().rev().find_map(|event| match event {
            ServerMessage::Typing { is_loading } => Some(*is_loading),
            _ => None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn next_video_pushes_the_following_number() {
        let mut h = Harness::new();
        h.start_lesson().await;

        let task = h
            .send(ClientMessage::SendMessage {
                text: "next video".to_string(),
            })
            .await
            .expect("reply task");
        task.await.unwrap();
        assert_eq!(appended_videos(&h.drain()), vec![2]);

        let task = h
            .send(ClientMessage::SendMessage {
                text: "Next video please".to_string(),
            })
            .await
            .expect("reply task");
        task.await.unwrap();
        assert_eq!(appended_videos(&h.drain()), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_stays_on_until_the_last_overlapping_reply() {
        let mut h = Harness::new();
        let first = h
            .send(ClientMessage::SendMessage {
                text: "hello".to_string(),
            })
            .await
            .expect("first reply task");
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = h
            .send(ClientMessage::SendMessage {
                text: "what is attention".to_string(),
            })
            .await
            .expect("second reply task");
        assert_eq!(last_typing(&h.drain()), Some(true));

        first.await.unwrap();
        let events = h.drain();
        assert!(events.iter().any(|event| matches!(
            event,
            ServerMessage::MessageAppended {
                message: Message::Text(_),
                ..
            }
        )));
        assert_eq!(last_typing(&events), Some(true));
        assert!(h.session.lock().await.chat.is_loading());

        second.await.unwrap();
        assert_eq!(last_typing(&h.drain()), Some(false));
        assert!(!h.session.lock().await.chat.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_replies() {
        let mut h = Harness::new();
        let task = h
            .send(ClientMessage::SendMessage {
                text: "start".to_string(),
            })
            .await
            .expect("reply task");
        h.drain();

        tokio::time::sleep(Duration::from_millis(100)).await;
        h.session.lock().await.cancellation_token.cancel();
        task.await.unwrap();

        assert!(h.drain().is_empty());
        assert!(!h.session.lock().await.chat.log().has_video());
    }

    #[tokio::test(start_paused = true)]
    async fn settings_changes_are_echoed() {
        let mut h = Harness::new();
        h.send(ClientMessage::SetClarity {
            clarity: ClarityLevel::Basic,
        })
        .await;
        h.send(ClientMessage::SetMode {
            mode: LearningMode::Review,
        })
        .await;
        assert_eq!(
            h.drain().last(),
            Some(&ServerMessage::SettingsChanged {
                clarity: ClarityLevel::Basic,
                mode: LearningMode::Review,
            })
        );
    }
}
