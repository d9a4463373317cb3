//! services/api/src/web/chat_task.rs
//!
//! The asynchronous "worker" functions that deliver simulated replies and
//! resume playback after their fixed latencies. Every wait races the session's
//! cancellation token, so nothing touches the session once the connection is gone.

use crate::{
    error::ApiError,
    web::{
        protocol::ServerMessage,
        state::{AppState, Outbound, SessionState},
    },
};
use learning_session_core::{
    domain::MessageId,
    responder::ReplyPlan,
    session::Submission,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Represents the outcome of a worker task.
#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Everything the task owed the client was delivered.
    Delivered,
    /// The session was torn down before the task finished.
    Cancelled,
}

/// Sleeps for `delay` unless the token fires first. Returns `false` when cancelled.
async fn wait_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Queues an event for the writer task. A closed channel only means the
/// client is gone, so it is logged and otherwise ignored.
pub fn publish(outbound: &Outbound, message: ServerMessage) {
    if outbound.send(message).is_err() {
        debug!("Dropping server message; the connection writer has shut down.");
    }
}

/// Delivers the reply for one submitted message:
/// typing delay, primary reply, then the optional delayed follow-up.
pub async fn reply_process(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    outbound: Outbound,
    submission: Submission,
    token: CancellationToken,
) -> TaskOutcome {
    let timings = session_state_lock.lock().await.timings;

    if !wait_or_cancel(timings.typing_delay, &token).await {
        return TaskOutcome::Cancelled;
    }

    let generated = generate_text(&app_state, &session_state_lock, &submission).await;
    if token.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    let follow_up = {
        let mut session = session_state_lock.lock().await;
        let delivery = session.chat.complete_reply(&submission, generated);
        for message in delivery.messages {
            publish(&outbound, ServerMessage::appended(message));
        }
        publish(
            &outbound,
            ServerMessage::Typing {
                is_loading: session.chat.is_loading(),
            },
        );
        delivery.follow_up
    };

    let Some(follow_up) = follow_up else {
        return TaskOutcome::Delivered;
    };

    if !wait_or_cancel(follow_up.delay(&timings), &token).await {
        return TaskOutcome::Cancelled;
    }

    let message = session_state_lock
        .lock()
        .await
        .chat
        .deliver_follow_up(&follow_up);
    publish(&outbound, ServerMessage::appended(message));
    TaskOutcome::Delivered
}

/// Asks the reply generator for text on the branches that carry free text.
/// A failing generator falls back to the canned templates.
async fn generate_text(
    app_state: &AppState,
    session_state_lock: &Mutex<SessionState>,
    submission: &Submission,
) -> Option<String> {
    let (clarity, mode) = {
        let session = session_state_lock.lock().await;
        (session.chat.clarity(), session.chat.mode())
    };

    let result = match &submission.plan {
        ReplyPlan::Doubt(context) => {
            app_state
                .responder
                .answer_doubt(&submission.input, context, clarity, mode)
                .await
        }
        ReplyPlan::General => {
            app_state
                .responder
                .general_reply(&submission.input, clarity, mode)
                .await
        }
        ReplyPlan::NextVideo { .. } | ReplyPlan::Start => return None,
    };

    match result.map_err(ApiError::from) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Reply generator failed, using template: {}", e);
            None
        }
    }
}

/// Second half of continue-learning: after the resume delay, playback starts.
pub async fn resume_process(
    session_state_lock: Arc<Mutex<SessionState>>,
    outbound: Outbound,
    video_id: MessageId,
    token: CancellationToken,
) -> TaskOutcome {
    let delay = session_state_lock.lock().await.timings.resume_delay;
    if !wait_or_cancel(delay, &token).await {
        return TaskOutcome::Cancelled;
    }

    let mut session = session_state_lock.lock().await;
    match session.chat.resume_video(video_id) {
        Ok(state) => {
            info!("Resuming video {} after continue-learning.", video_id);
            publish(&outbound, ServerMessage::VideoState { video_id, state });
        }
        Err(e) => {
            warn!("Could not resume video {}: {}", video_id, e);
            publish(&outbound, ServerMessage::Error { message: e.to_string() });
        }
    }
    TaskOutcome::Delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockCatalogAdapter, TemplateResponder};
    use crate::config::Config;
    use async_trait::async_trait;
    use learning_session_core::{
        domain::{ClarityLevel, DoubtContext, LearningMode, Message},
        ports::{PortError, PortResult, ResponseGenerator},
        responder,
    };
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    struct FailingResponder;

    #[async_trait]
    impl ResponseGenerator for FailingResponder {
        async fn answer_doubt(
            &self,
            _question: &str,
            _context: &DoubtContext,
            _clarity: ClarityLevel,
            _mode: LearningMode,
        ) -> PortResult<String> {
            Err(PortError::Unexpected("offline".to_string()))
        }

        async fn general_reply(
            &self,
            _input: &str,
            _clarity: ClarityLevel,
            _mode: LearningMode,
        ) -> PortResult<String> {
            Err(PortError::Unexpected("offline".to_string()))
        }
    }

    fn app_state(responder: Arc<dyn ResponseGenerator>) -> Arc<AppState> {
        let config = Config::from_lookup(|_| None).unwrap();
        Arc::new(AppState {
            config: Arc::new(config),
            responder,
            catalog: Arc::new(MockCatalogAdapter::new()),
        })
    }

    fn session(app: &AppState) -> Arc<Mutex<SessionState>> {
        Arc::new(Mutex::new(SessionState::new(&app.config)))
    }

    /// Paused time lands on timer deadlines, give or take the 1ms timer tick.
    fn assert_elapsed(started: Instant, millis: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(millis) && elapsed <= Duration::from_millis(millis + 5),
            "elapsed {elapsed:?}, expected about {millis}ms"
        );
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn start_reply_arrives_after_typing_then_video_after_reveal() {
        let app = app_state(Arc::new(TemplateResponder::new()));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let submission = lock.lock().await.chat.submit("start").unwrap();
        let token = CancellationToken::new();

        let started = Instant::now();
        let outcome = reply_process(app, lock.clone(), tx, submission, token).await;

        assert_eq!(outcome, TaskOutcome::Delivered);
        assert_elapsed(started, 1300);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        match &events[0] {
            ServerMessage::MessageAppended { message: Message::Text(text), tokens } => {
                assert_eq!(text.content, responder::START_INTRO);
                assert!(tokens.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], ServerMessage::Typing { is_loading: false });
        match &events[2] {
            ServerMessage::MessageAppended { message: Message::Video(video), .. } => {
                assert_eq!(video.video_number, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(lock.lock().await.chat.log().has_video());
    }

    #[tokio::test(start_paused = true)]
    async fn doubt_answer_carries_timestamp_tokens_and_prompt_follows() {
        let app = app_state(Arc::new(TemplateResponder::new()));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let video_id = {
            let mut session = lock.lock().await;
            let submission = session.chat.submit("start").unwrap();
            let delivery = session.chat.complete_reply(&submission, None);
            let video = session.chat.deliver_follow_up(&delivery.follow_up.unwrap());
            let video_id = video.id();
            session.chat.start_doubt(video_id, Some(37.0)).unwrap();
            video_id
        };
        let submission = lock.lock().await.chat.submit("why?").unwrap();

        let started = Instant::now();
        reply_process(app, lock.clone(), tx, submission, CancellationToken::new()).await;
        assert_elapsed(started, 1400);

        let events = drain(&mut rx);
        match &events[0] {
            ServerMessage::MessageAppended { tokens: Some(tokens), .. } => {
                assert!(tokens.iter().any(|t| matches!(
                    t,
                    learning_session_core::timestamps::Token::Timestamp { seconds: 37, .. }
                )));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[2] {
            ServerMessage::MessageAppended { message: Message::Action(action), .. } => {
                assert_eq!(action.related_video, video_id);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(lock.lock().await.chat.doubt_thread(video_id).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reply_leaves_the_session_untouched() {
        let app = app_state(Arc::new(TemplateResponder::new()));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let submission = lock.lock().await.chat.submit("hello").unwrap();
        let before = lock.lock().await.chat.messages().len();
        let token = CancellationToken::new();

        let task = tokio::spawn(reply_process(app, lock.clone(), tx, submission, token.clone()));
        tokio::time::sleep(Duration::from_millis(400)).await;
        token.cancel();

        assert_eq!(task.await.unwrap(), TaskOutcome::Cancelled);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(lock.lock().await.chat.messages().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_generator_falls_back_to_template() {
        let app = app_state(Arc::new(FailingResponder));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let submission = lock.lock().await.chat.submit("tell me about tokens").unwrap();

        reply_process(app, lock, tx, submission, CancellationToken::new()).await;

        match &drain(&mut rx)[0] {
            ServerMessage::MessageAppended { message: Message::Text(text), .. } => {
                assert!(text.content.starts_with("That's an interesting point about"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resume_plays_the_video_after_the_delay() {
        let app = app_state(Arc::new(TemplateResponder::new()));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let video_id = {
            let mut session = lock.lock().await;
            let submission = session.chat.submit("start").unwrap();
            let delivery = session.chat.complete_reply(&submission, None);
            session.chat.deliver_follow_up(&delivery.follow_up.unwrap()).id()
        };

        let started = Instant::now();
        let outcome = resume_process(lock.clone(), tx, video_id, CancellationToken::new()).await;
        assert_eq!(outcome, TaskOutcome::Delivered);
        assert_elapsed(started, 300);

        match &drain(&mut rx)[..] {
            [ServerMessage::VideoState { state, .. }] => assert!(state.is_playing),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_resume_does_not_play() {
        let app = app_state(Arc::new(TemplateResponder::new()));
        let lock = session(&app);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = resume_process(lock, tx, MessageId(1), token).await;
        assert_eq!(outcome, TaskOutcome::Cancelled);
        assert!(drain(&mut rx).is_empty());
    }
}
