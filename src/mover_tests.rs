use super::*;
use crate::game::session::{ClickOutcome, GameSession, ReplyOutcome};
use chess::{Color, Square};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

#[test]
fn test_reply_parses_full_body() {
    let reply: MoverReply = serde_json::from_str(
        r#"{"updated_fen": "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2", "result": "*"}"#,
    )
    .unwrap();
    assert_eq!(reply.result, "*");
    assert!(reply.updated_fen.starts_with("rnbqkbnr"));
}

#[test]
fn test_reply_tolerates_missing_fields() {
    let reply: MoverReply = serde_json::from_str(r#"{"result": "1-0"}"#).unwrap();
    assert_eq!(reply.updated_fen, "");
    assert_eq!(reply.result, "1-0");

    let reply: MoverReply = serde_json::from_str("{}").unwrap();
    assert_eq!(reply.updated_fen, "");
    assert_eq!(reply.result, "*");
}

struct ScriptedMover {
    reply_fen: &'static str,
    result: &'static str,
}

#[async_trait]
impl MoveService for ScriptedMover {
    async fn compute_move(&self, _fen: &str) -> Result<MoverReply, MoverError> {
        Ok(MoverReply {
            updated_fen: self.reply_fen.to_string(),
            result: self.result.to_string(),
        })
    }
}

#[actix_rt::test]
async fn test_scripted_service_substitutes_for_http() {
    let service: Arc<dyn MoveService> = Arc::new(ScriptedMover {
        reply_fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        result: "*",
    });
    let reply = service.compute_move("ignored").await.unwrap();
    assert_eq!(reply.result, "*");
    assert!(reply.updated_fen.contains(" w "));
}

#[actix_rt::test]
async fn test_session_round_trip_through_service() {
    let now = Instant::now();
    let mut session = GameSession::new();
    session.start(5.0, now);
    session.handle_click(Square::from_str("e2").unwrap(), now);
    let request = match session.handle_click(Square::from_str("e4").unwrap(), now) {
        ClickOutcome::Submit(request) => request,
        other => panic!("expected a mover submission, got {:?}", other),
    };

    let service: Arc<dyn MoveService> = Arc::new(ScriptedMover {
        reply_fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        result: "*",
    });
    let reply = service.compute_move(&request.fen).await.unwrap();

    assert!(session.take_pending_if_current(request.id).is_some());
    let outcome = session
        .apply_reply(&reply.updated_fen, &reply.result, now)
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::Continue);
    assert_eq!(session.position.side_to_move(), Color::White);
    assert!(!session.thinking());
}
