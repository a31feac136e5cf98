use super::*;
use std::str::FromStr;
use std::time::Duration;

fn sq(name: &str) -> Square {
    Square::from_str(name).unwrap()
}

fn started_session(now: Instant) -> GameSession {
    let mut session = GameSession::new();
    assert!(session.start(5.0, now));
    session
}

fn submit_e4(session: &mut GameSession, now: Instant) -> PendingMoveRequest {
    assert_eq!(session.handle_click(sq("e2"), now), ClickOutcome::Selection);
    match session.handle_click(sq("e4"), now) {
        ClickOutcome::Submit(request) => request,
        other => panic!("expected a mover submission, got {:?}", other),
    }
}

#[test]
fn test_start_only_from_awaiting_start() {
    let now = Instant::now();
    let mut session = GameSession::new();
    assert!(matches!(session.phase(), SessionPhase::AwaitingStart));
    assert!(session.start(5.0, now));
    assert!(session.is_in_progress());
    assert_eq!(session.clocks.remaining_ms(Color::White), 300_000);
    assert_eq!(session.clocks.active_side(), Some(Color::White));

    // Starting again mid-game is a no-op.
    assert!(!session.start(3.0, now));
    assert_eq!(session.clocks.remaining_ms(Color::White), 300_000);
}

#[test]
fn test_short_time_controls_are_floored() {
    let now = Instant::now();
    let mut session = GameSession::new();
    session.start(0.0, now);
    // Zero minutes still yields a playable six second budget.
    assert_eq!(session.clocks.remaining_ms(Color::White), 6_000);
}

#[test]
fn test_clicks_ignored_before_start() {
    let mut session = GameSession::new();
    assert_eq!(
        session.handle_click(sq("e2"), Instant::now()),
        ClickOutcome::Ignored
    );
}

#[test]
fn test_clocks_idle_before_start() {
    let mut session = GameSession::new();
    assert_eq!(session.tick(Instant::now()), SessionTick::Idle);
}

#[test]
fn test_player_move_submits_request_and_switches_clock() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);

    assert!(request.fen.contains(" b "));
    assert!(session.thinking());
    assert_eq!(session.position.selected(), None);
    assert_eq!(session.clocks.active_side(), Some(Color::Black));
    assert_eq!(session.position.history(), ["e2e4"]);
}

#[test]
fn test_clicks_ignored_while_awaiting_mover() {
    let now = Instant::now();
    let mut session = started_session(now);
    submit_e4(&mut session, now);
    assert_eq!(session.handle_click(sq("d2"), now), ClickOutcome::Ignored);
}

#[test]
fn test_clicking_selected_square_clears_selection() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.handle_click(sq("e2"), now);
    assert_eq!(session.position.selected(), Some(sq("e2")));
    assert_eq!(session.handle_click(sq("e2"), now), ClickOutcome::Selection);
    assert_eq!(session.position.selected(), None);
}

#[test]
fn test_clicking_another_piece_moves_selection() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.handle_click(sq("e2"), now);
    assert_eq!(session.handle_click(sq("g1"), now), ClickOutcome::Selection);
    assert_eq!(session.position.selected(), Some(sq("g1")));
}

#[test]
fn test_reply_applies_position_and_returns_clock_to_player() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);

    let taken = session.take_pending_if_current(request.id);
    assert_eq!(taken, Some(request));

    let reply_fen = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
    let outcome = session
        .apply_reply(reply_fen, "*", now + Duration::from_millis(800))
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::Continue);
    assert!(session.position.fen().starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8"));
    assert_eq!(session.position.side_to_move(), Color::White);
    assert_eq!(session.clocks.active_side(), Some(Color::White));
    assert!(!session.thinking());
}

#[test]
fn test_empty_reply_fen_keeps_position() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);
    session.take_pending_if_current(request.id);

    let before = session.position.fen();
    let outcome = session.apply_reply("", "*", now).unwrap();
    assert_eq!(outcome, ReplyOutcome::Continue);
    assert_eq!(session.position.fen(), before);
}

#[test]
fn test_malformed_reply_fen_is_an_error() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);
    session.take_pending_if_current(request.id);

    let before = session.position.fen();
    assert!(session.apply_reply("garbage", "*", now).is_err());
    assert_eq!(session.position.fen(), before);
    assert!(session.is_in_progress());
}

#[test]
fn test_mover_result_code_ends_session() {
    let now = Instant::now();
    let mut session = started_session(now);
    let mate_fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
    let outcome = session.apply_reply(mate_fen, "0-1", now).unwrap();
    match outcome {
        ReplyOutcome::Ended(result) => {
            assert_eq!(result.outcome, GameOutcome::BlackWins);
            assert_eq!(result.reason, EndReason::Checkmate);
        }
        other => panic!("expected the game to end, got {:?}", other),
    }
    assert!(matches!(session.phase(), SessionPhase::Ended(_)));
    assert_eq!(session.clocks.active_side(), None);
}

#[test]
fn test_draw_result_code_reports_draw_reason() {
    let now = Instant::now();
    let mut session = started_session(now);
    let outcome = session.apply_reply("", "1/2-1/2", now).unwrap();
    match outcome {
        ReplyOutcome::Ended(result) => {
            assert_eq!(result.outcome, GameOutcome::Draw);
            assert_eq!(result.reason, EndReason::Draw);
        }
        other => panic!("expected a draw, got {:?}", other),
    }
}

#[test]
fn test_stale_reply_after_new_game_is_not_current() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);

    session.reset_for_new_game();
    let fresh_fen = session.position.fen();

    // The reply for the dead request must not touch the new session.
    assert!(session.take_pending_if_current(request.id).is_none());
    assert_eq!(session.position.fen(), fresh_fen);
    assert!(matches!(session.phase(), SessionPhase::AwaitingStart));
}

#[test]
fn test_superseded_request_loses_to_newer_one() {
    let now = Instant::now();
    let mut session = started_session(now);
    let first = submit_e4(&mut session, now);

    let taken = session.take_pending_if_current(first.id).unwrap();
    session.note_backend_failure(taken);
    assert!(!session.thinking());
    assert!(session.awaiting_retry());
    assert_eq!(session.clocks.active_side(), None);

    let second = session.retry(now + Duration::from_millis(10)).unwrap();
    assert_eq!(second.fen, first.fen);
    assert_ne!(second.id, first.id);

    // Only the newest token is honored.
    assert!(session.take_pending_if_current(first.id).is_none());
    assert!(session.take_pending_if_current(second.id).is_some());
}

#[test]
fn test_successful_reply_clears_retry_state() {
    let now = Instant::now();
    let mut session = started_session(now);
    let first = submit_e4(&mut session, now);
    let taken = session.take_pending_if_current(first.id).unwrap();
    session.note_backend_failure(taken);

    let second = session.retry(now).unwrap();
    session.take_pending_if_current(second.id).unwrap();
    session
        .apply_reply(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
            "*",
            now,
        )
        .unwrap();
    assert!(!session.awaiting_retry());
    assert!(session.retry(now).is_none());
}

#[test]
fn test_retry_requires_a_recorded_failure() {
    let now = Instant::now();
    let mut session = started_session(now);
    assert!(session.retry(now).is_none());
}

#[test]
fn test_timeout_ends_session_within_one_tick() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.clocks.set_remaining(Color::White, 1_000);

    let after = now + Duration::from_millis(1_200);
    match session.tick(after) {
        SessionTick::Ended(result) => {
            assert_eq!(result.outcome, GameOutcome::BlackWins);
            assert_eq!(result.reason, EndReason::Timeout);
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert_eq!(session.clocks.remaining_ms(Color::White), 0);
    assert!(matches!(session.phase(), SessionPhase::Ended(_)));
    assert_eq!(session.tick(after + Duration::from_millis(100)), SessionTick::Idle);
    // An ended session ignores the board entirely.
    assert_eq!(session.handle_click(sq("e2"), after), ClickOutcome::Ignored);
}

#[test]
fn test_opponent_flag_while_thinking_favors_player() {
    let now = Instant::now();
    let mut session = started_session(now);
    let request = submit_e4(&mut session, now);
    session.clocks.set_remaining(Color::Black, 500);

    let result = match session.tick(now + Duration::from_millis(600)) {
        SessionTick::Ended(result) => result,
        other => panic!("expected a timeout, got {:?}", other),
    };
    assert_eq!(result.outcome, GameOutcome::WhiteWins);
    assert_eq!(result.reason, EndReason::Timeout);
    // The in-flight request token died with the game.
    assert!(session.take_pending_if_current(request.id).is_none());
}

#[test]
fn test_checkmate_by_player_ends_without_submission() {
    let now = Instant::now();
    let mut session = started_session(now);
    // White mates in one from a scholar's-mate setup.
    session
        .position
        .load_fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5Q2/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
        .unwrap();
    session.handle_click(sq("f3"), now);
    match session.handle_click(sq("f7"), now) {
        ClickOutcome::Ended(result) => {
            assert_eq!(result.outcome, GameOutcome::WhiteWins);
            assert_eq!(result.reason, EndReason::Checkmate);
        }
        other => panic!("expected checkmate, got {:?}", other),
    }
    assert!(!session.thinking());
    assert_eq!(session.clocks.active_side(), None);
}

#[test]
fn test_promotion_round_trip() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.position.load_fen("8/P6k/8/8/8/8/7K/8 w - - 0 1").unwrap();

    assert_eq!(session.handle_click(sq("a7"), now), ClickOutcome::Selection);
    assert_eq!(
        session.handle_click(sq("a8"), now),
        ClickOutcome::PromotionRequired {
            from: sq("a7"),
            to: sq("a8"),
        }
    );
    // The board is untouched until the piece is chosen.
    assert!(session.position.fen().starts_with("8/P6k"));
    assert!(!session.thinking());
    assert_eq!(session.pending_promotion(), Some((sq("a7"), sq("a8"))));

    let request = match session.promote(Piece::Queen, now) {
        ClickOutcome::Submit(request) => request,
        other => panic!("expected a mover submission, got {:?}", other),
    };
    assert!(request.fen.starts_with("Q7/7k"));
    assert_eq!(session.position.history(), ["a7a8q"]);
}

#[test]
fn test_cancelled_promotion_leaves_board_alone() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.position.load_fen("8/P6k/8/8/8/8/7K/8 w - - 0 1").unwrap();
    session.handle_click(sq("a7"), now);
    session.handle_click(sq("a8"), now);

    session.cancel_promotion();
    assert_eq!(session.pending_promotion(), None);
    assert_eq!(session.promote(Piece::Queen, now), ClickOutcome::Ignored);
    assert!(session.position.fen().starts_with("8/P6k"));
}

#[test]
fn test_any_click_clears_parked_promotion() {
    let now = Instant::now();
    let mut session = started_session(now);
    session.position.load_fen("8/P6k/8/8/8/8/7K/8 w - - 0 1").unwrap();
    session.handle_click(sq("a7"), now);
    session.handle_click(sq("a8"), now);
    assert!(session.pending_promotion().is_some());

    session.handle_click(sq("h2"), now);
    assert_eq!(session.pending_promotion(), None);
}

#[test]
fn test_restore_resumes_clocks_and_phase() {
    let now = Instant::now();
    let mut session = GameSession::new();
    let submit = session
        .restore(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
            Some(120_000),
            Some(90_000),
            now,
        )
        .unwrap();
    assert!(submit.is_none());
    assert!(session.is_in_progress());
    assert_eq!(session.clocks.remaining_ms(Color::White), 120_000);
    assert_eq!(session.clocks.remaining_ms(Color::Black), 90_000);
    assert_eq!(session.clocks.active_side(), Some(Color::White));
    assert!(!session.thinking());
}

#[test]
fn test_restore_with_opponent_to_move_submits() {
    let now = Instant::now();
    let mut session = GameSession::new();
    let submit = session
        .restore(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            None,
            None,
            now,
        )
        .unwrap();
    let request = submit.unwrap();
    assert!(request.fen.contains(" b "));
    assert!(session.thinking());
    assert_eq!(session.clocks.active_side(), Some(Color::Black));
}

#[test]
fn test_restore_rejects_garbage() {
    let mut session = GameSession::new();
    assert!(session
        .restore("corrupt", None, None, Instant::now())
        .is_err());
    assert!(matches!(session.phase(), SessionPhase::AwaitingStart));
}

#[test]
fn test_restore_of_finished_position_ends_immediately() {
    let now = Instant::now();
    let mut session = GameSession::new();
    let submit = session
        .restore(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            None,
            None,
            now,
        )
        .unwrap();
    assert!(submit.is_none());
    match session.result() {
        Some(result) => {
            assert_eq!(result.outcome, GameOutcome::BlackWins);
            assert_eq!(result.reason, EndReason::Checkmate);
        }
        None => panic!("expected a finished session"),
    }
}

#[test]
fn test_new_game_clears_everything() {
    let now = Instant::now();
    let mut session = started_session(now);
    submit_e4(&mut session, now);

    session.reset_for_new_game();
    assert!(matches!(session.phase(), SessionPhase::AwaitingStart));
    assert!(!session.thinking());
    assert!(!session.awaiting_retry());
    assert_eq!(session.position.selected(), None);
    assert!(session.position.history().is_empty());
    assert_eq!(session.position.fen(), PositionStore::new().fen());
    assert_eq!(session.clocks.active_side(), None);
    assert_eq!(
        session.clocks.remaining_ms(Color::White),
        session.clocks.initial_ms()
    );
}
