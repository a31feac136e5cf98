use chess::{Color, Piece, Square};
use std::time::Instant;
use uuid::Uuid;

use crate::game::clock::{ClockPair, TickOutcome};
use crate::game::position::{MoveOutcome, PositionError, PositionStore};
use crate::game::utils::time_control_label;

/// The side the connected player controls.
pub const HUMAN_SIDE: Color = Color::White;

/// Time control offered when the client does not pick one.
pub const DEFAULT_MINUTES: f64 = 5.0;

fn base_time_ms(minutes: f64) -> u64 {
    (minutes.max(0.1) * 60_000.0) as u64
}

/// Why a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Checkmate,
    Timeout,
    Draw,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Checkmate => "checkmate",
            EndReason::Timeout => "timeout",
            EndReason::Draw => "draw",
        }
    }
}

/// Final score of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameOutcome {
    pub fn as_code(&self) -> &'static str {
        match self {
            GameOutcome::WhiteWins => "1-0",
            GameOutcome::BlackWins => "0-1",
            GameOutcome::Draw => "1/2-1/2",
        }
    }

    pub fn from_code(code: &str) -> Option<GameOutcome> {
        match code {
            "1-0" => Some(GameOutcome::WhiteWins),
            "0-1" => Some(GameOutcome::BlackWins),
            "1/2-1/2" => Some(GameOutcome::Draw),
            _ => None,
        }
    }
}

/// Result and reason of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub outcome: GameOutcome,
    pub reason: EndReason,
}

/// Where the session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingStart,
    InProgress,
    Ended(SessionResult),
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingStart => "awaiting_start",
            SessionPhase::InProgress => "in_progress",
            SessionPhase::Ended(_) => "ended",
        }
    }
}

/// One in-flight call to the remote mover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMoveRequest {
    pub id: Uuid,
    pub fen: String,
}

/// What the caller must do after a click or promotion was processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing happened (wrong phase, not the player's turn, or an inert square).
    Ignored,
    /// The selection changed or was cleared.
    Selection,
    /// A promoting move is parked until a piece is chosen.
    PromotionRequired { from: Square, to: Square },
    /// The player's move was applied and the position goes to the mover.
    Submit(PendingMoveRequest),
    /// The player's move was applied and finished the game.
    Ended(SessionResult),
}

/// What the session did with a mover reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Continue,
    Ended(SessionResult),
}

/// Clock outcome of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTick {
    Idle,
    Running,
    Ended(SessionResult),
}

/// One human-versus-mover game with clocks, phase and request tracking.
pub struct GameSession {
    pub position: PositionStore,
    pub clocks: ClockPair,
    phase: SessionPhase,
    pending: Option<PendingMoveRequest>,
    pending_promotion: Option<(Square, Square)>,
    retry_fen: Option<String>,
    time_control_minutes: f64,
}

impl GameSession {
    pub fn new() -> Self {
        GameSession {
            position: PositionStore::new(),
            clocks: ClockPair::new(base_time_ms(DEFAULT_MINUTES)),
            phase: SessionPhase::AwaitingStart,
            pending: None,
            pending_promotion: None,
            retry_fen: None,
            time_control_minutes: DEFAULT_MINUTES,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    pub fn result(&self) -> Option<SessionResult> {
        match self.phase {
            SessionPhase::Ended(result) => Some(result),
            _ => None,
        }
    }

    /// True while a mover request is outstanding.
    pub fn thinking(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_promotion(&self) -> Option<(Square, Square)> {
        self.pending_promotion
    }

    pub fn awaiting_retry(&self) -> bool {
        self.retry_fen.is_some()
    }

    pub fn time_label(&self) -> &'static str {
        time_control_label(self.time_control_minutes)
    }

    /// Begin a fresh game with the chosen time control.
    pub fn start(&mut self, minutes: f64, now: Instant) -> bool {
        if self.phase != SessionPhase::AwaitingStart {
            return false;
        }
        self.time_control_minutes = minutes;
        self.position.reset();
        self.clocks.reset(base_time_ms(minutes));
        self.pending = None;
        self.pending_promotion = None;
        self.retry_fen = None;
        self.phase = SessionPhase::InProgress;
        self.clocks.activate(self.position.side_to_move(), now);
        true
    }

    /// Resume a stored or externally supplied position. When the opponent is
    /// to move the returned request must be sent to the mover.
    pub fn restore(
        &mut self,
        fen: &str,
        white_ms: Option<u64>,
        black_ms: Option<u64>,
        now: Instant,
    ) -> Result<Option<PendingMoveRequest>, PositionError> {
        self.position.load_fen(fen)?;
        self.clocks.reset(self.clocks.initial_ms());
        if let Some(ms) = white_ms {
            self.clocks.set_remaining(Color::White, ms);
        }
        if let Some(ms) = black_ms {
            self.clocks.set_remaining(Color::Black, ms);
        }
        self.pending = None;
        self.pending_promotion = None;
        self.retry_fen = None;
        self.phase = SessionPhase::InProgress;

        if self.position.is_terminal() {
            let result = self.local_terminal_result();
            self.end(result);
            return Ok(None);
        }

        let to_move = self.position.side_to_move();
        self.clocks.activate(to_move, now);
        if to_move == HUMAN_SIDE {
            Ok(None)
        } else {
            Ok(Some(self.register_request(self.position.fen())))
        }
    }

    /// Handle a board click from the player.
    pub fn handle_click(&mut self, square: Square, now: Instant) -> ClickOutcome {
        if !self.is_in_progress()
            || self.position.side_to_move() != HUMAN_SIDE
            || self.thinking()
        {
            return ClickOutcome::Ignored;
        }
        self.pending_promotion = None;

        if self.position.selected() == Some(square) {
            self.position.clear_selection();
            return ClickOutcome::Selection;
        }

        if let Some(from) = self.position.selected() {
            if self.position.targets().contains(&square) {
                return self.apply_player_move(from, square, None, now);
            }
        }

        self.position.select_square(square);
        ClickOutcome::Selection
    }

    /// Apply the parked promotion with the chosen piece.
    pub fn promote(&mut self, piece: Piece, now: Instant) -> ClickOutcome {
        if !self.is_in_progress() || self.thinking() {
            return ClickOutcome::Ignored;
        }
        let (from, to) = match self.pending_promotion.take() {
            Some(parked) => parked,
            None => return ClickOutcome::Ignored,
        };
        self.apply_player_move(from, to, Some(piece), now)
    }

    pub fn cancel_promotion(&mut self) {
        self.pending_promotion = None;
    }

    fn apply_player_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
        now: Instant,
    ) -> ClickOutcome {
        match self.position.apply_move(from, to, promotion) {
            MoveOutcome::Illegal => {
                // An unreachable square re-points or clears the selection.
                self.position.select_square(to);
                ClickOutcome::Selection
            }
            MoveOutcome::PromotionNeeded => {
                self.pending_promotion = Some((from, to));
                ClickOutcome::PromotionRequired { from, to }
            }
            MoveOutcome::Applied(_) => {
                if self.position.is_terminal() {
                    let result = self.local_terminal_result();
                    self.end(result);
                    ClickOutcome::Ended(result)
                } else {
                    self.clocks.activate(!HUMAN_SIDE, now);
                    ClickOutcome::Submit(self.register_request(self.position.fen()))
                }
            }
        }
    }

    /// Confirm a mover reply belongs to the current request and consume it.
    pub fn take_pending_if_current(&mut self, id: Uuid) -> Option<PendingMoveRequest> {
        if self.pending.as_ref().map(|p| p.id) == Some(id) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Apply a mover reply. The caller has already confirmed request currency.
    pub fn apply_reply(
        &mut self,
        updated_fen: &str,
        result_code: &str,
        now: Instant,
    ) -> Result<ReplyOutcome, PositionError> {
        if !updated_fen.is_empty() {
            self.position.load_fen(updated_fen)?;
        }

        if let Some(outcome) = GameOutcome::from_code(result_code) {
            let reason = if outcome == GameOutcome::Draw {
                EndReason::Draw
            } else {
                EndReason::Checkmate
            };
            let result = SessionResult { outcome, reason };
            self.end(result);
            return Ok(ReplyOutcome::Ended(result));
        }

        if self.position.is_terminal() {
            let result = self.local_terminal_result();
            self.end(result);
            return Ok(ReplyOutcome::Ended(result));
        }

        self.retry_fen = None;
        self.clocks.activate(self.position.side_to_move(), now);
        Ok(ReplyOutcome::Continue)
    }

    /// Record a failed mover call; the submitted position is kept for retry.
    pub fn note_backend_failure(&mut self, request: PendingMoveRequest) {
        self.retry_fen = Some(request.fen);
        self.clocks.deactivate();
    }

    /// Resubmit the position from the last failed call.
    pub fn retry(&mut self, now: Instant) -> Option<PendingMoveRequest> {
        if !self.is_in_progress() || self.thinking() {
            return None;
        }
        let fen = self.retry_fen.clone()?;
        self.clocks.activate(!HUMAN_SIDE, now);
        Some(self.register_request(fen))
    }

    /// Advance the clocks; a flagged side finishes the session in place.
    pub fn tick(&mut self, now: Instant) -> SessionTick {
        if !self.is_in_progress() {
            return SessionTick::Idle;
        }
        match self.clocks.tick(now) {
            TickOutcome::Idle => SessionTick::Idle,
            TickOutcome::Running => SessionTick::Running,
            TickOutcome::Flagged(flagged) => {
                let outcome = if flagged == HUMAN_SIDE {
                    GameOutcome::BlackWins
                } else {
                    GameOutcome::WhiteWins
                };
                let result = SessionResult {
                    outcome,
                    reason: EndReason::Timeout,
                };
                self.end(result);
                SessionTick::Ended(result)
            }
        }
    }

    /// Abandon whatever is running and return to the start screen.
    pub fn reset_for_new_game(&mut self) {
        self.pending = None;
        self.pending_promotion = None;
        self.retry_fen = None;
        self.position.reset();
        self.clocks.reset(self.clocks.initial_ms());
        self.phase = SessionPhase::AwaitingStart;
    }

    fn register_request(&mut self, fen: String) -> PendingMoveRequest {
        let request = PendingMoveRequest {
            id: Uuid::new_v4(),
            fen,
        };
        self.pending = Some(request.clone());
        request
    }

    fn local_terminal_result(&self) -> SessionResult {
        if self.position.is_checkmate() {
            // The side that cannot move lost.
            let outcome = if self.position.side_to_move() == Color::White {
                GameOutcome::BlackWins
            } else {
                GameOutcome::WhiteWins
            };
            SessionResult {
                outcome,
                reason: EndReason::Checkmate,
            }
        } else {
            SessionResult {
                outcome: GameOutcome::Draw,
                reason: EndReason::Draw,
            }
        }
    }

    fn end(&mut self, result: SessionResult) {
        self.phase = SessionPhase::Ended(result);
        self.pending = None;
        self.pending_promotion = None;
        self.retry_fen = None;
        self.clocks.deactivate();
        self.position.clear_selection();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
