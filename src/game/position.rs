use chess::{Board, BoardStatus, Color, Game, MoveGen, Piece, Square};
use std::str::FromStr;
use thiserror::Error;

use crate::game::utils::{has_insufficient_material, move_notation};

/// Failure to accept a serialized position.
#[derive(Debug, Error)]
pub enum PositionError {
    /// The rules library rejected the position string.
    #[error("invalid position string: {0}")]
    InvalidFormat(String),
}

/// A move the store has applied to the live position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

/// Result of asking the store to apply a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No legal move matches; nothing changed.
    Illegal,
    /// The move is a pawn promotion and no piece was chosen; nothing changed.
    PromotionNeeded,
    /// The move was applied.
    Applied(AppliedMove),
}

/// Owns the live position and the selection, delegating rules to the chess crate.
pub struct PositionStore {
    game: Game,
    selected: Option<Square>,
    targets: Vec<Square>,
    history: Vec<String>,
    last_move: Option<(Square, Square)>,
}

impl PositionStore {
    pub fn new() -> Self {
        PositionStore {
            game: Game::new(),
            selected: None,
            targets: Vec::new(),
            history: Vec::new(),
            last_move: None,
        }
    }

    /// FEN of the live position.
    pub fn fen(&self) -> String {
        self.game.current_position().to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.game.side_to_move()
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn targets(&self) -> &[Square] {
        &self.targets
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Legal destination squares for a piece on the given square.
    pub fn legal_targets(&self, from: Square) -> Vec<Square> {
        let board = self.game.current_position();
        MoveGen::new_legal(&board)
            .filter(|m| m.get_source() == from)
            .map(|m| m.get_dest())
            .collect()
    }

    /// Select a square if the side to move has a piece with legal moves there,
    /// otherwise clear the selection.
    pub fn select_square(&mut self, square: Square) -> bool {
        let board = self.game.current_position();
        if board.color_on(square) == Some(board.side_to_move()) {
            let targets = self.legal_targets(square);
            if !targets.is_empty() {
                self.selected = Some(square);
                self.targets = targets;
                return true;
            }
        }
        self.clear_selection();
        false
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.targets.clear();
    }

    /// Apply a move if it is legal for the current position.
    pub fn apply_move(&mut self, from: Square, to: Square, promotion: Option<Piece>) -> MoveOutcome {
        let board = self.game.current_position();
        let mut candidates =
            MoveGen::new_legal(&board).filter(|m| m.get_source() == from && m.get_dest() == to);

        let chosen = match promotion {
            Some(piece) => candidates.find(|m| m.get_promotion() == Some(piece)),
            None => match candidates.next() {
                // A promoting pawn needs a piece choice before anything changes.
                Some(m) if m.get_promotion().is_some() => return MoveOutcome::PromotionNeeded,
                other => other,
            },
        };

        let chess_move = match chosen {
            Some(m) => m,
            None => return MoveOutcome::Illegal,
        };

        if !self.game.make_move(chess_move) {
            return MoveOutcome::Illegal;
        }
        self.history
            .push(move_notation(from, to, chess_move.get_promotion()));
        self.last_move = Some((from, to));
        self.clear_selection();
        MoveOutcome::Applied(AppliedMove {
            from,
            to,
            promotion: chess_move.get_promotion(),
        })
    }

    /// Replace the live position wholesale from a FEN string.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), PositionError> {
        let board =
            Board::from_str(fen).map_err(|_| PositionError::InvalidFormat(fen.to_string()))?;
        self.game = Game::new_with_board(board);
        self.clear_selection();
        self.last_move = None;
        Ok(())
    }

    /// Back to the standard starting position.
    pub fn reset(&mut self) {
        self.game = Game::new();
        self.history.clear();
        self.clear_selection();
        self.last_move = None;
    }

    /// True when no further play is possible from the live position.
    pub fn is_terminal(&self) -> bool {
        let board = self.game.current_position();
        board.status() != BoardStatus::Ongoing
            || has_insufficient_material(&board)
            || self.game.can_declare_draw()
    }

    /// True when the side to move is checkmated.
    pub fn is_checkmate(&self) -> bool {
        self.game.current_position().status() == BoardStatus::Checkmate
    }
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod position_tests;
