use chess::{Color, Square};
use serde::{Deserialize, Serialize};

use crate::game::session::{GameSession, SessionResult};
use crate::game::utils::{color_to_string, format_clock};

/// Message sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientMessage {
    pub message_type: String,
    pub square: Option<String>,
    pub promotion: Option<String>,
    pub minutes: Option<f64>,
}

/// Message sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ServerMessage {
    pub message_type: String,
    pub phase: Option<String>,
    pub fen: Option<String>,
    pub side_to_move: Option<String>,
    pub selected: Option<String>,
    pub targets: Option<Vec<String>>,
    pub last_move: Option<LastMove>,
    pub history: Option<Vec<String>>,
    pub white_time_ms: Option<u64>,
    pub black_time_ms: Option<u64>,
    pub white_clock: Option<String>,
    pub black_clock: Option<String>,
    pub thinking: Option<bool>,
    pub time_label: Option<String>,
    pub result: Option<String>,
    pub reason: Option<String>,
    pub error: Option<String>,
    pub retryable: Option<bool>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Last move information
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LastMove {
    pub from: String,
    pub to: String,
}

impl ServerMessage {
    /// Full snapshot of the session for the client to render.
    pub fn session(session: &GameSession) -> Self {
        let (result, reason) = match session.result() {
            Some(result) => (
                Some(result.outcome.as_code().to_string()),
                Some(result.reason.as_str().to_string()),
            ),
            None => (None, None),
        };
        let white_ms = session.clocks.remaining_ms(Color::White);
        let black_ms = session.clocks.remaining_ms(Color::Black);
        ServerMessage {
            message_type: "session".to_string(),
            phase: Some(session.phase().as_str().to_string()),
            fen: Some(session.position.fen()),
            side_to_move: Some(color_to_string(session.position.side_to_move())),
            selected: session.position.selected().map(|s| s.to_string()),
            targets: Some(
                session
                    .position
                    .targets()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            last_move: session.position.last_move().map(|(from, to)| LastMove {
                from: from.to_string(),
                to: to.to_string(),
            }),
            history: Some(session.position.history().to_vec()),
            white_time_ms: Some(white_ms),
            black_time_ms: Some(black_ms),
            white_clock: Some(format_clock(white_ms)),
            black_clock: Some(format_clock(black_ms)),
            thinking: Some(session.thinking()),
            time_label: Some(session.time_label().to_string()),
            result,
            reason,
            ..Default::default()
        }
    }

    /// Lightweight clock update pushed on every timer tick.
    pub fn clock(session: &GameSession) -> Self {
        let white_ms = session.clocks.remaining_ms(Color::White);
        let black_ms = session.clocks.remaining_ms(Color::Black);
        ServerMessage {
            message_type: "clock".to_string(),
            white_time_ms: Some(white_ms),
            black_time_ms: Some(black_ms),
            white_clock: Some(format_clock(white_ms)),
            black_clock: Some(format_clock(black_ms)),
            thinking: Some(session.thinking()),
            ..Default::default()
        }
    }

    pub fn promotion_required(from: Square, to: Square) -> Self {
        ServerMessage {
            message_type: "promotion_required".to_string(),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Default::default()
        }
    }

    pub fn game_over(result: SessionResult) -> Self {
        ServerMessage {
            message_type: "game_over".to_string(),
            result: Some(result.outcome.as_code().to_string()),
            reason: Some(result.reason.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage {
            message_type: "error".to_string(),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Error the client may answer with a retry request.
    pub fn retryable_error(message: impl Into<String>) -> Self {
        ServerMessage {
            message_type: "error".to_string(),
            error: Some(message.into()),
            retryable: Some(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod messages_tests;
