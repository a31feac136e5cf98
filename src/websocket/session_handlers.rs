use actix_web_actors::ws;
use log::{info, warn};
use std::time::Instant;

use crate::game::session::{ClickOutcome, DEFAULT_MINUTES};
use crate::game::utils::{parse_promotion_piece, parse_square};
use crate::models::{ClientMessage, ServerMessage};
use crate::websocket::handler::GambitronWebSocket;

impl GambitronWebSocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg.message_type.as_str() {
            "start" => self.handle_start(msg, ctx),
            "click" => self.handle_click(msg, ctx),
            "promote" => self.handle_promote(msg, ctx),
            "promotion_cancel" => self.handle_promotion_cancel(ctx),
            "new_game" => self.handle_new_game(ctx),
            "retry" => self.handle_retry(ctx),
            "state" => self.handle_state(ctx),
            _ => {
                warn!("Unknown message type: {}", msg.message_type);
                self.send(
                    ServerMessage::error(format!("Unknown message type: {}", msg.message_type)),
                    ctx,
                );
            }
        }
    }

    /// Handle a request to begin a new game with a time control.
    pub fn handle_start(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let minutes = msg.minutes.unwrap_or(DEFAULT_MINUTES);
        if !self.session.start(minutes, Instant::now()) {
            // A running or finished game keeps its state.
            self.send(ServerMessage::session(&self.session), ctx);
            return;
        }
        info!("Session {} started with {} minutes", self.id, minutes);
        self.clear_storage();
        self.persist_clocks();
        self.ensure_ticking(ctx);
        self.send(ServerMessage::session(&self.session), ctx);
    }

    /// Handle a board click (select a piece or play a move).
    pub fn handle_click(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let square = match msg.square.as_deref().and_then(parse_square) {
            Some(square) => square,
            None => {
                self.send(ServerMessage::error("Click requires a square"), ctx);
                return;
            }
        };
        match self.session.handle_click(square, Instant::now()) {
            ClickOutcome::Ignored => {}
            ClickOutcome::Selection => {
                self.send(ServerMessage::session(&self.session), ctx);
            }
            ClickOutcome::PromotionRequired { from, to } => {
                self.send(ServerMessage::promotion_required(from, to), ctx);
            }
            ClickOutcome::Submit(request) => {
                self.persist_position();
                self.send(ServerMessage::session(&self.session), ctx);
                self.dispatch_request(request, ctx);
            }
            ClickOutcome::Ended(result) => {
                info!("Session {} ended: {:?}", self.id, result);
                self.finish_game(result, ctx);
            }
        }
    }

    /// Handle the piece choice for a parked promotion.
    pub fn handle_promote(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let piece = match msg.promotion.as_deref().and_then(parse_promotion_piece) {
            Some(piece) => piece,
            None => {
                self.send(
                    ServerMessage::error("Promotion requires a piece (q, r, b or n)"),
                    ctx,
                );
                return;
            }
        };
        match self.session.promote(piece, Instant::now()) {
            ClickOutcome::Submit(request) => {
                self.persist_position();
                self.send(ServerMessage::session(&self.session), ctx);
                self.dispatch_request(request, ctx);
            }
            ClickOutcome::Ended(result) => {
                info!("Session {} ended: {:?}", self.id, result);
                self.finish_game(result, ctx);
            }
            _ => {
                self.send(ServerMessage::session(&self.session), ctx);
            }
        }
    }

    pub fn handle_promotion_cancel(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        self.session.cancel_promotion();
        self.send(ServerMessage::session(&self.session), ctx);
    }

    /// Abandon the current game and return to the start screen.
    pub fn handle_new_game(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        info!("Session {} reset for a new game", self.id);
        self.abort_request(ctx);
        self.stop_ticking(ctx);
        self.session.reset_for_new_game();
        self.clear_storage();
        self.send(ServerMessage::session(&self.session), ctx);
    }

    /// Resubmit the last position after a mover failure.
    pub fn handle_retry(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(request) = self.session.retry(Instant::now()) {
            info!("Session {} retrying mover request", self.id);
            self.dispatch_request(request, ctx);
        }
        self.send(ServerMessage::session(&self.session), ctx);
    }

    /// Push a full snapshot on request.
    pub fn handle_state(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        self.send(ServerMessage::session(&self.session), ctx);
    }
}
