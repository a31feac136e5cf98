use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use chess::Color;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::game::session::{
    GameSession, PendingMoveRequest, ReplyOutcome, SessionResult, SessionTick,
};
use crate::game::utils::{force_white_to_move, is_truthy_flag};
use crate::models::{AppState, ClientMessage, ServerMessage};
use crate::mover::{MoverError, MoverReply};
use crate::storage::{KEY_CLOCK_AI, KEY_CLOCK_PLAYER, KEY_POSITION};

/// How often the active clock is re-billed.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Position to load for a freshly opened connection, already validated
/// against the configured admin key.
pub struct AdminBoot {
    pub fen: String,
}

/// WebSocket handler for one game session
pub struct GambitronWebSocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    pub session: GameSession,
    admin_boot: Option<AdminBoot>,
    tick_handle: Option<SpawnHandle>,
    request_handle: Option<SpawnHandle>,
}

impl GambitronWebSocket {
    pub fn new(app_state: web::Data<AppState>, admin_boot: Option<AdminBoot>) -> Self {
        GambitronWebSocket {
            id: Uuid::new_v4().to_string(),
            app_state,
            session: GameSession::new(),
            admin_boot,
            tick_handle: None,
            request_handle: None,
        }
    }
}

impl Actor for GambitronWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection started: {}", self.id);
        if let Some(boot) = self.admin_boot.take() {
            self.boot_from_admin(boot, ctx);
        } else {
            self.boot_from_storage(ctx);
        }
        self.send(ServerMessage::session(&self.session), ctx);
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        // The timer and any in-flight request die with the connection.
        self.stop_ticking(ctx);
        self.abort_request(ctx);
        info!("WebSocket connection closed: {}", self.id);
        Running::Stop
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GambitronWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                debug!("Received text message: {}", text);
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(client_msg) => self.handle_message(client_msg, ctx),
                    Err(e) => {
                        warn!("Error parsing client message: {}", e);
                        self.send(
                            ServerMessage::error(format!("Invalid message format: {}", e)),
                            ctx,
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send(ServerMessage::error("Binary messages are not supported"), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

impl GambitronWebSocket {
    /// Serialize and push one message to the client.
    pub(crate) fn send(&self, message: ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(&message) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                warn!("Error serializing message: {}", e);
                ctx.text("{\"error\": \"Internal server error\"}");
            }
        }
    }

    /// Arm the clock timer if it is not already running.
    pub(crate) fn ensure_ticking(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if self.tick_handle.is_none() {
            self.tick_handle = Some(ctx.run_interval(TICK_INTERVAL, |act, ctx| act.on_tick(ctx)));
        }
    }

    pub(crate) fn stop_ticking(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(handle) = self.tick_handle.take() {
            ctx.cancel_future(handle);
        }
    }

    /// Drop the in-flight mover future, if any.
    pub(crate) fn abort_request(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if let Some(handle) = self.request_handle.take() {
            ctx.cancel_future(handle);
        }
    }

    fn on_tick(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        match self.session.tick(Instant::now()) {
            SessionTick::Idle => {}
            SessionTick::Running => {
                self.persist_clocks();
                self.send(ServerMessage::clock(&self.session), ctx);
            }
            SessionTick::Ended(result) => {
                info!("Session {} ended on time: {:?}", self.id, result);
                self.finish_game(result, ctx);
            }
        }
    }

    /// Send a registered request to the mover, superseding any older one.
    pub(crate) fn dispatch_request(
        &mut self,
        request: PendingMoveRequest,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        self.abort_request(ctx);
        info!("Submitting position to mover (request {})", request.id);
        let service = self.app_state.mover.clone();
        let request_id = request.id;
        let fen = request.fen.clone();
        let future = async move { service.compute_move(&fen).await };
        let handle = ctx.spawn(fut::wrap_future::<_, Self>(future).map(
            move |outcome, act, ctx| {
                act.request_handle = None;
                act.on_mover_outcome(request_id, outcome, ctx);
            },
        ));
        self.request_handle = Some(handle);
    }

    fn on_mover_outcome(
        &mut self,
        request_id: Uuid,
        outcome: Result<MoverReply, MoverError>,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let request = match self.session.take_pending_if_current(request_id) {
            Some(request) => request,
            None => {
                // Superseded or the session moved on; the reply is dead.
                debug!("Discarding stale mover reply for request {}", request_id);
                return;
            }
        };
        if !self.session.is_in_progress() {
            debug!("Discarding mover reply for finished session {}", self.id);
            return;
        }
        match outcome {
            Ok(reply) => self.apply_mover_reply(request, reply, ctx),
            Err(e) => {
                warn!("Mover request {} failed: {}", request_id, e);
                self.session.note_backend_failure(request);
                self.persist_clocks();
                self.send(ServerMessage::retryable_error("Move service unavailable"), ctx);
            }
        }
    }

    fn apply_mover_reply(
        &mut self,
        request: PendingMoveRequest,
        reply: MoverReply,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match self
            .session
            .apply_reply(&reply.updated_fen, &reply.result, Instant::now())
        {
            Ok(ReplyOutcome::Continue) => {
                self.persist_position();
                self.send(ServerMessage::session(&self.session), ctx);
            }
            Ok(ReplyOutcome::Ended(result)) => {
                info!("Session {} ended: {:?}", self.id, result);
                self.finish_game(result, ctx);
            }
            Err(e) => {
                // A reply that does not parse is handled like an outage.
                warn!("Mover returned an unusable position: {}", e);
                self.session.note_backend_failure(request);
                self.persist_clocks();
                self.send(
                    ServerMessage::retryable_error("Move service returned an invalid position"),
                    ctx,
                );
            }
        }
    }

    /// Common teardown once the session has a result.
    pub(crate) fn finish_game(&mut self, result: SessionResult, ctx: &mut ws::WebsocketContext<Self>) {
        self.abort_request(ctx);
        self.stop_ticking(ctx);
        self.persist_position();
        self.persist_clocks();
        self.send(ServerMessage::session(&self.session), ctx);
        self.send(ServerMessage::game_over(result), ctx);
    }

    /// Snapshot the serialized position.
    pub(crate) fn persist_position(&self) {
        let mut storage = self.app_state.storage.lock().unwrap();
        storage.set(KEY_POSITION, self.session.position.fen());
    }

    /// Snapshot both clock values.
    pub(crate) fn persist_clocks(&self) {
        let mut storage = self.app_state.storage.lock().unwrap();
        storage.set(
            KEY_CLOCK_PLAYER,
            self.session.clocks.remaining_ms(Color::White).to_string(),
        );
        storage.set(
            KEY_CLOCK_AI,
            self.session.clocks.remaining_ms(Color::Black).to_string(),
        );
    }

    /// Drop every stored key.
    pub(crate) fn clear_storage(&self) {
        let mut storage = self.app_state.storage.lock().unwrap();
        storage.remove(KEY_POSITION);
        storage.remove(KEY_CLOCK_PLAYER);
        storage.remove(KEY_CLOCK_AI);
    }

    fn boot_from_storage(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let (stored_fen, white_ms, black_ms) = {
            let storage = self.app_state.storage.lock().unwrap();
            (
                storage.get(KEY_POSITION).map(str::to_string),
                storage.get_u64(KEY_CLOCK_PLAYER),
                storage.get_u64(KEY_CLOCK_AI),
            )
        };
        let fen = match stored_fen {
            Some(fen) => fen,
            None => return,
        };
        match self.session.restore(&fen, white_ms, black_ms, Instant::now()) {
            Ok(submit) => {
                info!("Restored stored game for session {}", self.id);
                if self.session.is_in_progress() {
                    self.ensure_ticking(ctx);
                }
                if let Some(request) = submit {
                    self.dispatch_request(request, ctx);
                }
            }
            Err(e) => {
                warn!("Stored position is invalid, discarding: {}", e);
                self.app_state.storage.lock().unwrap().remove(KEY_POSITION);
            }
        }
    }

    fn boot_from_admin(&mut self, boot: AdminBoot, ctx: &mut ws::WebsocketContext<Self>) {
        match self.session.restore(&boot.fen, None, None, Instant::now()) {
            Ok(submit) => {
                info!("Loaded supplied position for session {}", self.id);
                self.persist_position();
                self.persist_clocks();
                if self.session.is_in_progress() {
                    self.ensure_ticking(ctx);
                }
                if let Some(request) = submit {
                    self.dispatch_request(request, ctx);
                }
            }
            Err(e) => {
                warn!("Supplied position rejected: {}", e);
                self.send(ServerMessage::error(format!("Invalid position: {}", e)), ctx);
            }
        }
    }
}

/// Query parameters accepted on the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub admin_key: Option<String>,
    pub fen: Option<String>,
    pub keep_turn: Option<String>,
}

/// Validate the admin query against the configured secret.
pub fn admin_boot_from_query(query: &ConnectQuery, config: &AppConfig) -> Option<AdminBoot> {
    let supplied = query.admin_key.as_deref()?;
    let expected = config.admin_key.as_deref()?;
    if supplied != expected {
        warn!("Rejected position load: wrong admin key");
        return None;
    }
    let fen = query.fen.as_deref()?.trim();
    if fen.is_empty() {
        return None;
    }
    let keep_turn = query
        .keep_turn
        .as_deref()
        .map(is_truthy_flag)
        .unwrap_or(false);
    let fen = if keep_turn {
        fen.to_string()
    } else {
        force_white_to_move(fen)
    };
    Some(AdminBoot { fen })
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<ConnectQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let admin_boot = admin_boot_from_query(&query, &app_state.config);
    let ws = GambitronWebSocket::new(app_state.clone(), admin_boot);
    info!("New WebSocket connection: {}", ws.id);
    ws::start(ws, &req, stream)
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod handler_tests;
