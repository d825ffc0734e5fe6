use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::RoomConfigPatch;
use crate::room_manager::CloseReason;
use crate::session::{OutboundMessage, CLOSE_UNAUTHORIZED};
use crate::state::{Clock, SharedState};

/// Everything the admin plane needs: the shared hub, the bearer token and
/// the process clock.
#[derive(Clone)]
pub struct AdminContext {
    pub state: SharedState,
    pub token: Arc<String>,
    pub clock: Clock,
}

pub fn admin_router(ctx: AdminContext) -> Router {
    Router::new()
        .route("/api/admin/rooms", get(list_rooms).post(create_room))
        .route("/api/admin/rooms/{id}", delete(close_room))
        .route(
            "/api/admin/rooms/{id}/config",
            get(get_room_config).patch(patch_room_config),
        )
        .route(
            "/api/admin/config/default",
            get(get_default_config).patch(patch_default_config),
        )
        .route("/api/admin/rooms/{id}/players", get(list_players))
        .route(
            "/api/admin/rooms/{id}/players/{player_id}/kick",
            post(kick_player),
        )
        .route("/api/admin/ban", post(ban_name))
        .route("/api/admin/logs", get(get_logs))
        .route("/api/admin/stats", get(get_stats))
        .route("/api/admin/ws", get(spectator_ws))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(ctx)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn authorized(ctx: &AdminContext, headers: &HeaderMap) -> bool {
    bearer_token(headers) == Some(ctx.token.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "UNAUTHORIZED" })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "NOT_FOUND" })),
    )
        .into_response()
}

fn config_invalid(fields: Vec<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "CONFIG_INVALID", "fields": fields })),
    )
        .into_response()
}

async fn list_rooms(State(ctx): State<AdminContext>, headers: HeaderMap) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    Json(json!({ "rooms": guard.room_summaries() })).into_response()
}

async fn create_room(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Json(patch): Json<RoomConfigPatch>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let mut guard = ctx.state.lock().await;
    match guard.create_room(&patch, ctx.clock.now_ms()) {
        Ok(room_id) => {
            let config = guard.rooms.get(&room_id).map(|room| room.config.clone());
            Json(json!({ "roomId": room_id, "config": config })).into_response()
        }
        Err(err) => config_invalid(err.fields),
    }
}

async fn close_room(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let mut guard = ctx.state.lock().await;
    if guard.close_room(&room_id, CloseReason::Manual, ctx.clock.now_ms()) {
        Json(json!({ "closed": room_id })).into_response()
    } else {
        not_found()
    }
}

async fn get_room_config(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    match guard.rooms.get(&room_id) {
        Some(room) => Json(room.config.clone()).into_response(),
        None => not_found(),
    }
}

async fn patch_room_config(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
    Json(patch): Json<RoomConfigPatch>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let mut guard = ctx.state.lock().await;
    let Some(room) = guard.rooms.get_mut(&room_id) else {
        return not_found();
    };
    match patch.apply(&room.config) {
        Ok(merged) => {
            room.config = merged.clone();
            Json(merged).into_response()
        }
        Err(err) => config_invalid(err.fields),
    }
}

async fn get_default_config(State(ctx): State<AdminContext>, headers: HeaderMap) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    Json(guard.rooms.default_config().clone()).into_response()
}

async fn patch_default_config(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Json(patch): Json<RoomConfigPatch>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let mut guard = ctx.state.lock().await;
    match guard.rooms.set_default(&patch) {
        Ok(merged) => Json(merged).into_response(),
        Err(err) => config_invalid(err.fields),
    }
}

async fn list_players(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    if guard.rooms.get(&room_id).is_none() {
        return not_found();
    }
    Json(json!({ "players": guard.room_players(&room_id) })).into_response()
}

async fn kick_player(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let mut guard = ctx.state.lock().await;
    if guard.kick(&room_id, &player_id, ctx.clock.now_ms()) {
        Json(json!({ "kicked": player_id })).into_response()
    } else {
        not_found()
    }
}

#[derive(Debug, Deserialize)]
struct BanRequest {
    name: String,
}

async fn ban_name(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Json(request): Json<BanRequest>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    if request.name.trim().is_empty() {
        return config_invalid(vec!["name".to_string()]);
    }
    let mut guard = ctx.state.lock().await;
    let kicked = guard.ban(&request.name, ctx.clock.now_ms());
    Json(json!({ "banned": request.name.trim().to_lowercase(), "kicked": kicked }))
        .into_response()
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn get_logs(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    Json(json!({ "events": guard.events.recent(query.limit.unwrap_or(100)) })).into_response()
}

async fn get_stats(State(ctx): State<AdminContext>, headers: HeaderMap) -> Response {
    if !authorized(&ctx, &headers) {
        return unauthorized();
    }
    let guard = ctx.state.lock().await;
    let rooms: Vec<serde_json::Value> = guard
        .rooms
        .iter()
        .map(|room| {
            json!({
                "id": room.id,
                "players": room.player_count(),
                "foods": room.food_count(),
                "foodSpawnRatePerSecond": room.config.food_spawn_rate_per_second,
                "tick": room.tick_stats(),
            })
        })
        .collect();
    Json(json!({
        "counters": guard.metrics.to_json(),
        "sessions": guard.sessions.len(),
        "spectators": guard.spectators.len(),
        "broadcastRateHz": guard.broadcast_rate_hz,
        "rooms": rooms,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct WsAuthQuery {
    token: Option<String>,
}

/// Spectator socket. Browsers cannot attach an Authorization header to a
/// WebSocket, so a `token` query parameter is accepted as an equivalent.
async fn spectator_ws(
    State(ctx): State<AdminContext>,
    headers: HeaderMap,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let ok = authorized(&ctx, &headers) || query.token.as_deref() == Some(ctx.token.as_str());
    if !ok {
        return ws.on_upgrade(reject_unauthorized).into_response();
    }
    ws.on_upgrade(move |socket| handle_spectator_socket(ctx, socket))
        .into_response()
}

async fn reject_unauthorized(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_UNAUTHORIZED,
            reason: "unauthorized".into(),
        })))
        .await;
}

async fn handle_spectator_socket(ctx: AdminContext, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(64);
    let spectator_id = {
        let mut guard = ctx.state.lock().await;
        guard.open_spectator(tx.clone(), ctx.clock.now_ms())
    };
    debug!(spectator = %spectator_id, "admin spectator connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    ws_sender
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => {
                let mut guard = ctx.state.lock().await;
                guard.handle_spectator_message(&spectator_id, raw.as_str());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = ctx.state.lock().await;
        guard.close_spectator(&spectator_id);
    }
    drop(tx);
    let _ = writer.await;
}
