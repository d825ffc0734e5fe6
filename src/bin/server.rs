use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use rand::Rng as _;
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use worm_arena_server::admin::{admin_router, AdminContext};
use worm_arena_server::config::RoomConfig;
use worm_arena_server::constants::{
    DEFAULT_BROADCAST_RATE_HZ, HEARTBEAT_INTERVAL_MS, IDLE_SWEEP_INTERVAL_MS,
    MAX_BROADCAST_RATE_HZ, MIN_BROADCAST_RATE_HZ, SPECTATOR_SNAPSHOT_INTERVAL_MS, TICK_MS,
};
use worm_arena_server::metrics::Metrics;
use worm_arena_server::session::OutboundMessage;
use worm_arena_server::state::{Clock, ServerState, SharedState};

#[derive(Clone)]
struct AppContext {
    state: SharedState,
    clock: Clock,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let admin_token = match std::env::var("ADMIN_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => {
            error!("ADMIN_TOKEN must be set and non-empty");
            std::process::exit(1);
        }
    };

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let broadcast_rate_hz = std::env::var("BROADCAST_HZ")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(DEFAULT_BROADCAST_RATE_HZ)
        .clamp(MIN_BROADCAST_RATE_HZ, MAX_BROADCAST_RATE_HZ);

    let clock = Clock::start();
    let metrics = Arc::new(Metrics::new());
    let master_seed: u32 = rand::rng().random();
    let state: SharedState = Arc::new(Mutex::new(ServerState::new(
        RoomConfig::default(),
        master_seed,
        broadcast_rate_hz,
        metrics,
    )));

    start_tick_loop(state.clone(), clock);
    start_broadcast_loop(state.clone(), clock, broadcast_rate_hz);
    start_heartbeat_loop(state.clone(), clock);
    start_idle_sweep_loop(state.clone(), clock);
    start_spectator_loop(state.clone(), clock);

    let app_ctx = AppContext {
        state: state.clone(),
        clock,
    };
    let admin_ctx = AdminContext {
        state,
        token: Arc::new(admin_token),
        clock,
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(app_ctx)
        .merge(admin_router(admin_ctx));

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(dir = %static_dir.to_string_lossy(), "serving dashboard assets");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, broadcast_rate_hz, "listening");
    axum::serve(listener, app).await.expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let candidate = PathBuf::from("dist/dashboard");
    candidate.join("index.html").is_file().then_some(candidate)
}

fn start_tick_loop(state: SharedState, clock: Clock) {
    tokio::spawn(async move {
        let dt = TICK_MS as f64 / 1_000.0;
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.tick_all(clock.now_ms(), dt);
        }
    });
}

fn start_broadcast_loop(state: SharedState, clock: Clock, rate_hz: u32) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(1_000 / u64::from(rate_hz.max(1))));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.broadcast_all(clock.now_ms());
        }
    });
}

fn start_heartbeat_loop(state: SharedState, clock: Clock) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.heartbeat(clock.now_ms());
        }
    });
}

fn start_idle_sweep_loop(state: SharedState, clock: Clock) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(IDLE_SWEEP_INTERVAL_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.sweep_idle(clock.now_ms());
        }
    });
}

fn start_spectator_loop(state: SharedState, clock: Clock) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(SPECTATOR_SNAPSHOT_INTERVAL_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            guard.push_spectator_updates(clock.now_ms());
        }
    });
}

async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(ctx, socket))
}

async fn handle_socket(ctx: AppContext, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    let session_id = {
        let mut guard = ctx.state.lock().await;
        guard.open_session(tx.clone(), ctx.clock.now_ms())
    };

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
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
                guard.handle_message(&session_id, raw.as_str(), ctx.clock.now_ms());
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    let mut guard = ctx.state.lock().await;
                    guard.handle_message(&session_id, &text, ctx.clock.now_ms());
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = ctx.state.lock().await;
        guard.close_session(&session_id, ctx.clock.now_ms());
    }
    drop(tx);
    let _ = writer.await;
}
