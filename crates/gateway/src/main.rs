use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use device_link::{DeviceLink, TokioSerialConnector};
use gateway_api::ApiContext;
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::StructuralCommand,
    error::{ApiError, ErrorCode},
    protocol::{
        AnalyzeResponse, CommandResponse, ConnectRequest, GestureRequest, NumberRequest,
        RawCommandRequest, ServoRequest, StatusResponse,
    },
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

type Reply<T> = (StatusCode, Json<T>);

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    actuate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings()?;
    let link = Arc::new(DeviceLink::new(
        Arc::new(TokioSerialConnector::default()),
        settings.link_config(),
    ));
    let api = ApiContext {
        link: link.clone(),
        candidates: settings.candidates(),
        default_baud_rate: settings.baud_rate,
    };

    if settings.auto_connect {
        // The settle delay blocks for seconds; keep it off the serving path.
        tokio::spawn(startup_connect(api.clone()));
    }

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings
        .gateway_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.gateway_bind))?;
    info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    link.disconnect().await;
    info!("gateway stopped");
    Ok(())
}

async fn startup_connect(api: ApiContext) {
    match gateway_api::connect(&api, ConnectRequest::default()).await {
        Ok(response) => info!(message = %response.message, "device ready"),
        Err(err) => warn!(
            message = %err.message,
            "device not connected at startup; POST /connect to retry"
        ),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/command", post(send_command))
        .route("/gesture", post(send_gesture))
        .route("/rps", post(send_rps))
        .route("/number", post(send_number))
        .route("/servo", post(send_servo))
        .route("/reset", post(reset))
        .route("/openmax", post(open_max))
        .route("/closemax", post(close_max))
        .route("/analyze_hand", post(analyze_hand))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::LinkUnavailable | ErrorCode::ConnectFailed => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Io => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply(result: Result<CommandResponse, ApiError>) -> Reply<CommandResponse> {
    match result {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => {
            warn!(code = ?err.code, message = %err.message, "request failed");
            (status_for(err.code), Json(CommandResponse::failed(&err)))
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::invalid(format!("invalid request body: {e}")))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(gateway_api::status(&state.api).await)
}

async fn connect(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(ConnectRequest::default())
    } else {
        parse_body::<ConnectRequest>(&body)
    };
    let result = match req {
        Ok(req) => gateway_api::connect(&state.api, req).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn disconnect(State(state): State<Arc<AppState>>) -> Reply<CommandResponse> {
    reply(Ok(gateway_api::disconnect(&state.api).await))
}

async fn send_command(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let result = match parse_body::<RawCommandRequest>(&body) {
        Ok(req) => gateway_api::send_raw(&state.api, &req.command).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn send_gesture(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let result = match parse_body::<GestureRequest>(&body) {
        Ok(req) => gateway_api::send_gesture(&state.api, &req.gesture).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn send_rps(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let result = match parse_body::<GestureRequest>(&body) {
        Ok(req) => gateway_api::send_rps(&state.api, &req.gesture).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn send_number(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let result = match parse_body::<NumberRequest>(&body) {
        Ok(req) => gateway_api::send_number(&state.api, &req.number).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn send_servo(State(state): State<Arc<AppState>>, body: Bytes) -> Reply<CommandResponse> {
    let result = match parse_body::<ServoRequest>(&body) {
        Ok(req) => gateway_api::send_servo(&state.api, req.index, req.angle).await,
        Err(err) => Err(err),
    };
    reply(result)
}

async fn reset(State(state): State<Arc<AppState>>) -> Reply<CommandResponse> {
    reply(gateway_api::send_structural(&state.api, StructuralCommand::Reset).await)
}

async fn open_max(State(state): State<Arc<AppState>>) -> Reply<CommandResponse> {
    reply(gateway_api::send_structural(&state.api, StructuralCommand::FullOpen).await)
}

async fn close_max(State(state): State<Arc<AppState>>) -> Reply<CommandResponse> {
    reply(gateway_api::send_structural(&state.api, StructuralCommand::FullClose).await)
}

async fn analyze_hand(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AnalyzeQuery>,
    body: Bytes,
) -> Reply<AnalyzeResponse> {
    match parse_body::<serde_json::Value>(&body) {
        Ok(payload) => (
            StatusCode::OK,
            Json(gateway_api::analyze_hand(&state.api, &payload, q.actuate).await),
        ),
        Err(err) => {
            warn!(message = %err.message, "pose payload rejected");
            (StatusCode::BAD_REQUEST, Json(AnalyzeResponse::rejected(&err)))
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
