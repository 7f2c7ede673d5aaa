use crate::models::chat::{ ErrorBody, RelayRequest, RelayResponse };
use crate::relay::{ CompletionRelay, DirectRelay, RelayError };
use std::num::NonZeroU32;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{ rejection::BytesRejection, DefaultBodyLimit, Request, State },
    http::{ header::CONTENT_TYPE, Method, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post, MethodRouter },
    Json,
    Router,
};
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn };

type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub const RELAY_PATH: &str = "/api/chat";
pub const FUNCTION_PATH: &str = "/.netlify/functions/chat";
pub const PROXY_PATH: &str = "/v1/chat/completions";
pub const STATUS_PATH: &str = "/api/status";

/// Largest request body accepted on any route.
pub const MAX_BODY_SIZE: usize = 1 * 1024 * 1024;

#[derive(Serialize)]
struct StatusResponse {
    credential_configured: bool,
    model: String,
    proxy_enabled: bool,
}

#[derive(Clone)]
pub struct AppState {
    relay: Arc<DirectRelay>,
    limiter: Option<Arc<GlobalLimiter>>,
    proxy_enabled: bool,
}

impl AppState {
    /// `rate_limit` is requests per second across all clients; `0` means unlimited.
    pub fn new(relay: Arc<DirectRelay>, proxy_enabled: bool, rate_limit: u32) -> Self {
        let limiter = NonZeroU32::new(rate_limit)
            .map(|per_second| Arc::new(RateLimiter::direct(Quota::per_second(per_second))));
        Self { relay, limiter, proxy_enabled }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let relay_route = || -> MethodRouter<AppState> {
        post(relay_handler).options(preflight_handler).fallback(method_not_allowed)
    };

    let mut app: Router<AppState> = Router::new()
        .route(RELAY_PATH, relay_route())
        .route(FUNCTION_PATH, relay_route())
        .route(STATUS_PATH, get(status_handler));

    if state.proxy_enabled {
        app = app.route(PROXY_PATH, post(proxy_handler).fallback(method_not_allowed));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors)
        .with_state(state)
}

pub fn error_response(err: &RelayError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody { error: err.to_string() })).into_response()
}

/// Body extraction failures (oversized, unreadable) keep the `{error}` shape.
fn rejection_response(rejection: BytesRejection) -> Response {
    warn!("Rejected request body: {}", rejection.body_text());
    (rejection.status(), Json(ErrorBody { error: rejection.body_text() })).into_response()
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Rate limit exceeded for {} {}", req.method(), req.uri().path());
            return error_response(&RelayError::RateLimited);
        }
    }
    next.run(req).await
}

async fn relay_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(rejection) => return rejection_response(rejection),
    };
    let request = match serde_json::from_slice::<RelayRequest>(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected relay request: {}", e);
            return error_response(&RelayError::InvalidRequest(format!("Invalid request body: {}", e)));
        }
    };

    match state.relay.relay(&request.messages).await {
        Ok(content) => (StatusCode::OK, Json(RelayResponse { content })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.relay.passthrough(body.to_vec()).await {
        Ok(raw) => {
            let status = StatusCode::from_u16(raw.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = raw.content_type.unwrap_or_else(|| "application/json".to_string());
            info!("Proxied completion request, upstream status {}", raw.status);
            (status, [(CONTENT_TYPE, content_type)], raw.body).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        credential_configured: state.relay.has_credential(),
        model: state.relay.model(),
        proxy_enabled: state.proxy_enabled,
    })
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(ErrorBody { error: "Method not allowed".into() })).into_response()
}
