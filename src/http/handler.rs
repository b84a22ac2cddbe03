//! Endpoint handlers.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::Response;

use crate::http::request::RequestContext;
use crate::http::response::{method_not_allowed, text_response};
use crate::http::server::AppState;

/// POST handler for the form endpoint.
pub async fn submit(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = RequestContext::new(peer, &parts.headers, &parts.uri);

    let body = match axum::body::to_bytes(body, state.config.listener.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id, error = %e, "Unreadable request body");
            return text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large.".to_string(),
                Some(&ctx.request_id),
            );
        }
    };

    state.dispatcher.dispatch(&ctx, &parts.headers, &body).await
}

/// Any method other than POST.
pub async fn reject_method() -> Response {
    method_not_allowed()
}
