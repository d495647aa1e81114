use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error, info, warn};

use crate::authorization::{AuthorizationData, ACCESS_TOKEN_COOKIE};
use crate::errors::ApiError;
use crate::state::ServerState;

/// Count requests and record latency, labelled by method and final status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let start = Instant::now();
    let resp = next.run(req).await;
    common::telemetry::observe_http(&method, resp.status().as_u16(), start.elapsed());
    resp
}

/// One record per request: method, path, status and latency.
pub async fn log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let resp = next.run(req).await;

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        error!(%method, %path, status = status.as_u16(), latency_ms, "request finished");
    } else if status.is_client_error() {
        warn!(%method, %path, status = status.as_u16(), latency_ms, "request finished");
    } else {
        info!(%method, %path, status = status.as_u16(), latency_ms, "request finished");
    }
    resp
}

/// Resolve the caller from the `Access-Token` cookie and attach `AuthorizationData`
/// to the request. No cookie continues anonymously; a rejected token is 401.
pub async fn authorization_middleware(
    State(state): State<ServerState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(client) = state.authorization.clone() else {
        return Ok(next.run(req).await);
    };

    let data = match jar.get(ACCESS_TOKEN_COOKIE) {
        None => AuthorizationData::anonymous(),
        Some(cookie) => {
            let data = client.check_authorization(cookie.value()).await.map_err(|e| {
                error!(error = %e, "authorization check failed");
                ApiError::Internal(e.to_string())
            })?;
            if data.status_code != 200 {
                warn!(status_code = data.status_code, message = %data.message, "access token rejected");
                return Err(ApiError::Unauthorized(data.message));
            }
            data
        }
    };

    debug!(account_id = data.account_id, role = %data.role, "caller resolved");
    req.extensions_mut().insert(data);
    Ok(next.run(req).await)
}
