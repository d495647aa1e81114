pub mod organization;

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::openapi::Server;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::middleware::{authorization_middleware, log_middleware, metrics_middleware};
use crate::openapi::ApiDoc;
use crate::state::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = String)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

pub async fn metrics() -> impl IntoResponse {
    common::telemetry::encode_metrics()
}

/// `prefix` + `suffix`, never empty.
fn under(prefix: &str, suffix: &str) -> String {
    let path = format!("{prefix}{suffix}");
    if path.is_empty() { "/".to_string() } else { path }
}

/// OpenAPI document whose paths are relative to the mount prefix.
pub fn api_doc(prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(under(prefix, ""))]);
    doc
}

/// Build the full application router. Every route lives under `prefix`.
///
/// Organization CRUD sits behind the identity check; the balance routes carry
/// their own shared-secret check, and health, metrics and docs are open.
pub fn build_router(state: ServerState, prefix: &str) -> Router {
    let crud = Router::new()
        .route(&under(prefix, "/create"), post(organization::create))
        .route(&under(prefix, "/all"), get(organization::get_all))
        .route(
            &under(prefix, "/:organization_id"),
            get(organization::get_by_id).delete(organization::delete),
        )
        .route(&under(prefix, ""), put(organization::update))
        .route_layer(middleware::from_fn_with_state(state.clone(), authorization_middleware));

    let balance = Router::new()
        .route(&under(prefix, "/balance/top-up"), post(organization::top_up))
        .route(&under(prefix, "/balance/debit"), post(organization::debit));

    let ops = Router::new()
        .route(&under(prefix, "/health"), get(health))
        .route(&under(prefix, "/metrics"), get(metrics));

    Router::new()
        .merge(crud)
        .merge(balance)
        .merge(ops)
        .with_state(state)
        .merge(SwaggerUi::new(under(prefix, "/docs")).url(under(prefix, "/openapi.json"), api_doc(prefix)))
        // first layer is outermost: trace -> metrics -> log -> (authorization) -> handler
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG).include_headers(false))
                        .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
                )
                .layer(middleware::from_fn(metrics_middleware))
                .layer(middleware::from_fn(log_middleware)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_maps_update_to_root() {
        assert_eq!(under("", ""), "/");
        assert_eq!(under("", "/all"), "/all");
        assert_eq!(under("/api/organization", ""), "/api/organization");
    }

    #[test]
    fn api_doc_paths_are_relative_to_the_prefix() {
        let doc = api_doc("/v2/orgs");
        let servers = doc.servers.unwrap_or_default();
        assert_eq!(servers[0].url, "/v2/orgs");
        assert!(doc.paths.paths.contains_key("/create"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(!doc.paths.paths.keys().any(|p| p.starts_with("/api/organization")));
    }
}
