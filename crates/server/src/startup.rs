use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::authorization::{AuthorizationClient, HttpAuthorizationClient};
use crate::routes;
use crate::state::ServerState;
use service::organization::{
    repo::SeaOrmOrganizationRepository, BalancePolicy, OrganizationRepository, OrganizationService,
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Wire the service graph from configuration.
pub fn build_state(
    cfg: &AppConfig,
    repo: Arc<dyn OrganizationRepository>,
    authorization: Option<Arc<dyn AuthorizationClient>>,
) -> ServerState {
    let policy = BalancePolicy { allow_negative: cfg.balance.allow_negative };
    ServerState {
        organizations: Arc::new(OrganizationService::new(repo, policy)),
        interserver_secret_key: Arc::from(cfg.server.interserver_secret_key.as_str()),
        authorization,
    }
}

/// Public entry: connect, migrate, build the app and serve until `shutdown` resolves.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!(event = "migrations_applied", "database schema up to date");

    let repo: Arc<dyn OrganizationRepository> = Arc::new(SeaOrmOrganizationRepository::new(db));
    let authorization: Option<Arc<dyn AuthorizationClient>> = if cfg.authorization.enabled {
        info!(base_url = %cfg.authorization.base_url, "authorization check enabled");
        Some(Arc::new(HttpAuthorizationClient::new(&cfg.authorization)?))
    } else {
        None
    };
    let state = build_state(&cfg, repo, authorization);

    let app: Router = routes::build_router(state, &cfg.server.prefix).layer(build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, prefix = %cfg.server.prefix, "starting organization service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server shutdown complete");
    Ok(())
}
