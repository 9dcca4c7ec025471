mod admin;
mod auth;
mod maintenance;
mod pages;
mod problem;
mod router;
mod submission;
mod telemetry;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;

use chrono::Utc;
use sigforge_core::{OrganizationProfile, SignatureRenderer};
use sigforge_storage::Database;
use sigforge_util::{load_env_file, AppConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %config.database_url, "database ready");

    let profile = match &config.profile_path {
        Some(path) => {
            let profile = OrganizationProfile::from_json_file(path)?;
            info!(stage = "app", path = %path.display(), "organization profile loaded");
            profile
        }
        None => OrganizationProfile::default(),
    };

    match &config.admin_seed {
        Some(seed) => auth::provision_admin(&database, seed, Utc::now()).await?,
        None => warn!(stage = "auth", "ADMIN_EMAIL not set; no admin account provisioned"),
    }

    let sessions = auth::SessionTokens::new(
        &config.session_secret,
        config.session_ttl,
        config.environment.is_production(),
    );

    maintenance::MaintenanceWorker::new(database.clone()).spawn();

    let state = router::AppState::new(
        metrics,
        database,
        SignatureRenderer::new(profile),
        sessions,
    );

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
