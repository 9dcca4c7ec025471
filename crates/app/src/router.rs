use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sigforge_core::SignatureRenderer;
use sigforge_storage::Database;

use crate::auth::{self, SessionTokens};
use crate::{admin, submission, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    renderer: Arc<SignatureRenderer>,
    sessions: SessionTokens,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        storage: Database,
        renderer: SignatureRenderer,
        sessions: SessionTokens,
    ) -> Self {
        Self {
            metrics,
            storage,
            renderer: Arc::new(renderer),
            sessions,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn renderer(&self) -> &SignatureRenderer {
        &self.renderer
    }

    pub fn sessions(&self) -> &SessionTokens {
        &self.sessions
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/", get(submission::form_page).post(submission::submit_form))
        .route("/api/signatures", post(submission::submit_json))
        .route("/admin", get(auth::login_page))
        .route("/admin/login", post(auth::login))
        .route("/admin/logout", post(auth::logout))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/signatures/:id", get(admin::detail))
        .route("/admin/signatures/:id/copy", get(admin::copy))
        .route("/admin/api/signatures", get(admin::api_list))
        .route("/admin/api/signatures/:id", get(admin::api_detail))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
