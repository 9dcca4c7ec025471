use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use sigforge_core::SignatureRenderer;
use sigforge_storage::Database;
use sigforge_util::AdminSeed;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::{provision_admin, SessionTokens};
use crate::router::{app_router, AppState};
use crate::telemetry;

pub const ADMIN_EMAIL: &str = "admin@itfgroup.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A migrated database in a temp dir plus app state on a frozen clock.
pub struct TestContext {
    _dir: TempDir,
    pub database: Database,
    pub state: AppState,
    pub now: DateTime<Utc>,
}

impl TestContext {
    pub async fn new() -> Self {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}/test.db?mode=rwc", dir.path().display());
        let database = Database::connect(&url).await.expect("connect");
        database.run_migrations().await.expect("migrations");

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let sessions = SessionTokens::new(
            b"test-session-secret-with-enough-bytes",
            std::time::Duration::from_secs(3600),
            false,
        );
        let state = AppState::new(
            metrics,
            database.clone(),
            SignatureRenderer::default(),
            sessions,
        )
        .with_clock(Arc::new(move || now));

        Self {
            _dir: dir,
            database,
            state,
            now,
        }
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    pub async fn seed_admin(&self) {
        let seed = AdminSeed {
            email: ADMIN_EMAIL.into(),
            password: ADMIN_PASSWORD.into(),
        };
        provision_admin(&self.database, &seed, self.now)
            .await
            .expect("provision admin");
    }

    pub async fn post_login(&self, email: &str, password: &str) -> Response {
        let body = serde_urlencoded::to_string([("email", email), ("password", password)])
            .expect("encode form");
        self.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .expect("login response")
    }

    /// Seeds the admin, signs in and returns the `name=value` cookie pair.
    pub async fn login_cookie(&self) -> String {
        self.seed_admin().await;
        let response = self.post_login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .expect("ascii cookie");
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .trim()
            .to_string()
    }

    pub async fn body_text(response: Response) -> String {
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8")
    }
}
