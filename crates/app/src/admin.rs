use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Deserialize;
use tracing::{error, info};

use sigforge_core::types::SignatureRecord;
use sigforge_storage::SignatureError;

use crate::auth::{AdminApi, AdminPage};
use crate::pages;
use crate::problem::{internal_error, ProblemResponse};
use crate::router::AppState;

const LIST_FAILED: &str = "Failed to fetch signatures.";

async fn load_listing(state: &AppState, admin: &str) -> Result<Vec<SignatureRecord>, SignatureError> {
    match state.storage().signatures().list_recent().await {
        Ok(records) => {
            counter!("admin_listing_requests_total", "result" => "ok").increment(1);
            info!(stage = "admin", %admin, count = records.len(), "listed signatures");
            Ok(records)
        }
        Err(err) => {
            counter!("admin_listing_requests_total", "result" => "error").increment(1);
            error!(stage = "admin", error = %err, "failed to list signatures");
            Err(err)
        }
    }
}

async fn load_record(state: &AppState, id: &str) -> Result<Option<SignatureRecord>, SignatureError> {
    state.storage().signatures().fetch(id).await.inspect_err(|err| {
        error!(stage = "admin", %id, error = %err, "failed to load signature");
    })
}

pub async fn dashboard(State(state): State<AppState>, AdminPage(admin): AdminPage) -> Response {
    match load_listing(&state, &admin.email).await {
        Ok(records) => Html(pages::dashboard_page(&admin.email, &records)).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::error_page(LIST_FAILED)),
        )
            .into_response(),
    }
}

pub async fn detail(
    State(state): State<AppState>,
    AdminPage(_admin): AdminPage,
    Path(id): Path<String>,
) -> Response {
    match load_record(&state, &id).await {
        Ok(Some(record)) => {
            Html(pages::detail_page(&record, state.renderer().profile())).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Html(pages::error_page("Signature not found.")),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::error_page("Failed to load signature.")),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFormat {
    #[default]
    Html,
    Text,
}

impl CopyFormat {
    fn content_type(self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CopyQuery {
    #[serde(default)]
    pub format: CopyFormat,
}

/// Serves a stored signature as a clipboard payload: rich HTML by default,
/// or the same markup as plain text.
pub async fn copy(
    State(state): State<AppState>,
    AdminApi(_admin): AdminApi,
    Path(id): Path<String>,
    Query(query): Query<CopyQuery>,
) -> Result<Response, ProblemResponse> {
    let record = find_record(&state, &id).await?;
    let mut response = record.template_html.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(query.format.content_type()),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

pub async fn api_list(
    State(state): State<AppState>,
    AdminApi(admin): AdminApi,
) -> Result<Json<Vec<SignatureRecord>>, ProblemResponse> {
    load_listing(&state, &admin.email)
        .await
        .map(Json)
        .map_err(|_| internal_error(LIST_FAILED))
}

pub async fn api_detail(
    State(state): State<AppState>,
    AdminApi(_admin): AdminApi,
    Path(id): Path<String>,
) -> Result<Json<SignatureRecord>, ProblemResponse> {
    find_record(&state, &id).await.map(Json)
}

async fn find_record(state: &AppState, id: &str) -> Result<SignatureRecord, ProblemResponse> {
    load_record(state, id)
        .await
        .map_err(|_| internal_error("failed to load signature"))?
        .ok_or_else(|| {
            ProblemResponse::new(StatusCode::NOT_FOUND, "not_found", "signature not found")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use chrono::Duration;
    use serde_json::Value;
    use sigforge_core::types::SignatureForm;
    use sigforge_storage::NewSignature;
    use tower::ServiceExt;

    use crate::submission::create_signature;
    use crate::test_support::TestContext;

    async fn get(context: &TestContext, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        context
            .router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn insert(context: &TestContext, name: &str, offset_minutes: i64) -> SignatureRecord {
        let form = SignatureForm {
            name: name.into(),
            title: "Dispatcher".into(),
            phone_number: "123-456-7890".into(),
            email: format!("{}@itfgroup.com", name.to_lowercase()),
            meeting_link: None,
        };
        let html = context.state.renderer().render(&form);
        context
            .database
            .signatures()
            .insert(&NewSignature {
                form: &form,
                template_html: &html,
                created_at: context.now - Duration::minutes(offset_minutes),
            })
            .await
            .expect("insert")
    }

    #[tokio::test]
    async fn dashboard_requires_session() {
        let context = TestContext::new().await;
        let response = get(&context, "/admin/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");
    }

    #[tokio::test]
    async fn api_requires_session() {
        let context = TestContext::new().await;
        let response = get(&context, "/admin/api/signatures", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = get(
            &context,
            "/admin/api/signatures",
            Some("sigforge_session=forged.token.value"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submitted_record_heads_the_listing() {
        let context = TestContext::new().await;
        insert(&context, "Older", 60).await;
        insert(&context, "Oldest", 120).await;

        let form = SignatureForm {
            name: "Sam Burkan".into(),
            title: "CEO".into(),
            phone_number: "(877) 477-9677 ext. 116".into(),
            email: "sam@itfgroup.com".into(),
            meeting_link: None,
        };
        let created = create_signature(&context.state, form).await.expect("submit");

        let cookie = context.login_cookie().await;
        let response = get(&context, "/admin/api/signatures", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&TestContext::body_text(response).await).unwrap();
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Sam Burkan", "Older", "Oldest"]);
        assert_eq!(body[0]["id"], created.id.as_str());
        assert_eq!(body[0]["template_html"], created.template_html.as_str());
    }

    #[tokio::test]
    async fn dashboard_renders_table() {
        let context = TestContext::new().await;
        let record = insert(&context, "Jane", 5).await;
        let cookie = context.login_cookie().await;

        let response = get(&context, "/admin/dashboard", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = TestContext::body_text(response).await;
        assert!(html.contains("Jane"));
        assert!(html.contains(&format!("/admin/signatures/{}", record.id)));
        assert!(html.contains(r#"<div class="stat-value">1</div>"#));
    }

    #[tokio::test]
    async fn detail_page_and_unknown_id() {
        let context = TestContext::new().await;
        let record = insert(&context, "Jane", 5).await;
        let cookie = context.login_cookie().await;

        let response = get(
            &context,
            &format!("/admin/signatures/{}", record.id),
            Some(&cookie),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = TestContext::body_text(response).await;
        assert!(html.contains("jane@itfgroup.com"));
        assert!(html.contains("srcdoc="));
        assert!(html.contains("<dt>Address</dt><dd>11990 Missouri Bottom Road Hazelwood, MO 63042</dd>"));
        assert!(html.contains(">www.itfgroup.com</a></dd>"));

        let response = get(&context, "/admin/signatures/missing", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(&context, "/admin/api/signatures/missing", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn copy_serves_rich_and_plain_payloads() {
        let context = TestContext::new().await;
        let record = insert(&context, "Jane", 5).await;
        let cookie = context.login_cookie().await;

        let rich = get(
            &context,
            &format!("/admin/signatures/{}/copy", record.id),
            Some(&cookie),
        )
        .await;
        assert_eq!(rich.status(), StatusCode::OK);
        assert_eq!(
            rich.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(TestContext::body_text(rich).await, record.template_html);

        let plain = get(
            &context,
            &format!("/admin/signatures/{}/copy?format=text", record.id),
            Some(&cookie),
        )
        .await;
        assert_eq!(
            plain.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(TestContext::body_text(plain).await, record.template_html);

        let unauthenticated = get(
            &context,
            &format!("/admin/signatures/{}/copy", record.id),
            None,
        )
        .await;
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
    }
}
