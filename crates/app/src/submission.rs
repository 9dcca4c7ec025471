use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info};

use sigforge_core::types::{FormError, SignatureForm, SignatureRecord};
use sigforge_storage::{NewSignature, SignatureError};

use crate::pages;
use crate::problem::{internal_error, ProblemResponse};
use crate::router::AppState;

const SUBMISSION_FAILED: &str = "Failed to generate email signature. Please try again.";

/// Validates, renders and stores one submission.
///
/// The insert is attempted once; a failure leaves nothing behind and is
/// returned to the caller.
pub async fn create_signature(
    state: &AppState,
    form: SignatureForm,
) -> Result<SignatureRecord, SubmissionError> {
    let form = form.validate().inspect_err(|_| {
        counter!("signatures_submitted_total", "result" => "invalid").increment(1);
    })?;

    let start = Instant::now();
    let html = state.renderer().render(&form);
    histogram!("signature_render_seconds").record(start.elapsed().as_secs_f64());

    let record = state
        .storage()
        .signatures()
        .insert(&NewSignature {
            form: &form,
            template_html: &html,
            created_at: state.now(),
        })
        .await
        .inspect_err(|err| {
            counter!("signatures_submitted_total", "result" => "error").increment(1);
            error!(stage = "submission", error = %err, "failed to store signature");
        })?;

    counter!("signatures_submitted_total", "result" => "ok").increment(1);
    info!(
        stage = "submission",
        id = %record.id,
        email = %record.email,
        "signature generated"
    );
    Ok(record)
}

pub async fn form_page() -> Html<String> {
    Html(pages::form_page(&SignatureForm::default(), None, None))
}

pub async fn submit_form(State(state): State<AppState>, Form(form): Form<SignatureForm>) -> Response {
    match create_signature(&state, form.clone()).await {
        Ok(record) => Html(pages::result_page(&record)).into_response(),
        Err(SubmissionError::Invalid(err)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(pages::form_page(&form, Some(&err), None)),
        )
            .into_response(),
        Err(SubmissionError::Storage(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::form_page(&form, None, Some(SUBMISSION_FAILED))),
        )
            .into_response(),
    }
}

pub async fn submit_json(
    State(state): State<AppState>,
    Json(form): Json<SignatureForm>,
) -> Result<(StatusCode, Json<SignatureRecord>), ProblemResponse> {
    match create_signature(&state, form).await {
        Ok(record) => Ok((StatusCode::CREATED, Json(record))),
        Err(SubmissionError::Invalid(err)) => Err(ProblemResponse::validation(err)),
        Err(SubmissionError::Storage(_)) => Err(internal_error(SUBMISSION_FAILED)),
    }
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("failed to store signature: {0}")]
    Storage(#[from] SignatureError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{header, Request}};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_support::TestContext;

    fn sam_form() -> SignatureForm {
        SignatureForm {
            name: "Sam Burkan".into(),
            title: "CEO".into(),
            phone_number: "(877) 477-9677 ext. 116".into(),
            email: "sam@itfgroup.com".into(),
            meeting_link: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn create_signature_stores_rendered_html() {
        let context = TestContext::new().await;
        let record = create_signature(&context.state, sam_form())
            .await
            .expect("stored");

        assert!(record.template_html.contains("tel:+18774779677,,116"));
        assert!(record
            .template_html
            .contains("https://meetings.hubspot.com/sam-burkhan"));
        assert_eq!(record.created_at, context.now);
        assert_eq!(record.meeting_link, None);

        let expected = context.state.renderer().render(&record.form());
        assert_eq!(record.template_html, expected);

        let stored = context.database.signatures().list_recent().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], record);
    }

    #[tokio::test]
    async fn invalid_submission_is_not_stored() {
        let context = TestContext::new().await;
        let form = SignatureForm {
            email: String::new(),
            ..sam_form()
        };
        let err = create_signature(&context.state, form).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Invalid(_)));
        assert!(context
            .database
            .signatures()
            .list_recent()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported_without_retry() {
        let context = TestContext::new().await;
        sqlx::query("DROP TABLE signatures")
            .execute(context.database.pool())
            .await
            .expect("drop table");

        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signatures")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&sam_form()).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&TestContext::body_text(response).await).unwrap();
        assert_eq!(body["type"], "internal_error");
        assert_eq!(body["detail"], SUBMISSION_FAILED);
    }

    #[tokio::test]
    async fn form_post_renders_result_page() {
        let context = TestContext::new().await;
        let body = serde_urlencoded::to_string([
            ("name", "Jane Doe"),
            ("title", "Dispatcher"),
            ("phoneNumber", "123-456-7890"),
            ("email", "jane@itfgroup.com"),
            ("meetingLink", ""),
        ])
        .unwrap();

        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = TestContext::body_text(response).await;
        assert!(html.contains("Your signature is ready"));
        // The document is embedded escaped, so quotes around the href are entities.
        assert!(html.contains("href=&quot;tel:+11234567890&quot;"));
    }

    #[tokio::test]
    async fn form_post_with_missing_fields_rerenders_form() {
        let context = TestContext::new().await;
        let body = serde_urlencoded::to_string([("name", "Jane Doe"), ("title", "")]).unwrap();

        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = TestContext::body_text(response).await;
        assert!(html.contains(r#"value="Jane Doe""#));
        assert!(html.contains("Email is required"));
    }

    #[tokio::test]
    async fn json_submission_returns_created_record() {
        let context = TestContext::new().await;
        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signatures")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "name": "Jane Doe",
                            "title": "Dispatcher",
                            "phoneNumber": "555-0100 x12",
                            "email": "jane@itfgroup.com",
                            "meetingLink": "https://meetings.hubspot.com/jane"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = serde_json::from_str(&TestContext::body_text(response).await).unwrap();
        assert_eq!(body["phoneNumber"], "555-0100 x12");
        assert_eq!(body["meetingLink"], "https://meetings.hubspot.com/jane");
        assert!(body["template_html"]
            .as_str()
            .unwrap()
            .contains("tel:+15550100,,12"));
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn json_validation_errors_list_fields() {
        let context = TestContext::new().await;
        let response = context
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/signatures")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "name": "Jane" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
        let body: Value = serde_json::from_str(&TestContext::body_text(response).await).unwrap();
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["title", "phoneNumber", "email"]);
    }
}
