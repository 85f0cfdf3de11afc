use std::io::Cursor;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Json, Router};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use onboard::workflows::intake::{
    login, logout, require_admin, sanitize_filename, ApplicationId, ApplicationRepository,
    ApplicationSummary, DocumentSlot, DocumentStore, DocumentUpload, FormFields, ReviewError,
    SubmissionError, UploadSet,
};

use crate::infra::{AppContext, AppState, SessionHandle, SESSION_COOKIE};

/// Public intake and admin review routes.
pub(crate) fn router<R, S>(ctx: Arc<AppContext<R, S>>) -> Router
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    Router::new()
        .route("/", get(index_handler))
        .route("/submit", post(submit_handler))
        .route("/success", get(success_handler))
        .route("/login", get(login_view_handler).post(login_handler))
        .route("/logout", get(logout_handler))
        .route("/admin", get(admin_list_handler))
        .route("/admin/action", post(admin_action_handler))
        .route("/admin/details/:id", get(admin_details_handler))
        .route("/admin/export", get(admin_export_handler))
        .route("/admin/documents/:name", get(admin_document_handler))
        .with_state(ctx)
}

/// Health, readiness, and metrics endpoints shared with operations tooling.
pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

fn apply_cookie(mut response: Response, handle: &SessionHandle) -> Response {
    if handle.fresh {
        if let Ok(value) =
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={}; Path=/; HttpOnly", handle.id))
        {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

fn redirect(target: &str, handle: &SessionHandle) -> Response {
    apply_cookie(Redirect::to(target).into_response(), handle)
}

/// Gate an admin-only handler. On refusal the caller is sent to the login
/// step with a flash, never the admin payload.
fn ensure_admin<R, S>(ctx: &AppContext<R, S>, handle: &SessionHandle) -> Result<(), Response>
where
    R: ApplicationRepository,
    S: DocumentStore,
{
    let mut session = ctx.sessions.read(&handle.id);
    if require_admin(&session).is_ok() {
        return Ok(());
    }
    session.push_flash("Please login first.");
    ctx.sessions.write(&handle.id, session);
    Err(redirect("/login", handle))
}

async fn index_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    let mut session = ctx.sessions.read(&handle.id);
    let flash = session.take_flash();
    let field_errors = session.take_field_errors();
    ctx.sessions.write(&handle.id, session);

    let body = Json(json!({
        "view": "submission_form",
        "current_year": Utc::now().year(),
        "flash": flash,
        "field_errors": field_errors,
    }));
    apply_cookie(body.into_response(), &handle)
}

async fn success_handler() -> Json<serde_json::Value> {
    Json(json!({
        "view": "submission_received",
        "message": "Your application has been received and is pending review.",
    }))
}

async fn read_submission(
    mut multipart: Multipart,
) -> Result<(FormFields, UploadSet<Cursor<Bytes>>), MultipartError> {
    let mut fields = FormFields::default();
    let mut uploads: UploadSet<Cursor<Bytes>> = UploadSet::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(slot) = DocumentSlot::from_field_name(&name) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content = field.bytes().await?;
            // An empty filename is how browsers post an untouched file input.
            if !filename.is_empty() {
                uploads.insert(
                    slot,
                    DocumentUpload {
                        filename,
                        content: Cursor::new(content),
                    },
                );
            }
        } else {
            fields.insert(name, field.text().await?);
        }
    }

    Ok((fields, uploads))
}

async fn submit_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);

    let (fields, uploads) = match read_submission(multipart).await {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%err, "failed to read multipart submission");
            let mut session = ctx.sessions.read(&handle.id);
            session.push_flash("Unexpected error.");
            ctx.sessions.write(&handle.id, session);
            return redirect("/", &handle);
        }
    };

    match ctx.intake.submit(&fields, uploads) {
        Ok(record) => {
            info!(id = record.id.0, "application submitted");
            redirect("/success", &handle)
        }
        Err(SubmissionError::Invalid(errors)) => {
            let mut session = ctx.sessions.read(&handle.id);
            session.push_flash("Please fix the errors.");
            session.remember_errors(errors);
            ctx.sessions.write(&handle.id, session);
            redirect("/", &handle)
        }
        Err(err) => {
            error!(%err, "submission failed");
            let mut session = ctx.sessions.read(&handle.id);
            session.push_flash("Unexpected error.");
            ctx.sessions.write(&handle.id, session);
            redirect("/", &handle)
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_view_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    let mut session = ctx.sessions.read(&handle.id);
    let flash = session.take_flash();
    ctx.sessions.write(&handle.id, session);

    let body = Json(json!({ "view": "login", "flash": flash }));
    apply_cookie(body.into_response(), &handle)
}

async fn login_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    let mut session = ctx.sessions.read(&handle.id);

    match login(&mut session, &ctx.credentials, &form.username, &form.password) {
        Ok(()) => {
            session.push_flash("Login success");
            ctx.sessions.write(&handle.id, session);
            redirect("/admin", &handle)
        }
        Err(err) => {
            session.push_flash(err.to_string());
            ctx.sessions.write(&handle.id, session);
            redirect("/login", &handle)
        }
    }
}

async fn logout_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    let mut session = ctx.sessions.read(&handle.id);
    logout(&mut session);
    session.push_flash("Logged out");
    ctx.sessions.write(&handle.id, session);
    redirect("/login", &handle)
}

async fn admin_list_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    if let Err(refused) = ensure_admin(&ctx, &handle) {
        return refused;
    }

    let records = match ctx.review.list_all() {
        Ok(records) => records,
        Err(err) => {
            error!(%err, "failed to list applications");
            let body = Json(json!({ "error": "storage unavailable" }));
            return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        }
    };
    let applications: Vec<ApplicationSummary> =
        records.iter().map(ApplicationSummary::from_record).collect();

    let mut session = ctx.sessions.read(&handle.id);
    let flash = session.take_flash();
    ctx.sessions.write(&handle.id, session);

    let body = Json(json!({
        "view": "admin",
        "flash": flash,
        "applications": applications,
    }));
    apply_cookie(body.into_response(), &handle)
}

#[derive(Debug, Deserialize)]
struct AdminActionForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    action: String,
}

async fn admin_action_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
    Form(form): Form<AdminActionForm>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    if let Err(refused) = ensure_admin(&ctx, &handle) {
        return refused;
    }

    let notice = match form.id.parse::<u64>() {
        Err(_) => "Invalid request".to_string(),
        Ok(id) => match ctx.review.review(ApplicationId(id), &form.action) {
            Ok(status) => format!("Application {id} {}", status.label()),
            Err(ReviewError::InvalidAction) => "Invalid request".to_string(),
            Err(ReviewError::NotFound) => "Application not found".to_string(),
            Err(err) => {
                error!(%err, "review action failed");
                "Unexpected error.".to_string()
            }
        },
    };

    let mut session = ctx.sessions.read(&handle.id);
    session.push_flash(notice);
    ctx.sessions.write(&handle.id, session);
    redirect("/admin", &handle)
}

async fn admin_details_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    if let Err(refused) = ensure_admin(&ctx, &handle) {
        return refused;
    }

    match ctx.review.detail(ApplicationId(id)) {
        Ok(record) => {
            let body = Json(json!({ "view": "admin_details", "application": record }));
            apply_cookie(body.into_response(), &handle)
        }
        Err(ReviewError::NotFound) => {
            let mut session = ctx.sessions.read(&handle.id);
            session.push_flash("Application not found");
            ctx.sessions.write(&handle.id, session);
            redirect("/admin", &handle)
        }
        Err(err) => {
            error!(%err, "failed to load application detail");
            let body = Json(json!({ "error": "storage unavailable" }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

async fn admin_export_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    if let Err(refused) = ensure_admin(&ctx, &handle) {
        return refused;
    }

    match ctx.review.export_csv() {
        Ok(csv) => {
            let response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv")],
                csv,
            )
                .into_response();
            apply_cookie(response, &handle)
        }
        Err(err) => {
            error!(%err, "csv export failed");
            let body = Json(json!({ "error": "export failed" }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

async fn admin_document_handler<R, S>(
    State(ctx): State<Arc<AppContext<R, S>>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: DocumentStore + 'static,
{
    let handle = ctx.sessions.attach(&headers);
    if let Err(refused) = ensure_admin(&ctx, &handle) {
        return refused;
    }

    // Sanitize again so a crafted path segment cannot escape the upload dir.
    let safe_name = sanitize_filename(&name);
    let path = ctx.upload_dir.join(&safe_name);
    match std::fs::read(&path) {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let content_type = HeaderValue::from_str(mime.as_ref())
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            let mut response = bytes.into_response();
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
            apply_cookie(response, &handle)
        }
        Err(_) => {
            let mut session = ctx.sessions.read(&handle.id);
            session.push_flash("Document not found");
            ctx.sessions.write(&handle.id, session);
            redirect("/admin", &handle)
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryApplicationRepository;
    use axum::body::Body;
    use axum::http::Request;
    use onboard::config::{AdminCredentials, CredentialScheme};
    use onboard::workflows::intake::FsDocumentStore;
    use tower::ServiceExt;

    const BOUNDARY: &str = "x-onboard-test-boundary";

    fn test_app(dir: &std::path::Path) -> Router {
        let repository = Arc::new(InMemoryApplicationRepository::default());
        let documents = Arc::new(FsDocumentStore::create(dir).expect("upload dir"));
        let credentials = AdminCredentials {
            username: "admin".to_string(),
            secret: "admin123".to_string(),
            scheme: CredentialScheme::PlainText,
        };
        let ctx = Arc::new(AppContext::new(
            repository,
            documents,
            credentials,
            dir.to_path_buf(),
        ));
        router(ctx)
    }

    fn session_cookie(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie set")
            .to_str()
            .expect("cookie is ascii");
        raw.split(';').next().expect("cookie pair").to_string()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .expect("redirect target")
            .to_str()
            .expect("location is ascii")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    async fn admin_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=admin123"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");
        session_cookie(&response)
    }

    fn form_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn valid_submission_body() -> Vec<u8> {
        let fields = [
            ("business_name", "Harbor Analytics Ltd"),
            ("business_type", "Private Limited"),
            ("industry", "Software"),
            ("business_email", "ops@harbor.example"),
            ("business_phone", "+1-202-555-0108"),
            ("address", "88 Pier Street"),
            ("city", "Portland"),
            ("state", "ME"),
            ("postal_code", "04101"),
            ("country", "US"),
            ("contact_name", "Ana Silva"),
            ("contact_email", "ana@harbor.example"),
            ("contact_phone", "+1-202-555-0109"),
            ("position", "CEO"),
            ("id_type", "drivers_license"),
            ("id_number", "ME-4411"),
            ("tin", "04-7788990"),
            ("publicly_traded", "yes"),
            ("international", "Yes"),
            ("terms", "on"),
            ("privacy", "on"),
        ];

        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(form_part(name, value).as_bytes());
        }
        body.extend_from_slice(&file_part("reg_doc", "certificate.pdf", b"%PDF-1.5"));
        body.extend_from_slice(&file_part("rep_id_doc", "ceo-id.png", b"png-bytes"));
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn submit_request(body: Vec<u8>) -> Request<Body> {
        Request::post("/submit")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request builds")
    }

    #[tokio::test]
    async fn admin_routes_require_a_login_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        for uri in ["/admin", "/admin/details/1", "/admin/export"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
                .await
                .expect("route executes");
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri} must redirect");
            assert_eq!(location(&response), "/login");
        }
    }

    #[tokio::test]
    async fn login_rejects_unknown_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=nope"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        // The refused session must still be locked out of the listing.
        let cookie = session_cookie(&response);
        let response = app
            .clone()
            .oneshot(
                Request::get("/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn login_grants_access_to_the_admin_listing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());
        let cookie = admin_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::get("/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["view"], "admin");
        assert_eq!(payload["applications"], json!([]));
        assert_eq!(payload["flash"][0], "Login success");
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());
        let cookie = admin_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::get("/logout")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(location(&response), "/login");

        let response = app
            .clone()
            .oneshot(
                Request::get("/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn valid_multipart_submission_redirects_to_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        let response = app
            .clone()
            .oneshot(submit_request(valid_submission_body()))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/success");

        // The record is visible to the reviewer with derived booleans applied.
        let cookie = admin_session(&app).await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/admin/details/1")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        let application = &payload["application"];
        assert_eq!(application["status"], "pending");
        assert_eq!(application["compliance"]["publicly_traded"], true);
        // "Yes" is not the literal lowercase "yes".
        assert_eq!(application["compliance"]["international"], false);
        assert!(application["documents"]["registration"].is_string());
        assert!(application["documents"]["tax"].is_null());
    }

    #[tokio::test]
    async fn invalid_submission_flashes_field_errors_back_to_the_form() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        // Consent and both required documents are missing.
        let mut body = Vec::new();
        body.extend_from_slice(form_part("business_name", "Solo Venture").as_bytes());
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let response = app
            .clone()
            .oneshot(submit_request(body))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let cookie = session_cookie(&response);

        let response = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let payload = body_json(response).await;
        assert_eq!(payload["flash"][0], "Please fix the errors.");
        let errors = &payload["field_errors"];
        assert_eq!(errors["terms"], "Agree to Terms & Conditions.");
        assert_eq!(errors["reg_doc"], "This file is required.");
        assert_eq!(errors["rep_id_doc"], "This file is required.");
        assert!(errors.get("business_name").is_none());
    }

    #[tokio::test]
    async fn review_action_updates_status_and_flashes_the_outcome() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        app.clone()
            .oneshot(submit_request(valid_submission_body()))
            .await
            .expect("route executes");

        let cookie = admin_session(&app).await;
        let response = app
            .clone()
            .oneshot(
                Request::post("/admin/action")
                    .header(header::COOKIE, cookie.clone())
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("id=1&action=approve"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");

        let response = app
            .clone()
            .oneshot(
                Request::get("/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let payload = body_json(response).await;
        assert_eq!(payload["applications"][0]["status"], "approved");
        assert!(payload["flash"]
            .as_array()
            .expect("flash array")
            .iter()
            .any(|notice| notice == "Application 1 approved"));
    }

    #[tokio::test]
    async fn bogus_review_action_is_reported_and_changes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        app.clone()
            .oneshot(submit_request(valid_submission_body()))
            .await
            .expect("route executes");

        let cookie = admin_session(&app).await;
        let response = app
            .clone()
            .oneshot(
                Request::post("/admin/action")
                    .header(header::COOKIE, cookie.clone())
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("id=1&action=bogus"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(location(&response), "/admin");

        let response = app
            .clone()
            .oneshot(
                Request::get("/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let payload = body_json(response).await;
        assert_eq!(payload["applications"][0]["status"], "pending");
        assert!(payload["flash"]
            .as_array()
            .expect("flash array")
            .iter()
            .any(|notice| notice == "Invalid request"));
    }

    #[tokio::test]
    async fn csv_export_streams_the_applications() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        app.clone()
            .oneshot(submit_request(valid_submission_body()))
            .await
            .expect("route executes");

        let cookie = admin_session(&app).await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/admin/export")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/csv"))
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let csv = String::from_utf8_lossy(&bytes);
        assert!(csv.contains("Harbor Analytics Ltd"));
    }

    #[tokio::test]
    async fn stored_documents_are_downloadable_by_the_reviewer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(dir.path());

        app.clone()
            .oneshot(submit_request(valid_submission_body()))
            .await
            .expect("route executes");

        let cookie = admin_session(&app).await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/admin/documents/certificate.pdf")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/pdf"))
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        assert_eq!(&bytes[..], b"%PDF-1.5");
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = with_operational_routes(test_app(dir.path()));
        // Operational endpoints that need AppState are exercised in-process;
        // the plain healthcheck has no dependencies.
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["status"], "ok");
    }
}
