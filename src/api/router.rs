//! Report QA API router.
//!
//! Returns a composable `Router` mounted under `/api/`. Handlers are
//! thin: validation and state transitions live in the report module,
//! so every route body is extract → delegate → encode.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;

use crate::config::{APP_VERSION, MAX_UPLOAD_BYTES};
use crate::report::LifecycleManager;

use super::error::ApiError;
use super::types::{
    ApiContext, CheckResponse, CleanupResponse, HealthResponse, ReportResponse, UploadResponse,
};

/// Build the API router with all report QA endpoints under `/api/`.
pub fn api_router(manager: Arc<LifecycleManager>) -> Router {
    let ctx = ApiContext::new(manager);

    let routes = Router::new()
        .route("/health", get(health))
        .route("/reports", post(upload))
        .route("/reports/:id", get(detail).delete(cleanup))
        .route("/reports/:id/check", post(check))
        .route("/reports/:id/generate", post(generate))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Loopback-only tool; permissive CORS lets a local UI talk to it.
        .layer(CorsLayer::permissive());

    Router::new().nest("/api", routes)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: APP_VERSION,
    })
}

/// Accept a source report upload (multipart field `file`).
async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        let report = ctx.manager.upload(&filename, &bytes)?;
        return Ok((StatusCode::CREATED, Json(report.into())));
    }

    Err(ApiError::BadRequest("no file field in upload".into()))
}

async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = ctx.manager.get(id)?;
    Ok(Json(report.into()))
}

async fn check(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckResponse>, ApiError> {
    let result = ctx.manager.check(id).await?;
    Ok(Json(result.into()))
}

/// Run the conversion pipeline and stream back the final artifact.
async fn generate(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let final_path = ctx.manager.generate(id).await?;
    let file = tokio::fs::File::open(&final_path)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot open final artifact: {e}")))?;

    let mime = mime_guess::from_path(&final_path).first_or_octet_stream();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.pdf".into())
    );

    let body = axum::body::Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn cleanup(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let success = ctx.manager.cleanup(id)?;
    Ok(Json(CleanupResponse { success }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use futures_util::future::BoxFuture;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::{AppConfig, ToolCommand};
    use crate::extraction::{ExtractionError, TextSource};

    const CONSISTENT: &str = "\
FINDINGS:
The left ventricular ejection fraction is 55%.

CALCULATIONS:
LVEF: 55%

CONCLUSION:
Normal function with ejection fraction of 55%.
";

    const DISCORDANT: &str = "\
FINDINGS:
The left ventricular ejection fraction is 55%.

CALCULATIONS:
LVEF: 60%

CONCLUSION:
Normal function with ejection fraction of 55%.
";

    struct StaticText(&'static str);

    impl TextSource for StaticText {
        fn plain_text<'a>(
            &'a self,
            _artifact: &'a std::path::Path,
        ) -> BoxFuture<'a, Result<String, ExtractionError>> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }
    }

    fn copy_stage() -> ToolCommand {
        ToolCommand::new("/bin/sh", &["-c", "cp \"$0\" \"$1\"", "{input}", "{output}"])
    }

    fn test_config(root: &std::path::Path) -> AppConfig {
        AppConfig {
            reports_dir: root.to_path_buf(),
            source_to_intermediate: copy_stage(),
            template_and_sign: copy_stage(),
            render_final: copy_stage(),
            stage_timeout_secs: 10,
            ..AppConfig::default()
        }
    }

    fn test_router(cfg: AppConfig, text: &'static str) -> Router {
        let manager = Arc::new(LifecycleManager::with_text_source(
            Arc::new(cfg),
            Arc::new(StaticText(text)),
        ));
        api_router(manager)
    }

    fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "qa-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/rtf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/reports")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_response_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_check_generate_cleanup_flow() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        // Upload
        let response = app
            .clone()
            .oneshot(upload_request("echo.rtf", b"{\\rtf1 report body}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = response_json(response).await;
        let id = json["report_id"].as_str().unwrap().to_string();
        assert_eq!(json["state"], "uploaded");

        // Check
        let response = app
            .clone()
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "good");
        assert_eq!(json["values"]["conclusion"]["value"], 55);
        assert_eq!(json["values"]["text"]["value"], 55);
        assert_eq!(json["values"]["calcs"]["value"], 55);

        // Generate — stub stages copy the source through to the PDF slot
        let response = app
            .clone()
            .oneshot(post(&format!("/api/reports/{id}/generate")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\\rtf1 report body}");

        // Cleanup
        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/reports/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);

        // Id is invalidated for further operations
        let response = app
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_report_type_rejected_with_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let response = app
            .oneshot(upload_request("scan.pdf", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unsupported report type"));
    }

    #[tokio::test]
    async fn discordant_report_blocks_generation_with_409() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), DISCORDANT);

        let response = app
            .clone()
            .oneshot(upload_request("echo.rtf", b"{\\rtf1 x}"))
            .await
            .unwrap();
        let id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["status"], "discordant");

        let response = app
            .oneshot(post(&format!("/api/reports/{id}/generate")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "CONSISTENCY_BLOCKED");
    }

    #[tokio::test]
    async fn stage_failure_surfaces_502_with_stage_name() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            source_to_intermediate: ToolCommand::new(
                "/bin/sh",
                &["-c", "echo 'rtf converter crashed' >&2; exit 1"],
            ),
            ..test_config(tmp.path())
        };
        let app = test_router(cfg, CONSISTENT);

        let response = app
            .clone()
            .oneshot(upload_request("echo.rtf", b"{\\rtf1 x}"))
            .await
            .unwrap();
        let id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        app.clone()
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();
        let response = app
            .oneshot(post(&format!("/api/reports/{id}/generate")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["stage"], "SourceToIntermediate");
        assert!(json["reason"].as_str().unwrap().contains("rtf converter crashed"));
    }

    #[tokio::test]
    async fn unknown_report_returns_404() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let id = Uuid::new_v4();
        let response = app
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn detail_includes_last_check() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let response = app
            .clone()
            .oneshot(upload_request("echo.rtf", b"{\\rtf1 x}"))
            .await
            .unwrap();
        let id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        app.clone()
            .oneshot(post(&format!("/api/reports/{id}/check")))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::get(format!("/api/reports/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["state"], "good");
        assert_eq!(json["last_check"]["status"], "good");
        assert_eq!(json["filename"], "echo.rtf");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let boundary = "qa-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/reports")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn responses_are_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let app = test_router(test_config(tmp.path()), CONSISTENT);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }
}
