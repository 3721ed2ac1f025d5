use super::*;
use axum::{
    http::StatusCode as HttpStatus,
    routing::{delete as axum_delete, get, post},
    Json, Router,
};
use chrono::Utc;
use shared::domain::AnalysisId;
use shared::error::{ApiError as WireError, ErrorCode};

fn sample_record() -> AnalysisRecord {
    AnalysisRecord {
        id: AnalysisId::random(),
        filename: "pier.jpg".into(),
        image_base64: "aW1hZ2UtYnl0ZXM=".into(),
        analysis: "DESCRIPTION: A wooden pier over calm water".into(),
        objects_detected: vec!["pier".into(), "water".into()],
        text_found: String::new(),
        emotions: Vec::new(),
        scene_description: "Lakeside at dawn".into(),
        confidence: "Medium".into(),
        timestamp: Utc::now(),
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[test]
fn image_filenames_pass_the_gate() {
    assert!(is_image_filename("photo.jpg"));
    assert!(is_image_filename("photo.PNG"));
    assert!(is_image_filename("photo.webp"));
    assert!(!is_image_filename("notes.txt"));
    assert!(!is_image_filename("report.pdf"));
    assert!(!is_image_filename("no_extension"));
}

#[test]
fn server_url_loses_trailing_slash() {
    let client = AnalysisClient::new("http://localhost:8001/");
    assert_eq!(client.server_url(), "http://localhost:8001");
}

#[tokio::test]
async fn analyze_path_rejects_non_image_before_any_io() {
    let client = AnalysisClient::new("http://127.0.0.1:1");
    let err = client
        .analyze_path(Path::new("/definitely/missing/notes.txt"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, ClientError::NotAnImage { .. }));
}

#[tokio::test]
async fn analyze_posts_encoded_image_and_returns_record() {
    let app = Router::new().route(
        "/api/analyze-image",
        post(|Json(req): Json<AnalyzeImageRequest>| async move {
            assert_eq!(req.filename, "pier.jpg");
            assert_eq!(req.image_base64, "aW1hZ2UtYnl0ZXM=");
            Json(sample_record())
        }),
    );
    let client = AnalysisClient::new(spawn(app).await);

    let record = client
        .analyze_bytes("pier.jpg", b"image-bytes")
        .await
        .expect("analysis");
    assert_eq!(record.filename, "pier.jpg");
    assert_eq!(record.confidence, "Medium");
}

#[tokio::test]
async fn history_round_trips_records() {
    let app = Router::new().route(
        "/api/analysis-history",
        get(|| async { Json(vec![sample_record(), sample_record()]) }),
    );
    let client = AnalysisClient::new(spawn(app).await);

    let history = client.history().await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].objects_detected, vec!["pier", "water"]);
}

#[tokio::test]
async fn api_error_body_surfaces_as_message() {
    let app = Router::new().route(
        "/api/analysis/:id",
        axum_delete(|| async {
            (
                HttpStatus::NOT_FOUND,
                Json(WireError::new(ErrorCode::NotFound, "Analysis not found")),
            )
        }),
    );
    let client = AnalysisClient::new(spawn(app).await);

    let err = client.delete("missing-id").await.expect_err("not found");
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Analysis not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}
