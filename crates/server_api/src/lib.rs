use std::str::FromStr;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use shared::{
    domain::AnalysisId,
    error::{ApiError, ErrorCode},
    protocol::{AnalysisRecord, AnalyzeImageRequest, DeleteAck, ServiceStatus},
};
use storage::Storage;
use vision::{parse::parse_vision_reply, VisionProvider};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub vision: Arc<dyn VisionProvider>,
}

pub fn service_status() -> ServiceStatus {
    ServiceStatus {
        message: "AI Image Recognition API is running!".to_string(),
    }
}

pub async fn analyze_image(
    ctx: &ApiContext,
    request: AnalyzeImageRequest,
) -> Result<AnalysisRecord, ApiError> {
    if !ctx.vision.is_configured() {
        return Err(ApiError::new(
            ErrorCode::Unavailable,
            "AI service not configured",
        ));
    }
    if request.filename.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "filename is required"));
    }
    STANDARD
        .decode(&request.image_base64)
        .map_err(|_| ApiError::new(ErrorCode::Validation, "invalid base64 image data"))?;

    let reply = ctx
        .vision
        .analyze_image(&request.filename, &request.image_base64)
        .await
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("Analysis failed: {e}")))?;

    let parsed = parse_vision_reply(&reply);
    let record = AnalysisRecord {
        id: AnalysisId::random(),
        filename: request.filename,
        image_base64: request.image_base64,
        analysis: reply,
        objects_detected: parsed.objects_detected,
        text_found: parsed.text_found,
        emotions: parsed.emotions,
        scene_description: parsed.scene_description,
        confidence: parsed.confidence,
        timestamp: Utc::now(),
    };
    ctx.storage
        .insert_analysis(&record)
        .await
        .map_err(internal)?;
    Ok(record)
}

pub async fn analysis_history(ctx: &ApiContext) -> Result<Vec<AnalysisRecord>, ApiError> {
    ctx.storage.list_recent_analyses().await.map_err(internal)
}

pub async fn get_analysis(ctx: &ApiContext, id: &str) -> Result<AnalysisRecord, ApiError> {
    let Ok(id) = AnalysisId::from_str(id) else {
        return Err(not_found());
    };
    ctx.storage
        .load_analysis(id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)
}

pub async fn delete_analysis(ctx: &ApiContext, id: &str) -> Result<DeleteAck, ApiError> {
    let Ok(id) = AnalysisId::from_str(id) else {
        return Err(not_found());
    };
    let deleted = ctx.storage.delete_analysis(id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found());
    }
    Ok(DeleteAck {
        message: "Analysis deleted successfully".to_string(),
    })
}

fn not_found() -> ApiError {
    ApiError::new(ErrorCode::NotFound, "Analysis not found")
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use vision::MissingVisionProvider;

    const CANNED_REPLY: &str = "DESCRIPTION: A red bicycle leaning against a brick wall.\n\
OBJECTS: bicycle, wall, pavement\n\
TEXT: None detected\n\
EMOTIONS: None detected\n\
SCENE: Urban street scene\n\
CONFIDENCE: High";

    struct CannedVision;

    #[async_trait]
    impl VisionProvider for CannedVision {
        async fn analyze_image(&self, _filename: &str, _image_base64: &str) -> Result<String> {
            Ok(CANNED_REPLY.to_string())
        }
    }

    async fn setup() -> ApiContext {
        ApiContext {
            storage: Storage::new("sqlite::memory:").await.expect("db"),
            vision: Arc::new(CannedVision),
        }
    }

    fn request() -> AnalyzeImageRequest {
        AnalyzeImageRequest {
            filename: "bike.jpg".into(),
            image_base64: "aW1hZ2UtYnl0ZXM=".into(),
        }
    }

    #[tokio::test]
    async fn analyze_parses_reply_and_persists_record() {
        let ctx = setup().await;
        let record = analyze_image(&ctx, request()).await.expect("analysis");
        assert_eq!(record.objects_detected, vec!["bicycle", "wall", "pavement"]);
        assert_eq!(record.text_found, "None detected");
        assert_eq!(record.confidence, "High");

        let fetched = get_analysis(&ctx, &record.id.to_string())
            .await
            .expect("fetch");
        assert_eq!(fetched.filename, "bike.jpg");
    }

    #[tokio::test]
    async fn analyze_without_provider_is_unavailable() {
        let ctx = ApiContext {
            storage: Storage::new("sqlite::memory:").await.expect("db"),
            vision: Arc::new(MissingVisionProvider),
        };
        let err = analyze_image(&ctx, request()).await.expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Unavailable));
        assert_eq!(err.message, "AI service not configured");
    }

    #[tokio::test]
    async fn analyze_rejects_malformed_base64() {
        let ctx = setup().await;
        let err = analyze_image(
            &ctx,
            AnalyzeImageRequest {
                filename: "bike.jpg".into(),
                image_base64: "not base64!!".into(),
            },
        )
        .await
        .expect_err("should fail");
        assert!(matches!(err.code, ErrorCode::Validation));
    }

    #[tokio::test]
    async fn history_returns_newest_first() {
        let ctx = setup().await;
        analyze_image(&ctx, request()).await.expect("first");
        analyze_image(
            &ctx,
            AnalyzeImageRequest {
                filename: "second.jpg".into(),
                image_base64: "aW1hZ2UtYnl0ZXM=".into(),
            },
        )
        .await
        .expect("second");

        let history = analysis_history(&ctx).await.expect("history");
        assert_eq!(history.len(), 2);
        assert!(history[0].timestamp >= history[1].timestamp);
    }

    #[tokio::test]
    async fn delete_acks_then_misses() {
        let ctx = setup().await;
        let record = analyze_image(&ctx, request()).await.expect("analysis");
        let id = record.id.to_string();

        let ack = delete_analysis(&ctx, &id).await.expect("delete");
        assert_eq!(ack.message, "Analysis deleted successfully");

        let err = delete_analysis(&ctx, &id).await.expect_err("gone");
        assert!(matches!(err.code, ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn malformed_id_reads_as_missing() {
        let ctx = setup().await;
        let err = get_analysis(&ctx, "not-a-uuid").await.expect_err("bad id");
        assert!(matches!(err.code, ErrorCode::NotFound));
    }
}
